use crate::audio::DEFAULT_VOLUME;
use crate::error::{CoreError, Result};
use crate::lyrics::DEFAULT_SENTENCE_TAIL_MS;
use crate::sync::DEFAULT_REFRESH_RATE_HZ;
use crate::timing::{TimingConfig, DEFAULT_FINISH_BUFFER_MS, DEFAULT_HIGHLIGHT_DURATION_MS};
use serde::{Deserialize, Serialize};
use std::fs;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use tracing::info;

/// Accepted range for `playback.refresh_rate_hz`
pub const REFRESH_RATE_RANGE: RangeInclusive<u32> = 1..=120;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KaraokeConfig {
    #[serde(default)]
    pub playback: PlaybackConfig,
    #[serde(default)]
    pub lyrics: LyricsConfig,
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackConfig {
    #[serde(default = "default_refresh_rate")]
    pub refresh_rate_hz: u32,
    #[serde(default = "default_highlight_duration")]
    pub highlight_duration_ms: u64,
    #[serde(default = "default_sentence_tail")]
    pub sentence_tail_ms: u64,
    #[serde(default = "default_finish_buffer")]
    pub finish_buffer_ms: u64,
    #[serde(default = "default_seek_step")]
    pub seek_step_ms: u64,
}

const fn default_refresh_rate() -> u32 {
    DEFAULT_REFRESH_RATE_HZ
}

const fn default_highlight_duration() -> u64 {
    DEFAULT_HIGHLIGHT_DURATION_MS
}

const fn default_sentence_tail() -> u64 {
    DEFAULT_SENTENCE_TAIL_MS
}

const fn default_finish_buffer() -> u64 {
    DEFAULT_FINISH_BUFFER_MS
}

const fn default_seek_step() -> u64 {
    5000
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            refresh_rate_hz: default_refresh_rate(),
            highlight_duration_ms: default_highlight_duration(),
            sentence_tail_ms: default_sentence_tail(),
            finish_buffer_ms: default_finish_buffer(),
            seek_step_ms: default_seek_step(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LyricsConfig {
    /// Directory holding `<song>.json` files, relative to the working directory
    #[serde(default = "default_lyrics_dir")]
    pub directory: PathBuf,
    /// Reorder sentences by start time at load instead of keeping file order
    #[serde(default)]
    pub sort_by_start_time: bool,
}

fn default_lyrics_dir() -> PathBuf {
    PathBuf::from("lyrics")
}

impl Default for LyricsConfig {
    fn default() -> Self {
        Self {
            directory: default_lyrics_dir(),
            sort_by_start_time: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_volume")]
    pub volume: f32,
    #[serde(default = "default_audio_dir")]
    pub directory: PathBuf,
}

const fn default_volume() -> f32 {
    DEFAULT_VOLUME
}

fn default_audio_dir() -> PathBuf {
    PathBuf::from("audio")
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            volume: default_volume(),
            directory: default_audio_dir(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct DisplayConfig {
    #[serde(default = "default_true")]
    pub show_progress_bar: bool,
    #[serde(default = "default_true")]
    pub show_time_info: bool,
    #[serde(default = "default_true")]
    pub show_next_sentence: bool,
    #[serde(default)]
    pub show_previous_sentence: bool,
}

const fn default_true() -> bool {
    true
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            show_progress_bar: true,
            show_time_info: true,
            show_next_sentence: true,
            show_previous_sentence: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Also write logs to `~/.config/karaoke/karaoke.log`
    #[serde(default)]
    pub enabled: bool,
}

impl KaraokeConfig {
    /// Get the configuration directory path (~/.config/karaoke/)
    #[must_use]
    pub fn config_dir() -> PathBuf {
        crate::paths::config_dir()
    }

    /// Get the config file path (~/.config/karaoke/config.toml)
    #[must_use]
    pub fn config_path() -> PathBuf {
        crate::paths::config_path()
    }

    /// Load config from the default path, writing the template on first run
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read, parsed or validated.
    pub fn load_or_create() -> Result<Self> {
        Self::load_or_create_at(&Self::config_path())
    }

    /// Load config from `path`, writing the template there if it is missing.
    ///
    /// A freshly written template yields the default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the template cannot be written or the existing file
    /// cannot be read, parsed or validated.
    pub fn load_or_create_at(path: &Path) -> Result<Self> {
        if !path.exists() {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, CONFIG_TEMPLATE)?;
            info!("Wrote default config to {}", path.display());
            return Ok(Self::default());
        }

        Self::load_from(path)
    }

    /// Load config from an existing file
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ConfigNotFound`] if the file does not exist, and a
    /// parse or validation error if its contents are unusable.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CoreError::ConfigNotFound {
                    path: path.to_path_buf(),
                });
            }
            Err(e) => return Err(e.into()),
        };

        let config = Self::from_toml(&content)?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Parse and validate config from a TOML string
    ///
    /// # Errors
    ///
    /// Returns a parse error for malformed TOML and
    /// [`CoreError::ConfigInvalid`] for out-of-range values.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ConfigInvalid`] naming the offending field.
    pub fn validate(&self) -> Result<()> {
        if !REFRESH_RATE_RANGE.contains(&self.playback.refresh_rate_hz) {
            return Err(CoreError::ConfigInvalid {
                message: format!(
                    "playback.refresh_rate_hz must be between {} and {}, got {}",
                    REFRESH_RATE_RANGE.start(),
                    REFRESH_RATE_RANGE.end(),
                    self.playback.refresh_rate_hz
                ),
            });
        }
        if !(0.0..=1.0).contains(&self.audio.volume) {
            return Err(CoreError::ConfigInvalid {
                message: format!(
                    "audio.volume must be between 0.0 and 1.0, got {}",
                    self.audio.volume
                ),
            });
        }
        Ok(())
    }

    /// Timing windows derived from the `[playback]` table
    #[must_use]
    pub const fn timing(&self) -> TimingConfig {
        TimingConfig {
            highlight_duration_ms: self.playback.highlight_duration_ms,
            finish_buffer_ms: self.playback.finish_buffer_ms,
            sentence_tail_ms: self.playback.sentence_tail_ms,
        }
    }
}

pub const CONFIG_TEMPLATE: &str = r#"# Karaoke Configuration
# ~/.config/karaoke/config.toml

[playback]
# Display refresh rate (1-120)
refresh_rate_hz = 10
# How long a word stays highlighted after its timestamp
highlight_duration_ms = 800
# Extra time a sentence stays current after its last word
sentence_tail_ms = 1000
# Delay after the last sentence before the song counts as finished
finish_buffer_ms = 3000
# Left/right arrow seek step
seek_step_ms = 5000

[lyrics]
directory = "lyrics"
# Reorder sentences by start time instead of keeping file order
sort_by_start_time = false

[audio]
enabled = false
volume = 0.7  # 0.0 - 1.0
directory = "audio"

[display]
show_progress_bar = true
show_time_info = true
show_next_sentence = true
show_previous_sentence = false

[logging]
# Also write logs to ~/.config/karaoke/karaoke.log
enabled = false
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_template_matches_defaults() {
        let config = KaraokeConfig::from_toml(CONFIG_TEMPLATE).unwrap();
        assert_eq!(config, KaraokeConfig::default());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config = KaraokeConfig::from_toml(
            r#"
            [audio]
            enabled = true

            [playback]
            refresh_rate_hz = 30
            "#,
        )
        .unwrap();
        assert!(config.audio.enabled);
        assert!((config.audio.volume - 0.7).abs() < f32::EPSILON);
        assert_eq!(config.playback.refresh_rate_hz, 30);
        assert_eq!(config.playback.finish_buffer_ms, 3000);
        assert_eq!(config.lyrics.directory, PathBuf::from("lyrics"));
        assert!(!config.display.show_previous_sentence);
    }

    #[test]
    fn test_empty_file_is_default() {
        assert_eq!(
            KaraokeConfig::from_toml("").unwrap(),
            KaraokeConfig::default()
        );
    }

    #[test]
    fn test_validation() {
        let err = KaraokeConfig::from_toml("[playback]\nrefresh_rate_hz = 0").unwrap_err();
        assert!(matches!(err, CoreError::ConfigInvalid { .. }));

        let err = KaraokeConfig::from_toml("[playback]\nrefresh_rate_hz = 121").unwrap_err();
        assert!(matches!(err, CoreError::ConfigInvalid { .. }));

        let err = KaraokeConfig::from_toml("[audio]\nvolume = 1.5").unwrap_err();
        assert!(err.to_string().contains("audio.volume"));
    }

    #[test]
    fn test_parse_error() {
        let err = KaraokeConfig::from_toml("[playback\nrefresh_rate_hz = 10").unwrap_err();
        assert!(matches!(err, CoreError::ConfigParseError(_)));
    }

    #[test]
    fn test_load_or_create_writes_template() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = KaraokeConfig::load_or_create_at(&path).unwrap();
        assert_eq!(config, KaraokeConfig::default());
        assert_eq!(fs::read_to_string(&path).unwrap(), CONFIG_TEMPLATE);

        fs::write(&path, "[lyrics]\nsort_by_start_time = true\n").unwrap();
        let config = KaraokeConfig::load_or_create_at(&path).unwrap();
        assert!(config.lyrics.sort_by_start_time);
    }

    #[test]
    fn test_load_from_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = KaraokeConfig::load_from(&dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(err, CoreError::ConfigNotFound { .. }));
    }

    #[test]
    fn test_timing() {
        let config = KaraokeConfig::from_toml(
            "[playback]\nhighlight_duration_ms = 500\nfinish_buffer_ms = 0\n",
        )
        .unwrap();
        let timing = config.timing();
        assert_eq!(timing.highlight_duration_ms, 500);
        assert_eq!(timing.finish_buffer_ms, 0);
        assert_eq!(timing.sentence_tail_ms, 1000);
    }
}

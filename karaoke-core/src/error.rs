use crate::audio::AudioError;
use crate::clock::ClockState;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    // Configuration errors
    #[error("Config file not found at {path}")]
    ConfigNotFound { path: PathBuf },

    #[error("Invalid config: {message}")]
    ConfigInvalid { message: String },

    #[error("Failed to parse config file: {0}")]
    ConfigParseError(#[from] toml::de::Error),

    // Lyrics errors
    #[error("Lyrics file not found: {path}")]
    LyricsNotFound { path: PathBuf },

    #[error("Failed to parse lyrics file {path}: {source}")]
    LyricsParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    // Playback errors
    #[error("Cannot {operation} while {state}")]
    InvalidTransition {
        operation: &'static str,
        state: ClockState,
    },

    #[error("Audio error: {0}")]
    Audio(#[from] AudioError),

    // UI errors
    #[error("Rendering error: {reason}")]
    RenderError { reason: String },

    // IO errors
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl CoreError {
    /// Whether this error only affects audio, leaving lyric sync intact.
    #[must_use]
    pub const fn is_audio(&self) -> bool {
        matches!(self, Self::Audio(_))
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;

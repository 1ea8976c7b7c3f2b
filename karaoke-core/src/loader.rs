//! Loads songs from a directory of JSON lyrics files.

use crate::error::{CoreError, Result};
use crate::lyrics::{Song, SongInfo};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const LYRICS_EXTENSION: &str = "json";

/// Reads `<name>.json` lyrics files from a single directory.
#[derive(Debug, Clone)]
pub struct LyricsLoader {
    directory: PathBuf,
}

impl LyricsLoader {
    #[must_use]
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Resolve a song name to its file path, appending `.json` when missing.
    #[must_use]
    pub fn song_path(&self, name: &str) -> PathBuf {
        let has_extension = Path::new(name)
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case(LYRICS_EXTENSION));
        if has_extension {
            self.directory.join(name)
        } else {
            self.directory.join(format!("{name}.{LYRICS_EXTENSION}"))
        }
    }

    /// Load and parse a song.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::LyricsNotFound`] if the file does not exist and
    /// [`CoreError::LyricsParse`] if it is not a valid lyrics document.
    pub fn load_song(&self, name: &str) -> Result<Song> {
        let path = self.song_path(name);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(CoreError::LyricsNotFound { path });
            }
            Err(e) => return Err(e.into()),
        };

        let song: Song = serde_json::from_str(&content)
            .map_err(|source| CoreError::LyricsParse {
                path: path.clone(),
                source,
            })?;

        debug!(
            "Loaded '{}' by {} from {}: {} sentences, {} words",
            song.title,
            song.artist,
            path.display(),
            song.sentence_count(),
            song.word_count()
        );
        if !song.is_chronological() {
            warn!(
                "Sentences in {} are not in chronological order; next/previous lookups follow file order",
                path.display()
            );
        }

        Ok(song)
    }

    /// Names (file stems) of every lyrics file in the directory, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory exists but cannot be read.
    pub fn list_available_songs(&self) -> Result<Vec<String>> {
        let entries = match fs::read_dir(&self.directory) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut songs = Vec::new();
        for entry in entries {
            let path = entry?.path();
            let is_lyrics = path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case(LYRICS_EXTENSION));
            if is_lyrics {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    songs.push(stem.to_string());
                }
            }
        }
        songs.sort();
        Ok(songs)
    }

    /// Title and artist of a song without building the full model.
    ///
    /// Returns `None` when the file is missing or not valid JSON.
    #[must_use]
    pub fn song_info(&self, name: &str) -> Option<SongInfo> {
        let content = fs::read_to_string(self.song_path(name)).ok()?;
        serde_json::from_str(&content).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SONG_JSON: &str = r#"{
        "title": "Twinkle",
        "artist": "Traditional",
        "sentences": {
            "1": [{"time": 0, "text": "Twinkle"}, {"time": 600, "text": "twinkle"}],
            "2": [{"time": 2000, "text": "little"}, {"time": 2600, "text": "star"}]
        }
    }"#;

    fn lyrics_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("twinkle.json"), SONG_JSON).unwrap();
        fs::write(dir.path().join("broken.json"), "{ not json").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        dir
    }

    #[test]
    fn test_load_song_appends_extension() {
        let dir = lyrics_dir();
        let loader = LyricsLoader::new(dir.path());

        let song = loader.load_song("twinkle").unwrap();
        assert_eq!(song.title, "Twinkle");
        assert_eq!(song.sentence_count(), 2);
        assert_eq!(song.total_duration(), 3600);

        let same = loader.load_song("twinkle.json").unwrap();
        assert_eq!(song, same);
    }

    #[test]
    fn test_load_missing_song() {
        let dir = lyrics_dir();
        let loader = LyricsLoader::new(dir.path());
        let err = loader.load_song("missing").unwrap_err();
        assert!(matches!(err, CoreError::LyricsNotFound { .. }));
    }

    #[test]
    fn test_load_broken_song() {
        let dir = lyrics_dir();
        let loader = LyricsLoader::new(dir.path());
        let err = loader.load_song("broken").unwrap_err();
        assert!(matches!(err, CoreError::LyricsParse { .. }));
    }

    #[test]
    fn test_list_available_songs() {
        let dir = lyrics_dir();
        fs::write(dir.path().join("another.json"), SONG_JSON).unwrap();
        let loader = LyricsLoader::new(dir.path());
        assert_eq!(
            loader.list_available_songs().unwrap(),
            ["another", "broken", "twinkle"]
        );
    }

    #[test]
    fn test_list_missing_directory_is_empty() {
        let dir = TempDir::new().unwrap();
        let loader = LyricsLoader::new(dir.path().join("nope"));
        assert!(loader.list_available_songs().unwrap().is_empty());
    }

    #[test]
    fn test_song_info() {
        let dir = lyrics_dir();
        let loader = LyricsLoader::new(dir.path());

        let info = loader.song_info("twinkle").unwrap();
        assert_eq!(info.title, "Twinkle");
        assert_eq!(info.artist, "Traditional");

        assert!(loader.song_info("broken").is_none());
        assert!(loader.song_info("missing").is_none());
    }
}

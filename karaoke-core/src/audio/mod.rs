//! Audio driver contract used by the playback controller.
//!
//! The controller never talks to an audio library directly. A concrete
//! backend is injected at construction; when no backend is available the
//! application passes a [`NullAudioDriver`] and karaoke runs visual-only.

pub mod mock;

use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Extensions tried, in order, when an audio file is named without one.
pub const AUDIO_EXTENSIONS: [&str; 3] = ["mp3", "wav", "ogg"];

pub const DEFAULT_VOLUME: f32 = 0.7;

/// Errors reported by an [`AudioDriver`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AudioError {
    /// No audio backend is available on this system.
    #[error("audio backend unavailable")]
    Unavailable,

    /// Playback was requested before a file was loaded.
    #[error("no audio file loaded")]
    NotLoaded,

    /// The requested audio file does not exist.
    #[error("audio file not found: {path}")]
    FileNotFound { path: PathBuf },

    /// The backend rejected an operation.
    #[error("audio backend failed: {reason}")]
    Backend { reason: String },
}

/// Background audio playback.
///
/// Implementations must keep `position` consistent with `play`, `pause`,
/// `resume`, `seek` and `stop`. The lyric clock is not resynchronized from
/// the driver, so drift between the two is left to the backend.
pub trait AudioDriver: Send {
    /// Whether this driver can produce sound at all.
    fn is_available(&self) -> bool;

    /// Load a file for playback.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing or cannot be decoded.
    fn load(&mut self, path: &Path) -> Result<(), AudioError>;

    /// Start playing the loaded file from `start`.
    ///
    /// # Errors
    ///
    /// Returns an error if nothing is loaded or the backend fails.
    fn play(&mut self, start: Duration) -> Result<(), AudioError>;

    /// # Errors
    ///
    /// Returns an error if the backend fails.
    fn pause(&mut self) -> Result<(), AudioError>;

    /// # Errors
    ///
    /// Returns an error if the backend fails.
    fn resume(&mut self) -> Result<(), AudioError>;

    /// # Errors
    ///
    /// Returns an error if the backend fails.
    fn stop(&mut self) -> Result<(), AudioError>;

    /// Jump to `position`, keeping the playing/paused state.
    ///
    /// # Errors
    ///
    /// Returns an error if nothing is loaded or the backend fails.
    fn seek(&mut self, position: Duration) -> Result<(), AudioError>;

    /// Set the volume; values are clamped to `0.0..=1.0`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the change. The requested
    /// volume is still remembered.
    fn set_volume(&mut self, volume: f32) -> Result<(), AudioError>;

    fn volume(&self) -> f32;

    /// Current playback position of the audible stream.
    fn position(&self) -> Duration;

    /// Whether sound is currently paused.
    fn is_paused(&self) -> bool;
}

/// Driver shared between the controller and the position poller.
pub type SharedAudioDriver = Arc<Mutex<Box<dyn AudioDriver>>>;

/// Wrap a driver for sharing.
#[must_use]
pub fn shared(driver: impl AudioDriver + 'static) -> SharedAudioDriver {
    Arc::new(Mutex::new(Box::new(driver)))
}

/// Stand-in used when no audio backend is available.
#[derive(Debug, Clone)]
pub struct NullAudioDriver {
    volume: f32,
}

impl Default for NullAudioDriver {
    fn default() -> Self {
        Self {
            volume: DEFAULT_VOLUME,
        }
    }
}

impl AudioDriver for NullAudioDriver {
    fn is_available(&self) -> bool {
        false
    }

    fn load(&mut self, _path: &Path) -> Result<(), AudioError> {
        Err(AudioError::Unavailable)
    }

    fn play(&mut self, _start: Duration) -> Result<(), AudioError> {
        Err(AudioError::Unavailable)
    }

    fn pause(&mut self) -> Result<(), AudioError> {
        Err(AudioError::Unavailable)
    }

    fn resume(&mut self) -> Result<(), AudioError> {
        Err(AudioError::Unavailable)
    }

    fn stop(&mut self) -> Result<(), AudioError> {
        Err(AudioError::Unavailable)
    }

    fn seek(&mut self, _position: Duration) -> Result<(), AudioError> {
        Err(AudioError::Unavailable)
    }

    fn set_volume(&mut self, volume: f32) -> Result<(), AudioError> {
        self.volume = volume.clamp(0.0, 1.0);
        Err(AudioError::Unavailable)
    }

    fn volume(&self) -> f32 {
        self.volume
    }

    fn position(&self) -> Duration {
        Duration::ZERO
    }

    fn is_paused(&self) -> bool {
        false
    }
}

/// Resolve an audio file name inside `directory`.
///
/// Names without a known extension are tried with each of
/// [`AUDIO_EXTENSIONS`]; the first existing file wins.
///
/// # Errors
///
/// Returns [`AudioError::FileNotFound`] if no candidate exists.
pub fn resolve_audio_file(directory: &Path, name: &str) -> Result<PathBuf, AudioError> {
    let has_known_extension = Path::new(name).extension().is_some_and(|ext| {
        AUDIO_EXTENSIONS
            .iter()
            .any(|known| ext.eq_ignore_ascii_case(known))
    });

    if has_known_extension {
        let path = directory.join(name);
        return if path.is_file() {
            Ok(path)
        } else {
            Err(AudioError::FileNotFound { path })
        };
    }

    AUDIO_EXTENSIONS
        .iter()
        .map(|ext| directory.join(format!("{name}.{ext}")))
        .find(|path| path.is_file())
        .ok_or_else(|| AudioError::FileNotFound {
            path: directory.join(name),
        })
}

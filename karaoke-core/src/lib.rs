pub mod audio;
pub mod clock;
pub mod config;
pub mod controller;
pub mod error;
pub mod loader;
pub mod lyrics;
pub mod paths;
pub mod poller;
pub mod sync;
pub mod time;
pub mod timing;

pub use audio::{
    resolve_audio_file, shared, AudioDriver, AudioError, NullAudioDriver, SharedAudioDriver,
};
pub use clock::{ClockState, PlaybackClock};
pub use config::{
    AudioConfig, DisplayConfig, KaraokeConfig, LoggingConfig, LyricsConfig, PlaybackConfig,
};
pub use controller::{AudioSettings, PlaybackController, PlaybackStatus};
pub use error::{CoreError, Result};
pub use loader::LyricsLoader;
pub use lyrics::{Sentence, Song, SongInfo, Word};
pub use paths::{config_dir, config_path, log_file_path, CONFIG_DIR_NAME, CONFIG_FILE_NAME};
pub use poller::PositionPoller;
pub use sync::{Frame, FrameSink, SyncEvent, SyncHandle, SyncLoop, SyncOutcome};
pub use time::{format_time, DurationExt};
pub use timing::{TimingConfig, WordState};

/// Re-export toml error type for config parsing error handling
pub use toml::de::Error as TomlParseError;

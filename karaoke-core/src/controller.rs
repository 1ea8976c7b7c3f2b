//! Playback controller keeping the lyric clock and audio driver in step.
//!
//! Every command transitions the clock first. Audio is then driven to
//! match; if that fails the error is returned as [`CoreError::Audio`] but
//! the clock transition stands, so lyrics keep running visual-only.

use crate::audio::{AudioError, SharedAudioDriver, DEFAULT_VOLUME};
use crate::clock::{ClockState, PlaybackClock};
use crate::error::{CoreError, Result};
use crate::poller::{PositionPoller, DEFAULT_POLL_INTERVAL};
use crate::time::DurationExt;
use parking_lot::Mutex;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Audio preferences the controller starts with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AudioSettings {
    pub enabled: bool,
    pub volume: f32,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            volume: DEFAULT_VOLUME,
        }
    }
}

/// Snapshot of playback for renderers and status queries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackStatus {
    pub state: ClockState,
    pub elapsed: Duration,
    pub audio_enabled: bool,
    pub volume: f32,
    /// Last position reported by the audio driver, when audio is active.
    pub audio_position: Option<Duration>,
}

impl PlaybackStatus {
    #[must_use]
    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed.as_millis_u64()
    }

    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.state == ClockState::Paused
    }
}

#[derive(Debug)]
struct AudioState {
    /// Requested by configuration and supported by the driver.
    enabled: bool,
    loaded: bool,
    volume: f32,
}

/// Owns the playback clock and drives the injected audio driver with it.
pub struct PlaybackController {
    clock: Mutex<PlaybackClock>,
    audio: SharedAudioDriver,
    audio_state: Mutex<AudioState>,
    poller: PositionPoller,
}

impl PlaybackController {
    #[must_use]
    pub fn new(audio: SharedAudioDriver, settings: AudioSettings) -> Self {
        Self::with_poll_interval(audio, settings, DEFAULT_POLL_INTERVAL)
    }

    #[must_use]
    pub fn with_poll_interval(
        audio: SharedAudioDriver,
        settings: AudioSettings,
        poll_interval: Duration,
    ) -> Self {
        let available = audio.lock().is_available();
        if settings.enabled && !available {
            warn!("Audio enabled but no audio backend is available; running visual-only");
        }

        Self {
            clock: Mutex::new(PlaybackClock::new()),
            poller: PositionPoller::new(audio.clone(), poll_interval),
            audio,
            audio_state: Mutex::new(AudioState {
                enabled: settings.enabled && available,
                loaded: false,
                volume: settings.volume.clamp(0.0, 1.0),
            }),
        }
    }

    /// Load the backing track.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Audio`] if audio is disabled or the driver
    /// cannot load the file. Lyrics are unaffected.
    pub fn load_audio(&self, path: &Path) -> Result<()> {
        let mut state = self.audio_state.lock();
        if !state.enabled {
            return Err(AudioError::Unavailable.into());
        }

        let result = self.audio.lock().load(path);
        state.loaded = result.is_ok();
        match result {
            Ok(()) => {
                info!("Loaded audio {}", path.display());
                Ok(())
            }
            Err(e) => {
                warn!("Failed to load audio {}: {}", path.display(), e);
                Err(e.into())
            }
        }
    }

    fn audio_active(&self) -> bool {
        let state = self.audio_state.lock();
        state.enabled && state.loaded
    }

    /// Start playback at `offset`, restarting if already playing.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Audio`] if the audio could not be started; the
    /// clock is running regardless.
    pub fn play(&self, offset: Duration) -> Result<()> {
        self.clock.lock().start(offset);
        info!("Playback started at {:?}", offset);

        if !self.audio_active() {
            return Ok(());
        }
        let volume = self.audio_state.lock().volume;
        let result = {
            let mut driver = self.audio.lock();
            driver.set_volume(volume).and_then(|()| driver.play(offset))
        };
        if let Err(e) = result {
            warn!("Audio playback failed, continuing without sound: {}", e);
            return Err(e.into());
        }
        self.poller.start();
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`CoreError::InvalidTransition`] unless playing, or
    /// [`CoreError::Audio`] if the audio could not be paused.
    pub async fn pause(&self) -> Result<()> {
        self.clock.lock().pause()?;
        debug!("Playback paused");

        if self.audio_active() {
            self.poller.stop().await;
            let result = self.audio.lock().pause();
            result?;
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`CoreError::InvalidTransition`] unless paused, or
    /// [`CoreError::Audio`] if the audio could not be resumed.
    pub fn resume(&self) -> Result<()> {
        self.clock.lock().resume()?;
        debug!("Playback resumed");

        if self.audio_active() {
            let result = self.audio.lock().resume();
            result?;
            self.poller.start();
        }
        Ok(())
    }

    /// Pause when playing, resume when paused.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidTransition`] while stopped, or an audio
    /// error from the underlying command.
    pub async fn toggle_pause(&self) -> Result<ClockState> {
        let state = self.state();
        match state {
            ClockState::Playing => self.pause().await?,
            ClockState::Paused => self.resume()?,
            ClockState::Stopped => {
                return Err(CoreError::InvalidTransition {
                    operation: "toggle pause",
                    state,
                })
            }
        }
        Ok(self.state())
    }

    /// Jump to `offset`, keeping the playing/paused state.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidTransition`] while stopped, or
    /// [`CoreError::Audio`] if the audio could not seek.
    pub fn seek(&self, offset: Duration) -> Result<()> {
        self.clock.lock().seek(offset)?;
        debug!("Seeked to {:?}", offset);

        if self.audio_active() {
            let result = self.audio.lock().seek(offset);
            result?;
        }
        Ok(())
    }

    /// Seek relative to the current position, clamping at zero.
    ///
    /// Returns the new position.
    ///
    /// # Errors
    ///
    /// Same as [`Self::seek`].
    pub fn seek_by(&self, delta_ms: i64) -> Result<Duration> {
        let target = self.elapsed().saturating_add_signed_millis(delta_ms);
        self.seek(target)?;
        Ok(target)
    }

    /// Stop the clock, the position poller and the audio.
    ///
    /// Safe to call repeatedly. The poller has exited when this returns.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Audio`] if the driver failed to stop.
    pub async fn stop(&self) -> Result<()> {
        let was_stopped = {
            let mut clock = self.clock.lock();
            let was_stopped = clock.state() == ClockState::Stopped;
            clock.stop();
            was_stopped
        };
        self.poller.stop().await;

        if was_stopped || !self.audio_active() {
            return Ok(());
        }
        info!("Playback stopped");
        let result = self.audio.lock().stop();
        result.map_err(CoreError::from)
    }

    /// Set the volume, clamped to `0.0..=1.0`. Returns the applied value.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Audio`] if the driver rejected the change; the
    /// value is still remembered for the next playback.
    pub fn set_volume(&self, volume: f32) -> Result<f32> {
        let volume = volume.clamp(0.0, 1.0);
        let enabled = {
            let mut state = self.audio_state.lock();
            state.volume = volume;
            state.enabled
        };
        if enabled {
            let result = self.audio.lock().set_volume(volume);
            result?;
        }
        Ok(volume)
    }

    /// Change the volume by `delta`.
    ///
    /// # Errors
    ///
    /// Same as [`Self::set_volume`].
    pub fn adjust_volume(&self, delta: f32) -> Result<f32> {
        let current = self.audio_state.lock().volume;
        self.set_volume(current + delta)
    }

    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.clock.lock().elapsed()
    }

    #[must_use]
    pub fn state(&self) -> ClockState {
        self.clock.lock().state()
    }

    #[must_use]
    pub fn status(&self) -> PlaybackStatus {
        let (state, elapsed) = {
            let clock = self.clock.lock();
            (clock.state(), clock.elapsed())
        };
        let (audio_enabled, volume) = {
            let audio = self.audio_state.lock();
            (audio.enabled && audio.loaded, audio.volume)
        };
        PlaybackStatus {
            state,
            elapsed,
            audio_enabled,
            volume,
            audio_position: audio_enabled.then(|| self.poller.last_position()),
        }
    }

    /// Whether the audio position poller is currently running.
    #[must_use]
    pub fn is_polling(&self) -> bool {
        self.poller.is_running()
    }
}

//! Mock audio driver for tests and dry runs.
//!
//! - `MockAudioDriver::working()` - accepts every call and tracks position
//! - `MockAudioDriver::failing()` - reports available but rejects playback
//!
//! Every call is recorded in a shared [`AudioCallLog`] so tests can assert
//! that the controller kept audio in step with the lyric clock.

use super::{AudioDriver, AudioError, DEFAULT_VOLUME};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// One recorded driver call.
#[derive(Debug, Clone, PartialEq)]
pub enum AudioCall {
    Load(PathBuf),
    Play(Duration),
    Pause,
    Resume,
    Stop,
    Seek(Duration),
    SetVolume(f32),
}

/// Shared, cloneable record of driver calls.
#[derive(Debug, Clone, Default)]
pub struct AudioCallLog(Arc<Mutex<Vec<AudioCall>>>);

impl AudioCallLog {
    #[must_use]
    pub fn calls(&self) -> Vec<AudioCall> {
        self.0.lock().clone()
    }

    #[must_use]
    pub fn count(&self, matches: impl Fn(&AudioCall) -> bool) -> usize {
        self.0.lock().iter().filter(|call| matches(call)).count()
    }

    fn push(&self, call: AudioCall) {
        self.0.lock().push(call);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockBehavior {
    /// Every operation succeeds.
    Working,
    /// Loading succeeds, every playback operation fails.
    Failing,
}

#[derive(Debug, Clone, Copy)]
enum Transport {
    Stopped,
    Playing { started_at: Instant, offset: Duration },
    Paused { position: Duration },
}

/// In-memory [`AudioDriver`] with a simulated transport.
#[derive(Debug)]
pub struct MockAudioDriver {
    behavior: MockBehavior,
    log: AudioCallLog,
    loaded: Option<PathBuf>,
    transport: Transport,
    volume: f32,
}

impl MockAudioDriver {
    #[must_use]
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            log: AudioCallLog::default(),
            loaded: None,
            transport: Transport::Stopped,
            volume: DEFAULT_VOLUME,
        }
    }

    #[must_use]
    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    #[must_use]
    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    /// Handle to the call log that stays valid after the driver is boxed.
    #[must_use]
    pub fn log(&self) -> AudioCallLog {
        self.log.clone()
    }

    fn check(&self) -> Result<(), AudioError> {
        match self.behavior {
            MockBehavior::Working => Ok(()),
            MockBehavior::Failing => Err(AudioError::Backend {
                reason: "mock failure".into(),
            }),
        }
    }

    fn check_loaded(&self) -> Result<(), AudioError> {
        self.check()?;
        if self.loaded.is_none() {
            return Err(AudioError::NotLoaded);
        }
        Ok(())
    }
}

impl AudioDriver for MockAudioDriver {
    fn is_available(&self) -> bool {
        true
    }

    fn load(&mut self, path: &Path) -> Result<(), AudioError> {
        self.log.push(AudioCall::Load(path.to_path_buf()));
        self.loaded = Some(path.to_path_buf());
        Ok(())
    }

    fn play(&mut self, start: Duration) -> Result<(), AudioError> {
        self.log.push(AudioCall::Play(start));
        self.check_loaded()?;
        self.transport = Transport::Playing {
            started_at: Instant::now(),
            offset: start,
        };
        Ok(())
    }

    fn pause(&mut self) -> Result<(), AudioError> {
        self.log.push(AudioCall::Pause);
        self.check()?;
        self.transport = Transport::Paused {
            position: self.position(),
        };
        Ok(())
    }

    fn resume(&mut self) -> Result<(), AudioError> {
        self.log.push(AudioCall::Resume);
        self.check()?;
        if let Transport::Paused { position } = self.transport {
            self.transport = Transport::Playing {
                started_at: Instant::now(),
                offset: position,
            };
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<(), AudioError> {
        self.log.push(AudioCall::Stop);
        self.check()?;
        self.transport = Transport::Stopped;
        Ok(())
    }

    fn seek(&mut self, position: Duration) -> Result<(), AudioError> {
        self.log.push(AudioCall::Seek(position));
        self.check_loaded()?;
        self.transport = match self.transport {
            Transport::Playing { .. } => Transport::Playing {
                started_at: Instant::now(),
                offset: position,
            },
            Transport::Paused { .. } => Transport::Paused { position },
            Transport::Stopped => Transport::Stopped,
        };
        Ok(())
    }

    fn set_volume(&mut self, volume: f32) -> Result<(), AudioError> {
        self.log.push(AudioCall::SetVolume(volume));
        self.volume = volume.clamp(0.0, 1.0);
        self.check()
    }

    fn volume(&self) -> f32 {
        self.volume
    }

    fn position(&self) -> Duration {
        match self.transport {
            Transport::Stopped => Duration::ZERO,
            Transport::Playing { started_at, offset } => offset.saturating_add(started_at.elapsed()),
            Transport::Paused { position } => position,
        }
    }

    fn is_paused(&self) -> bool {
        matches!(self.transport, Transport::Paused { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_working_driver_tracks_position() {
        let mut driver = MockAudioDriver::working();
        driver.load(Path::new("song.mp3")).unwrap();
        driver.play(Duration::from_secs(2)).unwrap();

        tokio::time::advance(Duration::from_millis(500)).await;
        assert_eq!(driver.position(), Duration::from_millis(2500));

        driver.pause().unwrap();
        tokio::time::advance(Duration::from_secs(3)).await;
        assert_eq!(driver.position(), Duration::from_millis(2500));
        assert!(driver.is_paused());
    }

    #[test]
    fn test_play_requires_load() {
        let mut driver = MockAudioDriver::working();
        assert_eq!(driver.play(Duration::ZERO), Err(AudioError::NotLoaded));
    }

    #[test]
    fn test_failing_driver_records_calls() {
        let mut driver = MockAudioDriver::failing();
        let log = driver.log();
        driver.load(Path::new("song.mp3")).unwrap();
        assert!(driver.play(Duration::ZERO).is_err());
        assert!(driver.stop().is_err());

        assert_eq!(
            log.calls(),
            vec![
                AudioCall::Load(PathBuf::from("song.mp3")),
                AudioCall::Play(Duration::ZERO),
                AudioCall::Stop,
            ]
        );
    }
}

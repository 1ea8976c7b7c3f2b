//! Playback clock tracking elapsed song time across pauses and seeks.
//!
//! The clock reads [`tokio::time::Instant`], which behaves like
//! `std::time::Instant` at runtime and can be frozen and advanced in tests.

use crate::error::{CoreError, Result};
use crate::time::DurationExt;
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;

/// Externally visible clock state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockState {
    Stopped,
    Playing,
    Paused,
}

impl ClockState {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Stopped => "stopped",
            Self::Playing => "playing",
            Self::Paused => "paused",
        }
    }
}

impl fmt::Display for ClockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy)]
enum Phase {
    Stopped,
    /// Song time is `offset` plus the wall time since `started_at`.
    Playing { started_at: Instant, offset: Duration },
    /// Song time is frozen at `position`.
    Paused { position: Duration },
}

/// Stopped -> Playing <-> Paused -> Stopped state machine.
///
/// Invalid transitions leave the clock untouched and return
/// [`CoreError::InvalidTransition`].
#[derive(Debug, Clone)]
pub struct PlaybackClock {
    phase: Phase,
}

impl Default for PlaybackClock {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackClock {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            phase: Phase::Stopped,
        }
    }

    /// Start (or restart) playback so that `elapsed()` equals `offset` now.
    pub fn start(&mut self, offset: Duration) {
        self.phase = Phase::Playing {
            started_at: Instant::now(),
            offset,
        };
    }

    /// Freeze elapsed time.
    ///
    /// # Errors
    ///
    /// Fails unless the clock is playing.
    pub fn pause(&mut self) -> Result<()> {
        match self.phase {
            Phase::Playing { .. } => {
                self.phase = Phase::Paused {
                    position: self.elapsed(),
                };
                Ok(())
            }
            _ => Err(self.invalid("pause")),
        }
    }

    /// Continue from the frozen position; the paused interval is excluded.
    ///
    /// # Errors
    ///
    /// Fails unless the clock is paused.
    pub fn resume(&mut self) -> Result<()> {
        match self.phase {
            Phase::Paused { position } => {
                self.phase = Phase::Playing {
                    started_at: Instant::now(),
                    offset: position,
                };
                Ok(())
            }
            _ => Err(self.invalid("resume")),
        }
    }

    /// Jump to `offset`, keeping the playing/paused state.
    ///
    /// # Errors
    ///
    /// Fails while stopped.
    pub fn seek(&mut self, offset: Duration) -> Result<()> {
        match self.phase {
            Phase::Playing { .. } => {
                self.start(offset);
                Ok(())
            }
            Phase::Paused { .. } => {
                self.phase = Phase::Paused { position: offset };
                Ok(())
            }
            Phase::Stopped => Err(self.invalid("seek")),
        }
    }

    /// Stop playback. Stopping a stopped clock is a no-op.
    pub fn stop(&mut self) {
        self.phase = Phase::Stopped;
    }

    /// Song time since the logical start, excluding paused intervals.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        match self.phase {
            Phase::Stopped => Duration::ZERO,
            Phase::Playing { started_at, offset } => offset.saturating_add(started_at.elapsed()),
            Phase::Paused { position } => position,
        }
    }

    #[must_use]
    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed().as_millis_u64()
    }

    #[must_use]
    pub const fn state(&self) -> ClockState {
        match self.phase {
            Phase::Stopped => ClockState::Stopped,
            Phase::Playing { .. } => ClockState::Playing,
            Phase::Paused { .. } => ClockState::Paused,
        }
    }

    #[must_use]
    pub const fn is_playing(&self) -> bool {
        matches!(self.phase, Phase::Playing { .. })
    }

    #[must_use]
    pub const fn is_paused(&self) -> bool {
        matches!(self.phase, Phase::Paused { .. })
    }

    const fn invalid(&self, operation: &'static str) -> CoreError {
        CoreError::InvalidTransition {
            operation,
            state: self.state(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::advance;

    const fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    #[test]
    fn test_new_clock_is_stopped() {
        let clock = PlaybackClock::new();
        assert_eq!(clock.state(), ClockState::Stopped);
        assert_eq!(clock.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_at_offset() {
        let mut clock = PlaybackClock::new();
        clock.start(ms(2500));
        assert_eq!(clock.elapsed(), ms(2500));

        advance(ms(1000)).await;
        assert_eq!(clock.elapsed(), ms(3500));
        assert!(clock.is_playing());
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_freezes_and_resume_excludes_pause() {
        let mut clock = PlaybackClock::new();
        clock.start(Duration::ZERO);
        advance(ms(1200)).await;

        clock.pause().unwrap();
        let at_pause = clock.elapsed();
        assert_eq!(at_pause, ms(1200));

        advance(ms(5000)).await;
        assert_eq!(clock.elapsed(), at_pause);

        clock.resume().unwrap();
        assert_eq!(clock.elapsed(), at_pause);

        advance(ms(300)).await;
        assert_eq!(clock.elapsed(), ms(1500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_seek_while_playing() {
        let mut clock = PlaybackClock::new();
        clock.start(Duration::ZERO);
        advance(ms(800)).await;

        clock.seek(ms(5000)).unwrap();
        assert_eq!(clock.elapsed(), ms(5000));
        assert!(clock.is_playing());

        advance(ms(100)).await;
        assert_eq!(clock.elapsed(), ms(5100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_seek_while_paused_stays_paused() {
        let mut clock = PlaybackClock::new();
        clock.start(ms(20_000));
        clock.pause().unwrap();

        clock.seek(ms(5000)).unwrap();
        assert_eq!(clock.elapsed(), ms(5000));
        assert!(clock.is_paused());

        advance(ms(1000)).await;
        assert_eq!(clock.elapsed(), ms(5000));

        clock.resume().unwrap();
        advance(ms(250)).await;
        assert_eq!(clock.elapsed(), ms(5250));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_resets_elapsed() {
        let mut clock = PlaybackClock::new();
        clock.start(ms(1000));
        advance(ms(1000)).await;

        clock.stop();
        assert_eq!(clock.state(), ClockState::Stopped);
        assert_eq!(clock.elapsed(), Duration::ZERO);

        clock.stop();
        assert_eq!(clock.state(), ClockState::Stopped);
    }

    #[test]
    fn test_invalid_transitions_are_rejected() {
        let mut clock = PlaybackClock::new();

        let err = clock.pause().unwrap_err();
        assert!(matches!(
            err,
            CoreError::InvalidTransition {
                operation: "pause",
                state: ClockState::Stopped
            }
        ));
        assert!(clock.resume().is_err());
        assert!(clock.seek(ms(1000)).is_err());
        assert_eq!(clock.state(), ClockState::Stopped);

        clock.start(Duration::ZERO);
        assert!(clock.resume().is_err());
        assert!(clock.is_playing());

        clock.pause().unwrap();
        assert!(clock.pause().is_err());
        assert!(clock.is_paused());
    }

    #[test]
    fn test_invalid_transition_message() {
        let mut clock = PlaybackClock::new();
        let err = clock.resume().unwrap_err();
        assert_eq!(err.to_string(), "Cannot resume while stopped");
    }
}

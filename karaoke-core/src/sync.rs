use crate::clock::ClockState;
use crate::controller::{PlaybackController, PlaybackStatus};
use crate::error::Result;
use crate::lyrics::{Sentence, Song};
use crate::time::DurationExt;
use crate::timing::{
    current_sentence, is_song_finished, next_sentence, previous_sentence, progress_percentage,
    TimingConfig,
};
use async_trait::async_trait;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Default tick rate of the sync loop.
pub const DEFAULT_REFRESH_RATE_HZ: u32 = 10;

/// Render failures in a row after which the loop gives up.
const MAX_CONSECUTIVE_RENDER_FAILURES: u32 = 10;

/// Everything a renderer needs for one tick
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub title: String,
    pub artist: String,
    pub elapsed: Duration,
    pub total_duration: Duration,
    /// Song progress in percent (0.0 to 100.0)
    pub progress: f64,
    pub current: Option<Sentence>,
    pub next: Option<Sentence>,
    pub previous: Option<Sentence>,
    pub state: ClockState,
    pub audio_enabled: bool,
    pub volume: f32,
    pub audio_position: Option<Duration>,
}

impl Frame {
    /// Evaluate the timing queries for a playback snapshot
    #[must_use]
    pub fn capture(song: &Song, status: &PlaybackStatus) -> Self {
        let t = status.elapsed_ms();
        let total = song.total_duration();
        Self {
            title: song.title.clone(),
            artist: song.artist.clone(),
            elapsed: status.elapsed,
            total_duration: Duration::from_millis(total),
            progress: progress_percentage(t, total),
            current: current_sentence(song, t).cloned(),
            next: next_sentence(song, t).cloned(),
            previous: previous_sentence(song, t).cloned(),
            state: status.state,
            audio_enabled: status.audio_enabled,
            volume: status.volume,
            audio_position: status.audio_position,
        }
    }

    #[must_use]
    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed.as_millis_u64()
    }

    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.state == ClockState::Paused
    }
}

/// Consumer of frames produced by the sync loop
#[async_trait]
pub trait FrameSink: Send {
    /// Draw one tick.
    ///
    /// # Errors
    ///
    /// A failed render is logged and retried on the next tick.
    async fn render(&mut self, frame: &Frame) -> Result<()>;

    /// Called once after the last frame when the song has finished.
    ///
    /// # Errors
    ///
    /// Failures are logged; the loop ends either way.
    async fn finished(&mut self, frame: &Frame) -> Result<()> {
        let _ = frame;
        Ok(())
    }
}

/// Lifecycle events emitted by the sync loop
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    /// The loop started ticking
    Started { total_duration: Duration },
    /// The song ran past its end and the finish buffer
    Finished { elapsed: Duration },
    /// The loop was cancelled or playback was stopped
    Stopped { elapsed: Duration },
    /// The loop gave up after repeated failures
    Error { message: String },
}

/// How a sync loop run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Finished,
    Cancelled,
    Aborted { reason: String },
}

/// Fixed-cadence loop sampling the playback clock and rendering lyrics
pub struct SyncLoop {
    song: Arc<Song>,
    controller: Arc<PlaybackController>,
    timing: TimingConfig,
    tick_interval: Duration,
    cancel_token: CancellationToken,
    event_tx: broadcast::Sender<SyncEvent>,
    running: AtomicBool,
}

impl SyncLoop {
    /// Create a new sync loop
    ///
    /// # Arguments
    /// * `song` - Lyrics to synchronize
    /// * `controller` - Playback controller owning the clock
    /// * `timing` - Highlight, sentence tail and finish windows. The sentence
    ///   tail is applied to `song` here.
    /// * `refresh_rate_hz` - Ticks per second (values below 1 are treated as 1)
    /// * `cancel_token` - Optional external cancellation token for graceful shutdown
    #[must_use]
    pub fn new(
        song: Arc<Song>,
        controller: Arc<PlaybackController>,
        timing: TimingConfig,
        refresh_rate_hz: u32,
        cancel_token: Option<CancellationToken>,
    ) -> Arc<Self> {
        let (event_tx, _) = broadcast::channel(64);
        let song = if song
            .sentences()
            .iter()
            .all(|sentence| sentence.tail_ms() == timing.sentence_tail_ms)
        {
            song
        } else {
            Arc::new((*song).clone().with_sentence_tail(timing.sentence_tail_ms))
        };

        Arc::new(Self {
            song,
            controller,
            timing,
            tick_interval: tick_interval(refresh_rate_hz),
            cancel_token: cancel_token.unwrap_or_default(),
            event_tx,
            running: AtomicBool::new(false),
        })
    }

    /// Subscribe to sync events
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.event_tx.subscribe()
    }

    #[must_use]
    pub const fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    #[must_use]
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// The song being synchronized, with the configured sentence tail.
    #[must_use]
    pub fn song(&self) -> &Arc<Song> {
        &self.song
    }

    #[must_use]
    pub fn controller(&self) -> &Arc<PlaybackController> {
        &self.controller
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Signal the loop to stop at the next tick boundary
    pub fn stop(&self) {
        self.cancel_token.cancel();
    }

    /// Run the loop in a background task
    #[must_use]
    pub fn start(self: &Arc<Self>, mut sink: Box<dyn FrameSink>) -> SyncHandle {
        let sync = Arc::clone(self);
        let handle = tokio::spawn(async move { sync.run(sink.as_mut()).await });
        SyncHandle {
            sync: Arc::clone(self),
            handle,
        }
    }

    /// Tick until the song finishes, playback stops or the loop is cancelled.
    ///
    /// Playback (audio and position poller included) is stopped before this
    /// returns. A panicking sink ends the run as [`SyncOutcome::Aborted`].
    pub async fn run(&self, sink: &mut dyn FrameSink) -> SyncOutcome {
        self.running.store(true, Ordering::SeqCst);
        let total_duration = Duration::from_millis(self.song.total_duration());
        info!(
            "Sync loop started for '{}' ({:?}, tick {:?})",
            self.song.title, total_duration, self.tick_interval
        );
        let _ = self.event_tx.send(SyncEvent::Started { total_duration });

        let outcome = match AssertUnwindSafe(self.tick_until_done(sink))
            .catch_unwind()
            .await
        {
            Ok(outcome) => outcome,
            Err(panic) => SyncOutcome::Aborted {
                reason: format!("renderer panicked: {}", panic_message(panic.as_ref())),
            },
        };
        let elapsed = self.controller.elapsed();

        if let Err(e) = self.controller.stop().await {
            warn!("Failed to stop playback cleanly: {}", e);
        }

        match &outcome {
            SyncOutcome::Finished => {
                info!("Song finished at {:?}", elapsed);
            }
            SyncOutcome::Cancelled => {
                info!("Sync loop stopped at {:?}", elapsed);
                let _ = self.event_tx.send(SyncEvent::Stopped { elapsed });
            }
            SyncOutcome::Aborted { reason } => {
                error!("Sync loop aborted: {}", reason);
                let _ = self.event_tx.send(SyncEvent::Error {
                    message: reason.clone(),
                });
            }
        }

        self.running.store(false, Ordering::SeqCst);
        outcome
    }

    async fn tick_until_done(&self, sink: &mut dyn FrameSink) -> SyncOutcome {
        let mut consecutive_failures = 0;
        let mut last_current: Option<String> = None;

        loop {
            if self.cancel_token.is_cancelled() {
                return SyncOutcome::Cancelled;
            }

            let status = self.controller.status();
            if status.state == ClockState::Stopped {
                debug!("Playback clock stopped, ending sync loop");
                return SyncOutcome::Cancelled;
            }

            let frame = Frame::capture(&self.song, &status);
            let current_key = frame.current.as_ref().map(|s| s.key().to_string());
            if current_key != last_current {
                debug!(
                    "Current sentence: {:?} at {}ms",
                    current_key,
                    frame.elapsed_ms()
                );
                last_current = current_key;
            }

            match sink.render(&frame).await {
                Ok(()) => consecutive_failures = 0,
                Err(e) => {
                    consecutive_failures += 1;
                    warn!("Render failed (attempt {}): {}", consecutive_failures, e);
                    if consecutive_failures >= MAX_CONSECUTIVE_RENDER_FAILURES {
                        return SyncOutcome::Aborted {
                            reason: format!(
                                "{consecutive_failures} consecutive render failures, last: {e}"
                            ),
                        };
                    }
                }
            }

            if is_song_finished(&self.song, frame.elapsed_ms(), self.timing.finish_buffer_ms) {
                if let Err(e) = sink.finished(&frame).await {
                    warn!("Finish notification failed: {}", e);
                }
                let _ = self.event_tx.send(SyncEvent::Finished {
                    elapsed: frame.elapsed,
                });
                return SyncOutcome::Finished;
            }

            tokio::select! {
                () = self.cancel_token.cancelled() => return SyncOutcome::Cancelled,
                () = tokio::time::sleep(self.tick_interval) => {}
            }
        }
    }
}

/// Handle to a sync loop running in the background
pub struct SyncHandle {
    sync: Arc<SyncLoop>,
    handle: JoinHandle<SyncOutcome>,
}

impl SyncHandle {
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the loop to end on its own.
    ///
    /// If the task itself was aborted, playback is stopped here instead.
    pub async fn join(self) -> SyncOutcome {
        match self.handle.await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Sync loop task failed: {}", e);
                self.sync.running.store(false, Ordering::SeqCst);
                if let Err(stop_err) = self.sync.controller.stop().await {
                    warn!("Failed to stop playback cleanly: {}", stop_err);
                }
                let reason = e.to_string();
                let _ = self.sync.event_tx.send(SyncEvent::Error {
                    message: reason.clone(),
                });
                SyncOutcome::Aborted { reason }
            }
        }
    }

    /// Cancel the loop and wait until it and all playback have stopped.
    pub async fn stop(self) -> SyncOutcome {
        self.sync.stop();
        self.join().await
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

/// Interval between ticks for a refresh rate in Hz.
#[must_use]
pub fn tick_interval(refresh_rate_hz: u32) -> Duration {
    Duration::from_secs(1) / refresh_rate_hz.max(1)
}

//! Background polling of the audio driver's playback position.

use crate::audio::SharedAudioDriver;
use parking_lot::Mutex;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// How often the audio position is sampled.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Upper bound on how long [`PositionPoller::stop`] waits for the task.
pub const STOP_TIMEOUT: Duration = Duration::from_secs(1);

struct PollerTask {
    cancel_token: CancellationToken,
    handle: JoinHandle<()>,
}

/// Publishes the audio position on a watch channel while audio is playing.
///
/// At most one polling task runs at a time. Starting an already running
/// poller is a no-op, and stopping waits for the task to exit so no polling
/// outlives the owner.
pub struct PositionPoller {
    audio: SharedAudioDriver,
    interval: Duration,
    position_tx: watch::Sender<Duration>,
    task: Mutex<Option<PollerTask>>,
}

impl PositionPoller {
    #[must_use]
    pub fn new(audio: SharedAudioDriver, interval: Duration) -> Self {
        let (position_tx, _) = watch::channel(Duration::ZERO);
        Self {
            audio,
            interval,
            position_tx,
            task: Mutex::new(None),
        }
    }

    /// Most recently published position.
    #[must_use]
    pub fn last_position(&self) -> Duration {
        *self.position_tx.borrow()
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .as_ref()
            .is_some_and(|task| !task.handle.is_finished())
    }

    /// Spawn the polling task on the current tokio runtime.
    ///
    /// Returns `false` without spawning if a task is already running.
    pub fn start(&self) -> bool {
        let mut task = self.task.lock();
        if task.as_ref().is_some_and(|t| !t.handle.is_finished()) {
            debug!("Position poller already running");
            return false;
        }

        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(poll_positions(
            self.audio.clone(),
            self.interval,
            self.position_tx.clone(),
            cancel_token.clone(),
        ));
        *task = Some(PollerTask {
            cancel_token,
            handle,
        });
        debug!("Position poller started (interval: {:?})", self.interval);
        true
    }

    /// Cancel the polling task and wait up to [`STOP_TIMEOUT`] for it to
    /// exit, aborting it after that.
    pub async fn stop(&self) {
        let task = self.task.lock().take();
        let Some(task) = task else {
            return;
        };

        task.cancel_token.cancel();
        let abort_handle = task.handle.abort_handle();
        match timeout(STOP_TIMEOUT, task.handle).await {
            Ok(Ok(())) => debug!("Position poller stopped"),
            Ok(Err(e)) => warn!("Position poller task failed: {}", e),
            Err(_) => {
                warn!(
                    "Position poller did not stop within {:?}, aborting",
                    STOP_TIMEOUT
                );
                abort_handle.abort();
            }
        }
    }
}

async fn poll_positions(
    audio: SharedAudioDriver,
    interval: Duration,
    position_tx: watch::Sender<Duration>,
    cancel_token: CancellationToken,
) {
    loop {
        tokio::select! {
            () = cancel_token.cancelled() => break,
            () = tokio::time::sleep(interval) => {
                let (paused, position) = {
                    let driver = audio.lock();
                    (driver.is_paused(), driver.position())
                };
                if !paused {
                    position_tx.send_replace(position);
                }
            }
        }
    }
}

//! The watcher: an isolated Tokio task that owns the monitoring loop.
//!
//! The watcher runs in its own task, communicating with the outside
//! world through channels. On every poll it reads the provider's current
//! session, runs the expiry tracker, publishes the fresh snapshot on a
//! `watch` channel, and delivers edge events on an `mpsc` channel. The
//! owning scope holds a [`WatcherHandle`]; dropping it tears the task
//! down, so no timer outlives its owner.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use sessionwatch_poll::{PollConfig, PollScheduler};
use sessionwatch_session::{
    ExpiryTracker, MonitorConfig, MonitorEvent, MonitorState, SessionProvider,
};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::WatchError;

/// Command channel size for the watcher task.
const COMMAND_CHANNEL_SIZE: usize = 16;

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// Commands sent to the watcher task through its channel.
///
/// The `oneshot::Sender` in some variants is a reply channel: the caller
/// sends a command and waits for the response on it.
pub(crate) enum WatcherCommand {
    /// Run an evaluation immediately, outside the polling cadence, and
    /// reply with the resulting snapshot. UI code sends this on window
    /// focus.
    CheckNow {
        reply: oneshot::Sender<MonitorState>,
    },

    /// Stop the poll timer (page hidden).
    Pause,

    /// Restart the poll timer (page visible again).
    Resume,

    /// Stop the watcher for good. Replies once the loop is about to
    /// exit.
    Shutdown { reply: oneshot::Sender<()> },
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builder for configuring and spawning a session watcher.
///
/// # Example
///
/// ```rust,ignore
/// use sessionwatch::prelude::*;
///
/// let mut handle = WatcherBuilder::new()
///     .warn_threshold_mins(5)
///     .poll_interval(Duration::from_secs(30))
///     .spawn(my_provider);
///
/// while let Some(event) = handle.recv().await {
///     match event {
///         MonitorEvent::ExpiringSoon { .. } => show_banner(),
///         MonitorEvent::Expired => redirect_to_login(),
///     }
/// }
/// ```
pub struct WatcherBuilder {
    monitor: MonitorConfig,
    poll: PollConfig,
}

impl WatcherBuilder {
    /// Creates a builder with default settings: warn 5 minutes out,
    /// auto-refresh on, poll every 30 seconds.
    pub fn new() -> Self {
        Self {
            monitor: MonitorConfig::default(),
            poll: PollConfig::default(),
        }
    }

    /// Sets the full monitor configuration.
    pub fn monitor_config(mut self, config: MonitorConfig) -> Self {
        self.monitor = config;
        self
    }

    /// Sets the full poll configuration.
    pub fn poll_config(mut self, config: PollConfig) -> Self {
        self.poll = config;
        self
    }

    /// Sets the warning window width in minutes.
    pub fn warn_threshold_mins(mut self, mins: u32) -> Self {
        self.monitor.warn_threshold_mins = mins;
        self
    }

    /// Enables or disables the automatic refresh request on the
    /// expiring-soon edge.
    pub fn auto_refresh(mut self, on: bool) -> Self {
        self.monitor.auto_refresh = on;
        self
    }

    /// Sets the polling interval. `Duration::ZERO` selects manual mode:
    /// the watcher only evaluates on [`WatcherHandle::check_now`].
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll.interval = interval;
        self
    }

    /// Spawns the watcher task against the given provider and returns
    /// its handle.
    pub fn spawn<P: SessionProvider>(self, provider: P) -> WatcherHandle {
        let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_CHANNEL_SIZE);
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(MonitorState::default());

        let watcher = Watcher {
            provider: Arc::new(provider),
            tracker: ExpiryTracker::new(self.monitor),
            scheduler: PollScheduler::new(self.poll),
            commands: cmd_rx,
            events: event_tx,
            state_tx,
        };
        let task = tokio::spawn(watcher.run());

        tracing::info!("session watcher spawned");

        WatcherHandle {
            commands: cmd_tx,
            events: event_rx,
            state: state_rx,
            task: Some(task),
        }
    }
}

impl Default for WatcherBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

/// Owner-side handle to a running watcher task.
///
/// The handle is the watcher's lifetime: dropping it aborts the task and
/// its timer immediately, the moral equivalent of an effect cleanup. Use
/// [`shutdown`](Self::shutdown) instead when you want to wait for the
/// loop to wind down in an orderly way.
pub struct WatcherHandle {
    commands: mpsc::Sender<WatcherCommand>,
    events: mpsc::UnboundedReceiver<MonitorEvent>,
    state: watch::Receiver<MonitorState>,
    /// `None` only after `shutdown` has consumed the task.
    task: Option<JoinHandle<()>>,
}

impl WatcherHandle {
    /// The most recently published snapshot. Level-triggered and
    /// re-readable at any time; never blocks.
    pub fn state(&self) -> MonitorState {
        *self.state.borrow()
    }

    /// Receives the next lifecycle event.
    ///
    /// Returns `None` once the watcher has stopped and all pending
    /// events have been drained.
    pub async fn recv(&mut self) -> Option<MonitorEvent> {
        self.events.recv().await
    }

    /// Forces an immediate evaluation and returns the fresh snapshot.
    ///
    /// Any event produced by this evaluation is also delivered through
    /// [`recv`](Self::recv), exactly as if a poll had fired.
    ///
    /// # Errors
    /// [`WatchError::WatcherStopped`] if the task is gone.
    pub async fn check_now(&self) -> Result<MonitorState, WatchError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(WatcherCommand::CheckNow { reply: reply_tx })
            .await
            .map_err(|_| WatchError::WatcherStopped)?;
        reply_rx.await.map_err(|_| WatchError::WatcherStopped)
    }

    /// Stops the poll timer. Evaluations via
    /// [`check_now`](Self::check_now) still work while paused.
    ///
    /// # Errors
    /// [`WatchError::WatcherStopped`] if the task is gone.
    pub async fn pause(&self) -> Result<(), WatchError> {
        self.commands
            .send(WatcherCommand::Pause)
            .await
            .map_err(|_| WatchError::WatcherStopped)
    }

    /// Restarts the poll timer after a pause. The next poll fires one
    /// full interval from now.
    ///
    /// # Errors
    /// [`WatchError::WatcherStopped`] if the task is gone.
    pub async fn resume(&self) -> Result<(), WatchError> {
        self.commands
            .send(WatcherCommand::Resume)
            .await
            .map_err(|_| WatchError::WatcherStopped)
    }

    /// Stops the watcher and waits for the task to finish.
    ///
    /// # Errors
    /// [`WatchError::WatcherStopped`] if the task was already gone.
    pub async fn shutdown(mut self) -> Result<(), WatchError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(WatcherCommand::Shutdown { reply: reply_tx })
            .await
            .map_err(|_| WatchError::WatcherStopped)?;
        reply_rx.await.map_err(|_| WatchError::WatcherStopped)?;

        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
        Ok(())
    }
}

impl Drop for WatcherHandle {
    fn drop(&mut self) {
        // Deterministic teardown: no poll timer survives its owner.
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

// ---------------------------------------------------------------------------
// The watcher task
// ---------------------------------------------------------------------------

/// State owned by the watcher task. Never shared; the outside world
/// talks to it exclusively through channels.
struct Watcher<P: SessionProvider> {
    provider: Arc<P>,
    tracker: ExpiryTracker,
    scheduler: PollScheduler,
    commands: mpsc::Receiver<WatcherCommand>,
    events: mpsc::UnboundedSender<MonitorEvent>,
    state_tx: watch::Sender<MonitorState>,
}

impl<P: SessionProvider> Watcher<P> {
    /// Runs the watcher loop, processing commands and polls until
    /// shutdown.
    async fn run(mut self) {
        debug!("watcher started");

        loop {
            tokio::select! {
                cmd = self.commands.recv() => match cmd {
                    Some(WatcherCommand::CheckNow { reply }) => {
                        let state = self.evaluate().await;
                        let _ = reply.send(state);
                    }
                    Some(WatcherCommand::Pause) => self.scheduler.pause(),
                    Some(WatcherCommand::Resume) => self.scheduler.resume(),
                    Some(WatcherCommand::Shutdown { reply }) => {
                        let _ = reply.send(());
                        break;
                    }
                    // Every handle is gone; nobody can observe us.
                    None => break,
                },
                _info = self.scheduler.wait_for_poll() => {
                    self.evaluate().await;
                    self.scheduler.record_poll_end();
                }
            }
        }

        debug!(polls = self.scheduler.poll_count(), "watcher stopped");
    }

    /// One evaluation: read the provider, run the tracker, publish.
    async fn evaluate(&mut self) -> MonitorState {
        let session = match self.provider.current_session().await {
            Ok(session) => session,
            Err(e) => {
                // A provider that can't answer gets the same treatment
                // as a signed-out user; the tracker drops to idle.
                warn!(error = %e, "session lookup failed");
                None
            }
        };

        let event = self.tracker.evaluate(session.as_ref(), unix_now_ms());
        let state = self.tracker.state();
        self.state_tx.send_replace(state);

        if let Some(event) = event {
            if matches!(event, MonitorEvent::ExpiringSoon { .. })
                && self.tracker.config().auto_refresh
            {
                self.request_refresh();
            }
            // The receiver lives on the handle; if it's gone, the task
            // is being torn down anyway.
            let _ = self.events.send(event);
        }

        state
    }

    /// Fire-and-forget refresh request against the provider.
    ///
    /// Success never feeds back into the monitor directly; the next
    /// poll observes the pushed-out expiry on the session itself.
    fn request_refresh(&self) {
        let provider = Arc::clone(&self.provider);
        tokio::spawn(async move {
            match provider.refresh_session().await {
                Ok(()) => debug!("session refresh requested"),
                Err(e) => warn!(
                    error = %e,
                    "session refresh failed; session will expire naturally"
                ),
            }
        });
    }
}

/// Wall clock in unix milliseconds.
///
/// Negative before the epoch, which only a badly confused system clock
/// produces; the expiry arithmetic still holds either way.
fn unix_now_ms() -> i64 {
    match SystemTime::now().duration_since(SystemTime::UNIX_EPOCH) {
        Ok(d) => d.as_millis() as i64,
        Err(e) => -(e.duration().as_millis() as i64),
    }
}

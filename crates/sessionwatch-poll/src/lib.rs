//! Fixed-interval poll scheduler for Sessionwatch.
//!
//! Drives periodic session evaluation: wake up every `interval`, let the
//! owner run one evaluation, go back to sleep. Supports pause/resume
//! (page hidden / visible) and a manual mode for hosts that trigger
//! evaluations themselves.
//!
//! # Manual mode
//!
//! When `interval` is zero, the scheduler never fires on its own and
//! [`PollScheduler::wait_for_poll`] pends forever. The owning task keeps
//! reacting to its other `select!` branches (commands, shutdown), which
//! is exactly what an on-demand monitor needs.
//!
//! # Integration
//!
//! The scheduler is designed to sit inside a watcher task's
//! `tokio::select!` loop:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         Some(cmd) = cmd_rx.recv() => { /* handle commands */ }
//!         info = scheduler.wait_for_poll() => {
//!             evaluate_session().await;
//!             scheduler.record_poll_end();
//!         }
//!     }
//! }
//! ```
//!
//! The pending future returned while paused or in manual mode is dropped
//! by `select!` at the end of each iteration, so a `resume()` performed
//! from the command branch takes effect on the next loop pass.

use std::time::{Duration, Instant};

use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::time::{self, Instant as TokioInstant};
use tracing::{debug, trace, warn};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Full configuration for the poll scheduler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollConfig {
    /// Gap between wake-ups. `Duration::ZERO` = manual mode (the
    /// scheduler never fires on its own). Default: 30 seconds.
    pub interval: Duration,

    /// Random jitter (0–max ms) added to the *first* wake-up so that
    /// monitors created at the same instant don't align their polls.
    pub initial_jitter_ms: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            initial_jitter_ms: 500,
        }
    }
}

impl PollConfig {
    /// Minimum supported polling interval.
    pub const MIN_INTERVAL: Duration = Duration::from_secs(1);

    /// Create a config for a specific interval with default jitter.
    pub fn with_interval(interval: Duration) -> Self {
        Self {
            interval,
            ..Default::default()
        }
    }

    /// Clamp out-of-range values so the config is safe to use.
    ///
    /// Called automatically by [`PollScheduler::new`]. Rules:
    /// - A non-zero `interval` below [`Self::MIN_INTERVAL`] is raised to
    ///   the minimum (zero stays zero: manual mode).
    /// - Jitter larger than the interval is capped to one interval.
    pub fn validated(mut self) -> Self {
        if !self.interval.is_zero() && self.interval < Self::MIN_INTERVAL {
            warn!(
                interval_ms = self.interval.as_millis() as u64,
                min_ms = Self::MIN_INTERVAL.as_millis() as u64,
                "poll interval below minimum; raising"
            );
            self.interval = Self::MIN_INTERVAL;
        }
        if !self.interval.is_zero() {
            let max_jitter = self.interval.as_millis() as u64;
            if self.initial_jitter_ms > max_jitter {
                warn!(
                    jitter_ms = self.initial_jitter_ms,
                    max_jitter_ms = max_jitter,
                    "initial jitter exceeds interval; capping"
                );
                self.initial_jitter_ms = max_jitter;
            }
        }
        self
    }

    /// The polling interval. Returns `None` for manual mode.
    pub fn interval(&self) -> Option<Duration> {
        if self.interval.is_zero() {
            None
        } else {
            Some(self.interval)
        }
    }
}

// ---------------------------------------------------------------------------
// Poll info (returned to caller each wake-up)
// ---------------------------------------------------------------------------

/// Information about a wake-up, returned by [`PollScheduler::wait_for_poll`].
#[derive(Debug, Clone, Copy)]
pub struct PollInfo {
    /// Monotonically increasing poll number (starts at 1).
    pub seq: u64,

    /// `true` if this wake-up fired noticeably later than scheduled
    /// (runtime stalled, machine slept). The next wake-up is always
    /// rescheduled from now, so a late poll never causes a burst.
    pub late: bool,
}

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

/// Runtime counters for the poll scheduler.
///
/// Evaluation timings refer to the owner's work between a wake-up and the
/// matching [`PollScheduler::record_poll_end`] call.
#[derive(Debug, Clone, Default)]
pub struct PollMetrics {
    /// Total wake-ups fired.
    pub total_polls: u64,

    /// Wake-ups that fired noticeably late.
    pub late_polls: u64,

    /// Largest observed gap between two consecutive wake-ups.
    pub max_gap: Duration,

    /// Exponential moving average of evaluation time (α = 0.1).
    pub avg_eval_time: Duration,

    /// Maximum evaluation time observed.
    pub max_eval_time: Duration,
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// Fixed-interval poll scheduler.
///
/// One `PollScheduler` per watcher task. The owner is responsible for
/// calling [`wait_for_poll`](Self::wait_for_poll) inside its loop and
/// (optionally) [`record_poll_end`](Self::record_poll_end) after each
/// evaluation to feed the timing metrics.
pub struct PollScheduler {
    config: PollConfig,
    interval: Option<Duration>,
    poll_count: u64,
    /// When the next wake-up should fire (Tokio instant for `sleep_until`).
    next_poll: Option<TokioInstant>,
    /// When the previous wake-up fired. Feeds the max-gap metric.
    last_fired: Option<TokioInstant>,
    /// Wall-clock instant when the current evaluation started.
    /// Set by `wait_for_poll`, consumed by `record_poll_end`.
    eval_start: Option<Instant>,
    paused: bool,
    metrics: PollMetrics,
}

impl PollScheduler {
    /// Create a new scheduler from config.
    ///
    /// The first wake-up is scheduled with optional jitter so that
    /// several monitors spun up together drift apart.
    pub fn new(config: PollConfig) -> Self {
        let config = config.validated();
        let interval = config.interval();

        let next_poll = interval.map(|i| {
            let jitter = if config.initial_jitter_ms > 0 {
                let ms = rand::rng().random_range(0..config.initial_jitter_ms);
                Duration::from_millis(ms)
            } else {
                Duration::ZERO
            };
            TokioInstant::now() + i + jitter
        });

        if interval.is_none() {
            debug!("poll scheduler created in manual mode (no timer)");
        } else {
            debug!(
                interval_ms = config.interval.as_millis() as u64,
                "poll scheduler created"
            );
        }

        Self {
            config,
            interval,
            poll_count: 0,
            next_poll,
            last_fired: None,
            eval_start: None,
            paused: false,
            metrics: PollMetrics::default(),
        }
    }

    /// Create a scheduler for a specific interval with default settings.
    pub fn with_interval(interval: Duration) -> Self {
        Self::new(PollConfig::with_interval(interval))
    }

    /// Wait until the next poll is due. Returns [`PollInfo`] for the
    /// wake-up.
    ///
    /// In manual mode (`interval == 0`) or while paused, this future
    /// pends forever; it will never resolve on its own, but a
    /// `tokio::select!` around it still processes other branches.
    pub async fn wait_for_poll(&mut self) -> PollInfo {
        let (next, interval) = match (self.next_poll, self.interval) {
            (Some(next), Some(interval)) if !self.paused => (next, interval),
            _ => {
                // This future never completes; select! handles other branches.
                std::future::pending::<()>().await;
                unreachable!()
            }
        };

        time::sleep_until(next).await;

        let now = TokioInstant::now();
        self.poll_count += 1;
        self.eval_start = Some(Instant::now());

        // Did we wake up significantly late? >10% of the interval counts.
        let late_by = now.saturating_duration_since(next);
        let late = late_by > interval / 10;
        if late {
            self.metrics.late_polls += 1;
            warn!(
                seq = self.poll_count,
                late_ms = late_by.as_millis() as u64,
                "poll fired late"
            );
        }

        if let Some(prev) = self.last_fired {
            let gap = now.saturating_duration_since(prev);
            if gap > self.metrics.max_gap {
                self.metrics.max_gap = gap;
            }
        }
        self.last_fired = Some(now);

        // Always reschedule from now, not from the missed deadline.
        self.next_poll = Some(now + interval);
        self.metrics.total_polls += 1;

        trace!(seq = self.poll_count, late, "poll fired");

        PollInfo {
            seq: self.poll_count,
            late,
        }
    }

    /// Record that the evaluation for the current poll has finished.
    ///
    /// Call this after the session evaluation returns to feed the
    /// timing metrics. If not called, only the counters are maintained.
    pub fn record_poll_end(&mut self) {
        let Some(start) = self.eval_start.take() else {
            return;
        };
        let elapsed = start.elapsed();

        if elapsed > self.metrics.max_eval_time {
            self.metrics.max_eval_time = elapsed;
        }
        // Exponential moving average (α = 0.1).
        let alpha = 0.1;
        let prev = self.metrics.avg_eval_time.as_secs_f64();
        let curr = elapsed.as_secs_f64();
        self.metrics.avg_eval_time =
            Duration::from_secs_f64(prev * (1.0 - alpha) + curr * alpha);
    }

    /// Pause the timer. `wait_for_poll` pends until
    /// [`resume`](Self::resume) is called.
    ///
    /// Safe to call multiple times (idempotent).
    pub fn pause(&mut self) {
        if !self.paused {
            self.paused = true;
            debug!(seq = self.poll_count, "poll scheduler paused");
        }
    }

    /// Resume polling after a pause.
    ///
    /// Resets the deadline to `now + interval` so the time spent paused
    /// doesn't produce an immediate stale wake-up.
    pub fn resume(&mut self) {
        if self.paused {
            self.paused = false;
            if let Some(interval) = self.interval {
                self.next_poll = Some(TokioInstant::now() + interval);
            }
            debug!(seq = self.poll_count, "poll scheduler resumed");
        }
    }

    /// Whether the scheduler is currently paused.
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Whether this scheduler is in manual mode (interval = 0).
    pub fn is_manual(&self) -> bool {
        self.interval.is_none()
    }

    /// Number of wake-ups fired so far.
    pub fn poll_count(&self) -> u64 {
        self.poll_count
    }

    /// Snapshot of current metrics.
    pub fn metrics(&self) -> &PollMetrics {
        &self.metrics
    }

    /// The validated configuration this scheduler runs with.
    pub fn config(&self) -> &PollConfig {
        &self.config
    }

    /// The polling interval, or `None` for manual mode.
    pub fn interval(&self) -> Option<Duration> {
        self.interval
    }
}

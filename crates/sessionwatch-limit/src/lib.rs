//! Sliding-window sign-in attempt limiting.
//!
//! Tracks timestamps of failed sign-in attempts and reports whether the
//! caller has exhausted its attempt budget within a time window. The
//! caller records an attempt after each failed sign-in and checks
//! [`AttemptLimiter::is_rate_limited`] before permitting a new one.
//!
//! This is an advisory, client-side gate only. It lives in memory, so a
//! process restart clears the log; real abuse prevention belongs on the
//! server. What it buys is a polite UX: "too many attempts, try again in
//! N minutes" without a round trip.
//!
//! Pure and synchronous: no I/O, no timers, no async. The only clock
//! read is `Instant::now()` in the public wrappers; every computation
//! has an internal explicit-`now` variant that the tests drive directly.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for the attempt limiter.
///
/// Defaults match the classic sign-in gate: 5 attempts per 15 minutes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LimiterConfig {
    /// Attempts allowed inside one window before the limiter trips.
    pub max_attempts: usize,

    /// Width of the sliding window.
    pub window: Duration,
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            window: Duration::from_secs(15 * 60),
        }
    }
}

impl LimiterConfig {
    /// Minimum supported window width.
    pub const MIN_WINDOW: Duration = Duration::from_secs(1);

    /// Clamp out-of-range values so the config is safe to use.
    ///
    /// Called automatically by [`AttemptLimiter::new`]. Rules:
    /// - `max_attempts` of 0 would trip on an empty log; raised to 1.
    /// - A window below [`Self::MIN_WINDOW`] would forget attempts
    ///   before anyone could observe them; raised to the minimum.
    pub fn validated(mut self) -> Self {
        if self.max_attempts == 0 {
            warn!("max_attempts of 0 would always trip; raising to 1");
            self.max_attempts = 1;
        }
        if self.window < Self::MIN_WINDOW {
            warn!(
                window_ms = self.window.as_millis() as u64,
                min_ms = Self::MIN_WINDOW.as_millis() as u64,
                "limiter window below minimum; raising"
            );
            self.window = Self::MIN_WINDOW;
        }
        self
    }
}

// ---------------------------------------------------------------------------
// AttemptLimiter
// ---------------------------------------------------------------------------

/// Sliding-window limiter over sign-in attempts.
///
/// The log is an ordered deque of timestamps (insertion order is
/// chronological). Recording prunes entries that have aged out of the
/// window; queries count only in-window entries, so a stale log never
/// inflates the verdict even before the next prune.
///
/// Rapid attempts that land on the same timestamp are all recorded as
/// distinct entries and counted separately.
#[derive(Debug)]
pub struct AttemptLimiter {
    attempts: VecDeque<Instant>,
    config: LimiterConfig,
}

impl AttemptLimiter {
    /// Creates an empty limiter with the given (validated) config.
    pub fn new(config: LimiterConfig) -> Self {
        Self {
            attempts: VecDeque::new(),
            config: config.validated(),
        }
    }

    /// The configuration this limiter enforces.
    pub fn config(&self) -> &LimiterConfig {
        &self.config
    }

    /// Records a failed attempt at the current instant, pruning entries
    /// that have left the window.
    pub fn record_attempt(&mut self) {
        self.record_attempt_at(Instant::now());
    }

    /// True when the in-window attempt count has reached the budget.
    pub fn is_rate_limited(&self) -> bool {
        self.is_rate_limited_at(Instant::now())
    }

    /// Attempts still available inside the current window.
    pub fn attempts_left(&self) -> usize {
        self.attempts_left_at(Instant::now())
    }

    /// How long until the limiter could open up again.
    ///
    /// Zero when not limited. Otherwise the time until the oldest
    /// in-window attempt exits the window. With more than `max_attempts`
    /// entries recorded, the next entry takes over as that oldest
    /// attempt ages out, so the limited period stretches accordingly.
    pub fn remaining_time(&self) -> Duration {
        self.remaining_time_at(Instant::now())
    }

    /// Clears the log. Call on a successful sign-in.
    pub fn reset(&mut self) {
        if !self.attempts.is_empty() {
            debug!(
                cleared = self.attempts.len(),
                "attempt log reset"
            );
        }
        self.attempts.clear();
    }

    /// Number of attempts currently in the log (in-window or not yet
    /// pruned).
    pub fn len(&self) -> usize {
        self.attempts.len()
    }

    /// True if no attempts are recorded.
    pub fn is_empty(&self) -> bool {
        self.attempts.is_empty()
    }

    // -- Explicit-clock internals ------------------------------------------

    fn record_attempt_at(&mut self, now: Instant) {
        self.prune(now);
        self.attempts.push_back(now);
        if self.is_rate_limited_at(now) {
            debug!(
                attempts = self.attempts.len(),
                max = self.config.max_attempts,
                "attempt budget exhausted"
            );
        }
    }

    fn is_rate_limited_at(&self, now: Instant) -> bool {
        self.in_window_count(now) >= self.config.max_attempts
    }

    fn attempts_left_at(&self, now: Instant) -> usize {
        self.config
            .max_attempts
            .saturating_sub(self.in_window_count(now))
    }

    fn remaining_time_at(&self, now: Instant) -> Duration {
        if !self.is_rate_limited_at(now) {
            return Duration::ZERO;
        }
        // Oldest attempt still inside the window governs. The log is
        // chronological, so the first in-window entry is that oldest.
        let Some(oldest) = self
            .attempts
            .iter()
            .find(|&&t| self.in_window(t, now))
        else {
            return Duration::ZERO;
        };
        self.config.window - now.duration_since(*oldest)
    }

    /// Drops entries that have aged out of the window. The deque is
    /// chronological, so pruning only pops from the front.
    fn prune(&mut self, now: Instant) {
        while let Some(&front) = self.attempts.front() {
            if self.in_window(front, now) {
                break;
            }
            self.attempts.pop_front();
        }
    }

    fn in_window(&self, t: Instant, now: Instant) -> bool {
        now.duration_since(t) < self.config.window
    }

    fn in_window_count(&self, now: Instant) -> usize {
        self.attempts
            .iter()
            .filter(|&&t| self.in_window(t, now))
            .count()
    }
}

impl Default for AttemptLimiter {
    fn default() -> Self {
        Self::new(LimiterConfig::default())
    }
}

// =========================================================================
// Tests
// =========================================================================

//! The expiry tracker: turns session snapshots into lifecycle events.
//!
//! This is the central piece of the session layer. Each evaluation takes
//! the provider's current session plus the wall clock, recomputes the
//! derived [`MonitorState`], and reports *edges*: the first evaluation
//! inside the warning window produces [`MonitorEvent::ExpiringSoon`], the
//! first evaluation at or past expiry produces [`MonitorEvent::Expired`].
//! Repeated evaluations inside the same state produce nothing.
//!
//! # Purity
//!
//! The tracker never reads a clock and performs no I/O. Callers pass
//! `now_ms` (unix milliseconds) explicitly, which keeps every test in
//! this module free of timers and sleeps. The async watcher in the
//! `sessionwatch` crate is the only place that touches `SystemTime`.

use tracing::{debug, info};

use crate::{MonitorConfig, MonitorState, Session};

// ---------------------------------------------------------------------------
// MonitorEvent
// ---------------------------------------------------------------------------

/// An edge-triggered lifecycle transition.
///
/// At most one event is produced per evaluation: the warning and expired
/// conditions are mutually exclusive, so a poll interval that crosses
/// both the warning threshold and zero yields only `Expired`. The warning
/// window was never observed, so its edge never fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorEvent {
    /// The session entered the warning window: still alive, but less
    /// than the configured threshold of lifetime remains.
    ExpiringSoon {
        /// Remaining lifetime at the moment the edge was observed.
        time_until_expiry_ms: i64,
    },

    /// The session's remaining lifetime reached or passed zero.
    Expired,
}

// ---------------------------------------------------------------------------
// ExpiryTracker
// ---------------------------------------------------------------------------

/// Edge-triggered expiry state machine for a single session source.
///
/// ## Lifecycle
///
/// ```text
///          (remaining shrinks)                (remaining <= 0)
/// Healthy ────────────────────→ ExpiringSoon ────────────────→ Expired
///    ↑                               │                            │
///    └───────── (refresh pushes expiry back out) ────────────────┘
/// ```
///
/// Each arrow into `ExpiringSoon` or `Expired` fires the matching event
/// exactly once. Leaving a state re-arms its edge, so a session that is
/// refreshed and later decays again produces a fresh `ExpiringSoon`.
///
/// A missing session, or a session without an expiry instant, resets the
/// tracker to idle: both edges re-arm and no event fires.
#[derive(Debug)]
pub struct ExpiryTracker {
    config: MonitorConfig,

    /// Latest derived snapshot, recomputed by every `evaluate` call.
    state: MonitorState,

    /// Edge memory: has `ExpiringSoon` fired for the current stay inside
    /// the warning window?
    warned: bool,

    /// Edge memory: has `Expired` fired for the current stay past zero?
    expired: bool,
}

impl ExpiryTracker {
    /// Creates a tracker in the idle state.
    pub fn new(config: MonitorConfig) -> Self {
        Self {
            config,
            state: MonitorState::default(),
            warned: false,
            expired: false,
        }
    }

    /// The configuration this tracker evaluates against.
    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// The snapshot produced by the most recent evaluation.
    pub fn state(&self) -> MonitorState {
        self.state
    }

    /// Evaluates the session against the wall clock at `now_ms`
    /// (unix milliseconds) and returns the edge event, if one fired.
    ///
    /// This is a pure state transition: same inputs, same outputs, no
    /// clock reads. Call it from a poll loop, from a focus handler, or
    /// from a test with a synthetic clock.
    pub fn evaluate(
        &mut self,
        session: Option<&Session>,
        now_ms: i64,
    ) -> Option<MonitorEvent> {
        let Some(remaining) = session.and_then(|s| s.expires_in_ms(now_ms)) else {
            // No session, or a session without an expiry instant: drop to
            // idle and re-arm both edges. No event fires for going idle.
            if !self.state.is_idle() {
                debug!("no active session; tracker reset to idle");
            }
            self.state = MonitorState::default();
            self.warned = false;
            self.expired = false;
            return None;
        };

        let expiring_soon =
            remaining > 0 && remaining < self.config.warn_threshold_ms();
        let has_expired = remaining <= 0;

        self.state = MonitorState {
            time_until_expiry_ms: Some(remaining),
            is_expiring_soon: expiring_soon,
            has_expired,
        };

        // Level-to-edge conversion, independently per flag. Leaving a
        // state clears its memory so re-entry fires again.
        let mut event = None;

        if expiring_soon {
            if !self.warned {
                self.warned = true;
                info!(
                    remaining_ms = remaining,
                    threshold_mins = self.config.warn_threshold_mins,
                    "session entering warning window"
                );
                event = Some(MonitorEvent::ExpiringSoon {
                    time_until_expiry_ms: remaining,
                });
            }
        } else {
            self.warned = false;
        }

        if has_expired {
            if !self.expired {
                self.expired = true;
                info!(remaining_ms = remaining, "session expired");
                event = Some(MonitorEvent::Expired);
            }
        } else {
            self.expired = false;
        }

        event
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! Unit tests for `ExpiryTracker`.
    //!
    //! Naming convention: `test_{function}_{scenario}_{expected}`.
    //!
    //! # Testing time-dependent behavior
    //!
    //! `evaluate` takes the clock as a parameter, so these tests never
    //! sleep: they pick a fixed `NOW` and derive sessions relative to it.

    use super::*;

    /// An arbitrary fixed "current time" in unix milliseconds.
    const NOW: i64 = 1_700_000_000_000;

    /// Seconds-based offset helper: a session expiring `secs` seconds
    /// from `NOW`. Negative values build already-expired sessions.
    fn session_expiring_in(secs: i64) -> Session {
        Session::expiring_at(NOW / 1000 + secs)
    }

    fn tracker() -> ExpiryTracker {
        ExpiryTracker::new(MonitorConfig::default())
    }

    // =====================================================================
    // Idle handling
    // =====================================================================

    #[test]
    fn test_evaluate_no_session_stays_idle() {
        let mut t = tracker();

        let event = t.evaluate(None, NOW);

        assert_eq!(event, None);
        assert!(t.state().is_idle());
        assert!(!t.state().is_expiring_soon);
        assert!(!t.state().has_expired);
    }

    #[test]
    fn test_evaluate_session_without_expiry_stays_idle() {
        let mut t = tracker();
        let session = Session::without_expiry();

        let event = t.evaluate(Some(&session), NOW);

        assert_eq!(event, None);
        assert!(t.state().is_idle());
    }

    #[test]
    fn test_evaluate_session_vanishing_resets_to_idle() {
        // A signed-out user: session disappears between polls.
        let mut t = tracker();
        let session = session_expiring_in(120);
        t.evaluate(Some(&session), NOW);
        assert!(!t.state().is_idle());

        let event = t.evaluate(None, NOW + 30_000);

        assert_eq!(event, None);
        assert!(t.state().is_idle());
    }

    // =====================================================================
    // Healthy sessions
    // =====================================================================

    #[test]
    fn test_evaluate_far_future_expiry_sets_no_flags() {
        // More than threshold minutes out: neither flag, no event.
        let mut t = tracker();
        let session = session_expiring_in(3600);

        let event = t.evaluate(Some(&session), NOW);

        assert_eq!(event, None);
        let state = t.state();
        assert_eq!(state.time_until_expiry_ms, Some(3_600_000));
        assert!(!state.is_expiring_soon);
        assert!(!state.has_expired);
    }

    #[test]
    fn test_evaluate_exactly_at_threshold_is_not_expiring_soon() {
        // The warning window is open: remaining must be strictly less
        // than the threshold.
        let mut t = tracker();
        let session = session_expiring_in(5 * 60);

        let event = t.evaluate(Some(&session), NOW);

        assert_eq!(event, None);
        assert!(!t.state().is_expiring_soon);
    }

    // =====================================================================
    // Warning window
    // =====================================================================

    #[test]
    fn test_evaluate_two_minutes_out_is_expiring_soon() {
        // The scenario from the contract: expires_at = now + 120s,
        // threshold 5 min.
        let mut t = tracker();
        let session = session_expiring_in(120);

        let event = t.evaluate(Some(&session), NOW);

        assert_eq!(
            event,
            Some(MonitorEvent::ExpiringSoon {
                time_until_expiry_ms: 120_000
            })
        );
        let state = t.state();
        assert!(state.is_expiring_soon);
        assert!(!state.has_expired);
        assert_eq!(state.minutes_until_expiry(), Some(2));
    }

    #[test]
    fn test_evaluate_repeated_polls_fire_warning_once() {
        // Edge-triggered: one event per continuous stay in the window,
        // no matter how many polls land inside it.
        let mut t = tracker();
        let session = session_expiring_in(240);

        let first = t.evaluate(Some(&session), NOW);
        assert!(matches!(first, Some(MonitorEvent::ExpiringSoon { .. })));

        for poll in 1..=4 {
            let event = t.evaluate(Some(&session), NOW + poll * 30_000);
            assert_eq!(event, None, "poll {poll} must not re-fire the edge");
            assert!(t.state().is_expiring_soon);
        }
    }

    #[test]
    fn test_evaluate_refresh_rearms_warning_edge() {
        // Session decays into the window, gets refreshed back out, then
        // decays again: the warning must fire a second time.
        let mut t = tracker();

        let old = session_expiring_in(120);
        assert!(matches!(
            t.evaluate(Some(&old), NOW),
            Some(MonitorEvent::ExpiringSoon { .. })
        ));

        // Refresh succeeded: expiry pushed an hour out. Flags clear.
        let refreshed = session_expiring_in(3600);
        assert_eq!(t.evaluate(Some(&refreshed), NOW + 30_000), None);
        assert!(!t.state().is_expiring_soon);

        // An hour later the refreshed session is itself decaying.
        let late = NOW + 3_550_000;
        let event = t.evaluate(Some(&refreshed), late);
        assert!(
            matches!(event, Some(MonitorEvent::ExpiringSoon { .. })),
            "re-entry into the window must fire again"
        );
    }

    #[test]
    fn test_evaluate_zero_threshold_disables_warning() {
        let mut t = ExpiryTracker::new(MonitorConfig {
            warn_threshold_mins: 0,
            auto_refresh: false,
        });
        let session = session_expiring_in(1);

        let event = t.evaluate(Some(&session), NOW);

        assert_eq!(event, None);
        assert!(!t.state().is_expiring_soon);
    }

    // =====================================================================
    // Expiry
    // =====================================================================

    #[test]
    fn test_evaluate_past_expiry_fires_expired_once() {
        // expires_at = now - 10s: expired on the first evaluation,
        // silent on the following ones.
        let mut t = tracker();
        let session = session_expiring_in(-10);

        let first = t.evaluate(Some(&session), NOW);
        assert_eq!(first, Some(MonitorEvent::Expired));
        let state = t.state();
        assert!(state.has_expired);
        assert!(!state.is_expiring_soon);
        assert_eq!(state.time_until_expiry_ms, Some(-10_000));

        let second = t.evaluate(Some(&session), NOW + 30_000);
        assert_eq!(second, None);
        assert!(t.state().has_expired);
    }

    #[test]
    fn test_evaluate_exactly_zero_remaining_is_expired() {
        let mut t = tracker();
        let session = session_expiring_in(0);

        let event = t.evaluate(Some(&session), NOW);

        assert_eq!(event, Some(MonitorEvent::Expired));
        assert_eq!(t.state().time_until_expiry_ms, Some(0));
    }

    #[test]
    fn test_evaluate_warning_then_expiry_fires_both_edges() {
        // The common real-world path: a poll inside the window, then a
        // poll past zero.
        let mut t = tracker();
        let session = session_expiring_in(20);

        let first = t.evaluate(Some(&session), NOW);
        assert!(matches!(first, Some(MonitorEvent::ExpiringSoon { .. })));

        let second = t.evaluate(Some(&session), NOW + 30_000);
        assert_eq!(second, Some(MonitorEvent::Expired));
        assert!(!t.state().is_expiring_soon, "flags are mutually exclusive");
    }

    #[test]
    fn test_evaluate_interval_crossing_threshold_and_zero_fires_expired_only() {
        // One poll interval can cross the warning threshold AND zero
        // (session shorter than the poll gap). Only Expired fires; the
        // warning window was never observed.
        let mut t = tracker();
        let session = session_expiring_in(3600);
        assert_eq!(t.evaluate(Some(&session), NOW), None);

        let event = t.evaluate(Some(&session), NOW + 3_700_000);
        assert_eq!(event, Some(MonitorEvent::Expired));
    }

    #[test]
    fn test_evaluate_refresh_after_expiry_rearms_expired_edge() {
        // Expired, then a new session appears (re-auth). Letting it
        // expire again must fire Expired again.
        let mut t = tracker();

        let dead = session_expiring_in(-10);
        assert_eq!(t.evaluate(Some(&dead), NOW), Some(MonitorEvent::Expired));

        let fresh = session_expiring_in(3600);
        assert_eq!(t.evaluate(Some(&fresh), NOW + 30_000), None);
        assert!(!t.state().has_expired);

        let event = t.evaluate(Some(&fresh), NOW + 3_700_000);
        assert_eq!(event, Some(MonitorEvent::Expired));
    }

    #[test]
    fn test_evaluate_idle_gap_rearms_edges() {
        // Sign out while expired, then sign back in with a dying
        // session: both edges must be live again.
        let mut t = tracker();

        let dead = session_expiring_in(-10);
        assert_eq!(t.evaluate(Some(&dead), NOW), Some(MonitorEvent::Expired));

        assert_eq!(t.evaluate(None, NOW + 30_000), None);

        let dying = session_expiring_in(120);
        assert!(matches!(
            t.evaluate(Some(&dying), NOW + 60_000),
            Some(MonitorEvent::ExpiringSoon { .. })
        ));
    }
}

//! Session types: the data structures that describe an identity session.
//!
//! A "session" here is the client's view of what the identity provider
//! issued: an opaque credential bundle of which we consume exactly one
//! field, the expiry instant. Everything else the provider attaches
//! (tokens, user metadata) stays on the provider's side of the fence.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// A snapshot of the identity provider's session.
///
/// The provider owns the real session object; this type is the minimal
/// read-only copy the monitor works with. It deserializes from the
/// provider's JSON payload, ignoring every field except the expiry.
///
/// `expires_at` is in unix **seconds**, matching what identity providers
/// put on the wire. A `None` expiry means the provider returned a session
/// record without an expiry instant; the monitor treats that the same as
/// having no session at all (see [`ExpiryTracker`](crate::ExpiryTracker)).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Expiry instant in unix seconds, if the provider set one.
    #[serde(default)]
    pub expires_at: Option<i64>,
}

impl Session {
    /// A session expiring at the given unix-seconds instant.
    pub fn expiring_at(expires_at: i64) -> Self {
        Self {
            expires_at: Some(expires_at),
        }
    }

    /// A session record with no expiry instant.
    ///
    /// The monitor treats this as "no active session": no flags, no
    /// events.
    pub fn without_expiry() -> Self {
        Self { expires_at: None }
    }

    /// Signed milliseconds until expiry, measured from `now_ms`
    /// (unix milliseconds). Negative once the session has lapsed.
    ///
    /// Returns `None` when the session carries no expiry instant.
    pub fn expires_in_ms(&self, now_ms: i64) -> Option<i64> {
        self.expires_at.map(|secs| secs * 1000 - now_ms)
    }
}

// ---------------------------------------------------------------------------
// MonitorConfig
// ---------------------------------------------------------------------------

/// Configuration for expiry monitoring behavior.
///
/// Hosts can customize these when setting up a watcher. Sensible defaults
/// are provided: warn 5 minutes out, refresh automatically.
///
/// The polling cadence is configured separately on the scheduler; this
/// struct only controls what an evaluation *means*, not when it runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Width of the warning window, in minutes, before expiry.
    ///
    /// A session with less than this much lifetime left (but more than
    /// zero) counts as "expiring soon". Default: 5. Set to 0 to disable
    /// the warning state entirely.
    pub warn_threshold_mins: u32,

    /// Whether entering the warning window should trigger a
    /// fire-and-forget refresh request against the provider.
    ///
    /// Default: true.
    pub auto_refresh: bool,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            warn_threshold_mins: 5,
            auto_refresh: true,
        }
    }
}

impl MonitorConfig {
    /// The warning window width in milliseconds.
    pub fn warn_threshold_ms(&self) -> i64 {
        i64::from(self.warn_threshold_mins) * 60_000
    }
}

// ---------------------------------------------------------------------------
// MonitorState
// ---------------------------------------------------------------------------

/// The derived, level-triggered view of the session's lifecycle.
///
/// Recomputed from scratch on every evaluation; holds no history. The
/// two flags are mutually exclusive by construction:
///
/// ```text
///   remaining > threshold        → neither flag        (healthy)
///   0 < remaining < threshold    → is_expiring_soon    (warning window)
///   remaining <= 0               → has_expired
/// ```
///
/// `Default` is the idle state: no session under observation, both flags
/// false, no remaining time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorState {
    /// Signed milliseconds until expiry. `None` when no session with an
    /// expiry instant is under observation.
    pub time_until_expiry_ms: Option<i64>,

    /// Remaining lifetime is positive but inside the warning window.
    pub is_expiring_soon: bool,

    /// Remaining lifetime has reached or passed zero.
    pub has_expired: bool,
}

impl MonitorState {
    /// Whole minutes until expiry (floor), or `None` when idle.
    ///
    /// A session 120 seconds from expiry reports 2; an expired session
    /// reports a negative count.
    pub fn minutes_until_expiry(&self) -> Option<i64> {
        self.time_until_expiry_ms.map(|ms| ms.div_euclid(60_000))
    }

    /// True when no session (or no expiry instant) is under observation.
    pub fn is_idle(&self) -> bool {
        self.time_until_expiry_ms.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expires_in_ms_positive_before_expiry() {
        let session = Session::expiring_at(1_000);
        assert_eq!(session.expires_in_ms(900_000), Some(100_000));
    }

    #[test]
    fn test_expires_in_ms_negative_after_expiry() {
        let session = Session::expiring_at(1_000);
        assert_eq!(session.expires_in_ms(1_010_000), Some(-10_000));
    }

    #[test]
    fn test_expires_in_ms_none_without_expiry() {
        let session = Session::without_expiry();
        assert_eq!(session.expires_in_ms(123_456), None);
    }

    #[test]
    fn test_session_deserializes_from_provider_payload() {
        // Providers send a richer object; everything but expires_at is
        // ignored on deserialization.
        let payload = r#"{
            "access_token": "abc",
            "token_type": "bearer",
            "expires_at": 1700000000
        }"#;
        let session: Session = serde_json::from_str(payload).unwrap();
        assert_eq!(session.expires_at, Some(1_700_000_000));
    }

    #[test]
    fn test_session_deserializes_missing_expiry_as_none() {
        let session: Session = serde_json::from_str(r#"{}"#).unwrap();
        assert_eq!(session.expires_at, None);
    }

    #[test]
    fn test_monitor_config_defaults() {
        let config = MonitorConfig::default();
        assert_eq!(config.warn_threshold_mins, 5);
        assert!(config.auto_refresh);
        assert_eq!(config.warn_threshold_ms(), 300_000);
    }

    #[test]
    fn test_monitor_state_default_is_idle() {
        let state = MonitorState::default();
        assert!(state.is_idle());
        assert!(!state.is_expiring_soon);
        assert!(!state.has_expired);
        assert_eq!(state.minutes_until_expiry(), None);
    }

    #[test]
    fn test_minutes_until_expiry_floors() {
        let state = MonitorState {
            time_until_expiry_ms: Some(120_000),
            is_expiring_soon: true,
            has_expired: false,
        };
        assert_eq!(state.minutes_until_expiry(), Some(2));

        let state = MonitorState {
            time_until_expiry_ms: Some(119_999),
            ..state
        };
        assert_eq!(state.minutes_until_expiry(), Some(1));
    }

    #[test]
    fn test_minutes_until_expiry_negative_when_expired() {
        let state = MonitorState {
            time_until_expiry_ms: Some(-10_000),
            is_expiring_soon: false,
            has_expired: true,
        };
        // Floor division: 10 seconds past expiry is "minus one minute".
        assert_eq!(state.minutes_until_expiry(), Some(-1));
    }
}

//! Error types for the session layer.

/// Errors that can occur when talking to the session provider.
///
/// These cover the two provider operations the monitor performs:
/// reading the current session and requesting a refresh.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The provider could not report its current session (SDK failure,
    /// network error, corrupt payload). The watcher treats this poll as
    /// "no active session" and logs the cause.
    #[error("session lookup failed: {0}")]
    Provider(String),

    /// The provider could not re-issue the session. Not retried; the
    /// session is left to expire naturally and the host is expected to
    /// send the user back through authentication.
    #[error("session refresh failed: {0}")]
    RefreshFailed(String),
}

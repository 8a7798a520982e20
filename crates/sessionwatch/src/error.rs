//! Unified error type for the Sessionwatch crate.

use sessionwatch_session::SessionError;

/// Top-level error that wraps lower-layer errors plus the handle's own
/// failure mode.
///
/// When using the `sessionwatch` meta-crate, you deal with this single
/// error type instead of importing errors from each sub-crate. The
/// `#[from]` attribute auto-generates `From` impls, so the `?` operator
/// converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    /// A session-layer error (provider lookup, refresh).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The watcher task is no longer running, so a handle command could
    /// not be delivered or answered.
    #[error("watcher task has stopped")]
    WatcherStopped,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_session_error() {
        let err = SessionError::RefreshFailed("token endpoint 503".into());
        let watch_err: WatchError = err.into();
        assert!(matches!(watch_err, WatchError::Session(_)));
        assert!(watch_err.to_string().contains("503"));
    }

    #[test]
    fn test_watcher_stopped_display() {
        let err = WatchError::WatcherStopped;
        assert_eq!(err.to_string(), "watcher task has stopped");
    }
}

//! Provider hook for reading and refreshing the identity session.
//!
//! Sessionwatch doesn't talk to any identity vendor itself. Instead it
//! defines the [`SessionProvider`] trait: two async methods the host
//! implements against whatever SDK or HTTP client it already uses
//! (Supabase, Auth0, Keycloak, a custom token endpoint). The watcher
//! calls it on every poll and on the auto-refresh edge.
//!
//! # Why a trait?
//!
//! The same monitor then runs against production SDKs, an in-memory
//! provider in demos, and a mock in tests, without the framework knowing
//! the difference. It also keeps the session object on the provider's
//! side: the monitor only ever sees the minimal [`Session`] snapshot.

use crate::{Session, SessionError};

/// Read-and-refresh access to the external identity session.
///
/// # Trait bounds
///
/// - `Send + Sync` → the provider is shared with the watcher task and
///   with spawned refresh requests, which may run on different threads.
/// - `'static` → it doesn't borrow temporary data; it lives as long as
///   the watcher.
///
/// # Example
///
/// ```rust
/// use std::sync::{Arc, Mutex};
///
/// use sessionwatch_session::{Session, SessionError, SessionProvider};
///
/// /// A provider backed by a shared in-memory slot. Good enough for
/// /// demos and tests; production hosts wrap their vendor SDK instead.
/// #[derive(Clone, Default)]
/// struct MemoryProvider {
///     slot: Arc<Mutex<Option<Session>>>,
/// }
///
/// impl SessionProvider for MemoryProvider {
///     async fn current_session(&self) -> Result<Option<Session>, SessionError> {
///         Ok(self.slot.lock().unwrap().clone())
///     }
///
///     async fn refresh_session(&self) -> Result<(), SessionError> {
///         // A real provider would hit its refresh endpoint here and
///         // store the re-issued session on success.
///         Err(SessionError::RefreshFailed("not implemented".into()))
///     }
/// }
/// ```
pub trait SessionProvider: Send + Sync + 'static {
    /// Returns the provider's current session, or `None` when signed out.
    ///
    /// Called on every poll. The returned snapshot is all the monitor
    /// sees; the provider keeps ownership of the real session object.
    fn current_session(
        &self,
    ) -> impl std::future::Future<Output = Result<Option<Session>, SessionError>> + Send;

    /// Asks the provider to re-issue the session before it lapses.
    ///
    /// Called fire-and-forget when the session enters the warning window
    /// and auto-refresh is enabled. Success is never reported back into
    /// the monitor directly: the next `current_session` read observes
    /// the pushed-out expiry, which is what clears the warning state.
    ///
    /// # Errors
    /// [`SessionError::RefreshFailed`] when the provider could not
    /// re-issue the session. The watcher logs the failure and moves on;
    /// there is no retry.
    fn refresh_session(
        &self,
    ) -> impl std::future::Future<Output = Result<(), SessionError>> + Send;
}

//! Login gate demo: the sign-in flow of a booking app, in miniature.
//!
//! Wires the two Sessionwatch pieces together the way a real frontend
//! does:
//! - an [`AttemptLimiter`] in front of the credential check, producing
//!   the "too many attempts, try again in N seconds" UX
//! - a watcher over an in-memory [`SessionProvider`], printing lifecycle
//!   events as the issued session decays and expires
//!
//! Run with `cargo run -p login-gate`. Set `RUST_LOG=debug` to watch the
//! scheduler and tracker internals.

use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

use sessionwatch::prelude::*;

// ---------------------------------------------------------------------------
// In-memory identity provider
// ---------------------------------------------------------------------------

/// Stands in for the hosted identity vendor: holds the issued session in
/// a shared slot and extends it on refresh.
#[derive(Clone, Default)]
struct MemoryProvider {
    slot: Arc<Mutex<Option<Session>>>,
}

impl MemoryProvider {
    fn issue(&self, lifetime: Duration) {
        // Vendors hand back a JSON bundle; Session picks out the expiry
        // and ignores the rest.
        let payload = format!(
            r#"{{"token_type":"bearer","access_token":"demo","expires_at":{}}}"#,
            unix_now_secs() + lifetime.as_secs() as i64
        );
        let session: Session =
            serde_json::from_str(&payload).expect("well-formed payload");
        *self.slot.lock().expect("slot lock") = Some(session);
    }
}

impl SessionProvider for MemoryProvider {
    async fn current_session(&self) -> Result<Option<Session>, SessionError> {
        Ok(self.slot.lock().expect("slot lock").clone())
    }

    async fn refresh_session(&self) -> Result<(), SessionError> {
        // A real vendor re-issues the session here. This demo declines,
        // so the session runs out and the Expired event shows up.
        Err(SessionError::RefreshFailed(
            "demo provider does not re-issue sessions".into(),
        ))
    }
}

fn unix_now_secs() -> i64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Sign-in gate
// ---------------------------------------------------------------------------

/// Checks credentials behind the limiter. Returns true on success.
fn try_sign_in(limiter: &mut AttemptLimiter, password: &str) -> bool {
    if limiter.is_rate_limited() {
        let wait = limiter.remaining_time().as_secs();
        println!("  -> too many attempts, try again in {wait}s");
        return false;
    }

    // The "server side" of this demo accepts exactly one password.
    if password == "hunter2" {
        limiter.reset();
        println!("  -> signed in");
        return true;
    }

    limiter.record_attempt();
    let left = limiter.attempts_left();
    println!("  -> wrong password ({left} attempts left)");
    false
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), WatchError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    // A tight limiter so the gate trips within the demo's runtime.
    let mut limiter = AttemptLimiter::new(LimiterConfig {
        max_attempts: 3,
        window: Duration::from_secs(60),
    });

    println!("sign-in gate (3 attempts per minute):");
    for password in ["guest", "letmein", "qwerty", "hunter2"] {
        println!("attempt with {password:?}");
        if try_sign_in(&mut limiter, password) {
            break;
        }
    }
    // Even the right password is refused until the window slides.
    println!("attempt with \"hunter2\" (gate still closed)");
    try_sign_in(&mut limiter, "hunter2");

    // Issue a short-lived session and watch it decay. The warning window
    // is deliberately wider than the session, so the ExpiringSoon edge
    // fires on the first poll and Expired follows a few polls later.
    let provider = MemoryProvider::default();
    provider.issue(Duration::from_secs(8));

    println!("\nwatching an 8-second session (1s polls):");
    let mut handle = WatcherBuilder::new()
        .warn_threshold_mins(5)
        .auto_refresh(true)
        .poll_interval(Duration::from_secs(1))
        .spawn(provider);

    while let Some(event) = handle.recv().await {
        match event {
            MonitorEvent::ExpiringSoon {
                time_until_expiry_ms,
            } => {
                let state = handle.state();
                println!(
                    "  session expiring soon: {}ms left (~{} min)",
                    time_until_expiry_ms,
                    state.minutes_until_expiry().unwrap_or_default()
                );
            }
            MonitorEvent::Expired => {
                println!("  session expired; back to the sign-in page");
                break;
            }
        }
    }

    handle.shutdown().await
}

//! # Sessionwatch
//!
//! Client-side session lifecycle monitoring for apps built on an
//! external identity provider.
//!
//! Sessionwatch watches the session your identity provider issued and
//! tells you, exactly once per transition, when it is about to expire
//! and when it has expired, optionally firing a refresh request before
//! it lapses. A sliding-window attempt limiter for the sign-in form
//! rides along in [`sessionwatch_limit`].
//!
//! You implement one trait, [`SessionProvider`], over whatever SDK or
//! HTTP client you already use; the framework handles polling,
//! edge-triggered events, and deterministic teardown.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use sessionwatch::prelude::*;
//!
//! // Implement SessionProvider for your identity vendor, then:
//! // let mut handle = WatcherBuilder::new()
//! //     .warn_threshold_mins(5)
//! //     .spawn(my_provider);
//! // while let Some(event) = handle.recv().await { ... }
//! ```

mod error;
mod watcher;

pub use error::WatchError;
pub use watcher::{WatcherBuilder, WatcherHandle};

pub use sessionwatch_limit::{AttemptLimiter, LimiterConfig};
pub use sessionwatch_poll::{PollConfig, PollMetrics, PollScheduler};
pub use sessionwatch_session::{
    ExpiryTracker, MonitorConfig, MonitorEvent, MonitorState, Session,
    SessionError, SessionProvider,
};

/// One-stop imports for hosts embedding the watcher.
pub mod prelude {
    pub use crate::{
        AttemptLimiter, LimiterConfig, MonitorConfig, MonitorEvent,
        MonitorState, PollConfig, Session, SessionError, SessionProvider,
        WatchError, WatcherBuilder, WatcherHandle,
    };
}

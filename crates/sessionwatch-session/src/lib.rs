//! Session lifecycle primitives for Sessionwatch.
//!
//! This crate handles the *meaning* of a session's remaining lifetime:
//!
//! 1. **Snapshots** — the minimal [`Session`] value read from the
//!    provider (just an expiry instant)
//! 2. **Derivation** — the level-triggered [`MonitorState`] flags
//!    recomputed on every evaluation
//! 3. **Edges** — the [`ExpiryTracker`] state machine that fires
//!    [`MonitorEvent`]s exactly once per transition
//! 4. **Injection** — the [`SessionProvider`] trait the host implements
//!    over its identity vendor
//!
//! # How it fits in the stack
//!
//! ```text
//! sessionwatch (above)   ← spawns the watcher task, delivers events
//!     ↕
//! Session layer (this crate)   ← pure expiry semantics, provider trait
//!     ↕
//! Identity provider (external)   ← issues and refreshes real sessions
//! ```
//!
//! Everything here is synchronous and clock-free except the provider
//! trait, which is async because real providers are.

#![allow(async_fn_in_trait)]

mod error;
mod provider;
mod session;
mod tracker;

pub use error::SessionError;
pub use provider::SessionProvider;
pub use session::{MonitorConfig, MonitorState, Session};
pub use tracker::{ExpiryTracker, MonitorEvent};

//! `syncdesk-session` — inactivity logout for the admin console.
//!
//! # Overview
//!
//! A [`controller::SessionLifecycleController`] watches an injected
//! [`activity::ActivitySource`] and keeps two cancelable timers armed: a
//! warning that asks the user whether to continue, and a logout that ends
//! the session. Every qualifying activity restarts both. The time of the
//! last activity is written through [`persistence::ActivityPersistence`]
//! so a reload (or a laptop waking from sleep) can tell that the session
//! already expired.
//!
//! # State machine
//!
//! | From        | Event                         | To          |
//! |-------------|-------------------------------|-------------|
//! | `Inactive`  | activate, marker present      | `Monitoring`|
//! | `Inactive`  | activate, stored time too old | `Expired`   |
//! | `Monitoring`| warning timer fires           | `Warning`   |
//! | `Warning`   | activity or "continue"        | `Monitoring`|
//! | any live    | logout timer / explicit logout| `Expired`   |
//!
//! `Expired` is terminal for a controller instance.

pub mod activity;
pub mod controller;
pub mod db;
pub mod error;
pub mod persistence;
pub mod store;
pub mod types;

pub use activity::{ActivityHub, ActivityKind, ActivitySource, SubscriptionId};
pub use controller::{
    Activation, LogoutTransport, SessionGuard, SessionLifecycleController, WarningPrompt,
};
pub use error::{Result, SessionError};
pub use persistence::{ActivityPersistence, SessionSnapshot};
pub use store::{KeyValueStore, MemoryStore, SqliteStore};
pub use types::{LogoutReason, SessionState, SessionTiming};

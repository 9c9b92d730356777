//! `syncdesk-notify` — unread tracking over a re-polled notification list.
//!
//! The server keeps no per-user read state. The console remembers the
//! highest notification id it has shown (the baseline) and counts anything
//! above it as unread. The baseline lives in memory only and starts over
//! with every session.

pub mod center;
pub mod error;
pub mod tracker;
pub mod types;

pub use center::{NotificationCenter, NotificationFeed};
pub use error::{NotifyError, Result};
pub use tracker::{Identified, UnseenItemTracker};
pub use types::{JobLogNotification, JobRef};

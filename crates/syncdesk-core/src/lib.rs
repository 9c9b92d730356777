//! `syncdesk-core` — pieces shared by the console's temporal engines:
//! layered configuration, the common error type and the wall-clock seam.

pub mod clock;
pub mod config;
pub mod error;

pub use clock::{Clock, SystemClock, TokioClock};
pub use config::ConsoleConfig;
pub use error::{CoreError, Result};

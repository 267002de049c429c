//! # Expiry Scheduler Feature
//!
//! Long-duration timers and the per-subscriber registry that sends a
//! notification once a subscription lapses.
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0
//! - **Toggleable**: false

pub mod expiry;
pub mod timer;

pub use expiry::{ExpiryPolicy, ExpiryScheduler, RecoveryReport};
pub use timer::{LongTimer, MAX_PRIMITIVE_MS};

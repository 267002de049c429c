//! # Core Module
//!
//! Configuration, the framework error taxonomy and Discord message helpers.
//!
//! - **Version**: 2.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 2.0.0: Add typed error taxonomy for declarations, identities, dispatch and scheduling
//! - 1.1.0: Add response module with Discord message length helpers
//! - 1.0.0: Initial creation with config module

pub mod config;
pub mod error;
pub mod response;

// Re-export commonly used items
pub use config::Config;
pub use error::{DeclarationError, DispatchError, IdentityError, SchedulerError};
pub use response::{truncate_for_message, MESSAGE_LIMIT};

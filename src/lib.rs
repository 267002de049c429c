// Core layer - configuration, error taxonomy and message helpers
pub mod core;

// Interaction layer - event model, identity codec, registries and dispatch
pub mod interactions;

// Application layer - declared commands and their handlers
pub mod commands;

// Features layer - subscriptions and the expiry scheduler
pub mod features;

// Platform layer - serenity adapter
pub mod platform;

#[cfg(test)]
mod testing;

// Re-export the entry points used by the bot binary
pub use crate::core::Config;
pub use commands::{CommandDecl, CommandRegistry, CommandSet};
pub use features::{ExpiryScheduler, SubscriptionService};
pub use interactions::{DispatchOutcome, Dispatcher};

//! # Features
//!
//! Self-contained bot features layered on the interaction framework.
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0

pub mod scheduler;
pub mod subscriptions;

pub use scheduler::{ExpiryPolicy, ExpiryScheduler, LongTimer, RecoveryReport};
pub use subscriptions::{
    MemoryStore, PaymentEvent, SqliteStore, Subscriber, SubscriberId, SubscriberStore,
    SubscriptionService,
};

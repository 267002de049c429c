//! # Subscriptions Feature
//!
//! Subscriber records, their persistence, and the service that applies
//! payment events and Discord account links.
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0
//! - **Toggleable**: false

pub mod service;
pub mod sqlite_store;
pub mod store;

pub use service::{PaymentEvent, SubscriptionService, SubscriptionStatus};
pub use sqlite_store::SqliteStore;
pub use store::{MemoryStore, Subscriber, SubscriberId, SubscriberStore, SubscriberUpdate};

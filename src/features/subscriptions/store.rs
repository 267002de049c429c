//! Subscriber records and the storage seam
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serenity::model::id::UserId;
use std::fmt;

/// External billing identifier of a subscriber
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriberId(pub String);

impl SubscriberId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SubscriberId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for SubscriberId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A paying subscriber, optionally linked to a Discord account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscriber {
    pub id: SubscriberId,
    pub discord_user_id: Option<UserId>,
    pub tier: Option<String>,
    pub last_payment_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Subscriber {
    pub fn new(id: impl Into<SubscriberId>, paid_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            discord_user_id: None,
            tier: None,
            last_payment_at: paid_at,
            created_at: paid_at,
        }
    }
}

/// Partial update; `None` leaves a field untouched
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubscriberUpdate {
    pub discord_user_id: Option<Option<UserId>>,
    pub tier: Option<Option<String>>,
    pub last_payment_at: Option<DateTime<Utc>>,
}

impl SubscriberUpdate {
    pub fn link(user_id: UserId) -> Self {
        Self {
            discord_user_id: Some(Some(user_id)),
            ..Self::default()
        }
    }

    pub fn unlink() -> Self {
        Self {
            discord_user_id: Some(None),
            ..Self::default()
        }
    }

    /// Record a payment; a `tier` of `None` keeps the stored tier
    pub fn payment(paid_at: DateTime<Utc>, tier: Option<String>) -> Self {
        Self {
            tier: tier.map(Some),
            last_payment_at: Some(paid_at),
            ..Self::default()
        }
    }

    /// Apply the update in place
    ///
    /// An update carrying a payment older than the stored one is stale and
    /// leaves the record untouched.
    pub fn apply(self, subscriber: &mut Subscriber) {
        if matches!(self.last_payment_at, Some(paid_at) if paid_at < subscriber.last_payment_at) {
            return;
        }
        if let Some(user) = self.discord_user_id {
            subscriber.discord_user_id = user;
        }
        if let Some(tier) = self.tier {
            subscriber.tier = tier;
        }
        if let Some(paid_at) = self.last_payment_at {
            subscriber.last_payment_at = paid_at;
        }
    }
}

pub type SubscriberFilter = dyn Fn(&Subscriber) -> bool + Send + Sync;

/// Persistence for subscriber records
#[async_trait]
pub trait SubscriberStore: Send + Sync {
    async fn get_subscriber(&self, id: &SubscriberId) -> Result<Option<Subscriber>>;

    async fn list_subscribers(&self) -> Result<Vec<Subscriber>>;

    /// Insert or fully replace a record
    async fn upsert_subscriber(&self, subscriber: &Subscriber) -> Result<()>;

    /// Apply a partial update, returning the updated record if it exists
    async fn update_subscriber(
        &self,
        id: &SubscriberId,
        update: SubscriberUpdate,
    ) -> Result<Option<Subscriber>>;

    /// Delete every record matching `filter`, returning how many were removed
    async fn delete_subscribers(&self, filter: &SubscriberFilter) -> Result<usize>;

    async fn find_by_user(&self, user_id: UserId) -> Result<Option<Subscriber>> {
        Ok(self
            .list_subscribers()
            .await?
            .into_iter()
            .find(|s| s.discord_user_id == Some(user_id)))
    }
}

/// In-memory store, used in tests and when no database is configured
#[derive(Default)]
pub struct MemoryStore {
    subscribers: DashMap<SubscriberId, Subscriber>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SubscriberStore for MemoryStore {
    async fn get_subscriber(&self, id: &SubscriberId) -> Result<Option<Subscriber>> {
        Ok(self.subscribers.get(id).map(|entry| entry.value().clone()))
    }

    async fn list_subscribers(&self) -> Result<Vec<Subscriber>> {
        let mut all: Vec<Subscriber> = self
            .subscribers
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(all)
    }

    async fn upsert_subscriber(&self, subscriber: &Subscriber) -> Result<()> {
        self.subscribers
            .insert(subscriber.id.clone(), subscriber.clone());
        Ok(())
    }

    async fn update_subscriber(
        &self,
        id: &SubscriberId,
        update: SubscriberUpdate,
    ) -> Result<Option<Subscriber>> {
        Ok(self.subscribers.get_mut(id).map(|mut entry| {
            update.apply(entry.value_mut());
            entry.value().clone()
        }))
    }

    async fn delete_subscribers(&self, filter: &SubscriberFilter) -> Result<usize> {
        let mut removed = 0;
        self.subscribers.retain(|_, subscriber| {
            let matched = filter(subscriber);
            removed += usize::from(matched);
            !matched
        });
        Ok(removed)
    }
}

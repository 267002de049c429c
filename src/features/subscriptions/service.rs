//! Payment events and account links, persisted first and then scheduled
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0

use anyhow::Result;
use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};
use serenity::model::id::UserId;
use std::sync::Arc;

use super::store::{Subscriber, SubscriberId, SubscriberStore, SubscriberUpdate};
use crate::features::scheduler::ExpiryScheduler;

/// A decoded billing webhook event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PaymentEvent {
    PaymentSucceeded {
        subscriber_id: SubscriberId,
        paid_at: DateTime<Utc>,
        #[serde(default)]
        tier: Option<String>,
    },
    SubscriptionCancelled {
        subscriber_id: SubscriberId,
    },
}

/// What a linked user sees about their subscription
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionStatus {
    pub subscriber: Subscriber,
    pub expires_at: DateTime<Utc>,
    pub reminder_pending: bool,
}

/// Keeps the store and the expiry scheduler in step
///
/// Every operation persists before touching the scheduler, so a failed write
/// leaves the existing timer as it was.
#[derive(Clone)]
pub struct SubscriptionService {
    store: Arc<dyn SubscriberStore>,
    scheduler: ExpiryScheduler,
}

impl SubscriptionService {
    pub fn new(store: Arc<dyn SubscriberStore>, scheduler: ExpiryScheduler) -> Self {
        Self { store, scheduler }
    }

    pub fn scheduler(&self) -> &ExpiryScheduler {
        &self.scheduler
    }

    pub async fn apply(&self, event: PaymentEvent) -> Result<()> {
        self.apply_at(event, Utc::now()).await
    }

    pub async fn apply_at(&self, event: PaymentEvent, now: DateTime<Utc>) -> Result<()> {
        match event {
            PaymentEvent::PaymentSucceeded {
                subscriber_id,
                paid_at,
                tier,
            } => {
                // Applied in place so a link made meanwhile is kept
                let update = SubscriberUpdate::payment(paid_at, tier.clone());
                let subscriber = match self.store.update_subscriber(&subscriber_id, update).await? {
                    Some(stored) => stored,
                    None => {
                        let created = Subscriber {
                            tier,
                            ..Subscriber::new(subscriber_id.clone(), paid_at)
                        };
                        self.store.upsert_subscriber(&created).await?;
                        created
                    }
                };

                if subscriber.last_payment_at > paid_at {
                    info!(
                        "Ignoring payment for {} at {}: a later payment at {} is on record",
                        subscriber_id, paid_at, subscriber.last_payment_at
                    );
                    return Ok(());
                }

                if self.scheduler.schedule_payment(&subscriber, now) {
                    let remaining = self.scheduler.policy().remaining_ms(&subscriber, now);
                    info!("Payment recorded for {}, expiry in {}ms", subscriber_id, remaining);
                }
            }
            PaymentEvent::SubscriptionCancelled { subscriber_id } => {
                let target = subscriber_id.clone();
                let removed = self
                    .store
                    .delete_subscribers(&move |s: &Subscriber| s.id == target)
                    .await?;
                self.scheduler.remove(&subscriber_id);
                info!("Subscription {} cancelled ({} record(s) removed)", subscriber_id, removed);
            }
        }
        Ok(())
    }

    /// Link a Discord user to a subscriber and re-arm from the stored payment
    ///
    /// Returns `None` for an unknown subscriber. A user is linked to at most
    /// one subscriber; any previous link of the same user is cleared.
    pub async fn link(
        &self,
        subscriber_id: &SubscriberId,
        user_id: UserId,
    ) -> Result<Option<Subscriber>> {
        if let Some(previous) = self.store.find_by_user(user_id).await? {
            if &previous.id != subscriber_id {
                self.store
                    .update_subscriber(&previous.id, SubscriberUpdate::unlink())
                    .await?;
            }
        }

        let Some(subscriber) = self
            .store
            .update_subscriber(subscriber_id, SubscriberUpdate::link(user_id))
            .await?
        else {
            return Ok(None);
        };

        let now = Utc::now();
        if self.scheduler.policy().remaining_ms(&subscriber, now) > 0 {
            self.scheduler.schedule_payment(&subscriber, now);
        }
        info!("Linked {} to subscriber {}", user_id, subscriber_id);
        Ok(Some(subscriber))
    }

    /// Remove the link of a Discord user, if any
    pub async fn unlink(&self, user_id: UserId) -> Result<Option<Subscriber>> {
        let Some(subscriber) = self.store.find_by_user(user_id).await? else {
            return Ok(None);
        };
        let updated = self
            .store
            .update_subscriber(&subscriber.id, SubscriberUpdate::unlink())
            .await?;
        info!("Unlinked {} from subscriber {}", user_id, subscriber.id);
        Ok(updated)
    }

    /// Remove the link only while it still points at `subscriber_id`
    ///
    /// Returns `None`, and changes nothing, when the user is now linked to
    /// another subscriber or to none.
    pub async fn unlink_from(
        &self,
        user_id: UserId,
        subscriber_id: &SubscriberId,
    ) -> Result<Option<Subscriber>> {
        match self.store.find_by_user(user_id).await? {
            Some(current) if &current.id == subscriber_id => self.unlink(user_id).await,
            _ => Ok(None),
        }
    }

    pub async fn status_for(&self, user_id: UserId) -> Result<Option<SubscriptionStatus>> {
        let Some(subscriber) = self.store.find_by_user(user_id).await? else {
            return Ok(None);
        };
        Ok(Some(SubscriptionStatus {
            expires_at: self.scheduler.policy().deadline(subscriber.last_payment_at),
            reminder_pending: self.scheduler.contains(&subscriber.id),
            subscriber,
        }))
    }
}

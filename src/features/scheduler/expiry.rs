//! Per-subscriber expiry timers
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0
//!
//! At most one timer is live per subscriber. `replace` and `remove` go
//! through the map's per-key entry lock, and every installed timer carries a
//! generation number so a timer that lost a race can never remove its
//! successor.

use anyhow::Result;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use log::{debug, error, info};
use serenity::model::id::ChannelId;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::time::Instant;

use super::timer::LongTimer;
use crate::core::error::SchedulerError;
use crate::features::subscriptions::{Subscriber, SubscriberId, SubscriberStore};
use crate::platform::Platform;

/// When a subscription lapses and where the notice goes
#[derive(Debug, Clone, PartialEq)]
pub struct ExpiryPolicy {
    pub channel_id: ChannelId,
    pub period: chrono::Duration,
    pub grace: chrono::Duration,
    /// Send a catch-up notice at startup for subscribers already overdue
    pub notify_overdue_on_startup: bool,
}

impl ExpiryPolicy {
    pub fn deadline(&self, last_payment_at: DateTime<Utc>) -> DateTime<Utc> {
        last_payment_at + self.period + self.grace
    }

    /// Milliseconds until the subscriber's deadline; zero or less if overdue
    pub fn remaining_ms(&self, subscriber: &Subscriber, now: DateTime<Utc>) -> i64 {
        (self.deadline(subscriber.last_payment_at) - now).num_milliseconds()
    }
}

/// Outcome of startup recovery
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecoveryReport {
    pub scheduled: usize,
    pub skipped: usize,
    pub overdue_notified: usize,
}

struct ScheduledExpiry {
    generation: u64,
    timer: LongTimer,
    deadline: Instant,
    /// Payment the timer was computed from, when armed through `schedule_payment`
    paid_at: Option<DateTime<Utc>>,
}

struct Inner {
    timers: DashMap<SubscriberId, ScheduledExpiry>,
    generation: AtomicU64,
    store: Arc<dyn SubscriberStore>,
    platform: Arc<dyn Platform>,
    policy: ExpiryPolicy,
}

/// Registry of pending "subscription expired" notifications
#[derive(Clone)]
pub struct ExpiryScheduler {
    inner: Arc<Inner>,
}

impl ExpiryScheduler {
    pub fn new(
        store: Arc<dyn SubscriberStore>,
        platform: Arc<dyn Platform>,
        policy: ExpiryPolicy,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                timers: DashMap::new(),
                generation: AtomicU64::new(0),
                store,
                platform,
                policy,
            }),
        }
    }

    pub fn policy(&self) -> &ExpiryPolicy {
        &self.inner.policy
    }

    /// Cancel any pending timer for `id` and install a fresh one
    ///
    /// `compute_delay` runs under the entry lock, so concurrent replacements
    /// for one subscriber are serialized and exactly one timer survives.
    pub fn replace<F>(&self, id: &SubscriberId, compute_delay: F)
    where
        F: FnOnce() -> i64,
    {
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;

        match self.inner.timers.entry(id.clone()) {
            Entry::Occupied(mut slot) => {
                slot.get().timer.clear();
                slot.insert(self.start(id, generation, compute_delay(), None));
            }
            Entry::Vacant(slot) => {
                slot.insert(self.start(id, generation, compute_delay(), None));
            }
        }
        debug!("Expiry timer for {} installed (generation {})", id, generation);
    }

    /// Arm the timer from the subscriber's stored payment
    ///
    /// A pending timer computed from a later payment is kept, so overlapping
    /// payment events settle on the newest one whatever order they finish in.
    /// Returns whether a timer was installed.
    pub fn schedule_payment(&self, subscriber: &Subscriber, now: DateTime<Utc>) -> bool {
        let paid_at = subscriber.last_payment_at;
        let remaining = self.inner.policy.remaining_ms(subscriber, now);
        let id = &subscriber.id;

        match self.inner.timers.entry(id.clone()) {
            Entry::Occupied(mut slot) => {
                if matches!(slot.get().paid_at, Some(pending) if pending > paid_at) {
                    debug!("Expiry timer for {} already follows a later payment", id);
                    return false;
                }
                let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
                slot.get().timer.clear();
                slot.insert(self.start(id, generation, remaining, Some(paid_at)));
            }
            Entry::Vacant(slot) => {
                let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
                slot.insert(self.start(id, generation, remaining, Some(paid_at)));
            }
        }
        debug!("Expiry timer for {} armed from payment at {}", id, paid_at);
        true
    }

    /// Cancel and forget the timer for `id`, if any
    pub fn remove(&self, id: &SubscriberId) {
        if let Some((_, scheduled)) = self.inner.timers.remove(id) {
            scheduled.timer.clear();
            debug!("Expiry timer for {} removed", id);
        }
    }

    pub fn contains(&self, id: &SubscriberId) -> bool {
        self.inner.timers.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.inner.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.timers.is_empty()
    }

    /// Time left before the pending notification for `id` fires
    pub fn time_until(&self, id: &SubscriberId) -> Option<Duration> {
        self.inner
            .timers
            .get(id)
            .map(|entry| entry.deadline.saturating_duration_since(Instant::now()))
    }

    /// Rebuild timers from persisted subscribers after a restart
    pub async fn recover(&self, now: DateTime<Utc>) -> Result<RecoveryReport> {
        let subscribers = self.inner.store.list_subscribers().await?;
        let policy = &self.inner.policy;
        let mut report = RecoveryReport::default();

        for subscriber in subscribers {
            let remaining = policy.remaining_ms(&subscriber, now);
            if remaining > 0 {
                self.schedule_payment(&subscriber, now);
                report.scheduled += 1;
            } else if policy.notify_overdue_on_startup {
                self.replace(&subscriber.id, || 0);
                report.overdue_notified += 1;
            } else {
                debug!(
                    "Subscriber {} overdue by {}ms, not rescheduled",
                    subscriber.id, -remaining
                );
                report.skipped += 1;
            }
        }

        info!(
            "Expiry recovery: {} scheduled, {} skipped, {} overdue notified",
            report.scheduled, report.skipped, report.overdue_notified
        );
        Ok(report)
    }

    fn start(
        &self,
        id: &SubscriberId,
        generation: u64,
        delay_ms: i64,
        paid_at: Option<DateTime<Utc>>,
    ) -> ScheduledExpiry {
        let scheduler: Weak<Inner> = Arc::downgrade(&self.inner);
        let fired_id = id.clone();
        let timer = LongTimer::new(
            move || {
                if let Some(inner) = scheduler.upgrade() {
                    tokio::spawn(async move {
                        ExpiryScheduler { inner }.fire(fired_id, generation).await;
                    });
                }
            },
            delay_ms,
        );

        ScheduledExpiry {
            generation,
            timer,
            deadline: Instant::now() + Duration::from_millis(delay_ms.max(0) as u64),
            paid_at,
        }
    }

    async fn fire(&self, id: SubscriberId, generation: u64) {
        let current = self
            .inner
            .timers
            .remove_if(&id, |_, scheduled| scheduled.generation == generation);
        if current.is_none() {
            debug!("Stale expiry timer for {} (generation {}) ignored", id, generation);
            return;
        }

        match self.notify(&id).await {
            Ok(()) => info!("Expiry notification sent for {}", id),
            Err(e) => error!("Expiry notification failed: {}", e),
        }
    }

    async fn notify(&self, id: &SubscriberId) -> Result<(), SchedulerError> {
        let subscriber = self
            .inner
            .store
            .get_subscriber(id)
            .await
            .map_err(|cause| SchedulerError::Store {
                id: id.clone(),
                cause,
            })?
            .ok_or_else(|| SchedulerError::SubscriberNotFound(id.clone()))?;

        let policy = &self.inner.policy;
        let content = expiry_message(&subscriber, policy);
        self.inner
            .platform
            .send_message(policy.channel_id, &content)
            .await
            .map_err(|cause| SchedulerError::Notification {
                id: id.clone(),
                cause,
            })
    }
}

fn expiry_message(subscriber: &Subscriber, policy: &ExpiryPolicy) -> String {
    let who = match subscriber.discord_user_id {
        Some(user) => format!("<@{}> (`{}`)", user.0, subscriber.id),
        None => format!("`{}`", subscriber.id),
    };
    format!(
        "⏰ Subscription expired for {}: last payment {}, grace period ended {}.",
        who,
        subscriber.last_payment_at.format("%Y-%m-%d"),
        policy.deadline(subscriber.last_payment_at).format("%Y-%m-%d %H:%M UTC"),
    )
}

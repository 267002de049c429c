//! SQLite-backed subscriber store
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0
//!
//! Timestamps are stored as Unix milliseconds, Discord ids as text.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use log::info;
use serenity::model::id::UserId;
use sqlite::{Connection, ConnectionThreadSafe, State, Statement, Value};
use std::path::Path;
use tokio::sync::Mutex;

use super::store::{Subscriber, SubscriberFilter, SubscriberId, SubscriberStore, SubscriberUpdate};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS subscribers (
        id TEXT PRIMARY KEY,
        discord_user_id TEXT,
        tier TEXT,
        last_payment_at INTEGER NOT NULL,
        created_at INTEGER NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_subscribers_discord_user
        ON subscribers(discord_user_id);
";

const SELECT_COLUMNS: &str =
    "SELECT id, discord_user_id, tier, last_payment_at, created_at FROM subscribers";

pub struct SqliteStore {
    connection: Mutex<ConnectionThreadSafe>,
}

impl SqliteStore {
    /// Open (or create) the database and make sure the table exists
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let connection = Connection::open_thread_safe(path)
            .with_context(|| format!("Failed to open database {}", path.display()))?;
        connection.execute(SCHEMA)?;
        info!("Subscriber database ready at {}", path.display());
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }
}

#[async_trait]
impl SubscriberStore for SqliteStore {
    async fn get_subscriber(&self, id: &SubscriberId) -> Result<Option<Subscriber>> {
        let connection = self.connection.lock().await;
        select_one(&connection, id)
    }

    async fn list_subscribers(&self) -> Result<Vec<Subscriber>> {
        let connection = self.connection.lock().await;
        let mut statement = connection.prepare(format!("{SELECT_COLUMNS} ORDER BY id"))?;
        let mut subscribers = Vec::new();
        while let State::Row = statement.next()? {
            subscribers.push(read_subscriber(&statement)?);
        }
        Ok(subscribers)
    }

    async fn upsert_subscriber(&self, subscriber: &Subscriber) -> Result<()> {
        let connection = self.connection.lock().await;
        upsert(&connection, subscriber)
    }

    async fn update_subscriber(
        &self,
        id: &SubscriberId,
        update: SubscriberUpdate,
    ) -> Result<Option<Subscriber>> {
        // Read-modify-write under one lock
        let connection = self.connection.lock().await;
        let Some(mut subscriber) = select_one(&connection, id)? else {
            return Ok(None);
        };
        update.apply(&mut subscriber);
        upsert(&connection, &subscriber)?;
        Ok(Some(subscriber))
    }

    async fn delete_subscribers(&self, filter: &SubscriberFilter) -> Result<usize> {
        let connection = self.connection.lock().await;

        let mut matching = Vec::new();
        let mut statement = connection.prepare(SELECT_COLUMNS)?;
        while let State::Row = statement.next()? {
            let subscriber = read_subscriber(&statement)?;
            if filter(&subscriber) {
                matching.push(subscriber.id);
            }
        }
        drop(statement);

        for id in &matching {
            let mut delete = connection.prepare("DELETE FROM subscribers WHERE id = ?")?;
            delete.bind((1, id.as_str()))?;
            while delete.next()? != State::Done {}
        }
        Ok(matching.len())
    }

    async fn find_by_user(&self, user_id: UserId) -> Result<Option<Subscriber>> {
        let connection = self.connection.lock().await;
        let mut statement =
            connection.prepare(format!("{SELECT_COLUMNS} WHERE discord_user_id = ? LIMIT 1"))?;
        statement.bind((1, user_id.0.to_string().as_str()))?;
        match statement.next()? {
            State::Row => Ok(Some(read_subscriber(&statement)?)),
            State::Done => Ok(None),
        }
    }
}

fn select_one(connection: &Connection, id: &SubscriberId) -> Result<Option<Subscriber>> {
    let mut statement = connection.prepare(format!("{SELECT_COLUMNS} WHERE id = ?"))?;
    statement.bind((1, id.as_str()))?;
    match statement.next()? {
        State::Row => Ok(Some(read_subscriber(&statement)?)),
        State::Done => Ok(None),
    }
}

fn upsert(connection: &Connection, subscriber: &Subscriber) -> Result<()> {
    let mut statement = connection.prepare(
        "INSERT INTO subscribers (id, discord_user_id, tier, last_payment_at, created_at)
         VALUES (?, ?, ?, ?, ?)
         ON CONFLICT(id) DO UPDATE SET
            discord_user_id = excluded.discord_user_id,
            tier = excluded.tier,
            last_payment_at = excluded.last_payment_at,
            created_at = excluded.created_at",
    )?;

    let user = subscriber
        .discord_user_id
        .map(|user| Value::String(user.0.to_string()))
        .unwrap_or(Value::Null);
    let tier = subscriber
        .tier
        .clone()
        .map(Value::String)
        .unwrap_or(Value::Null);

    statement.bind((1, subscriber.id.as_str()))?;
    statement.bind((2, user))?;
    statement.bind((3, tier))?;
    statement.bind((4, subscriber.last_payment_at.timestamp_millis()))?;
    statement.bind((5, subscriber.created_at.timestamp_millis()))?;
    while statement.next()? != State::Done {}
    Ok(())
}

fn read_subscriber(statement: &Statement) -> Result<Subscriber> {
    let id: String = statement.read("id")?;

    let discord_user_id = match statement.read::<Value, _>("discord_user_id")? {
        Value::String(raw) => Some(UserId(
            raw.parse()
                .with_context(|| format!("Invalid discord_user_id for {id}: {raw}"))?,
        )),
        _ => None,
    };
    let tier = match statement.read::<Value, _>("tier")? {
        Value::String(tier) => Some(tier),
        _ => None,
    };

    Ok(Subscriber {
        discord_user_id,
        tier,
        last_payment_at: from_millis(statement.read("last_payment_at")?)?,
        created_at: from_millis(statement.read("created_at")?)?,
        id: SubscriberId(id),
    })
}

fn from_millis(millis: i64) -> Result<DateTime<Utc>> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .ok_or_else(|| anyhow!("Timestamp out of range: {millis}"))
}

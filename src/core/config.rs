//! Environment-based bot configuration
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 1.1.0: Reject period and grace values chrono cannot represent
//! - 1.0.0: Environment lookup with defaults

use anyhow::{Context, Result};
use chrono::Duration;
use serenity::model::id::{ChannelId, GuildId};
use std::str::FromStr;

use crate::features::scheduler::ExpiryPolicy;

/// Upper bound for either window, keeping payment plus period plus grace in
/// chrono's range
const MAX_WINDOW_DAYS: i64 = 36_500;

/// Runtime configuration, loaded from environment variables (and `.env`)
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub discord_token: String,
    /// Register commands for one guild only (faster propagation while developing)
    pub discord_guild_id: Option<u64>,
    pub database_path: String,
    pub log_level: String,
    /// Where full error reports are posted
    pub operator_channel_id: Option<u64>,
    /// Where subscription expiry notifications are posted
    pub expiry_channel_id: u64,
    pub subscription_period: Duration,
    pub grace_period: Duration,
    pub notify_overdue_on_startup: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let discord_token = lookup("DISCORD_TOKEN")
            .filter(|token| !token.trim().is_empty())
            .context("DISCORD_TOKEN must be set")?;

        let expiry_channel_id = parse_optional(&lookup, "EXPIRY_CHANNEL_ID")?
            .context("EXPIRY_CHANNEL_ID must be set")?;

        let subscription_period_days =
            parse_optional(&lookup, "SUBSCRIPTION_PERIOD_DAYS")?.unwrap_or(30);
        let grace_period_days = parse_optional(&lookup, "GRACE_PERIOD_DAYS")?.unwrap_or(3);
        if subscription_period_days <= 0 || grace_period_days < 0 {
            anyhow::bail!(
                "SUBSCRIPTION_PERIOD_DAYS must be positive and GRACE_PERIOD_DAYS non-negative"
            );
        }
        let subscription_period = window("SUBSCRIPTION_PERIOD_DAYS", subscription_period_days)?;
        let grace_period = window("GRACE_PERIOD_DAYS", grace_period_days)?;

        Ok(Self {
            discord_token,
            discord_guild_id: parse_optional(&lookup, "DISCORD_GUILD_ID")?,
            database_path: lookup("DATABASE_PATH").unwrap_or_else(|| "subscribers.db".to_string()),
            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            operator_channel_id: parse_optional(&lookup, "OPERATOR_CHANNEL_ID")?,
            expiry_channel_id,
            subscription_period,
            grace_period,
            notify_overdue_on_startup: parse_optional(&lookup, "NOTIFY_OVERDUE_ON_STARTUP")?
                .unwrap_or(false),
        })
    }

    pub fn guild_id(&self) -> Option<GuildId> {
        self.discord_guild_id.map(GuildId)
    }

    pub fn operator_channel(&self) -> Option<ChannelId> {
        self.operator_channel_id.map(ChannelId)
    }

    /// Expiry timing derived from the configured period and grace window
    pub fn expiry_policy(&self) -> ExpiryPolicy {
        ExpiryPolicy {
            channel_id: ChannelId(self.expiry_channel_id),
            period: self.subscription_period,
            grace: self.grace_period,
            notify_overdue_on_startup: self.notify_overdue_on_startup,
        }
    }
}

fn window(key: &str, days: i64) -> Result<Duration> {
    Duration::try_days(days)
        .filter(|_| days <= MAX_WINDOW_DAYS)
        .with_context(|| format!("{key} must be at most {MAX_WINDOW_DAYS} days (got {days})"))
}

fn parse_optional<T, F>(lookup: &F, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| anyhow::anyhow!("Invalid value for {key} ('{raw}'): {e}")),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = Config::from_lookup(lookup_from(&[
            ("DISCORD_TOKEN", "token"),
            ("EXPIRY_CHANNEL_ID", "42"),
        ]))
        .unwrap();

        assert_eq!(config.discord_token, "token");
        assert_eq!(config.expiry_channel_id, 42);
        assert_eq!(config.database_path, "subscribers.db");
        assert_eq!(config.log_level, "info");
        assert_eq!(config.subscription_period, Duration::days(30));
        assert_eq!(config.grace_period, Duration::days(3));
        assert!(!config.notify_overdue_on_startup);
        assert!(config.guild_id().is_none());
        assert!(config.operator_channel().is_none());
    }

    #[test]
    fn test_full_config() {
        let config = Config::from_lookup(lookup_from(&[
            ("DISCORD_TOKEN", "token"),
            ("DISCORD_GUILD_ID", "100"),
            ("DATABASE_PATH", "/tmp/subs.db"),
            ("LOG_LEVEL", "debug"),
            ("OPERATOR_CHANNEL_ID", "7"),
            ("EXPIRY_CHANNEL_ID", "8"),
            ("SUBSCRIPTION_PERIOD_DAYS", "31"),
            ("GRACE_PERIOD_DAYS", "0"),
            ("NOTIFY_OVERDUE_ON_STARTUP", "true"),
        ]))
        .unwrap();

        assert_eq!(config.guild_id(), Some(GuildId(100)));
        assert_eq!(config.operator_channel(), Some(ChannelId(7)));
        assert!(config.notify_overdue_on_startup);

        let policy = config.expiry_policy();
        assert_eq!(policy.channel_id, ChannelId(8));
        assert_eq!(policy.period, Duration::days(31));
        assert_eq!(policy.grace, Duration::zero());
    }

    #[test]
    fn test_missing_token_is_error() {
        let err = Config::from_lookup(lookup_from(&[("EXPIRY_CHANNEL_ID", "42")])).unwrap_err();
        assert!(err.to_string().contains("DISCORD_TOKEN"));
    }

    #[test]
    fn test_missing_expiry_channel_is_error() {
        let err = Config::from_lookup(lookup_from(&[("DISCORD_TOKEN", "t")])).unwrap_err();
        assert!(err.to_string().contains("EXPIRY_CHANNEL_ID"));
    }

    #[test]
    fn test_invalid_number_is_error() {
        let err = Config::from_lookup(lookup_from(&[
            ("DISCORD_TOKEN", "t"),
            ("EXPIRY_CHANNEL_ID", "not-a-number"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("EXPIRY_CHANNEL_ID"));
    }

    #[test]
    fn test_non_positive_period_is_error() {
        let result = Config::from_lookup(lookup_from(&[
            ("DISCORD_TOKEN", "t"),
            ("EXPIRY_CHANNEL_ID", "1"),
            ("SUBSCRIPTION_PERIOD_DAYS", "0"),
        ]));
        assert!(result.is_err());
    }

    #[test]
    fn test_out_of_range_windows_are_errors() {
        for (key, value) in [
            ("SUBSCRIPTION_PERIOD_DAYS", "999999999999"),
            ("GRACE_PERIOD_DAYS", "9223372036854775807"),
            ("SUBSCRIPTION_PERIOD_DAYS", "36501"),
        ] {
            let err = Config::from_lookup(lookup_from(&[
                ("DISCORD_TOKEN", "t"),
                ("EXPIRY_CHANNEL_ID", "1"),
                (key, value),
            ]))
            .unwrap_err();
            assert!(err.to_string().contains(key), "{key}={value}: {err}");
        }

        let config = Config::from_lookup(lookup_from(&[
            ("DISCORD_TOKEN", "t"),
            ("EXPIRY_CHANNEL_ID", "1"),
            ("SUBSCRIPTION_PERIOD_DAYS", "36500"),
            ("GRACE_PERIOD_DAYS", "36500"),
        ]))
        .unwrap();
        let policy = config.expiry_policy();
        assert_eq!(policy.period + policy.grace, Duration::days(73_000));
    }
}

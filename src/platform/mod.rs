//! # Platform Boundary
//!
//! The narrow slice of the Discord client this crate consumes, plus the
//! serenity-backed implementation used by the bot binary.
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0
//! - **Toggleable**: false

pub mod discord;

use anyhow::Result;
use async_trait::async_trait;
use serenity::builder::CreateApplicationCommand;
use serenity::model::id::{ChannelId, CommandId};
use std::collections::HashMap;

pub use discord::{convert_interaction, SerenityPlatform, SerenityResponder};

/// Outbound calls to the chat platform that are not tied to one interaction
#[async_trait]
pub trait Platform: Send + Sync {
    /// Post a plain message to a channel
    async fn send_message(&self, channel_id: ChannelId, content: &str) -> Result<()>;

    /// Replace the registered command set, returning the assigned id per name
    async fn register_command_schemas(
        &self,
        schemas: Vec<CreateApplicationCommand>,
    ) -> Result<HashMap<String, CommandId>>;
}

//! Invocation context handed to command handlers

use anyhow::Result;
use serenity::model::id::UserId;
use std::sync::Arc;

use crate::interactions::event::{CommandInteraction, CommandKind};
use crate::interactions::respond::{Reply, Responder};

/// One command invocation together with the means to answer it
#[derive(Clone)]
pub struct Invocation {
    pub interaction: CommandInteraction,
    pub responder: Arc<dyn Responder>,
}

impl Invocation {
    pub fn new(interaction: CommandInteraction, responder: Arc<dyn Responder>) -> Self {
        Self {
            interaction,
            responder,
        }
    }

    pub fn user_id(&self) -> UserId {
        self.interaction.invoker.user_id
    }

    /// Target user of a user context menu command
    pub fn target_user(&self) -> Option<UserId> {
        match self.interaction.kind {
            CommandKind::User => self.interaction.target_id.map(UserId),
            _ => None,
        }
    }

    pub async fn reply(&self, content: impl Into<String>) -> Result<()> {
        self.responder.reply(Reply::new(content)).await
    }

    pub async fn reply_ephemeral(&self, content: impl Into<String>) -> Result<()> {
        self.responder.reply(Reply::ephemeral(content)).await
    }
}

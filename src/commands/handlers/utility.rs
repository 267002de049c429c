//! Utility command handlers
//!
//! Handles: ping
//!
//! - **Version**: 2.0.0
//! - **Since**: 1.0.0
//!
//! ## Changelog
//! - 2.0.0: Port to declared commands; drop help, status, version and uptime
//! - 1.0.0: Extracted from command_handler.rs

use anyhow::Result;
use async_trait::async_trait;
use log::info;

use crate::commands::declare::CommandDecl;
use crate::commands::handler::CommandHandler;
use crate::commands::invocation::Invocation;

pub struct PingHandler;

#[async_trait]
impl CommandHandler<()> for PingHandler {
    async fn handle(&self, invocation: Invocation, _args: ()) -> Result<()> {
        invocation.reply("Pong!").await?;
        info!("Ping command completed for user {}", invocation.user_id());
        Ok(())
    }
}

pub fn declare() -> CommandDecl {
    CommandDecl::slash("ping", "Test bot responsiveness").handler(PingHandler)
}

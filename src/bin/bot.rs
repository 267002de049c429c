use anyhow::Result;
use chrono::Utc;
use dotenvy::dotenv;
use log::{debug, error, info};
use serenity::async_trait;
use serenity::http::Http;
use serenity::model::application::interaction::Interaction;
use serenity::model::gateway::Ready;
use serenity::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use switchboard::commands::{create_bundled, register_commands, CommandRegistry, CommandSet};
use switchboard::core::Config;
use switchboard::features::scheduler::ExpiryScheduler;
use switchboard::features::subscriptions::{SqliteStore, SubscriberStore, SubscriptionService};
use switchboard::interactions::Dispatcher;
use switchboard::platform::{convert_interaction, SerenityPlatform, SerenityResponder};

struct Handler {
    dispatcher: Arc<Dispatcher>,
    platform: Arc<SerenityPlatform>,
    scheduler: ExpiryScheduler,
    /// Emptied by the first successful registration; a failed one is retried
    /// on the next Ready
    pending_commands: Mutex<CommandSet>,
    recovered: AtomicBool,
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!("🎉 {} is connected and ready!", ready.user.name);
        info!("📡 Connected to {} guilds", ready.guilds.len());

        let mut pending = self.pending_commands.lock().await;
        if !pending.is_empty() {
            match register_commands(self.platform.as_ref(), &mut pending, self.dispatcher.commands())
                .await
            {
                Ok(count) => info!("✅ Registered {count} application commands"),
                Err(e) => error!(
                    "❌ Failed to register application commands, retrying on next Ready: {e:#}"
                ),
            }
        }
        drop(pending);

        if self.recovered.swap(true, Ordering::SeqCst) {
            debug!("Reconnected; expiry timers are already set up");
            return;
        }

        match self.scheduler.recover(Utc::now()).await {
            Ok(report) => info!(
                "⏰ Expiry timers recovered: {} scheduled, {} skipped, {} overdue notified",
                report.scheduled, report.skipped, report.overdue_notified
            ),
            Err(e) => error!("❌ Failed to recover expiry timers: {e:#}"),
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        let Some((event, raw)) = convert_interaction(interaction) else {
            debug!("Ignoring unsupported interaction");
            return;
        };
        let responder = Arc::new(SerenityResponder::new(ctx.http.clone(), raw));
        self.dispatcher.dispatch(event, responder).await;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv().ok();

    let config = Config::from_env()?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_level))
        .init();

    info!("Starting Switchboard bot...");

    let http = Arc::new(Http::new(&config.discord_token));
    let platform = Arc::new(SerenityPlatform::new(http, config.guild_id()));
    match config.guild_id() {
        Some(guild_id) => info!("🔧 Development mode: commands register for guild {guild_id}"),
        None => info!("🌍 Production mode: commands register globally"),
    }

    let store: Arc<dyn SubscriberStore> = Arc::new(SqliteStore::open(&config.database_path)?);
    let scheduler = ExpiryScheduler::new(store.clone(), platform.clone(), config.expiry_policy());
    let service = SubscriptionService::new(store, scheduler.clone());

    // Declaration errors are fatal: never run with a partial command set
    let (commands, components) = create_bundled(&service)?;

    let mut dispatcher = Dispatcher::new(CommandRegistry::new(), Arc::new(components));
    if let Some(channel_id) = config.operator_channel() {
        info!("🛠️ Error reports go to channel {channel_id}");
        dispatcher = dispatcher.with_operator_channel(platform.clone(), channel_id);
    }

    let handler = Handler {
        dispatcher: Arc::new(dispatcher),
        platform,
        scheduler,
        pending_commands: Mutex::new(commands),
        recovered: AtomicBool::new(false),
    };

    let intents = GatewayIntents::GUILDS;

    let mut client = Client::builder(&config.discord_token, intents)
        .event_handler(handler)
        .await
        .map_err(|e| {
            error!("Failed to create Discord client: {e}");
            anyhow::anyhow!("Client creation failed: {}", e)
        })?;

    info!("Bot configured successfully. Connecting to Discord gateway...");

    if let Err(why) = client.start().await {
        error!("Gateway connection failed: {why:?}");
        return Err(anyhow::anyhow!(
            "Failed to establish gateway connection: {}",
            why
        ));
    }

    Ok(())
}

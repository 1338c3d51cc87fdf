// This is the entry point of the Discord bot.
//
// **Architecture Overview:**
// - `core/` = Business logic (platform-agnostic)
// - `infra/` = Implementations of core ports (Discord REST, webhook, files)
// - `discord/` = Discord-specific adapters (commands, events)
//
// This file's job is to:
// 1. Load configuration
// 2. Initialize services (dependency injection)
// 3. Set up the Discord framework
// 4. Register commands and event handlers
// 5. Spawn the optional game-log watcher

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with half a dozen mod.rs files that all look the same.
#[path = "core/core_layer.rs"]
mod core;
#[path = "discord/discord_layer.rs"]
mod discord;
#[path = "infra/infra_layer.rs"]
mod infra;

use crate::core::pruning::WebhookPruner;
use crate::core::watcher::EventSink;
use crate::discord::{Data, Error};
use crate::infra::pruning::SerenityMessageDeleter;
use crate::infra::watcher::{LogTailer, WebhookSink};
use poise::serenity_prelude as serenity;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Event handler for non-command Discord events.
/// This is where webhook messages get pruned.
async fn event_handler(
    _ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    if let serenity::FullEvent::Message { new_message } = event {
        // Only webhook posts in the configured channel are interesting.
        if new_message.channel_id.get() != data.prune_channel_id
            || new_message.webhook_id.is_none()
        {
            return Ok(());
        }

        // The pruner never fails outward - a failed delete is logged and
        // swallowed so message ingestion keeps running.
        data.pruner
            .observe(
                new_message.channel_id.get(),
                new_message.id.get(),
                data.deleter.as_ref(),
            )
            .await;
    }

    Ok(())
}

fn required_env(name: &str) -> String {
    std::env::var(name)
        .unwrap_or_else(|_| panic!("Missing {name} environment variable! Check your .env file."))
}

fn required_env_u64(name: &str) -> u64 {
    required_env(name)
        .parse()
        .unwrap_or_else(|_| panic!("{name} must be a numeric Discord id"))
}

#[tokio::main]
async fn main() {
    // Initialize logging so we can see what's happening
    tracing_subscriber::fmt::init();

    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    let token = required_env("DISCORD_TOKEN");
    let guild_id = serenity::GuildId::new(required_env_u64("GUILD_ID"));
    let prune_channel_id = required_env_u64("PRUNE_CHANNEL_ID");

    // The log watcher only runs when both its settings are present.
    let game_log_path = std::env::var("GAME_LOG_PATH").ok().map(PathBuf::from);
    let game_log_webhook = std::env::var("GAME_LOG_WEBHOOK_URL").ok();

    // ========================================================================
    // BACKGROUND WATCHER
    // ========================================================================
    // The tailer is independent of the gateway; it gets its own task and a
    // cancellation token so ctrl-c stops it cleanly.

    let watcher_cancel = CancellationToken::new();

    match (game_log_path, game_log_webhook) {
        (Some(path), Some(url)) => {
            tracing::info!(path = %path.display(), "starting game log watcher");
            let sink = Arc::new(WebhookSink::new(url)) as Arc<dyn EventSink>;
            let cancel = watcher_cancel.clone();
            tokio::spawn(LogTailer::new(path).run(sink, cancel));
        }
        (None, None) => {
            tracing::info!("game log watcher disabled (GAME_LOG_PATH not set)");
        }
        _ => {
            tracing::warn!(
                "game log watcher needs both GAME_LOG_PATH and GAME_LOG_WEBHOOK_URL; skipping"
            );
        }
    }

    // ========================================================================
    // DISCORD FRAMEWORK SETUP
    // ========================================================================
    // Configure the poise framework with our commands and settings.

    let intents = serenity::GatewayIntents::GUILDS
        | serenity::GatewayIntents::GUILD_MESSAGES
        | serenity::GatewayIntents::GUILD_MESSAGE_REACTIONS;

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            // Register all our commands here
            commands: vec![
                discord::commands::help::comandos(),
                discord::commands::invite::convite(),
                discord::commands::roll::roll(),
                discord::commands::poll::poll(),
                discord::commands::giveaway::giveaway(),
            ],
            // Event handler for messages and other events
            event_handler: |ctx, event, framework, data| {
                Box::pin(event_handler(ctx, event, framework, data))
            },
            ..Default::default()
        })
        .setup(move |ctx, _ready, framework| {
            Box::pin(async move {
                tracing::info!("bot connected, registering commands");

                // The bot serves a single guild, so register there - guild
                // commands show up immediately, unlike global ones.
                poise::builtins::register_in_guild(ctx, &framework.options().commands, guild_id)
                    .await?;

                // The original bot always sat on Do Not Disturb.
                ctx.set_presence(None, serenity::OnlineStatus::DoNotDisturb);

                tracing::info!("commands registered, bot is ready");

                Ok(Data {
                    pruner: Arc::new(WebhookPruner::new()),
                    deleter: Arc::new(SerenityMessageDeleter::new(ctx.http.clone())),
                    prune_channel_id,
                })
            })
        })
        .build();

    // Create the client and start the bot
    let mut client = serenity::ClientBuilder::new(token, intents)
        .framework(framework)
        .await
        .expect("Error creating client");

    // Shut everything down on ctrl-c: the watcher via its token, the
    // gateway via the shard manager.
    let shard_manager = client.shard_manager.clone();
    let signal_cancel = watcher_cancel.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to listen for ctrl-c");
        tracing::info!("shutting down");
        signal_cancel.cancel();
        shard_manager.shutdown_all().await;
    });

    client.start().await.expect("Error running bot");
}

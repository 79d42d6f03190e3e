// This is the entry point of the automod bot.
//
// **Architecture Overview:**
// - `core/` = Rule evaluation and action dispatch (platform-agnostic)
// - `infra/` = Implementations of core traits (config stores)
// - `discord/` = Discord-specific adapters (event handlers, moderation calls)
//
// This file's job is to:
// 1. Load configuration
// 2. Initialize services (dependency injection)
// 3. Set up the Discord framework
// 4. Register the /automod configuration commands
// 5. Feed message events into the automod pipeline

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with half a dozen mod.rs files that all look the same.
#[path = "core/core_layer.rs"]
mod core;
#[path = "discord/discord_layer.rs"]
mod discord;
#[path = "infra/infra_layer.rs"]
mod infra;

use crate::core::automod::{AutoModService, ConfigStore, GuildConfig, RoleId};
use crate::discord::{commands, message_handler};
use crate::discord::{Data, Error, SerenityPlatform};
use crate::infra::automod::{InMemoryConfigStore, SqliteConfigStore};
use poise::serenity_prelude as serenity;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

const DEFAULT_DB_PATH: &str = "data/automod.db";
const DEFAULT_SWEEP_SECS: u64 = 60;

/// Event handler for non-command Discord events.
async fn event_handler(
    _ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    match event {
        serenity::FullEvent::Message { new_message } => {
            message_handler::handle_new_message(data, new_message).await?;
        }
        serenity::FullEvent::MessageUpdate { new, event, .. } => {
            message_handler::handle_edited_message(data, new.as_ref(), event).await?;
        }
        serenity::FullEvent::GuildDelete { incomplete, .. } => {
            // `unavailable` means an outage, not that we left
            if !incomplete.unavailable {
                data.automod.forget_guild(incomplete.id.get());
            }
        }
        _ => {}
    }

    Ok(())
}

/// Comma-separated role ids that bypass automod entirely.
fn parse_immune_roles(raw: &str) -> HashSet<RoleId> {
    raw.split(',')
        .filter_map(|part| {
            let part = part.trim();
            if part.is_empty() {
                return None;
            }
            match part.parse::<RoleId>() {
                Ok(id) => Some(id),
                Err(_) => {
                    tracing::warn!(value = part, "Ignoring invalid AUTOMOD_IMMUNE_ROLES entry");
                    None
                }
            }
        })
        .collect()
}

async fn build_config_store() -> anyhow::Result<Arc<dyn ConfigStore>> {
    let backend = std::env::var("AUTOMOD_STORE").unwrap_or_else(|_| "sqlite".to_string());
    match backend.as_str() {
        "memory" => {
            tracing::warn!("Using in-memory config store, settings will not persist");
            Ok(Arc::new(InMemoryConfigStore::new()))
        }
        "sqlite" => {
            let db_path =
                std::env::var("AUTOMOD_DB_PATH").unwrap_or_else(|_| DEFAULT_DB_PATH.to_string());
            tracing::info!(path = %db_path, "Using SQLite config store");
            Ok(Arc::new(SqliteConfigStore::new(&db_path).await?))
        }
        other => anyhow::bail!("Unknown AUTOMOD_STORE `{}` (expected sqlite or memory)", other),
    }
}

#[tokio::main]
async fn main() {
    // Initialize logging so we can see what's happening
    tracing_subscriber::fmt::init();

    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    // Get Discord bot token from environment
    let token = std::env::var("DISCORD_TOKEN").expect(
        "Missing DISCORD_TOKEN environment variable! Create a .env file with your bot token.",
    );

    let sweep_interval = std::env::var("AUTOMOD_SWEEP_SECS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .filter(|secs| *secs > 0)
        .unwrap_or(DEFAULT_SWEEP_SECS);

    let immune_roles = std::env::var("AUTOMOD_IMMUNE_ROLES")
        .map(|raw| parse_immune_roles(&raw))
        .unwrap_or_default();

    // ========================================================================
    // DEPENDENCY INJECTION
    // ========================================================================
    // The config store is built up front; the platform needs the client's
    // HTTP handle and cache, so the service itself is wired in `setup`.

    let store = build_config_store()
        .await
        .expect("Failed to initialize config store");
    let config = GuildConfig::new(store);

    // ========================================================================
    // DISCORD FRAMEWORK SETUP
    // ========================================================================

    let intents = serenity::GatewayIntents::GUILD_MESSAGES
        | serenity::GatewayIntents::MESSAGE_CONTENT // Required to read message content
        | serenity::GatewayIntents::GUILDS
        | serenity::GatewayIntents::GUILD_MEMBERS;

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: vec![commands::automod()],
            // Event handler for messages and other events
            event_handler: |ctx, event, framework, data| {
                Box::pin(event_handler(ctx, event, framework, data))
            },
            ..Default::default()
        })
        .setup(move |ctx, ready, framework| {
            Box::pin(async move {
                tracing::info!(user = %ready.user.name, "Bot is starting up");

                poise::builtins::register_globally(ctx, &framework.options().commands).await?;

                let platform = Arc::new(SerenityPlatform::new(
                    ctx.http.clone(),
                    ctx.cache.clone(),
                    immune_roles,
                ));
                let automod = Arc::new(AutoModService::new(config, platform));

                // Spam windows only need expiring entries dropped; detection
                // itself evicts on every message.
                let sweeper = Arc::clone(&automod);
                tokio::spawn(async move {
                    let mut ticker = tokio::time::interval(Duration::from_secs(sweep_interval));
                    loop {
                        ticker.tick().await;
                        let removed = sweeper.sweep_spam_windows();
                        if removed > 0 {
                            tracing::debug!(removed, "Swept idle spam windows");
                        }
                    }
                });

                // Offense events are for third-party integrations; log them
                // so there is always at least one consumer.
                let mut events = automod.subscribe();
                tokio::spawn(async move {
                    loop {
                        match events.recv().await {
                            Ok(event) => tracing::debug!(
                                event = %event.name,
                                user_id = event.author.id,
                                guild_id = event.message.guild_id,
                                message_id = event.message.id,
                                "Automod offense event"
                            ),
                            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                                tracing::warn!(skipped, "Automod event log fell behind");
                            }
                            Err(broadcast::error::RecvError::Closed) => break,
                        }
                    }
                });

                tracing::info!("Automod is ready");
                Ok(Data { automod })
            })
        })
        .build();

    // Cached messages let edits be evaluated against the full updated message
    let mut cache_settings = serenity::cache::Settings::default();
    cache_settings.max_messages = 10000;

    let mut client = serenity::ClientBuilder::new(token, intents)
        .framework(framework)
        .cache_settings(cache_settings)
        .await
        .expect("Error creating client");

    client.start().await.expect("Error running bot");
}

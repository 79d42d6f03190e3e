// Discord layer - slash commands, gateway event handlers and the
// serenity-backed platform.

use crate::core::automod::AutoModService;
use std::sync::Arc;

#[path = "automod/commands.rs"]
pub mod commands;

#[path = "automod/message_handler.rs"]
pub mod message_handler;

#[path = "automod/serenity_platform.rs"]
pub mod serenity_platform;

pub use serenity_platform::SerenityPlatform;

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;

/// Shared state handed to every event handler.
pub struct Data {
    pub automod: Arc<AutoModService<SerenityPlatform>>,
}

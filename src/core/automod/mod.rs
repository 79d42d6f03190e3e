// Core automod module - rule evaluation and action dispatch.

pub mod action_dispatcher;
pub mod automod_config;
pub mod automod_models;
pub mod automod_service;
pub mod automod_settings;
pub mod operator;
pub mod platform;
pub mod rule;
pub mod rules;

#[cfg(test)]
mod test_support;

pub use automod_config::{ConfigError, ConfigStore, GuildConfig};
pub use automod_models::{
    Announcement, Author, ChannelId, GuildId, GuildRuleConfig, Message, RoleId, RuleKind, UserId,
};
pub use automod_service::{AutoModService, Evaluation};
pub use platform::{ModerationPlatform, OperatorPrompt, PlatformError};
pub use rule::{Rule, RuleError};

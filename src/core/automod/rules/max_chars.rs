// Max chars - flags messages longer than the configured character count.

use super::max_words::{get_max_length, set_max_length};
use crate::core::automod::automod_config::{ConfigError, GuildConfig};
use crate::core::automod::automod_models::{GuildId, Message, RuleKind};
use crate::core::automod::rule::{Rule, RuleError, RuleSettings};
use async_trait::async_trait;
use std::num::NonZeroU32;

pub struct MaxCharsRule {
    settings: RuleSettings,
}

impl MaxCharsRule {
    pub fn new(config: GuildConfig) -> Self {
        Self {
            settings: RuleSettings::new(RuleKind::MaxChars, config),
        }
    }

    pub async fn get_max_chars_length(
        &self,
        guild_id: GuildId,
    ) -> Result<Option<u32>, ConfigError> {
        get_max_length(&self.settings, guild_id).await
    }

    pub async fn set_max_chars_length(
        &self,
        guild_id: GuildId,
        max_length: NonZeroU32,
    ) -> Result<(), ConfigError> {
        set_max_length(&self.settings, guild_id, max_length).await
    }
}

#[async_trait]
impl Rule for MaxCharsRule {
    fn settings(&self) -> &RuleSettings {
        &self.settings
    }

    async fn check(&self, message: &Message) -> Result<Option<String>, RuleError> {
        let Some(max_length) = self.get_max_chars_length(message.guild_id).await? else {
            return Ok(None);
        };

        // Characters, not bytes
        let chars = message.content.chars().count();
        if chars > max_length as usize {
            return Ok(Some(format!("{} characters (max {})", chars, max_length)));
        }
        Ok(None)
    }
}

// Mention spam - flags messages that mention too many individual users/roles.

use crate::core::automod::automod_config::{ConfigError, GuildConfig};
use crate::core::automod::automod_models::{
    GuildId, Message, RuleKind, DEFAULT_MENTION_THRESHOLD,
};
use crate::core::automod::rule::{Rule, RuleError, RuleSettings};
use async_trait::async_trait;
use std::collections::HashSet;

pub struct MentionSpamRule {
    settings: RuleSettings,
}

impl MentionSpamRule {
    pub fn new(config: GuildConfig) -> Self {
        Self {
            settings: RuleSettings::new(RuleKind::MentionSpam, config),
        }
    }

    pub async fn get_threshold(&self, guild_id: GuildId) -> Result<u32, ConfigError> {
        match self
            .settings
            .config()
            .get_typed(guild_id, &[RuleKind::MentionSpam.rule_name(), "threshold"])
            .await
        {
            Err(ConfigError::NotFound(_)) => Ok(DEFAULT_MENTION_THRESHOLD),
            other => other,
        }
    }

    /// Set the max amount of individual mentions allowed.
    /// Returns `(before, after)`.
    pub async fn set_threshold(
        &self,
        guild_id: GuildId,
        threshold: i64,
    ) -> Result<(u32, u32), RuleError> {
        let after = u32::try_from(threshold)
            .ok()
            .filter(|t| *t > 0)
            .ok_or(RuleError::InvalidThreshold(threshold))?;

        let before = self.get_threshold(guild_id).await?;
        self.settings
            .config()
            .set_typed(
                guild_id,
                &[RuleKind::MentionSpam.rule_name(), "threshold"],
                &after,
            )
            .await?;
        Ok((before, after))
    }
}

/// Distinct users plus distinct roles mentioned.
fn count_mentions(message: &Message) -> usize {
    let users: HashSet<_> = message.mentioned_users.iter().collect();
    let roles: HashSet<_> = message.mentioned_roles.iter().collect();
    users.len() + roles.len()
}

#[async_trait]
impl Rule for MentionSpamRule {
    fn settings(&self) -> &RuleSettings {
        &self.settings
    }

    async fn check(&self, message: &Message) -> Result<Option<String>, RuleError> {
        let threshold = self.get_threshold(message.guild_id).await?;
        let mentions = count_mentions(message);
        if mentions > threshold as usize {
            return Ok(Some(format!(
                "{} individual mentions (max {})",
                mentions, threshold
            )));
        }
        Ok(None)
    }
}

// Max words - flags messages with more whitespace-separated words than allowed.

use crate::core::automod::automod_config::{ConfigError, GuildConfig};
use crate::core::automod::automod_models::{GuildId, Message, RuleKind};
use crate::core::automod::rule::{Rule, RuleError, RuleSettings};
use async_trait::async_trait;
use std::num::NonZeroU32;

pub struct MaxWordsRule {
    settings: RuleSettings,
}

impl MaxWordsRule {
    pub fn new(config: GuildConfig) -> Self {
        Self {
            settings: RuleSettings::new(RuleKind::MaxWords, config),
        }
    }

    /// `None` until an operator sets a threshold.
    pub async fn get_max_words_length(
        &self,
        guild_id: GuildId,
    ) -> Result<Option<u32>, ConfigError> {
        get_max_length(&self.settings, guild_id).await
    }

    pub async fn set_max_words_length(
        &self,
        guild_id: GuildId,
        max_length: NonZeroU32,
    ) -> Result<(), ConfigError> {
        set_max_length(&self.settings, guild_id, max_length).await
    }
}

pub(super) async fn get_max_length(
    settings: &RuleSettings,
    guild_id: GuildId,
) -> Result<Option<u32>, ConfigError> {
    match settings
        .config()
        .get_typed::<u32>(guild_id, &[settings.kind().rule_name(), "max_length"])
        .await
    {
        Ok(max_length) => Ok(Some(max_length)),
        Err(ConfigError::NotFound(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

pub(super) async fn set_max_length(
    settings: &RuleSettings,
    guild_id: GuildId,
    max_length: NonZeroU32,
) -> Result<(), ConfigError> {
    settings
        .config()
        .set_typed(
            guild_id,
            &[settings.kind().rule_name(), "max_length"],
            &max_length.get(),
        )
        .await
}

#[async_trait]
impl Rule for MaxWordsRule {
    fn settings(&self) -> &RuleSettings {
        &self.settings
    }

    async fn check(&self, message: &Message) -> Result<Option<String>, RuleError> {
        let Some(max_length) = self.get_max_words_length(message.guild_id).await? else {
            return Ok(None);
        };

        let words = message.content.split_whitespace().count();
        if words > max_length as usize {
            return Ok(Some(format!("{} words (max {})", words, max_length)));
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::automod::test_support::{memory_config, message};

    #[tokio::test]
    async fn test_threshold_is_exclusive() {
        let rule = MaxWordsRule::new(memory_config());
        rule.set_max_words_length(1, NonZeroU32::new(4).unwrap())
            .await
            .unwrap();

        let five = message(1, 10, "The quick brown fox jumps");
        let four = message(1, 10, "The   quick brown\nfox");
        assert!(rule.is_offensive(&five).await.unwrap());
        assert!(!rule.is_offensive(&four).await.unwrap());
    }

    #[tokio::test]
    async fn test_unset_threshold_never_fires() {
        let rule = MaxWordsRule::new(memory_config());
        assert_eq!(rule.get_max_words_length(1).await.unwrap(), None);
        let long = message(1, 10, &"word ".repeat(500));
        assert!(!rule.is_offensive(&long).await.unwrap());
    }

    #[tokio::test]
    async fn test_setting_threshold_overwrites() {
        let rule = MaxWordsRule::new(memory_config());
        rule.set_max_words_length(1, NonZeroU32::new(2).unwrap())
            .await
            .unwrap();
        rule.set_max_words_length(1, NonZeroU32::new(10).unwrap())
            .await
            .unwrap();
        assert_eq!(rule.get_max_words_length(1).await.unwrap(), Some(10));
    }
}

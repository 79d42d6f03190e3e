// Word filter - flags messages containing any of the guild's filtered words.

use crate::core::automod::automod_config::{ConfigError, GuildConfig};
use crate::core::automod::automod_models::{
    ChannelId, FilteredWord, GuildId, Message, RuleKind, UserId,
};
use crate::core::automod::rule::{Rule, RuleError, RuleSettings};
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};

const FILTERED_WORDS: &str = "filtered_words";
const CHANNEL_GROUPS: &str = "channel_groups";

pub struct WordFilterRule {
    settings: RuleSettings,
}

impl WordFilterRule {
    pub fn new(config: GuildConfig) -> Self {
        Self {
            settings: RuleSettings::new(RuleKind::WordFilter, config),
        }
    }

    fn config(&self) -> &GuildConfig {
        self.settings.config()
    }

    pub async fn get_filtered_words(
        &self,
        guild_id: GuildId,
    ) -> Result<Vec<FilteredWord>, ConfigError> {
        match self
            .config()
            .get_typed(guild_id, &[RuleKind::WordFilter.rule_name(), FILTERED_WORDS])
            .await
        {
            Err(ConfigError::NotFound(_)) => Ok(Vec::new()),
            other => other,
        }
    }

    async fn save_filtered_words(
        &self,
        guild_id: GuildId,
        words: &[FilteredWord],
    ) -> Result<(), ConfigError> {
        self.config()
            .set_typed(
                guild_id,
                &[RuleKind::WordFilter.rule_name(), FILTERED_WORDS],
                &words,
            )
            .await
    }

    /// Add a word, lowercased. Empty `channels` filters it everywhere.
    pub async fn add_to_filter(
        &self,
        guild_id: GuildId,
        word: &str,
        author: UserId,
        channels: &[ChannelId],
        is_cleaned: bool,
    ) -> Result<FilteredWord, RuleError> {
        let word = word.trim().to_lowercase();
        // An empty needle would match every message
        if word.is_empty() || (is_cleaned && clean_content(&word).is_empty()) {
            return Err(RuleError::EmptyWord);
        }
        let mut words = self.get_filtered_words(guild_id).await?;
        if words.iter().any(|existing| existing.word == word) {
            return Err(RuleError::AlreadyFiltered(word));
        }

        let entry = FilteredWord {
            word,
            author,
            is_cleaned,
            channels: channels.iter().copied().collect(),
        };
        words.push(entry.clone());
        self.save_filtered_words(guild_id, &words).await?;

        tracing::info!(
            guild_id,
            word = %entry.word,
            channels = entry.channels.len(),
            "Added word to filter"
        );
        Ok(entry)
    }

    /// Add a word scoped to the channels of a named channel group.
    pub async fn add_to_filter_group(
        &self,
        guild_id: GuildId,
        word: &str,
        author: UserId,
        group_name: &str,
        is_cleaned: bool,
    ) -> Result<FilteredWord, RuleError> {
        let groups = self.get_channel_groups(guild_id).await?;
        let channels: Vec<ChannelId> = groups
            .get(group_name)
            .ok_or_else(|| RuleError::UnknownChannelGroup(group_name.to_string()))?
            .iter()
            .copied()
            .collect();

        self.add_to_filter(guild_id, word, author, &channels, is_cleaned)
            .await
    }

    pub async fn remove_filter(&self, guild_id: GuildId, word: &str) -> Result<(), RuleError> {
        let word = word.trim().to_lowercase();
        let mut words = self.get_filtered_words(guild_id).await?;
        let before = words.len();
        words.retain(|existing| existing.word != word);
        if words.len() == before {
            return Err(RuleError::NotFiltered(word));
        }

        self.save_filtered_words(guild_id, &words).await?;
        Ok(())
    }

    pub async fn get_channel_groups(
        &self,
        guild_id: GuildId,
    ) -> Result<BTreeMap<String, BTreeSet<ChannelId>>, ConfigError> {
        match self.config().get_typed(guild_id, &[CHANNEL_GROUPS]).await {
            Err(ConfigError::NotFound(_)) => Ok(BTreeMap::new()),
            other => other,
        }
    }

    pub async fn set_channel_group(
        &self,
        guild_id: GuildId,
        group_name: &str,
        channels: &[ChannelId],
    ) -> Result<(), ConfigError> {
        let channels: BTreeSet<ChannelId> = channels.iter().copied().collect();
        self.config()
            .set_typed(guild_id, &[CHANNEL_GROUPS, group_name], &channels)
            .await
    }

    pub async fn delete_channel_group(
        &self,
        guild_id: GuildId,
        group_name: &str,
    ) -> Result<(), RuleError> {
        let mut groups = self.get_channel_groups(guild_id).await?;
        if groups.remove(group_name).is_none() {
            return Err(RuleError::UnknownChannelGroup(group_name.to_string()));
        }
        self.config()
            .set_typed(guild_id, &[CHANNEL_GROUPS], &groups)
            .await?;
        Ok(())
    }
}

/// Drop everything that is not alphanumeric, so `f.ilte.red` and
/// `f i l t e r e d` both read as `filtered`.
fn clean_content(content: &str) -> String {
    content.chars().filter(|c| c.is_alphanumeric()).collect()
}

/// First filtered word that applies to `channel_id` and appears in `content`.
fn find_filtered_word<'a>(
    words: &'a [FilteredWord],
    channel_id: ChannelId,
    content: &str,
) -> Option<&'a FilteredWord> {
    let lowered = content.to_lowercase();
    let mut cleaned: Option<String> = None;

    words
        .iter()
        .filter(|word| word.applies_to(channel_id))
        .find(|word| {
            if word.is_cleaned {
                let cleaned = cleaned.get_or_insert_with(|| clean_content(&lowered));
                let needle = clean_content(&word.word);
                !needle.is_empty() && cleaned.contains(needle.as_str())
            } else {
                lowered.contains(word.word.as_str())
            }
        })
}

#[async_trait]
impl Rule for WordFilterRule {
    fn settings(&self) -> &RuleSettings {
        &self.settings
    }

    async fn check(&self, message: &Message) -> Result<Option<String>, RuleError> {
        let words = self.get_filtered_words(message.guild_id).await?;
        Ok(find_filtered_word(&words, message.channel_id, &message.content)
            .map(|word| format!("Filtered word `{}`", word.word)))
    }
}

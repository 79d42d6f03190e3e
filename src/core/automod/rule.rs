// Rule interface - shared per-rule settings plus the detection predicate.
//
// Every detector owns a `RuleSettings`, which reads and writes the common
// fields (enabled, action, delete, mute role, channel scope, role whitelist)
// under the rule's config key. Detectors only add `is_offensive` and their
// own rule-specific settings.

use super::automod_config::{ConfigError, GuildConfig};
use super::automod_models::{
    ActionKind, ChannelId, GuildId, GuildRuleConfig, Message, RoleId, RuleKind,
};
use async_trait::async_trait;
use serde_json::json;
use std::collections::BTreeSet;
use thiserror::Error;

// ============================================================================
// ERRORS
// ============================================================================

/// Errors surfaced to the operator issuing a rule command.
#[derive(Debug, Error)]
pub enum RuleError {
    #[error("`{0}` is already being filtered.")]
    AlreadyFiltered(String),

    #[error("A filtered word cannot be empty.")]
    EmptyWord,

    #[error("`{0}` is not being filtered.")]
    NotFiltered(String),

    #[error("`{0}` is already an allowed link.")]
    AlreadyAllowed(String),

    #[error("`{0}` is not in the allowed links list.")]
    NotAllowed(String),

    #[error("Role {0} is already whitelisted.")]
    AlreadyWhitelisted(RoleId),

    #[error("Role {0} is not whitelisted.")]
    NotWhitelisted(RoleId),

    #[error("Threshold must be a positive integer, got {0}")]
    InvalidThreshold(i64),

    #[error("`{0}` Could not find group.")]
    UnknownChannelGroup(String),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

// ============================================================================
// SHARED SETTINGS
// ============================================================================

/// Common settings accessors for a single rule kind.
#[derive(Clone)]
pub struct RuleSettings {
    kind: RuleKind,
    config: GuildConfig,
}

impl RuleSettings {
    pub fn new(kind: RuleKind, config: GuildConfig) -> Self {
        Self { kind, config }
    }

    pub fn kind(&self) -> RuleKind {
        self.kind
    }

    pub fn config(&self) -> &GuildConfig {
        &self.config
    }

    fn key(&self) -> &'static str {
        self.kind.rule_name()
    }

    /// Load the whole record, created lazily from defaults.
    pub async fn load(&self, guild_id: GuildId) -> Result<GuildRuleConfig, ConfigError> {
        let value = self.config.get(guild_id, self.key()).await?;
        Ok(serde_json::from_value(value)?)
    }

    pub async fn is_enabled(&self, guild_id: GuildId) -> Result<bool, ConfigError> {
        Ok(self.load(guild_id).await?.enabled)
    }

    /// Returns `(before, after)`.
    pub async fn toggle_enabled(
        &self,
        guild_id: GuildId,
        enabled: bool,
    ) -> Result<(bool, bool), ConfigError> {
        let before = self.is_enabled(guild_id).await?;
        self.config
            .set_raw(guild_id, &[self.key(), "enabled"], json!(enabled))
            .await?;
        Ok((before, enabled))
    }

    /// True when the rule is global or `channel_id` is in its enforced set.
    pub async fn is_enforced_channel(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
    ) -> Result<bool, ConfigError> {
        Ok(is_channel_in_scope(
            &self.load(guild_id).await?,
            channel_id,
        ))
    }

    /// True when any of `roles` is whitelisted for this rule.
    pub async fn role_is_whitelisted(
        &self,
        guild_id: GuildId,
        roles: &[RoleId],
    ) -> Result<bool, ConfigError> {
        Ok(is_role_whitelisted(&self.load(guild_id).await?, roles))
    }

    pub async fn get_action_to_take(&self, guild_id: GuildId) -> Result<ActionKind, ConfigError> {
        Ok(self.load(guild_id).await?.action)
    }

    pub async fn set_action_to_take(
        &self,
        guild_id: GuildId,
        action: ActionKind,
    ) -> Result<(), ConfigError> {
        self.config
            .set_typed(guild_id, &[self.key(), "action_to_take"], &action)
            .await
    }

    pub async fn get_should_delete(&self, guild_id: GuildId) -> Result<bool, ConfigError> {
        Ok(self.load(guild_id).await?.delete_on_offense)
    }

    /// Flip delete-on-offense. Returns `(before, after)`.
    pub async fn toggle_to_delete_message(
        &self,
        guild_id: GuildId,
    ) -> Result<(bool, bool), ConfigError> {
        let before = self.get_should_delete(guild_id).await?;
        let after = !before;
        self.config
            .set_raw(guild_id, &[self.key(), "delete_message"], json!(after))
            .await?;
        Ok((before, after))
    }

    /// The configured mute role, read through the nested path so an unset
    /// role surfaces as "not configured" rather than a default.
    pub async fn get_mute_role(&self, guild_id: GuildId) -> Result<Option<RoleId>, ConfigError> {
        match self
            .config
            .get_typed::<RoleId>(guild_id, &[self.key(), "role_to_add"])
            .await
        {
            Ok(role) => Ok(Some(role)),
            Err(ConfigError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Returns `(before, after)`.
    pub async fn set_mute_role(
        &self,
        guild_id: GuildId,
        role_id: RoleId,
    ) -> Result<(Option<RoleId>, RoleId), ConfigError> {
        let before = self.get_mute_role(guild_id).await?;
        self.config
            .set_raw(guild_id, &[self.key(), "role_to_add"], json!(role_id))
            .await?;
        Ok((before, role_id))
    }

    /// Replace the enforced channel set. Empty resets the rule to global.
    pub async fn set_enforced_channels(
        &self,
        guild_id: GuildId,
        channels: &[ChannelId],
    ) -> Result<Vec<ChannelId>, ConfigError> {
        let channels: BTreeSet<ChannelId> = channels.iter().copied().collect();
        self.config
            .set_typed(guild_id, &[self.key(), "enforced_channels"], &channels)
            .await?;
        Ok(channels.into_iter().collect())
    }

    pub async fn get_enforced_channels(
        &self,
        guild_id: GuildId,
    ) -> Result<Vec<ChannelId>, ConfigError> {
        Ok(self
            .load(guild_id)
            .await?
            .enforced_channels
            .into_iter()
            .collect())
    }

    pub async fn append_whitelist_role(
        &self,
        guild_id: GuildId,
        role_id: RoleId,
    ) -> Result<(), RuleError> {
        let mut roles = self.load(guild_id).await?.whitelisted_roles;
        if !roles.insert(role_id) {
            return Err(RuleError::AlreadyWhitelisted(role_id));
        }
        self.config
            .set_typed(guild_id, &[self.key(), "whitelist_roles"], &roles)
            .await?;
        Ok(())
    }

    pub async fn remove_whitelist_role(
        &self,
        guild_id: GuildId,
        role_id: RoleId,
    ) -> Result<(), RuleError> {
        let mut roles = self.load(guild_id).await?.whitelisted_roles;
        if !roles.remove(&role_id) {
            return Err(RuleError::NotWhitelisted(role_id));
        }
        self.config
            .set_typed(guild_id, &[self.key(), "whitelist_roles"], &roles)
            .await?;
        Ok(())
    }

    pub async fn get_all_whitelisted_roles(
        &self,
        guild_id: GuildId,
    ) -> Result<Vec<RoleId>, ConfigError> {
        Ok(self
            .load(guild_id)
            .await?
            .whitelisted_roles
            .into_iter()
            .collect())
    }
}

/// Channel scope check on an already loaded record.
pub fn is_channel_in_scope(config: &GuildRuleConfig, channel_id: ChannelId) -> bool {
    config.enforced_channels.is_empty() || config.enforced_channels.contains(&channel_id)
}

/// Role whitelist check on an already loaded record.
pub fn is_role_whitelisted(config: &GuildRuleConfig, roles: &[RoleId]) -> bool {
    roles
        .iter()
        .any(|role| config.whitelisted_roles.contains(role))
}

// ============================================================================
// RULE TRAIT
// ============================================================================

/// A named, independently configurable offense detector.
///
/// `is_offensive` is a pure function of the message and the rule's
/// configuration, except for the spam-family rules which also update their
/// sliding windows on every call.
#[async_trait]
pub trait Rule: Send + Sync {
    fn settings(&self) -> &RuleSettings;

    fn kind(&self) -> RuleKind {
        self.settings().kind()
    }

    /// Returns the reason the message matched, or `None` if it is clean.
    async fn check(&self, message: &Message) -> Result<Option<String>, RuleError>;

    async fn is_offensive(&self, message: &Message) -> Result<bool, RuleError> {
        Ok(self.check(message).await?.is_some())
    }
}

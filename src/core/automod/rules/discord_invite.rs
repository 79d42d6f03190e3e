// Discord invites - flags invite links that are not on the guild's allow list.
//
// Supported link shapes:
//   discord.gg/inviteCode
//   discord.com/invite/inviteCode
//   discordapp.com/invite/inviteCode

use crate::core::automod::automod_config::{ConfigError, GuildConfig};
use crate::core::automod::automod_models::{GuildId, Message, RuleKind};
use crate::core::automod::rule::{Rule, RuleError, RuleSettings};
use async_trait::async_trait;
use regex::Regex;
use std::sync::OnceLock;

const ALLOWED_LINKS: &str = "allowed_links";

fn invite_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"(?i)(?:https?://)?(?:www\.)?(discord\.gg|discord(?:app)?\.com/invite)/([A-Za-z0-9-]+)",
        )
        .expect("invite pattern is valid")
    })
}

/// Canonical `domain/code` form used to compare links.
///
/// The invite code keeps its case, as codes are case-sensitive.
pub fn normalize_link(link: &str) -> String {
    let trimmed = link.trim();
    if let Some(captures) = invite_pattern().captures(trimmed) {
        if let (Some(domain), Some(code)) = (captures.get(1), captures.get(2)) {
            return format!("{}/{}", domain.as_str().to_lowercase(), code.as_str());
        }
    }

    let without_scheme = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"))
        .unwrap_or(trimmed);
    let without_www = without_scheme
        .strip_prefix("www.")
        .unwrap_or(without_scheme);
    without_www.trim_end_matches('/').to_string()
}

/// Every invite found in `content`, normalized.
fn find_invites(content: &str) -> Vec<String> {
    invite_pattern()
        .captures_iter(content)
        .filter_map(|captures| {
            let domain = captures.get(1)?;
            let code = captures.get(2)?;
            Some(format!("{}/{}", domain.as_str().to_lowercase(), code.as_str()))
        })
        .collect()
}

pub struct DiscordInviteRule {
    settings: RuleSettings,
}

impl DiscordInviteRule {
    pub fn new(config: GuildConfig) -> Self {
        Self {
            settings: RuleSettings::new(RuleKind::DiscordInvite, config),
        }
    }

    pub async fn get_allowed_links(&self, guild_id: GuildId) -> Result<Vec<String>, ConfigError> {
        match self
            .settings
            .config()
            .get_typed(guild_id, &[RuleKind::DiscordInvite.rule_name(), ALLOWED_LINKS])
            .await
        {
            Err(ConfigError::NotFound(_)) => Ok(Vec::new()),
            other => other,
        }
    }

    async fn save_allowed_links(
        &self,
        guild_id: GuildId,
        links: &[String],
    ) -> Result<(), ConfigError> {
        self.settings
            .config()
            .set_typed(
                guild_id,
                &[RuleKind::DiscordInvite.rule_name(), ALLOWED_LINKS],
                &links,
            )
            .await
    }

    pub async fn add_allowed_link(&self, guild_id: GuildId, link: &str) -> Result<(), RuleError> {
        let normalized = normalize_link(link);
        let mut links = self.get_allowed_links(guild_id).await?;
        if links.iter().any(|existing| normalize_link(existing) == normalized) {
            return Err(RuleError::AlreadyAllowed(link.to_string()));
        }

        links.push(link.trim().to_string());
        self.save_allowed_links(guild_id, &links).await?;
        Ok(())
    }

    pub async fn delete_allowed_link(
        &self,
        guild_id: GuildId,
        link: &str,
    ) -> Result<(), RuleError> {
        let normalized = normalize_link(link);
        let mut links = self.get_allowed_links(guild_id).await?;
        let before = links.len();
        links.retain(|existing| normalize_link(existing) != normalized);
        if links.len() == before {
            return Err(RuleError::NotAllowed(link.to_string()));
        }

        self.save_allowed_links(guild_id, &links).await?;
        Ok(())
    }
}

#[async_trait]
impl Rule for DiscordInviteRule {
    fn settings(&self) -> &RuleSettings {
        &self.settings
    }

    async fn check(&self, message: &Message) -> Result<Option<String>, RuleError> {
        let invites = find_invites(&message.content);
        if invites.is_empty() {
            return Ok(None);
        }

        let allowed: Vec<String> = self
            .get_allowed_links(message.guild_id)
            .await?
            .iter()
            .map(|link| normalize_link(link))
            .collect();

        Ok(invites
            .into_iter()
            .find(|invite| !allowed.contains(invite))
            .map(|invite| format!("Invite link `{}`", invite)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::automod::test_support::{memory_config, message};

    #[test]
    fn test_normalize_link() {
        assert_eq!(normalize_link("https://www.Discord.gg/abc123/"), "discord.gg/abc123");
        assert_eq!(
            normalize_link("discordapp.com/invite/AbC"),
            "discordapp.com/invite/AbC"
        );
        assert_eq!(normalize_link("http://example.com/"), "example.com");
    }

    #[tokio::test]
    async fn test_invite_detected_unless_allowed() {
        let rule = DiscordInviteRule::new(memory_config());
        let msg = message(1, 10, "come join discord.gg/abc123 now");
        assert!(rule.is_offensive(&msg).await.unwrap());

        rule.add_allowed_link(1, "discord.gg/abc123").await.unwrap();
        assert!(!rule.is_offensive(&msg).await.unwrap());

        rule.delete_allowed_link(1, "discord.gg/abc123").await.unwrap();
        assert!(rule.is_offensive(&msg).await.unwrap());
    }

    #[tokio::test]
    async fn test_every_invite_must_be_allowed() {
        let rule = DiscordInviteRule::new(memory_config());
        rule.add_allowed_link(1, "https://discord.gg/ours").await.unwrap();

        let ours = message(1, 10, "https://discord.gg/ours");
        let mixed = message(1, 10, "discord.gg/ours and discord.com/invite/theirs");
        assert!(!rule.is_offensive(&ours).await.unwrap());
        assert!(rule.is_offensive(&mixed).await.unwrap());
        assert!(!rule
            .is_offensive(&message(1, 10, "no links here"))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_allowed_link_uniqueness() {
        let rule = DiscordInviteRule::new(memory_config());
        rule.add_allowed_link(1, "discord.gg/abc").await.unwrap();

        assert!(matches!(
            rule.add_allowed_link(1, "https://discord.gg/abc").await,
            Err(RuleError::AlreadyAllowed(_))
        ));
        assert!(matches!(
            rule.delete_allowed_link(1, "discord.gg/missing").await,
            Err(RuleError::NotAllowed(_))
        ));
        assert_eq!(rule.get_allowed_links(1).await.unwrap().len(), 1);
    }
}

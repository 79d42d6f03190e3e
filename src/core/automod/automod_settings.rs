// Guild-wide automod settings that are not tied to a single rule.

use super::automod_config::{ConfigError, GuildConfig};
use super::automod_models::{ChannelId, GuildId};
use serde_json::{json, Value};

const SETTINGS: &str = "settings";

pub fn default_settings() -> Value {
    json!({ "announcement_channel": null, "is_announcement_enabled": false })
}

#[derive(Clone)]
pub struct AnnouncementSettings {
    config: GuildConfig,
}

impl AnnouncementSettings {
    pub fn new(config: GuildConfig) -> Self {
        Self { config }
    }

    /// `(is_announcement_enabled, announcement_channel)`
    pub async fn announcements_enabled(
        &self,
        guild_id: GuildId,
    ) -> Result<(bool, Option<ChannelId>), ConfigError> {
        let settings = self.config.get(guild_id, SETTINGS).await?;
        let enabled = settings
            .get("is_announcement_enabled")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let channel = settings
            .get("announcement_channel")
            .and_then(Value::as_u64);
        Ok((enabled, channel))
    }

    pub async fn set_announcement_channel(
        &self,
        guild_id: GuildId,
        channel_id: Option<ChannelId>,
    ) -> Result<(), ConfigError> {
        self.config
            .set_raw(guild_id, &[SETTINGS, "announcement_channel"], json!(channel_id))
            .await
    }

    /// Returns `(before, after)`.
    pub async fn toggle_announcements(
        &self,
        guild_id: GuildId,
        enabled: bool,
    ) -> Result<(bool, bool), ConfigError> {
        let (before, _) = self.announcements_enabled(guild_id).await?;
        self.config
            .set_raw(guild_id, &[SETTINGS, "is_announcement_enabled"], json!(enabled))
            .await?;
        Ok((before, enabled))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::automod::test_support::memory_config;

    #[tokio::test]
    async fn test_announcements_default_off() {
        let settings = AnnouncementSettings::new(memory_config());
        assert_eq!(settings.announcements_enabled(1).await.unwrap(), (false, None));

        settings.set_announcement_channel(1, Some(55)).await.unwrap();
        assert_eq!(settings.toggle_announcements(1, true).await.unwrap(), (false, true));
        assert_eq!(
            settings.announcements_enabled(1).await.unwrap(),
            (true, Some(55))
        );

        settings.set_announcement_channel(1, None).await.unwrap();
        assert_eq!(settings.announcements_enabled(1).await.unwrap(), (true, None));
    }
}

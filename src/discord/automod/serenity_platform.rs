// ModerationPlatform over serenity's HTTP client.

use crate::core::automod::{
    Announcement, Author, ChannelId, GuildId, Message, ModerationPlatform, PlatformError, RoleId,
    UserId,
};
use async_trait::async_trait;
use poise::serenity_prelude as serenity;
use std::collections::HashSet;
use std::sync::Arc;

// Discord JSON error codes
const MISSING_PERMISSIONS: isize = 50013;
const UNKNOWN_MESSAGE: isize = 10008;
const UNKNOWN_MEMBER: isize = 10007;

/// Embed field values are capped at 1024 characters.
const FIELD_LIMIT: usize = 1024;

pub struct SerenityPlatform {
    http: Arc<serenity::Http>,
    cache: Arc<serenity::Cache>,
    immune_roles: HashSet<RoleId>,
}

impl SerenityPlatform {
    pub fn new(
        http: Arc<serenity::Http>,
        cache: Arc<serenity::Cache>,
        immune_roles: HashSet<RoleId>,
    ) -> Self {
        Self {
            http,
            cache,
            immune_roles,
        }
    }
}

fn map_error(source: serenity::Error) -> PlatformError {
    match &source {
        serenity::Error::Http(serenity::HttpError::UnsuccessfulRequest(response)) => {
            let status = response.status_code.as_u16();
            let code = response.error.code;
            if status == 403 || code == MISSING_PERMISSIONS {
                PlatformError::PermissionDenied
            } else if status == 404 || code == UNKNOWN_MESSAGE || code == UNKNOWN_MEMBER {
                PlatformError::NotFound
            } else {
                PlatformError::Transient(source.to_string())
            }
        }
        _ => PlatformError::Transient(source.to_string()),
    }
}

fn truncate(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let mut truncated: String = text.chars().take(limit.saturating_sub(3)).collect();
    truncated.push_str("...");
    truncated
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "Yes"
    } else {
        "No"
    }
}

fn announcement_embed(announcement: &Announcement) -> serenity::CreateEmbed {
    let colour = if announcement.action_succeeded {
        serenity::Colour::ORANGE
    } else {
        serenity::Colour::RED
    };

    let content = if announcement.content.is_empty() {
        "*No text content*".to_string()
    } else {
        truncate(&announcement.content, FIELD_LIMIT)
    };

    let embed = serenity::CreateEmbed::new()
        .title(format!("AutoMod: {}", announcement.rule.friendly_name()))
        .colour(colour)
        .field(
            "User",
            format!("<@{}> ({})", announcement.user_id, announcement.user_name),
            true,
        )
        .field("Channel", format!("<#{}>", announcement.channel_id), true)
        .field("Action", announcement.action.description(), true)
        .field("Message deleted", yes_no(announcement.message_deleted), true)
        .field("Action succeeded", yes_no(announcement.action_succeeded), true)
        .field("Reason", truncate(&announcement.reason, FIELD_LIMIT), false)
        .field("Content", content, false);

    match serenity::Timestamp::from_unix_timestamp(announcement.detected_at.timestamp()) {
        Ok(timestamp) => embed.timestamp(timestamp),
        Err(_) => embed,
    }
}

#[async_trait]
impl ModerationPlatform for SerenityPlatform {
    async fn is_automod_immune(&self, guild_id: GuildId, author: &Author) -> bool {
        if author.roles.iter().any(|role| self.immune_roles.contains(role)) {
            return true;
        }

        self.cache
            .guild(serenity::GuildId::new(guild_id))
            .map(|guild| guild.owner_id.get() == author.id)
            .unwrap_or(false)
    }

    async fn delete_message(&self, message: &Message) -> Result<(), PlatformError> {
        serenity::ChannelId::new(message.channel_id)
            .delete_message(&self.http, serenity::MessageId::new(message.id))
            .await
            .map_err(map_error)
    }

    async fn kick_member(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        reason: &str,
    ) -> Result<(), PlatformError> {
        serenity::GuildId::new(guild_id)
            .kick_with_reason(&self.http, serenity::UserId::new(user_id), reason)
            .await
            .map_err(map_error)
    }

    async fn ban_member(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        delete_message_days: u8,
        reason: &str,
    ) -> Result<(), PlatformError> {
        serenity::GuildId::new(guild_id)
            .ban_with_reason(
                &self.http,
                serenity::UserId::new(user_id),
                delete_message_days,
                reason,
            )
            .await
            .map_err(map_error)
    }

    async fn add_role(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        role_id: RoleId,
        reason: &str,
    ) -> Result<(), PlatformError> {
        self.http
            .add_member_role(
                serenity::GuildId::new(guild_id),
                serenity::UserId::new(user_id),
                serenity::RoleId::new(role_id),
                Some(reason),
            )
            .await
            .map_err(map_error)
    }

    async fn send_to_channel(
        &self,
        channel_id: ChannelId,
        announcement: &Announcement,
    ) -> Result<(), PlatformError> {
        serenity::ChannelId::new(channel_id)
            .send_message(
                &self.http,
                serenity::CreateMessage::new().embed(announcement_embed(announcement)),
            )
            .await
            .map(|_| ())
            .map_err(map_error)
    }
}

// Ports the automod core depends on but does not implement: the chat
// platform's moderation primitives and the operator prompt used by
// interactive rule commands.

use super::automod_models::{Announcement, Author, ChannelId, GuildId, Message, RoleId, UserId};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlatformError {
    /// The platform rejected the action (missing permissions, role hierarchy).
    #[error("Missing permissions")]
    PermissionDenied,

    /// The target no longer exists (message already deleted, member left).
    #[error("Not found")]
    NotFound,

    /// Network or HTTP failure.
    #[error("Platform error: {0}")]
    Transient(String),
}

/// Moderation actions the dispatcher can request from the platform.
#[async_trait]
pub trait ModerationPlatform: Send + Sync {
    /// Host-level immunity (owners, admins, configured immune roles).
    async fn is_automod_immune(&self, _guild_id: GuildId, _author: &Author) -> bool {
        false
    }

    async fn delete_message(&self, message: &Message) -> Result<(), PlatformError>;

    async fn kick_member(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        reason: &str,
    ) -> Result<(), PlatformError>;

    /// Ban and purge the member's messages from the last `delete_message_days`.
    async fn ban_member(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        delete_message_days: u8,
        reason: &str,
    ) -> Result<(), PlatformError>;

    async fn add_role(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        role_id: RoleId,
        reason: &str,
    ) -> Result<(), PlatformError>;

    async fn send_to_channel(
        &self,
        channel_id: ChannelId,
        announcement: &Announcement,
    ) -> Result<(), PlatformError>;
}

/// Interactive confirmation primitives, however the host renders them.
#[async_trait]
pub trait OperatorPrompt: Send + Sync {
    async fn confirm(&self, prompt: &str) -> bool;

    /// Index of the chosen option, or `None` if the operator gave up.
    async fn choose_option(&self, prompt: &str, options: &[String]) -> Option<usize>;
}

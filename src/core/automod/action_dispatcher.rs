// Action dispatcher - turns a detected offense into moderation actions.
//
// Detected -> Deleting -> Punishing -> Announcing -> Done
//
// Each stage is optional and never rolls back. A failing stage is logged
// and the next stage still runs.

use super::automod_models::{
    ActionKind, Announcement, GuildRuleConfig, Offense, OffenseEvent,
};
use super::automod_settings::AnnouncementSettings;
use super::platform::{ModerationPlatform, PlatformError};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Days of message history purged when banning.
pub const BAN_DELETE_MESSAGE_DAYS: u8 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// Delete-on-offense is off for this rule.
    Skipped,
    Deleted,
    /// The message was already gone; counts as deleted.
    AlreadyGone,
    Failed,
}

impl DeleteOutcome {
    pub fn was_deleted(self) -> bool {
        matches!(self, DeleteOutcome::Deleted | DeleteOutcome::AlreadyGone)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PunishOutcome {
    /// `None` / `Message` actions: only the event fires.
    EventOnly,
    Applied,
    /// The offender already had the mute role.
    AlreadyApplied,
    /// `AddRole` without a configured mute role.
    RoleNotConfigured,
    Failed,
}

impl PunishOutcome {
    pub fn succeeded(self) -> bool {
        matches!(
            self,
            PunishOutcome::EventOnly | PunishOutcome::Applied | PunishOutcome::AlreadyApplied
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnounceOutcome {
    Disabled,
    NoChannel,
    Sent,
    Failed,
}

/// What happened while handling one offense.
#[derive(Debug, Clone)]
pub struct DispatchReport {
    pub offense: Offense,
    pub action: ActionKind,
    pub delete: DeleteOutcome,
    pub punish: PunishOutcome,
    pub announce: AnnounceOutcome,
}

pub struct ActionDispatcher<P: ModerationPlatform> {
    platform: Arc<P>,
    announcements: AnnouncementSettings,
    events: broadcast::Sender<OffenseEvent>,
}

impl<P: ModerationPlatform> ActionDispatcher<P> {
    pub fn new(
        platform: Arc<P>,
        announcements: AnnouncementSettings,
        events: broadcast::Sender<OffenseEvent>,
    ) -> Self {
        Self {
            platform,
            announcements,
            events,
        }
    }

    pub fn platform(&self) -> &Arc<P> {
        &self.platform
    }

    /// Run every stage for `offense` using the rule's already loaded config.
    pub async fn dispatch(&self, offense: Offense, rule_config: &GuildRuleConfig) -> DispatchReport {
        let rule = offense.rule.rule_name();
        let message = &offense.message;
        let action = rule_config.action;

        // Always fire, whatever the configured action
        let event = OffenseEvent {
            name: offense.rule.event_name(),
            rule: offense.rule,
            author: message.author.clone(),
            message: message.clone(),
            detected_at: Utc::now(),
        };
        // No subscribers is fine
        let _ = self.events.send(event);

        info!(
            rule,
            user_id = message.author.id,
            user = %message.author.name,
            guild_id = message.guild_id,
            channel_id = message.channel_id,
            reason = %offense.matched_reason,
            action = %action,
            "Automod offense detected"
        );

        let delete = if rule_config.delete_on_offense {
            self.delete_stage(&offense).await
        } else {
            debug!(
                rule,
                user_id = message.author.id,
                guild_id = message.guild_id,
                channel_id = message.channel_id,
                "Message deletion is off for this rule"
            );
            DeleteOutcome::Skipped
        };

        let punish = self.punish_stage(&offense, rule_config).await;
        let announce = self.announce_stage(&offense, action, delete, punish).await;

        DispatchReport {
            offense,
            action,
            delete,
            punish,
            announce,
        }
    }

    async fn delete_stage(&self, offense: &Offense) -> DeleteOutcome {
        let rule = offense.rule.rule_name();
        let message = &offense.message;

        match self.platform.delete_message(message).await {
            Ok(()) => {
                info!(
                    rule,
                    user_id = message.author.id,
                    guild_id = message.guild_id,
                    channel_id = message.channel_id,
                    "Deleted offending message"
                );
                DeleteOutcome::Deleted
            }
            Err(PlatformError::NotFound) => {
                warn!(
                    rule,
                    user_id = message.author.id,
                    guild_id = message.guild_id,
                    channel_id = message.channel_id,
                    "Could not delete message as it does not exist"
                );
                DeleteOutcome::AlreadyGone
            }
            Err(err) => {
                warn!(
                    rule,
                    user_id = message.author.id,
                    guild_id = message.guild_id,
                    channel_id = message.channel_id,
                    error = %err,
                    "Failed to delete offending message"
                );
                DeleteOutcome::Failed
            }
        }
    }

    async fn punish_stage(&self, offense: &Offense, rule_config: &GuildRuleConfig) -> PunishOutcome {
        let rule = offense.rule.rule_name();
        let message = &offense.message;
        let guild_id = message.guild_id;
        let user_id = message.author.id;
        let reason = format!("[AutoMod] {}", rule);

        let result = match rule_config.action {
            ActionKind::None | ActionKind::Message => {
                debug!(
                    rule,
                    user_id,
                    guild_id,
                    channel_id = message.channel_id,
                    action = %rule_config.action,
                    "Automod action only fires the offense event"
                );
                return PunishOutcome::EventOnly;
            }
            ActionKind::Kick => self.platform.kick_member(guild_id, user_id, &reason).await,
            ActionKind::Ban => {
                self.platform
                    .ban_member(guild_id, user_id, BAN_DELETE_MESSAGE_DAYS, &reason)
                    .await
            }
            ActionKind::AddRole => {
                let Some(role_id) = rule_config.mute_role else {
                    warn!(
                        rule,
                        user_id,
                        guild_id,
                        channel_id = message.channel_id,
                        "No role set to add to offending user"
                    );
                    return PunishOutcome::RoleNotConfigured;
                };
                if message.author.roles.contains(&role_id) {
                    debug!(
                        rule,
                        user_id,
                        guild_id,
                        channel_id = message.channel_id,
                        role_id,
                        "Offending user already has the mute role"
                    );
                    return PunishOutcome::AlreadyApplied;
                }
                self.platform
                    .add_role(guild_id, user_id, role_id, &reason)
                    .await
            }
        };

        match result {
            Ok(()) => {
                info!(
                    rule,
                    user_id,
                    guild_id,
                    channel_id = message.channel_id,
                    action = %rule_config.action,
                    "Applied automod action"
                );
                PunishOutcome::Applied
            }
            Err(err) => {
                warn!(
                    rule,
                    user_id,
                    guild_id,
                    channel_id = message.channel_id,
                    action = %rule_config.action,
                    error = %err,
                    "Failed to apply automod action"
                );
                PunishOutcome::Failed
            }
        }
    }

    async fn announce_stage(
        &self,
        offense: &Offense,
        action: ActionKind,
        delete: DeleteOutcome,
        punish: PunishOutcome,
    ) -> AnnounceOutcome {
        let rule = offense.rule.rule_name();
        let message = &offense.message;

        let (enabled, channel) = match self
            .announcements
            .announcements_enabled(message.guild_id)
            .await
        {
            Ok(settings) => settings,
            Err(err) => {
                warn!(
                    rule,
                    user_id = message.author.id,
                    guild_id = message.guild_id,
                    channel_id = message.channel_id,
                    error = %err,
                    "Failed to read announcement settings"
                );
                return AnnounceOutcome::Failed;
            }
        };

        if !enabled {
            debug!(rule, guild_id = message.guild_id, "Automod announcements are disabled");
            return AnnounceOutcome::Disabled;
        }
        let Some(channel_id) = channel else {
            debug!(
                rule,
                guild_id = message.guild_id,
                "Announcements are enabled but no announcement channel is set"
            );
            return AnnounceOutcome::NoChannel;
        };

        let announcement = Announcement {
            rule: offense.rule,
            guild_id: message.guild_id,
            channel_id: message.channel_id,
            user_id: message.author.id,
            user_name: message.author.name.clone(),
            content: message.content.clone(),
            reason: offense.matched_reason.clone(),
            message_deleted: delete.was_deleted(),
            action_succeeded: punish.succeeded(),
            action,
            detected_at: Utc::now(),
        };

        match self.platform.send_to_channel(channel_id, &announcement).await {
            Ok(()) => {
                info!(
                    rule,
                    user_id = message.author.id,
                    guild_id = message.guild_id,
                    channel_id,
                    "Sent automod announcement"
                );
                AnnounceOutcome::Sent
            }
            Err(err) => {
                warn!(
                    rule,
                    user_id = message.author.id,
                    guild_id = message.guild_id,
                    channel_id,
                    error = %err,
                    "Failed to send automod announcement"
                );
                AnnounceOutcome::Failed
            }
        }
    }
}

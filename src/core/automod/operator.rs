// Interactive rule commands that need an operator's confirmation.

use super::automod_config::ConfigError;
use super::automod_models::{ActionKind, ChannelId, GuildId, RoleId};
use super::platform::OperatorPrompt;
use super::rule::{RuleError, RuleSettings};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionChoice {
    pub action: ActionKind,
    /// `AddRole` was chosen but the rule has no mute role yet.
    pub needs_mute_role: bool,
}

/// Offer every action and store the one picked. `None` if nothing was chosen.
pub async fn choose_action(
    settings: &RuleSettings,
    guild_id: GuildId,
    prompt: &dyn OperatorPrompt,
) -> Result<Option<ActionChoice>, ConfigError> {
    let options: Vec<String> = ActionKind::ALL
        .iter()
        .map(|action| action.description().to_string())
        .collect();

    let question = format!(
        "Choose the action to take for {}",
        settings.kind().friendly_name()
    );
    let Some(index) = prompt.choose_option(&question, &options).await else {
        return Ok(None);
    };
    let Some(action) = ActionKind::ALL.get(index).copied() else {
        return Ok(None);
    };

    settings.set_action_to_take(guild_id, action).await?;

    let needs_mute_role =
        action == ActionKind::AddRole && settings.get_mute_role(guild_id).await?.is_none();
    Ok(Some(ActionChoice {
        action,
        needs_mute_role,
    }))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WhitelistOutcome {
    Added,
    Removed,
    Unchanged,
}

/// Whitelist `role_id`, or offer to remove it if it already is.
pub async fn whitelist_role(
    settings: &RuleSettings,
    guild_id: GuildId,
    role_id: RoleId,
    prompt: &dyn OperatorPrompt,
) -> Result<WhitelistOutcome, RuleError> {
    match settings.append_whitelist_role(guild_id, role_id).await {
        Ok(()) => Ok(WhitelistOutcome::Added),
        Err(RuleError::AlreadyWhitelisted(_)) => {
            let question = format!(
                "Role {} is already whitelisted for {}. Remove it from the whitelist?",
                role_id,
                settings.kind().friendly_name()
            );
            if prompt.confirm(&question).await {
                settings.remove_whitelist_role(guild_id, role_id).await?;
                Ok(WhitelistOutcome::Removed)
            } else {
                Ok(WhitelistOutcome::Unchanged)
            }
        }
        Err(e) => Err(e),
    }
}

/// Replace the enforced channels. An empty list asks before clearing them,
/// since that makes the rule apply everywhere. `None` if cancelled.
pub async fn set_enforced_channels(
    settings: &RuleSettings,
    guild_id: GuildId,
    channels: &[ChannelId],
    prompt: &dyn OperatorPrompt,
) -> Result<Option<Vec<ChannelId>>, ConfigError> {
    if channels.is_empty() {
        let question = format!(
            "Clear the enforced channels for {}? It will then apply in every channel.",
            settings.kind().friendly_name()
        );
        if !prompt.confirm(&question).await {
            return Ok(None);
        }
    }

    Ok(Some(settings.set_enforced_channels(guild_id, channels).await?))
}

// Automod slash commands for configuration.
//
// Each command extracts ids, calls the core settings, and formats a reply.
// Interactive flows (choose an action, whitelist-or-remove, clear channels)
// run through `ButtonPrompt`.

use crate::core::automod::operator::{self, WhitelistOutcome};
use crate::core::automod::{
    ChannelId, GuildRuleConfig, OperatorPrompt, RoleId, Rule, RuleError, RuleKind,
};
use crate::discord::{Context, Error};
use async_trait::async_trait;
use poise::serenity_prelude as serenity;
use std::num::NonZeroU32;
use std::time::Duration;

const PROMPT_TIMEOUT: Duration = Duration::from_secs(60);
const BUTTONS_PER_ROW: usize = 5;
const BUTTON_LABEL_MAX: usize = 80;

#[derive(Debug, Clone, Copy, poise::ChoiceParameter)]
pub enum RuleChoice {
    #[name = "Wall spam"]
    WallSpam,
    #[name = "Mention spam"]
    MentionSpam,
    #[name = "Discord invites"]
    DiscordInvite,
    #[name = "General spam"]
    Spam,
    #[name = "Maximum words"]
    MaxWords,
    #[name = "Maximum characters"]
    MaxChars,
    #[name = "Word filter"]
    WordFilter,
}

impl From<RuleChoice> for RuleKind {
    fn from(value: RuleChoice) -> Self {
        match value {
            RuleChoice::WallSpam => RuleKind::WallSpam,
            RuleChoice::MentionSpam => RuleKind::MentionSpam,
            RuleChoice::DiscordInvite => RuleKind::DiscordInvite,
            RuleChoice::Spam => RuleKind::Spam,
            RuleChoice::MaxWords => RuleKind::MaxWords,
            RuleChoice::MaxChars => RuleKind::MaxChars,
            RuleChoice::WordFilter => RuleKind::WordFilter,
        }
    }
}

// ============================================================================
// OPERATOR PROMPT
// ============================================================================

/// Asks the invoking user with buttons under the command reply.
pub struct ButtonPrompt<'a> {
    ctx: Context<'a>,
}

impl<'a> ButtonPrompt<'a> {
    pub fn new(ctx: Context<'a>) -> Self {
        Self { ctx }
    }

    async fn ask(&self, prompt: &str, options: &[String]) -> Option<usize> {
        match self.try_ask(prompt, options).await {
            Ok(choice) => choice,
            Err(e) => {
                tracing::warn!(error = %e, "Automod operator prompt failed");
                None
            }
        }
    }

    async fn try_ask(
        &self,
        prompt: &str,
        options: &[String],
    ) -> Result<Option<usize>, serenity::Error> {
        let ctx_id = self.ctx.id();
        let rows: Vec<serenity::CreateActionRow> = options
            .chunks(BUTTONS_PER_ROW)
            .enumerate()
            .map(|(row, chunk)| {
                serenity::CreateActionRow::Buttons(
                    chunk
                        .iter()
                        .enumerate()
                        .map(|(i, label)| {
                            serenity::CreateButton::new(option_id(ctx_id, row * BUTTONS_PER_ROW + i))
                                .label(button_label(label))
                                .style(serenity::ButtonStyle::Secondary)
                        })
                        .collect(),
                )
            })
            .collect();

        let reply = self
            .ctx
            .send(
                poise::CreateReply::default()
                    .content(prompt)
                    .components(rows),
            )
            .await?;

        let message = reply.message().await?.into_owned();
        let interaction = message
            .await_component_interaction(self.ctx)
            .author_id(self.ctx.author().id)
            .timeout(PROMPT_TIMEOUT)
            .await;

        let Some(interaction) = interaction else {
            reply
                .edit(
                    self.ctx,
                    poise::CreateReply::default()
                        .content("⌛ Timed out, nothing was changed.")
                        .components(vec![]),
                )
                .await?;
            return Ok(None);
        };

        let choice = parse_option_id(ctx_id, &interaction.data.custom_id)
            .filter(|index| *index < options.len());
        let picked = choice
            .map(|index| format!("{}\n> {}", prompt, options[index]))
            .unwrap_or_else(|| prompt.to_string());

        interaction
            .create_response(
                self.ctx.http(),
                serenity::CreateInteractionResponse::UpdateMessage(
                    serenity::CreateInteractionResponseMessage::new()
                        .content(picked)
                        .components(vec![]),
                ),
            )
            .await?;

        Ok(choice)
    }
}

#[async_trait]
impl<'a> OperatorPrompt for ButtonPrompt<'a> {
    async fn confirm(&self, prompt: &str) -> bool {
        let options = ["Confirm".to_string(), "Cancel".to_string()];
        self.ask(prompt, &options).await == Some(0)
    }

    async fn choose_option(&self, prompt: &str, options: &[String]) -> Option<usize> {
        self.ask(prompt, options).await
    }
}

fn option_id(ctx_id: u64, index: usize) -> String {
    format!("{}_option_{}", ctx_id, index)
}

/// Index encoded by `option_id`, if the button belongs to this prompt.
fn parse_option_id(ctx_id: u64, custom_id: &str) -> Option<usize> {
    custom_id
        .strip_prefix(&format!("{}_option_", ctx_id))?
        .parse()
        .ok()
}

fn button_label(label: &str) -> String {
    label.chars().take(BUTTON_LABEL_MAX).collect()
}

// ============================================================================
// HELPERS
// ============================================================================

/// Channel ids from mentions (`<#123>`) or bare ids, separated by spaces or commas.
fn parse_channel_ids(raw: &str) -> Vec<ChannelId> {
    raw.split(|c: char| c.is_whitespace() || c == ',')
        .filter_map(|part| {
            let part = part.trim();
            let id = part
                .strip_prefix("<#")
                .and_then(|rest| rest.strip_suffix('>'))
                .unwrap_or(part);
            id.parse().ok()
        })
        .collect()
}

fn role_list(roles: &[RoleId]) -> String {
    if roles.is_empty() {
        return "none".to_string();
    }
    roles
        .iter()
        .map(|id| format!("<@&{}>", id))
        .collect::<Vec<_>>()
        .join(", ")
}

fn format_rule_status(kind: RuleKind, config: &GuildRuleConfig) -> String {
    let channels = if config.enforced_channels.is_empty() {
        "every channel".to_string()
    } else {
        config
            .enforced_channels
            .iter()
            .map(|id| format!("<#{}>", id))
            .collect::<Vec<_>>()
            .join(", ")
    };
    let whitelist = role_list(&config.whitelisted_roles.iter().copied().collect::<Vec<_>>());
    let mute_role = config
        .mute_role
        .map(|id| format!("<@&{}>", id))
        .unwrap_or_else(|| "not set".to_string());

    format!(
        "**{}** is {}\n\
         • Action: {}\n\
         • Delete message: {}\n\
         • Mute role: {}\n\
         • Enforced in: {}\n\
         • Whitelisted roles: {}",
        kind.friendly_name(),
        if config.enabled { "✅ enabled" } else { "❌ disabled" },
        config.action.description(),
        if config.delete_on_offense { "yes" } else { "no" },
        mute_role,
        channels,
        whitelist
    )
}

/// Operator mistakes are replied to; storage failures propagate.
async fn reply_or_fail(ctx: Context<'_>, result: Result<String, RuleError>) -> Result<(), Error> {
    match result {
        Ok(text) => {
            ctx.say(text).await?;
            Ok(())
        }
        Err(RuleError::Config(e)) => Err(e.into()),
        Err(e) => {
            ctx.say(format!("⚠️ {}", e)).await?;
            Ok(())
        }
    }
}

fn guild_id(ctx: Context<'_>) -> Result<u64, Error> {
    Ok(ctx.guild_id().ok_or("Must be used in a server")?.get())
}

// ============================================================================
// COMMANDS
// ============================================================================

/// Automod configuration commands.
#[poise::command(
    slash_command,
    subcommands(
        "status",
        "toggle",
        "action",
        "delete",
        "muterole",
        "whitelist",
        "channels",
        "scope",
        "filter_add",
        "filter_remove",
        "filter_list",
        "group_set",
        "group_delete",
        "invite_allow",
        "invite_remove",
        "mentions",
        "max_words",
        "max_chars",
        "announce_channel",
        "announce"
    ),
    required_permissions = "MANAGE_GUILD",
    guild_only
)]
pub async fn automod(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Show a rule's current settings.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn status(
    ctx: Context<'_>,
    #[description = "Rule to inspect"] rule: RuleChoice,
) -> Result<(), Error> {
    let guild_id = guild_id(ctx)?;
    let kind = RuleKind::from(rule);
    let config = ctx.data().automod.rule(kind).settings().load(guild_id).await?;

    ctx.say(format_rule_status(kind, &config)).await?;
    Ok(())
}

/// Enable or disable a rule.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn toggle(
    ctx: Context<'_>,
    #[description = "Rule to change"] rule: RuleChoice,
    #[description = "Whether the rule should run"] enabled: bool,
) -> Result<(), Error> {
    let guild_id = guild_id(ctx)?;
    let kind = RuleKind::from(rule);
    let (before, after) = ctx
        .data()
        .automod
        .rule(kind)
        .settings()
        .toggle_enabled(guild_id, enabled)
        .await?;

    let text = if before == after {
        format!("**{}** was already {}.", kind.friendly_name(), on_off(after))
    } else {
        format!("**{}** is now {}.", kind.friendly_name(), on_off(after))
    };
    ctx.say(text).await?;
    Ok(())
}

fn on_off(enabled: bool) -> &'static str {
    if enabled {
        "enabled"
    } else {
        "disabled"
    }
}

/// Choose what happens to offenders.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn action(
    ctx: Context<'_>,
    #[description = "Rule to change"] rule: RuleChoice,
) -> Result<(), Error> {
    let guild_id = guild_id(ctx)?;
    let rule = ctx.data().automod.rule(rule.into());
    let prompt = ButtonPrompt::new(ctx);

    let Some(choice) = operator::choose_action(rule.settings(), guild_id, &prompt).await? else {
        let current = rule.settings().get_action_to_take(guild_id).await?;
        ctx.say(format!("Action unchanged: {}.", current.description()))
            .await?;
        return Ok(());
    };

    if choice.needs_mute_role {
        ctx.say("⚠️ No role is set yet. Use `/automod muterole` before this takes effect.")
            .await?;
    }
    Ok(())
}

/// Flip whether offending messages are deleted.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn delete(
    ctx: Context<'_>,
    #[description = "Rule to change"] rule: RuleChoice,
) -> Result<(), Error> {
    let guild_id = guild_id(ctx)?;
    let kind = RuleKind::from(rule);
    let (_, after) = ctx
        .data()
        .automod
        .rule(kind)
        .settings()
        .toggle_to_delete_message(guild_id)
        .await?;

    let text = if after {
        format!("🗑️ **{}** will delete offending messages.", kind.friendly_name())
    } else {
        format!("**{}** will leave offending messages.", kind.friendly_name())
    };
    ctx.say(text).await?;
    Ok(())
}

/// Set the role added to offenders.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn muterole(
    ctx: Context<'_>,
    #[description = "Rule to change"] rule: RuleChoice,
    #[description = "Role to add to offenders"] role: serenity::Role,
) -> Result<(), Error> {
    let guild_id = guild_id(ctx)?;
    let kind = RuleKind::from(rule);
    let (before, after) = ctx
        .data()
        .automod
        .rule(kind)
        .settings()
        .set_mute_role(guild_id, role.id.get())
        .await?;

    let text = match before {
        Some(before) if before != after => format!(
            "**{}** role changed from <@&{}> to <@&{}>.",
            kind.friendly_name(),
            before,
            after
        ),
        _ => format!("**{}** will add <@&{}>.", kind.friendly_name(), after),
    };
    ctx.say(text).await?;
    Ok(())
}

/// Whitelist a role, or remove it if it already is.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn whitelist(
    ctx: Context<'_>,
    #[description = "Rule to change"] rule: RuleChoice,
    #[description = "Role that bypasses the rule"] role: serenity::Role,
) -> Result<(), Error> {
    let guild_id = guild_id(ctx)?;
    let rule = ctx.data().automod.rule(rule.into());
    let prompt = ButtonPrompt::new(ctx);

    let outcome = operator::whitelist_role(rule.settings(), guild_id, role.id.get(), &prompt).await;
    let result = match outcome {
        Ok(outcome) => {
            let roles = rule.settings().get_all_whitelisted_roles(guild_id).await?;
            let text = match outcome {
                WhitelistOutcome::Added => format!("✅ <@&{}> is now whitelisted.", role.id),
                WhitelistOutcome::Removed => format!("<@&{}> is no longer whitelisted.", role.id),
                WhitelistOutcome::Unchanged => "Nothing was changed.".to_string(),
            };
            Ok(format!("{}
Whitelisted roles: {}", text, role_list(&roles)))
        }
        Err(e) => Err(e),
    };
    reply_or_fail(ctx, result).await
}

/// Limit a rule to some channels. Leave empty to enforce everywhere.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn channels(
    ctx: Context<'_>,
    #[description = "Rule to change"] rule: RuleChoice,
    #[description = "Channel mentions or ids"] channels: Option<String>,
) -> Result<(), Error> {
    let guild_id = guild_id(ctx)?;
    let rule = ctx.data().automod.rule(rule.into());
    let channels = channels.as_deref().map(parse_channel_ids).unwrap_or_default();
    let prompt = ButtonPrompt::new(ctx);

    match operator::set_enforced_channels(rule.settings(), guild_id, &channels, &prompt).await? {
        Some(saved) if saved.is_empty() => {
            ctx.say("Enforced in every channel.").await?;
        }
        Some(saved) => {
            let list: Vec<String> = saved.iter().map(|id| format!("<#{}>", id)).collect();
            ctx.say(format!("Enforced in {}.", list.join(", "))).await?;
        }
        None => {
            let current = rule.settings().get_enforced_channels(guild_id).await?;
            let text = if current.is_empty() {
                "Nothing was changed, still enforced in every channel.".to_string()
            } else {
                let list: Vec<String> = current.iter().map(|id| format!("<#{}>", id)).collect();
                format!("Nothing was changed, still enforced in {}.", list.join(", "))
            };
            ctx.say(text).await?;
        }
    }
    Ok(())
}

/// Check whether a rule applies in a channel for a role.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn scope(
    ctx: Context<'_>,
    #[description = "Rule to check"] rule: RuleChoice,
    #[description = "Channel to check"] channel: serenity::GuildChannel,
    #[description = "Role to check"] role: Option<serenity::Role>,
) -> Result<(), Error> {
    let guild_id = guild_id(ctx)?;
    let kind = RuleKind::from(rule);
    let rule = ctx.data().automod.rule(kind);
    let settings = rule.settings();

    let in_scope = settings
        .is_enforced_channel(guild_id, channel.id.get())
        .await?;
    let whitelisted = match &role {
        Some(role) => settings.role_is_whitelisted(guild_id, &[role.id.get()]).await?,
        None => false,
    };

    let text = match (in_scope, whitelisted) {
        (false, _) => format!("**{}** is not enforced in <#{}>.", kind.friendly_name(), channel.id),
        (true, true) => format!(
            "**{}** is enforced in <#{}>, but the role is whitelisted.",
            kind.friendly_name(),
            channel.id
        ),
        (true, false) => format!("**{}** is enforced in <#{}>.", kind.friendly_name(), channel.id),
    };
    ctx.say(text).await?;
    Ok(())
}

/// Add a word to the filter.
#[poise::command(
    slash_command,
    guild_only,
    required_permissions = "MANAGE_GUILD",
    rename = "filter-add"
)]
pub async fn filter_add(
    ctx: Context<'_>,
    #[description = "Word to filter"] word: String,
    #[description = "Ignore punctuation and spacing when matching"] cleaned: Option<bool>,
    #[description = "Only filter in this channel group"] group: Option<String>,
    #[description = "Only filter in these channels"] channels: Option<String>,
) -> Result<(), Error> {
    let guild_id = guild_id(ctx)?;
    let author = ctx.author().id.get();
    let cleaned = cleaned.unwrap_or(false);
    let filter = &ctx.data().automod.rules().word_filter;

    let result = match group {
        Some(group) => {
            filter
                .add_to_filter_group(guild_id, &word, author, &group, cleaned)
                .await
        }
        None => {
            let channels = channels.as_deref().map(parse_channel_ids).unwrap_or_default();
            filter
                .add_to_filter(guild_id, &word, author, &channels, cleaned)
                .await
        }
    };
    reply_or_fail(ctx, result.map(|entry| format!("✅ Now filtering `{}`.", entry.word))).await
}

/// Stop filtering a word.
#[poise::command(
    slash_command,
    guild_only,
    required_permissions = "MANAGE_GUILD",
    rename = "filter-remove"
)]
pub async fn filter_remove(
    ctx: Context<'_>,
    #[description = "Word to stop filtering"] word: String,
) -> Result<(), Error> {
    let guild_id = guild_id(ctx)?;
    let result = ctx
        .data()
        .automod
        .rules()
        .word_filter
        .remove_filter(guild_id, &word)
        .await
        .map(|()| format!("`{}` is no longer filtered.", word.trim().to_lowercase()));
    reply_or_fail(ctx, result).await
}

/// List filtered words.
#[poise::command(
    slash_command,
    guild_only,
    required_permissions = "MANAGE_GUILD",
    rename = "filter-list"
)]
pub async fn filter_list(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = guild_id(ctx)?;
    let words = ctx
        .data()
        .automod
        .rules()
        .word_filter
        .get_filtered_words(guild_id)
        .await?;

    if words.is_empty() {
        ctx.say("No words are filtered.").await?;
        return Ok(());
    }

    let lines: Vec<String> = words
        .iter()
        .map(|entry| {
            let scope = if entry.channels.is_empty() {
                String::new()
            } else {
                format!(" ({} channels)", entry.channels.len())
            };
            let cleaned = if entry.is_cleaned { " [cleaned]" } else { "" };
            format!("• `{}`{}{}", entry.word, cleaned, scope)
        })
        .collect();
    ctx.send(
        poise::CreateReply::default()
            .content(lines.join("\n"))
            .ephemeral(true),
    )
    .await?;
    Ok(())
}

/// Create or replace a named channel group.
#[poise::command(
    slash_command,
    guild_only,
    required_permissions = "MANAGE_GUILD",
    rename = "group-set"
)]
pub async fn group_set(
    ctx: Context<'_>,
    #[description = "Group name"] name: String,
    #[description = "Channel mentions or ids"] channels: String,
) -> Result<(), Error> {
    let guild_id = guild_id(ctx)?;
    let channels = parse_channel_ids(&channels);
    ctx.data()
        .automod
        .rules()
        .word_filter
        .set_channel_group(guild_id, &name, &channels)
        .await?;

    ctx.say(format!("Group `{}` now has {} channels.", name, channels.len()))
        .await?;
    Ok(())
}

/// Delete a channel group.
#[poise::command(
    slash_command,
    guild_only,
    required_permissions = "MANAGE_GUILD",
    rename = "group-delete"
)]
pub async fn group_delete(
    ctx: Context<'_>,
    #[description = "Group name"] name: String,
) -> Result<(), Error> {
    let guild_id = guild_id(ctx)?;
    let result = ctx
        .data()
        .automod
        .rules()
        .word_filter
        .delete_channel_group(guild_id, &name)
        .await
        .map(|()| format!("Group `{}` deleted.", name));
    reply_or_fail(ctx, result).await
}

/// Allow an invite link.
#[poise::command(
    slash_command,
    guild_only,
    required_permissions = "MANAGE_GUILD",
    rename = "invite-allow"
)]
pub async fn invite_allow(
    ctx: Context<'_>,
    #[description = "Invite link to allow"] link: String,
) -> Result<(), Error> {
    let guild_id = guild_id(ctx)?;
    let result = ctx
        .data()
        .automod
        .rules()
        .discord_invite
        .add_allowed_link(guild_id, &link)
        .await
        .map(|()| format!("✅ `{}` is allowed.", link.trim()));
    reply_or_fail(ctx, result).await
}

/// Remove an allowed invite link.
#[poise::command(
    slash_command,
    guild_only,
    required_permissions = "MANAGE_GUILD",
    rename = "invite-remove"
)]
pub async fn invite_remove(
    ctx: Context<'_>,
    #[description = "Invite link to remove"] link: String,
) -> Result<(), Error> {
    let guild_id = guild_id(ctx)?;
    let result = ctx
        .data()
        .automod
        .rules()
        .discord_invite
        .delete_allowed_link(guild_id, &link)
        .await
        .map(|()| format!("`{}` is no longer allowed.", link.trim()));
    reply_or_fail(ctx, result).await
}

/// Set how many distinct mentions a message may carry.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn mentions(
    ctx: Context<'_>,
    #[description = "Maximum mentions (default: 4)"] threshold: i64,
) -> Result<(), Error> {
    let guild_id = guild_id(ctx)?;
    let result = ctx
        .data()
        .automod
        .rules()
        .mention_spam
        .set_threshold(guild_id, threshold)
        .await
        .map(|(before, after)| format!("Mention threshold changed from {} to {}.", before, after));
    reply_or_fail(ctx, result).await
}

/// Set the most words a message may have.
#[poise::command(
    slash_command,
    guild_only,
    required_permissions = "MANAGE_GUILD",
    rename = "max-words"
)]
pub async fn max_words(
    ctx: Context<'_>,
    #[description = "Maximum words"]
    #[min = 1]
    limit: u32,
) -> Result<(), Error> {
    let guild_id = guild_id(ctx)?;
    let limit = NonZeroU32::new(limit).ok_or("The limit must be at least 1")?;
    ctx.data()
        .automod
        .rules()
        .max_words
        .set_max_words_length(guild_id, limit)
        .await?;

    ctx.say(format!("Messages over {} words are now offenses.", limit))
        .await?;
    Ok(())
}

/// Set the most characters a message may have.
#[poise::command(
    slash_command,
    guild_only,
    required_permissions = "MANAGE_GUILD",
    rename = "max-chars"
)]
pub async fn max_chars(
    ctx: Context<'_>,
    #[description = "Maximum characters"]
    #[min = 1]
    limit: u32,
) -> Result<(), Error> {
    let guild_id = guild_id(ctx)?;
    let limit = NonZeroU32::new(limit).ok_or("The limit must be at least 1")?;
    ctx.data()
        .automod
        .rules()
        .max_chars
        .set_max_chars_length(guild_id, limit)
        .await?;

    ctx.say(format!("Messages over {} characters are now offenses.", limit))
        .await?;
    Ok(())
}

/// Set (or clear) the channel offenses are announced in.
#[poise::command(
    slash_command,
    guild_only,
    required_permissions = "MANAGE_GUILD",
    rename = "announce-channel"
)]
pub async fn announce_channel(
    ctx: Context<'_>,
    #[description = "Channel for announcements (leave empty to clear)"]
    channel: Option<serenity::GuildChannel>,
) -> Result<(), Error> {
    let guild_id = guild_id(ctx)?;
    let channel_id = channel.map(|channel| channel.id.get());
    ctx.data()
        .automod
        .announcements()
        .set_announcement_channel(guild_id, channel_id)
        .await?;

    let text = match channel_id {
        Some(id) => format!("📢 Offenses will be announced in <#{}>.", id),
        None => "Announcement channel cleared.".to_string(),
    };
    ctx.say(text).await?;
    Ok(())
}

/// Turn offense announcements on or off.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn announce(
    ctx: Context<'_>,
    #[description = "Whether to announce offenses"] enabled: bool,
) -> Result<(), Error> {
    let guild_id = guild_id(ctx)?;
    let announcements = ctx.data().automod.announcements();
    announcements.toggle_announcements(guild_id, enabled).await?;

    let (_, channel) = announcements.announcements_enabled(guild_id).await?;
    let mut text = format!("Announcements {}.", on_off(enabled));
    if enabled && channel.is_none() {
        text.push_str(" Set a channel with `/automod announce-channel` to see them.");
    }
    ctx.say(text).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_channel_ids_from_mentions_and_ids() {
        assert_eq!(
            parse_channel_ids("<#10>, 20 <#30>,,junk <#x>"),
            vec![10, 20, 30]
        );
        assert!(parse_channel_ids("   ").is_empty());
    }

    #[test]
    fn test_option_ids_are_scoped_to_the_prompt() {
        let id = option_id(77, 3);
        assert_eq!(parse_option_id(77, &id), Some(3));
        assert_eq!(parse_option_id(78, &id), None);
        assert_eq!(parse_option_id(77, "77_confirm"), None);
    }

    #[test]
    fn test_long_labels_are_cut() {
        let label = "x".repeat(200);
        assert_eq!(button_label(&label).chars().count(), BUTTON_LABEL_MAX);
        assert_eq!(button_label("Kick offender"), "Kick offender");
    }

    #[test]
    fn test_rule_choice_covers_every_rule() {
        let choices = [
            RuleChoice::WallSpam,
            RuleChoice::MentionSpam,
            RuleChoice::DiscordInvite,
            RuleChoice::Spam,
            RuleChoice::MaxWords,
            RuleChoice::MaxChars,
            RuleChoice::WordFilter,
        ];
        let kinds: Vec<RuleKind> = choices.into_iter().map(RuleKind::from).collect();
        assert_eq!(kinds, RuleKind::ALL.to_vec());
    }

    #[test]
    fn test_role_list() {
        assert_eq!(role_list(&[]), "none");
        assert_eq!(role_list(&[1, 2]), "<@&1>, <@&2>");
    }

    #[test]
    fn test_status_lists_scope_and_whitelist() {
        let config = GuildRuleConfig {
            enabled: true,
            mute_role: Some(9),
            enforced_channels: BTreeSet::from([10, 11]),
            ..Default::default()
        };
        let text = format_rule_status(RuleKind::WordFilter, &config);
        assert!(text.contains("**word filter** is ✅ enabled"));
        assert!(text.contains("Mute role: <@&9>"));
        assert!(text.contains("Enforced in: <#10>, <#11>"));
        assert!(text.contains("Whitelisted roles: none"));

        let text = format_rule_status(RuleKind::Spam, &GuildRuleConfig::default());
        assert!(text.contains("Enforced in: every channel"));
        assert!(text.contains("Mute role: not set"));
    }
}

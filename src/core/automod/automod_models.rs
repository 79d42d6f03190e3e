// Automod domain models - rule kinds, action kinds, per-guild rule records
// and the message snapshot the detectors inspect.
//
// These are pure domain types with no Discord dependencies.
// The Discord layer converts gateway messages into `Message`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeSet;

pub type GuildId = u64;
pub type ChannelId = u64;
pub type UserId = u64;
pub type RoleId = u64;

/// Every rule the engine knows about.
///
/// The order of `RuleKind::ALL` is the order the intake pipeline visits rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RuleKind {
    WallSpam,
    MentionSpam,
    DiscordInvite,
    Spam,
    MaxWords,
    MaxChars,
    WordFilter,
}

impl RuleKind {
    pub const ALL: [RuleKind; 7] = [
        RuleKind::WallSpam,
        RuleKind::MentionSpam,
        RuleKind::DiscordInvite,
        RuleKind::Spam,
        RuleKind::MaxWords,
        RuleKind::MaxChars,
        RuleKind::WordFilter,
    ];

    /// Config key and event suffix for this rule.
    pub fn rule_name(self) -> &'static str {
        match self {
            RuleKind::WallSpam => "wallspamrule",
            RuleKind::MentionSpam => "mentionspamrule",
            RuleKind::DiscordInvite => "inviterule",
            RuleKind::Spam => "spamrule",
            RuleKind::MaxWords => "maxwordsrule",
            RuleKind::MaxChars => "maxcharsrule",
            RuleKind::WordFilter => "wordfilterrule",
        }
    }

    pub fn friendly_name(self) -> &'static str {
        match self {
            RuleKind::WallSpam => "wall spam",
            RuleKind::MentionSpam => "mention spam",
            RuleKind::DiscordInvite => "discord invites",
            RuleKind::Spam => "general spam",
            RuleKind::MaxWords => "maximum words",
            RuleKind::MaxChars => "maximum characters",
            RuleKind::WordFilter => "word filter",
        }
    }

    #[cfg(test)]
    pub fn from_rule_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.rule_name() == name)
    }

    /// Name of the event emitted whenever this rule detects an offense.
    pub fn event_name(self) -> String {
        format!("automod_{}", self.rule_name())
    }

    /// Defaults registered for this rule's config key at startup.
    pub fn default_options(self) -> Value {
        let mut options = match serde_json::to_value(GuildRuleConfig::default()) {
            Ok(Value::Object(map)) => map,
            _ => serde_json::Map::new(),
        };

        match self {
            RuleKind::MentionSpam => {
                options.insert("threshold".into(), json!(DEFAULT_MENTION_THRESHOLD));
            }
            RuleKind::WordFilter => {
                options.insert("filtered_words".into(), json!([]));
            }
            RuleKind::DiscordInvite => {
                options.insert("allowed_links".into(), json!([]));
            }
            _ => {}
        }

        Value::Object(options)
    }
}

impl std::fmt::Display for RuleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.rule_name())
    }
}

pub const DEFAULT_MENTION_THRESHOLD: u32 = 4;

/// The punitive response configured for a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ActionKind {
    /// Do nothing, but still fire the offense event for third-party integrations.
    #[default]
    #[serde(rename = "third_party")]
    None,
    /// Placeholder for message delivery; only the event fires.
    #[serde(rename = "message")]
    Message,
    /// Add the rule's configured mute role to the offender.
    #[serde(rename = "add_role")]
    AddRole,
    #[serde(rename = "kick")]
    Kick,
    #[serde(rename = "ban")]
    Ban,
}

impl ActionKind {
    /// Options in the order they are offered to an operator.
    pub const ALL: [ActionKind; 5] = [
        ActionKind::None,
        ActionKind::Message,
        ActionKind::AddRole,
        ActionKind::Kick,
        ActionKind::Ban,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ActionKind::None => "third_party",
            ActionKind::Message => "message",
            ActionKind::AddRole => "add_role",
            ActionKind::Kick => "kick",
            ActionKind::Ban => "ban",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            ActionKind::None => "Nothing (still fires event for third-party integration)",
            ActionKind::Message => "DM a role",
            ActionKind::AddRole => "Add a role to offender (Mute role for example)",
            ActionKind::Kick => "Kick offender",
            ActionKind::Ban => "Ban offender",
        }
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

fn default_true() -> bool {
    true
}

/// Per (guild, rule) settings record.
///
/// Stored under the rule's config key. Rule-specific fields (filtered words,
/// thresholds...) live next to these and are ignored when deserializing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuildRuleConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default, rename = "action_to_take")]
    pub action: ActionKind,
    #[serde(default = "default_true", rename = "delete_message")]
    pub delete_on_offense: bool,
    #[serde(
        default,
        rename = "role_to_add",
        skip_serializing_if = "Option::is_none"
    )]
    pub mute_role: Option<RoleId>,
    /// Empty means the rule is enforced globally.
    #[serde(default)]
    pub enforced_channels: BTreeSet<ChannelId>,
    #[serde(default, rename = "whitelist_roles")]
    pub whitelisted_roles: BTreeSet<RoleId>,
}

impl Default for GuildRuleConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            action: ActionKind::None,
            delete_on_offense: true,
            mute_role: None,
            enforced_channels: BTreeSet::new(),
            whitelisted_roles: BTreeSet::new(),
        }
    }
}

/// A word in a guild's filter list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilteredWord {
    /// Always stored lowercased.
    pub word: String,
    pub author: UserId,
    #[serde(default)]
    pub is_cleaned: bool,
    /// Empty means the word is filtered in every channel.
    #[serde(default, rename = "channel")]
    pub channels: BTreeSet<ChannelId>,
}

impl FilteredWord {
    pub fn applies_to(&self, channel_id: ChannelId) -> bool {
        self.channels.is_empty() || self.channels.contains(&channel_id)
    }
}

/// Author of a message, as far as the rules care.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Author {
    pub id: UserId,
    pub name: String,
    pub roles: Vec<RoleId>,
    pub bot: bool,
}

/// Snapshot of a guild message handed to the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: u64,
    pub guild_id: GuildId,
    pub channel_id: ChannelId,
    pub author: Author,
    pub content: String,
    pub mentioned_users: Vec<UserId>,
    pub mentioned_roles: Vec<RoleId>,
}

/// A detected violation of a rule on a specific message.
#[derive(Debug, Clone)]
pub struct Offense {
    pub rule: RuleKind,
    pub message: Message,
    pub matched_reason: String,
}

/// Broadcast to third-party integrations on every detected offense,
/// regardless of the configured action.
#[derive(Debug, Clone)]
pub struct OffenseEvent {
    /// `automod_<rule_name>`
    pub name: String,
    pub rule: RuleKind,
    pub author: Author,
    pub message: Message,
    pub detected_at: DateTime<Utc>,
}

/// Summary posted to a guild's announcement channel after an offense.
#[derive(Debug, Clone, PartialEq)]
pub struct Announcement {
    pub rule: RuleKind,
    pub guild_id: GuildId,
    pub channel_id: ChannelId,
    pub user_id: UserId,
    pub user_name: String,
    pub content: String,
    pub reason: String,
    pub message_deleted: bool,
    pub action_succeeded: bool,
    pub action: ActionKind,
    pub detected_at: DateTime<Utc>,
}

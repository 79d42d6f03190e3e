// AutoMod service - message intake and the per-message rule pipeline.
//
// Platform-agnostic: the Discord adapter converts gateway events into
// `Message` values and hands them here.

use super::action_dispatcher::{ActionDispatcher, DispatchReport};
use super::automod_config::GuildConfig;
use super::automod_models::{GuildId, Message, Offense, OffenseEvent, RuleKind};
use super::automod_settings::{default_settings, AnnouncementSettings};
use super::platform::ModerationPlatform;
use super::rule::{is_channel_in_scope, is_role_whitelisted, Rule};
use super::rules::{
    DiscordInviteRule, MaxCharsRule, MaxWordsRule, MentionSpamRule, SpamRule, WallSpamRule,
    WordFilterRule,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::broadcast;
use tracing::{debug, error, warn};

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Register the defaults for every config key automod reads.
pub fn register_all_defaults(config: &GuildConfig) {
    for kind in RuleKind::ALL {
        config.register_defaults(kind.rule_name(), kind.default_options());
    }
    config.register_defaults("settings", default_settings());
    config.register_defaults("channel_groups", json!({}));
}

// ============================================================================
// RULE REGISTRY
// ============================================================================

/// One instance of every built-in rule.
pub struct Rules {
    pub wall_spam: Arc<WallSpamRule>,
    pub mention_spam: Arc<MentionSpamRule>,
    pub discord_invite: Arc<DiscordInviteRule>,
    pub spam: Arc<SpamRule>,
    pub max_words: Arc<MaxWordsRule>,
    pub max_chars: Arc<MaxCharsRule>,
    pub word_filter: Arc<WordFilterRule>,
}

impl Rules {
    pub fn new(config: &GuildConfig) -> Self {
        Self {
            wall_spam: Arc::new(WallSpamRule::new(config.clone())),
            mention_spam: Arc::new(MentionSpamRule::new(config.clone())),
            discord_invite: Arc::new(DiscordInviteRule::new(config.clone())),
            spam: Arc::new(SpamRule::new(config.clone())),
            max_words: Arc::new(MaxWordsRule::new(config.clone())),
            max_chars: Arc::new(MaxCharsRule::new(config.clone())),
            word_filter: Arc::new(WordFilterRule::new(config.clone())),
        }
    }

    pub fn get(&self, kind: RuleKind) -> Arc<dyn Rule> {
        match kind {
            RuleKind::WallSpam => self.wall_spam.clone(),
            RuleKind::MentionSpam => self.mention_spam.clone(),
            RuleKind::DiscordInvite => self.discord_invite.clone(),
            RuleKind::Spam => self.spam.clone(),
            RuleKind::MaxWords => self.max_words.clone(),
            RuleKind::MaxChars => self.max_chars.clone(),
            RuleKind::WordFilter => self.word_filter.clone(),
        }
    }

    /// Every rule in pipeline order.
    pub fn ordered(&self) -> Vec<Arc<dyn Rule>> {
        RuleKind::ALL.iter().map(|kind| self.get(*kind)).collect()
    }
}

// ============================================================================
// EVALUATION RESULT
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    Bot,
    Immune,
}

#[derive(Debug)]
pub enum Evaluation {
    /// The message was never evaluated.
    Ignored(IgnoreReason),
    /// An enabled rule whitelisted the author or excluded the channel, which
    /// ends evaluation for the whole message. Offenses handled by earlier
    /// rules are kept in `reports`.
    Halted {
        rule: RuleKind,
        reports: Vec<DispatchReport>,
    },
    /// Every enabled rule was checked.
    Evaluated { reports: Vec<DispatchReport> },
}

impl Evaluation {
    pub fn reports(&self) -> &[DispatchReport] {
        match self {
            Evaluation::Ignored(_) => &[],
            Evaluation::Halted { reports, .. } | Evaluation::Evaluated { reports } => reports,
        }
    }
}

// ============================================================================
// CORE SERVICE
// ============================================================================

pub struct AutoModService<P: ModerationPlatform> {
    rules: Rules,
    pipeline: Vec<Arc<dyn Rule>>,
    dispatcher: ActionDispatcher<P>,
    announcements: AnnouncementSettings,
    events: broadcast::Sender<OffenseEvent>,
}

impl<P: ModerationPlatform> AutoModService<P> {
    pub fn new(config: GuildConfig, platform: Arc<P>) -> Self {
        register_all_defaults(&config);

        let rules = Rules::new(&config);
        let pipeline = rules.ordered();
        let announcements = AnnouncementSettings::new(config.clone());
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let dispatcher = ActionDispatcher::new(platform, announcements.clone(), events.clone());

        Self {
            rules,
            pipeline,
            dispatcher,
            announcements,
            events,
        }
    }

    /// Replace the evaluation pipeline. Rules run in the given order.
    #[cfg(test)]
    pub fn with_pipeline(mut self, pipeline: Vec<Arc<dyn Rule>>) -> Self {
        self.pipeline = pipeline;
        self
    }

    pub fn rules(&self) -> &Rules {
        &self.rules
    }

    pub fn rule(&self, kind: RuleKind) -> Arc<dyn Rule> {
        self.rules.get(kind)
    }

    pub fn announcements(&self) -> &AnnouncementSettings {
        &self.announcements
    }

    /// Receive an `automod_<rule>` event for every detected offense.
    pub fn subscribe(&self) -> broadcast::Receiver<OffenseEvent> {
        self.events.subscribe()
    }

    /// Evaluate a newly created message.
    pub async fn handle_message(&self, message: &Message) -> Evaluation {
        if message.author.bot {
            return Evaluation::Ignored(IgnoreReason::Bot);
        }

        if self
            .dispatcher
            .platform()
            .is_automod_immune(message.guild_id, &message.author)
            .await
        {
            return Evaluation::Ignored(IgnoreReason::Immune);
        }

        let mut reports = Vec::new();

        for rule in &self.pipeline {
            let kind = rule.kind();

            let rule_config = match rule.settings().load(message.guild_id).await {
                Ok(config) => config,
                Err(e) => {
                    error!(
                        rule = kind.rule_name(),
                        guild_id = message.guild_id,
                        error = %e,
                        "Failed to load rule config, skipping rule"
                    );
                    continue;
                }
            };

            if !rule_config.enabled {
                continue;
            }

            if is_role_whitelisted(&rule_config, &message.author.roles)
                || !is_channel_in_scope(&rule_config, message.channel_id)
            {
                debug!(
                    rule = kind.rule_name(),
                    user_id = message.author.id,
                    guild_id = message.guild_id,
                    channel_id = message.channel_id,
                    "Author whitelisted or channel not enforced, halting evaluation"
                );
                return Evaluation::Halted {
                    rule: kind,
                    reports,
                };
            }

            match rule.check(message).await {
                Ok(Some(reason)) => {
                    let offense = Offense {
                        rule: kind,
                        message: message.clone(),
                        matched_reason: reason,
                    };
                    reports.push(self.dispatcher.dispatch(offense, &rule_config).await);
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(
                        rule = kind.rule_name(),
                        user_id = message.author.id,
                        guild_id = message.guild_id,
                        channel_id = message.channel_id,
                        error = %e,
                        "Rule check failed"
                    );
                }
            }
        }

        Evaluation::Evaluated { reports }
    }

    /// Evaluate the edited version of a message.
    pub async fn handle_message_edit(&self, after: &Message) -> Evaluation {
        self.handle_message(after).await
    }

    /// Evict expired spam-window entries. Returns windows removed.
    pub fn sweep_spam_windows(&self) -> usize {
        self.rules.spam.sweep(Instant::now())
    }

    /// Drop in-memory state for a guild the bot has left.
    pub fn forget_guild(&self, guild_id: GuildId) {
        self.rules.spam.forget_guild(guild_id);
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::automod::action_dispatcher::{DeleteOutcome, PunishOutcome};
    use crate::core::automod::automod_models::ActionKind;
    use crate::core::automod::rule::{RuleError, RuleSettings};
    use crate::core::automod::test_support::{
        memory_config, message, message_from, MockPlatform, PlatformCall,
    };
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Flags every message and counts how often it was asked.
    struct CountingRule {
        settings: RuleSettings,
        checks: AtomicUsize,
    }

    impl CountingRule {
        fn new(kind: RuleKind, config: &GuildConfig) -> Arc<Self> {
            Arc::new(Self {
                settings: RuleSettings::new(kind, config.clone()),
                checks: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl Rule for CountingRule {
        fn settings(&self) -> &RuleSettings {
            &self.settings
        }

        async fn check(&self, _message: &Message) -> Result<Option<String>, RuleError> {
            self.checks.fetch_add(1, Ordering::SeqCst);
            Ok(Some("always".to_string()))
        }
    }

    fn shared_config(service: &AutoModService<MockPlatform>) -> &GuildConfig {
        service.rules().wall_spam.settings().config()
    }

    fn service() -> (AutoModService<MockPlatform>, Arc<MockPlatform>) {
        let platform = Arc::new(MockPlatform::default());
        (AutoModService::new(memory_config(), platform.clone()), platform)
    }

    #[tokio::test]
    async fn test_disabled_rule_is_never_checked() {
        let (service, platform) = service();
        let rule = CountingRule::new(RuleKind::WallSpam, shared_config(&service));
        let service = service.with_pipeline(vec![rule.clone() as Arc<dyn Rule>]);

        let evaluation = service.handle_message(&message(1, 10, "hi")).await;
        assert!(matches!(evaluation, Evaluation::Evaluated { ref reports } if reports.is_empty()));
        assert_eq!(rule.checks.load(Ordering::SeqCst), 0);
        assert!(platform.calls().is_empty());
    }

    #[tokio::test]
    async fn test_bots_and_immune_authors_are_ignored() {
        let (service, platform) = service();
        let rule = CountingRule::new(RuleKind::WallSpam, shared_config(&service));
        rule.settings.toggle_enabled(1, true).await.unwrap();
        let service = service.with_pipeline(vec![rule.clone() as Arc<dyn Rule>]);

        let mut from_bot = message(1, 10, "beep");
        from_bot.author.bot = true;
        assert!(matches!(
            service.handle_message(&from_bot).await,
            Evaluation::Ignored(IgnoreReason::Bot)
        ));

        platform.immune_users.lock().unwrap().push(7);
        assert!(matches!(
            service.handle_message(&message_from(1, 10, 7, "admin")).await,
            Evaluation::Ignored(IgnoreReason::Immune)
        ));
        assert_eq!(rule.checks.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_whitelisted_role_halts_later_rules() {
        let (service, _platform) = service();
        let first = CountingRule::new(RuleKind::WallSpam, shared_config(&service));
        let second = CountingRule::new(RuleKind::WordFilter, shared_config(&service));
        first.settings.toggle_enabled(1, true).await.unwrap();
        second.settings.toggle_enabled(1, true).await.unwrap();
        first.settings.append_whitelist_role(1, 3).await.unwrap();
        let service = service.with_pipeline(vec![first.clone() as Arc<dyn Rule>, second.clone()]);

        let mut msg = message(1, 10, "anything");
        msg.author.roles = vec![3];
        let evaluation = service.handle_message(&msg).await;

        assert!(matches!(
            evaluation,
            Evaluation::Halted { rule: RuleKind::WallSpam, .. }
        ));
        assert_eq!(first.checks.load(Ordering::SeqCst), 0);
        // The second rule would have fired but never ran
        assert_eq!(second.checks.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_out_of_scope_channel_keeps_earlier_reports() {
        let (service, _platform) = service();
        let first = CountingRule::new(RuleKind::WallSpam, shared_config(&service));
        let second = CountingRule::new(RuleKind::WordFilter, shared_config(&service));
        first.settings.toggle_enabled(1, true).await.unwrap();
        second.settings.toggle_enabled(1, true).await.unwrap();
        second.settings.set_enforced_channels(1, &[99]).await.unwrap();
        let service = service.with_pipeline(vec![first.clone() as Arc<dyn Rule>, second.clone()]);

        let evaluation = service.handle_message(&message(1, 10, "anything")).await;
        match evaluation {
            Evaluation::Halted { rule, reports } => {
                assert_eq!(rule, RuleKind::WordFilter);
                assert_eq!(reports.len(), 1);
                assert_eq!(reports[0].offense.rule, RuleKind::WallSpam);
            }
            other => panic!("expected halt, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_word_filter_end_to_end() {
        let (service, platform) = service();
        let mut events = service.subscribe();
        let word_filter = &service.rules().word_filter;
        word_filter.settings().toggle_enabled(1, true).await.unwrap();
        word_filter
            .settings()
            .set_action_to_take(1, ActionKind::Kick)
            .await
            .unwrap();
        word_filter
            .add_to_filter(1, "heck", 2, &[], false)
            .await
            .unwrap();

        let evaluation = service
            .handle_message(&message(1, 10, "what the HECK"))
            .await;
        let reports = evaluation.reports();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].delete, DeleteOutcome::Deleted);
        assert_eq!(reports[0].punish, PunishOutcome::Applied);
        assert_eq!(
            platform.calls(),
            vec![PlatformCall::Delete(1), PlatformCall::Kick(500)]
        );
        assert_eq!(events.try_recv().unwrap().rule, RuleKind::WordFilter);

        // Edits are evaluated the same way
        let clean = service
            .handle_message_edit(&message(1, 10, "what the heck"))
            .await;
        assert_eq!(clean.reports().len(), 1);
    }

    #[tokio::test]
    async fn test_one_message_can_trip_several_rules() {
        let (service, _platform) = service();
        service
            .rules()
            .wall_spam
            .settings()
            .toggle_enabled(1, true)
            .await
            .unwrap();
        service
            .rules()
            .max_chars
            .settings()
            .toggle_enabled(1, true)
            .await
            .unwrap();
        service
            .rules()
            .max_chars
            .set_max_chars_length(1, std::num::NonZeroU32::new(20).unwrap())
            .await
            .unwrap();

        let wall = "a".repeat(40);
        let reports = service.handle_message(&message(1, 10, &wall)).await;
        let rules: Vec<RuleKind> = reports.reports().iter().map(|r| r.offense.rule).collect();
        assert_eq!(rules, vec![RuleKind::WallSpam, RuleKind::MaxChars]);
    }

    #[tokio::test]
    async fn test_sweep_and_forget_guild() {
        let (service, _platform) = service();
        service
            .rules()
            .spam
            .settings()
            .toggle_enabled(1, true)
            .await
            .unwrap();
        service.handle_message(&message(1, 10, "hello")).await;
        assert_eq!(service.rules().spam.tracked_windows(), 2);

        service.forget_guild(1);
        assert_eq!(service.rules().spam.tracked_windows(), 0);
        assert_eq!(service.sweep_spam_windows(), 0);
    }
}

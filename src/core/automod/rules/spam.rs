// General spam - mass spamming by a single user or of a single message.
//
// 1) A user sending 10 or more messages within 12 seconds.
// 2) The same content being sent 15 or more times within 17 seconds,
//    by anyone in the guild.

use super::spam_window::WindowMap;
use crate::core::automod::automod_config::GuildConfig;
use crate::core::automod::automod_models::{GuildId, Message, RuleKind, UserId};
use crate::core::automod::rule::{Rule, RuleError, RuleSettings};
use async_trait::async_trait;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::{Duration, Instant};

pub const USER_BURST_LIMIT: usize = 10;
pub const USER_BURST_WINDOW: Duration = Duration::from_secs(12);
pub const CONTENT_REPEAT_LIMIT: usize = 15;
pub const CONTENT_REPEAT_WINDOW: Duration = Duration::from_secs(17);

pub struct SpamRule {
    settings: RuleSettings,
    /// (guild_id, user_id) -> recent messages
    by_user: WindowMap<(GuildId, UserId)>,
    /// (guild_id, content hash) -> recent messages
    by_content: WindowMap<(GuildId, u64)>,
}

impl SpamRule {
    pub fn new(config: GuildConfig) -> Self {
        Self {
            settings: RuleSettings::new(RuleKind::Spam, config),
            by_user: WindowMap::new(USER_BURST_WINDOW),
            by_content: WindowMap::new(CONTENT_REPEAT_WINDOW),
        }
    }

    /// Hash message content for repeat detection. The content must match exactly.
    fn hash_content(content: &str) -> u64 {
        let mut hasher = DefaultHasher::new();
        content.hash(&mut hasher);
        hasher.finish()
    }

    /// Record `message` at `now` and report which condition, if any, it tripped.
    ///
    /// Both windows are updated even when the first already fires, so the
    /// counters stay accurate.
    pub fn record_at(&self, message: &Message, now: Instant) -> Option<String> {
        let user_hits = self
            .by_user
            .record((message.guild_id, message.author.id), now);

        let content_hits = if message.content.is_empty() {
            0
        } else {
            self.by_content.record(
                (message.guild_id, Self::hash_content(&message.content)),
                now,
            )
        };

        if user_hits >= USER_BURST_LIMIT {
            return Some(format!(
                "{} messages in {} seconds",
                user_hits,
                USER_BURST_WINDOW.as_secs()
            ));
        }
        if content_hits >= CONTENT_REPEAT_LIMIT {
            return Some(format!(
                "Same content sent {} times in {} seconds",
                content_hits,
                CONTENT_REPEAT_WINDOW.as_secs()
            ));
        }
        None
    }

    /// Evict expired entries and drop empty windows. Returns windows removed.
    pub fn sweep(&self, now: Instant) -> usize {
        self.by_user.sweep(now) + self.by_content.sweep(now)
    }

    /// Discard all windows belonging to a guild.
    pub fn forget_guild(&self, guild_id: GuildId) {
        self.by_user.forget(|(guild, _)| *guild == guild_id);
        self.by_content.forget(|(guild, _)| *guild == guild_id);
    }

    #[cfg(test)]
    pub fn tracked_windows(&self) -> usize {
        self.by_user.len() + self.by_content.len()
    }
}

#[async_trait]
impl Rule for SpamRule {
    fn settings(&self) -> &RuleSettings {
        &self.settings
    }

    async fn check(&self, message: &Message) -> Result<Option<String>, RuleError> {
        Ok(self.record_at(message, Instant::now()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::automod::test_support::{memory_config, message_from};
    use std::sync::Arc;

    fn at(start: Instant, millis: u64) -> Instant {
        start + Duration::from_millis(millis)
    }

    #[test]
    fn test_tenth_message_in_window_is_spam() {
        let rule = SpamRule::new(memory_config());
        let start = Instant::now();

        for i in 0..9 {
            let msg = message_from(1, 10, 5, &format!("Message {}", i));
            assert!(rule.record_at(&msg, at(start, i * 1000)).is_none());
        }

        let tenth = message_from(1, 10, 5, "Message 9");
        assert!(rule.record_at(&tenth, at(start, 9_000)).is_some());
    }

    #[test]
    fn test_tenth_message_after_window_is_not_spam() {
        let rule = SpamRule::new(memory_config());
        let start = Instant::now();

        for i in 0..9 {
            let msg = message_from(1, 10, 5, &format!("Message {}", i));
            assert!(rule.record_at(&msg, at(start, i * 100)).is_none());
        }

        // 13 seconds after the first: the first message has left the window
        let tenth = message_from(1, 10, 5, "Message 9");
        assert!(rule.record_at(&tenth, at(start, 13_000)).is_none());
    }

    #[test]
    fn test_users_and_guilds_are_isolated() {
        let rule = SpamRule::new(memory_config());
        let now = Instant::now();

        for i in 0..9 {
            rule.record_at(&message_from(1, 10, 5, &format!("a{}", i)), now);
            rule.record_at(&message_from(2, 10, 5, &format!("b{}", i)), now);
        }
        assert!(rule
            .record_at(&message_from(1, 10, 6, "other user"), now)
            .is_none());
        assert!(rule
            .record_at(&message_from(2, 10, 5, "tenth in guild 2"), now)
            .is_some());
    }

    #[test]
    fn test_repeated_content_across_users() {
        let rule = SpamRule::new(memory_config());
        let start = Instant::now();

        for user in 0..14 {
            let msg = message_from(1, 10, user, "join my server");
            assert!(rule.record_at(&msg, at(start, user * 1000)).is_none());
        }
        let fifteenth = message_from(1, 10, 99, "join my server");
        let reason = rule.record_at(&fifteenth, at(start, 14_000)).unwrap();
        assert!(reason.starts_with("Same content"));

        // Different casing is different content
        let other = message_from(1, 10, 100, "JOIN MY SERVER");
        assert!(rule.record_at(&other, at(start, 14_000)).is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_burst_fires_once() {
        let rule = Arc::new(SpamRule::new(memory_config()));
        let now = Instant::now();

        let handles: Vec<_> = (0..USER_BURST_LIMIT)
            .map(|i| {
                let rule = Arc::clone(&rule);
                tokio::spawn(async move {
                    let msg = message_from(1, 10, 5, &format!("burst {}", i));
                    rule.record_at(&msg, now)
                })
            })
            .collect();

        let mut fired = 0;
        for handle in handles {
            if handle.await.unwrap().is_some() {
                fired += 1;
            }
        }
        assert_eq!(fired, 1);
        assert_eq!(rule.by_user.record((1, 5), now), USER_BURST_LIMIT + 1);
    }

    #[test]
    fn test_sweep_and_forget_bound_memory() {
        let rule = SpamRule::new(memory_config());
        let start = Instant::now();
        rule.record_at(&message_from(1, 10, 5, "hello"), start);
        rule.record_at(&message_from(2, 10, 5, "hello"), start);
        assert_eq!(rule.tracked_windows(), 4);

        rule.forget_guild(2);
        assert_eq!(rule.tracked_windows(), 2);

        assert_eq!(rule.sweep(at(start, 20_000)), 2);
        assert_eq!(rule.tracked_windows(), 0);
    }
}

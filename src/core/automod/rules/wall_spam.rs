// Wall spam - walls of text and long runs of the same character or emoji.

use crate::core::automod::automod_config::GuildConfig;
use crate::core::automod::automod_models::{Message, RuleKind};
use crate::core::automod::rule::{Rule, RuleError, RuleSettings};
use async_trait::async_trait;

/// Messages with more lines than this are walls.
pub const MAX_LINES: usize = 10;
/// Longest allowed run of one repeated non-whitespace character.
pub const MAX_CHAR_RUN: usize = 30;

pub struct WallSpamRule {
    settings: RuleSettings,
}

impl WallSpamRule {
    pub fn new(config: GuildConfig) -> Self {
        Self {
            settings: RuleSettings::new(RuleKind::WallSpam, config),
        }
    }
}

fn longest_char_run(content: &str) -> usize {
    let mut longest = 0;
    let mut current = 0;
    let mut previous: Option<char> = None;

    for c in content.chars() {
        if c.is_whitespace() {
            previous = None;
            current = 0;
            continue;
        }
        if previous == Some(c) {
            current += 1;
        } else {
            previous = Some(c);
            current = 1;
        }
        longest = longest.max(current);
    }
    longest
}

fn detect_wall(content: &str) -> Option<String> {
    let lines = content.lines().count();
    if lines > MAX_LINES {
        return Some(format!("{} lines (max {})", lines, MAX_LINES));
    }

    let run = longest_char_run(content);
    if run > MAX_CHAR_RUN {
        return Some(format!("{} repeated characters (max {})", run, MAX_CHAR_RUN));
    }
    None
}

#[async_trait]
impl Rule for WallSpamRule {
    fn settings(&self) -> &RuleSettings {
        &self.settings
    }

    async fn check(&self, message: &Message) -> Result<Option<String>, RuleError> {
        Ok(detect_wall(&message.content))
    }
}

// Detector implementations, one file per rule.

pub mod discord_invite;
pub mod max_chars;
pub mod max_words;
pub mod mention_spam;
pub mod spam;
pub mod spam_window;
pub mod wall_spam;
pub mod word_filter;

pub use discord_invite::DiscordInviteRule;
pub use max_chars::MaxCharsRule;
pub use max_words::MaxWordsRule;
pub use mention_spam::MentionSpamRule;
pub use spam::SpamRule;
pub use wall_spam::WallSpamRule;
pub use word_filter::WordFilterRule;

// Shared mocks for automod tests: an in-memory config store, a recording
// platform and message builders.

use super::automod_config::{ConfigError, ConfigStore, GuildConfig};
use super::automod_models::{Announcement, Author, ChannelId, GuildId, Message, RoleId, UserId};
use super::automod_service::register_all_defaults;
use super::platform::{ModerationPlatform, OperatorPrompt, PlatformError};
use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// In-memory store for testing
#[derive(Default)]
pub struct MockConfigStore {
    values: DashMap<(GuildId, String), Value>,
}

#[async_trait]
impl ConfigStore for MockConfigStore {
    async fn load(&self, guild_id: GuildId, key: &str) -> Result<Option<Value>, ConfigError> {
        Ok(self
            .values
            .get(&(guild_id, key.to_string()))
            .map(|v| v.clone()))
    }

    async fn save(&self, guild_id: GuildId, key: &str, value: Value) -> Result<(), ConfigError> {
        self.values.insert((guild_id, key.to_string()), value);
        Ok(())
    }
}

/// A config handle with every rule's defaults registered.
pub fn memory_config() -> GuildConfig {
    let config = GuildConfig::new(Arc::new(MockConfigStore::default()));
    register_all_defaults(&config);
    config
}

pub fn message(guild_id: GuildId, channel_id: ChannelId, content: &str) -> Message {
    message_from(guild_id, channel_id, 500, content)
}

pub fn message_from(
    guild_id: GuildId,
    channel_id: ChannelId,
    user_id: UserId,
    content: &str,
) -> Message {
    Message {
        id: 1,
        guild_id,
        channel_id,
        author: Author {
            id: user_id,
            name: format!("user{}", user_id),
            roles: Vec::new(),
            bot: false,
        },
        content: content.to_string(),
        mentioned_users: Vec::new(),
        mentioned_roles: Vec::new(),
    }
}

/// Everything the platform was asked to do, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum PlatformCall {
    Delete(u64),
    Kick(UserId),
    Ban(UserId, u8),
    AddRole(UserId, RoleId),
    Send(ChannelId),
}

/// Recording platform whose individual actions can be made to fail.
#[derive(Default)]
pub struct MockPlatform {
    pub calls: Mutex<Vec<PlatformCall>>,
    pub announcements: Mutex<Vec<Announcement>>,
    pub delete_error: Mutex<Option<PlatformError>>,
    pub punish_error: Mutex<Option<PlatformError>>,
    pub send_error: Mutex<Option<PlatformError>>,
    pub immune_users: Mutex<Vec<UserId>>,
}

impl MockPlatform {
    pub fn calls(&self) -> Vec<PlatformCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: PlatformCall) {
        self.calls.lock().unwrap().push(call);
    }

    fn take(slot: &Mutex<Option<PlatformError>>) -> Result<(), PlatformError> {
        match slot.lock().unwrap().take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ModerationPlatform for MockPlatform {
    async fn is_automod_immune(&self, _guild_id: GuildId, author: &Author) -> bool {
        self.immune_users.lock().unwrap().contains(&author.id)
    }

    async fn delete_message(&self, message: &Message) -> Result<(), PlatformError> {
        self.record(PlatformCall::Delete(message.id));
        Self::take(&self.delete_error)
    }

    async fn kick_member(
        &self,
        _guild_id: GuildId,
        user_id: UserId,
        _reason: &str,
    ) -> Result<(), PlatformError> {
        self.record(PlatformCall::Kick(user_id));
        Self::take(&self.punish_error)
    }

    async fn ban_member(
        &self,
        _guild_id: GuildId,
        user_id: UserId,
        delete_message_days: u8,
        _reason: &str,
    ) -> Result<(), PlatformError> {
        self.record(PlatformCall::Ban(user_id, delete_message_days));
        Self::take(&self.punish_error)
    }

    async fn add_role(
        &self,
        _guild_id: GuildId,
        user_id: UserId,
        role_id: RoleId,
        _reason: &str,
    ) -> Result<(), PlatformError> {
        self.record(PlatformCall::AddRole(user_id, role_id));
        Self::take(&self.punish_error)
    }

    async fn send_to_channel(
        &self,
        channel_id: ChannelId,
        announcement: &Announcement,
    ) -> Result<(), PlatformError> {
        self.record(PlatformCall::Send(channel_id));
        Self::take(&self.send_error)?;
        self.announcements.lock().unwrap().push(announcement.clone());
        Ok(())
    }
}

/// Prompt that replays scripted answers.
#[derive(Default)]
pub struct ScriptedPrompt {
    pub confirms: Mutex<VecDeque<bool>>,
    pub choices: Mutex<VecDeque<Option<usize>>>,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedPrompt {
    pub fn confirming(answers: &[bool]) -> Self {
        Self {
            confirms: Mutex::new(answers.iter().copied().collect()),
            ..Default::default()
        }
    }

    pub fn choosing(choice: Option<usize>) -> Self {
        Self {
            choices: Mutex::new(VecDeque::from([choice])),
            ..Default::default()
        }
    }
}

#[async_trait]
impl OperatorPrompt for ScriptedPrompt {
    async fn confirm(&self, prompt: &str) -> bool {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.confirms.lock().unwrap().pop_front().unwrap_or(false)
    }

    async fn choose_option(&self, prompt: &str, _options: &[String]) -> Option<usize> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.choices.lock().unwrap().pop_front().flatten()
    }
}

/// Collects formatted log lines while the returned guard is alive.
///
/// Only sees events from the current thread, so use it with the default
/// current-thread `#[tokio::test]` runtime.
#[derive(Clone, Default)]
pub struct LogCapture {
    buffer: Arc<Mutex<Vec<u8>>>,
}

struct LogWriter(Arc<Mutex<Vec<u8>>>);

impl std::io::Write for LogWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl LogCapture {
    pub fn start() -> (Self, tracing::subscriber::DefaultGuard) {
        let capture = Self::default();
        let buffer = Arc::clone(&capture.buffer);
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_ansi(false)
            .with_writer(move || LogWriter(Arc::clone(&buffer)))
            .finish();
        let guard = tracing::subscriber::set_default(subscriber);
        (capture, guard)
    }

    pub fn lines(&self) -> Vec<String> {
        let bytes = self.buffer.lock().unwrap().clone();
        String::from_utf8_lossy(&bytes)
            .lines()
            .map(str::to_string)
            .collect()
    }

    /// The line carrying `message`, if one was logged.
    pub fn find(&self, message: &str) -> Option<String> {
        self.lines().into_iter().find(|line| line.contains(message))
    }
}

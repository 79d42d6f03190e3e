// In-memory ConfigStore. Nothing survives a restart; useful for local runs
// and tests.

use crate::core::automod::{ConfigError, ConfigStore, GuildId};
use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;

/// Composite key: one JSON document per (guild, top-level key).
#[derive(Hash, Eq, PartialEq, Clone, Debug)]
struct GuildKey {
    guild_id: GuildId,
    key: String,
}

#[derive(Default)]
pub struct InMemoryConfigStore {
    data: DashMap<GuildKey, Value>,
}

impl InMemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConfigStore for InMemoryConfigStore {
    async fn load(&self, guild_id: GuildId, key: &str) -> Result<Option<Value>, ConfigError> {
        let key = GuildKey {
            guild_id,
            key: key.to_string(),
        };
        Ok(self.data.get(&key).map(|entry| entry.value().clone()))
    }

    async fn save(&self, guild_id: GuildId, key: &str, value: Value) -> Result<(), ConfigError> {
        let key = GuildKey {
            guild_id,
            key: key.to_string(),
        };
        self.data.insert(key, value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_guilds_are_isolated() {
        let store = InMemoryConfigStore::new();
        store.save(1, "spamrule", json!({"enabled": true})).await.unwrap();

        assert_eq!(
            store.load(1, "spamrule").await.unwrap(),
            Some(json!({"enabled": true}))
        );
        assert_eq!(store.load(2, "spamrule").await.unwrap(), None);
        assert_eq!(store.load(1, "inviterule").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_save_overwrites() {
        let store = InMemoryConfigStore::new();
        store.save(1, "settings", json!({"a": 1})).await.unwrap();
        store.save(1, "settings", json!({"b": 2})).await.unwrap();
        assert_eq!(
            store.load(1, "settings").await.unwrap(),
            Some(json!({"b": 2}))
        );
    }
}

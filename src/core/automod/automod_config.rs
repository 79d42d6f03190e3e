// Guild configuration - the storage port and the handle every rule shares.
//
// The store only knows how to load/save one JSON value per (guild, key).
// `GuildConfig` layers registered defaults and nested path access on top,
// so every store implementation gets the same lookup semantics.

use super::automod_models::GuildId;
use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::{Map, Value};
use std::sync::Arc;
use thiserror::Error;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    /// The nested path is absent. Callers treat this as "not configured".
    #[error("Config path not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

// ============================================================================
// STORAGE TRAIT (PORT)
// ============================================================================

/// Raw per-guild key-value persistence.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Load the value stored under `key`, if any.
    async fn load(&self, guild_id: GuildId, key: &str) -> Result<Option<Value>, ConfigError>;

    /// Overwrite the value stored under `key`.
    async fn save(&self, guild_id: GuildId, key: &str, value: Value) -> Result<(), ConfigError>;
}

// ============================================================================
// CONFIG HANDLE
// ============================================================================

/// Shared handle over a `ConfigStore` plus registered defaults.
///
/// Cloning is cheap; all clones see the same store and defaults.
#[derive(Clone)]
pub struct GuildConfig {
    store: Arc<dyn ConfigStore>,
    defaults: Arc<DashMap<String, Value>>,
}

impl GuildConfig {
    pub fn new(store: Arc<dyn ConfigStore>) -> Self {
        Self {
            store,
            defaults: Arc::new(DashMap::new()),
        }
    }

    /// Register the guild-scope default for a top-level key.
    pub fn register_defaults(&self, key: &str, value: Value) {
        self.defaults.insert(key.to_string(), value);
    }

    /// Stored value merged over the registered default.
    pub async fn get(&self, guild_id: GuildId, key: &str) -> Result<Value, ConfigError> {
        let stored = self.store.load(guild_id, key).await?;
        let default = self.defaults.get(key).map(|entry| entry.value().clone());

        match (stored, default) {
            (Some(mut stored), Some(default)) => {
                merge_defaults(&mut stored, &default);
                Ok(stored)
            }
            (Some(stored), None) => Ok(stored),
            (None, Some(default)) => Ok(default),
            (None, None) => Err(ConfigError::NotFound(key.to_string())),
        }
    }

    pub async fn set(&self, guild_id: GuildId, key: &str, value: Value) -> Result<(), ConfigError> {
        self.store.save(guild_id, key, value).await
    }

    /// Nested lookup. A missing segment or a null leaf is `NotFound`.
    pub async fn get_raw(&self, guild_id: GuildId, path: &[&str]) -> Result<Value, ConfigError> {
        let (first, rest) = path
            .split_first()
            .ok_or_else(|| ConfigError::NotFound(String::new()))?;

        let mut current = self.get(guild_id, first).await?;
        for segment in rest {
            current = match current {
                Value::Object(mut map) => map
                    .remove(*segment)
                    .ok_or_else(|| ConfigError::NotFound(path.join(".")))?,
                _ => return Err(ConfigError::NotFound(path.join("."))),
            };
        }

        if current.is_null() {
            return Err(ConfigError::NotFound(path.join(".")));
        }
        Ok(current)
    }

    /// Nested write that keeps sibling values intact.
    ///
    /// Only the explicitly written path is persisted; everything else keeps
    /// falling back to the registered defaults.
    pub async fn set_raw(
        &self,
        guild_id: GuildId,
        path: &[&str],
        value: Value,
    ) -> Result<(), ConfigError> {
        let (first, rest) = path
            .split_first()
            .ok_or_else(|| ConfigError::NotFound(String::new()))?;

        if rest.is_empty() {
            return self.set(guild_id, first, value).await;
        }

        let mut root = self
            .store
            .load(guild_id, first)
            .await?
            .filter(Value::is_object)
            .unwrap_or_else(|| Value::Object(Map::new()));

        let mut cursor = &mut root;
        let (leaf, parents) = rest
            .split_last()
            .ok_or_else(|| ConfigError::NotFound(path.join(".")))?;
        for segment in parents {
            let map = ensure_object(cursor);
            cursor = map
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
        }
        ensure_object(cursor).insert(leaf.to_string(), value);

        self.set(guild_id, first, root).await
    }

    /// Typed nested lookup.
    pub async fn get_typed<T: serde::de::DeserializeOwned>(
        &self,
        guild_id: GuildId,
        path: &[&str],
    ) -> Result<T, ConfigError> {
        let value = self.get_raw(guild_id, path).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Typed nested write.
    pub async fn set_typed<T: serde::Serialize>(
        &self,
        guild_id: GuildId,
        path: &[&str],
        value: &T,
    ) -> Result<(), ConfigError> {
        self.set_raw(guild_id, path, serde_json::to_value(value)?)
            .await
    }
}

fn ensure_object(value: &mut Value) -> &mut Map<String, Value> {
    if !value.is_object() {
        *value = Value::Object(Map::new());
    }
    match value {
        Value::Object(map) => map,
        _ => unreachable!("value was just replaced with an object"),
    }
}

/// Fill keys missing from `target` with the ones from `default`, recursively.
fn merge_defaults(target: &mut Value, default: &Value) {
    if let (Value::Object(target), Value::Object(default)) = (target, default) {
        for (key, default_value) in default {
            match target.get_mut(key) {
                Some(existing) => merge_defaults(existing, default_value),
                None => {
                    target.insert(key.clone(), default_value.clone());
                }
            }
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// Minimal store for testing
    struct MockConfigStore {
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

        async fn save(
            &self,
            guild_id: GuildId,
            key: &str,
            value: Value,
        ) -> Result<(), ConfigError> {
            self.values.insert((guild_id, key.to_string()), value);
            Ok(())
        }
    }

    fn config() -> GuildConfig {
        let config = GuildConfig::new(Arc::new(MockConfigStore {
            values: DashMap::new(),
        }));
        config.register_defaults("rule", json!({ "enabled": false, "threshold": 4 }));
        config
    }

    #[tokio::test]
    async fn test_get_falls_back_to_defaults() {
        let config = config();
        let value = config.get(1, "rule").await.unwrap();
        assert_eq!(value, json!({ "enabled": false, "threshold": 4 }));

        assert!(matches!(
            config.get(1, "unknown").await,
            Err(ConfigError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_set_raw_preserves_defaults_and_siblings() {
        let config = config();
        config
            .set_raw(1, &["rule", "enabled"], json!(true))
            .await
            .unwrap();
        config
            .set_raw(1, &["rule", "role_to_add"], json!(99))
            .await
            .unwrap();

        let value = config.get(1, "rule").await.unwrap();
        assert_eq!(value["enabled"], json!(true));
        assert_eq!(value["threshold"], json!(4));
        assert_eq!(value["role_to_add"], json!(99));

        // Other guilds are untouched
        let other = config.get(2, "rule").await.unwrap();
        assert_eq!(other["enabled"], json!(false));
    }

    #[tokio::test]
    async fn test_get_raw_missing_path_is_not_found() {
        let config = config();
        let err = config.get_raw(1, &["rule", "role_to_add"]).await;
        assert!(matches!(err, Err(ConfigError::NotFound(path)) if path == "rule.role_to_add"));

        config
            .set_raw(1, &["rule", "role_to_add"], Value::Null)
            .await
            .unwrap();
        assert!(config.get_raw(1, &["rule", "role_to_add"]).await.is_err());

        let threshold: u32 = config.get_typed(1, &["rule", "threshold"]).await.unwrap();
        assert_eq!(threshold, 4);
    }

    #[tokio::test]
    async fn test_set_raw_creates_nested_objects() {
        let config = config();
        config
            .set_raw(1, &["channel_groups", "staff", "extra"], json!([1, 2]))
            .await
            .unwrap();
        let value = config
            .get_raw(1, &["channel_groups", "staff", "extra"])
            .await
            .unwrap();
        assert_eq!(value, json!([1, 2]));
    }
}

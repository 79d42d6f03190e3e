// SQLite-backed ConfigStore. Each (guild, key) document is stored as JSON text.

use crate::core::automod::{ConfigError, ConfigStore, GuildId};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Row, Sqlite};
use std::path::Path;

pub struct SqliteConfigStore {
    pool: Pool<Sqlite>,
}

fn storage(e: sqlx::Error) -> ConfigError {
    ConfigError::Storage(e.to_string())
}

impl SqliteConfigStore {
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        // Ensure the file exists if it's a file path
        let path_str = database_url.trim_start_matches("sqlite://");
        if !database_url.contains(":memory:") && !Path::new(path_str).exists() {
            if let Some(parent) = Path::new(path_str).parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::File::create(path_str)?;
        }

        let conn_str = if database_url.starts_with("sqlite:") {
            database_url.to_string()
        } else {
            format!("sqlite://{}", database_url)
        };

        let pool = SqlitePoolOptions::new().connect(&conn_str).await?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS guild_config (
                guild_id INTEGER NOT NULL,
                config_key TEXT NOT NULL,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (guild_id, config_key)
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl ConfigStore for SqliteConfigStore {
    async fn load(&self, guild_id: GuildId, key: &str) -> Result<Option<Value>, ConfigError> {
        let row = sqlx::query("SELECT value FROM guild_config WHERE guild_id = ? AND config_key = ?")
            .bind(guild_id as i64)
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;

        match row {
            Some(row) => {
                let text: String = row.get("value");
                Ok(Some(serde_json::from_str(&text)?))
            }
            None => Ok(None),
        }
    }

    async fn save(&self, guild_id: GuildId, key: &str, value: Value) -> Result<(), ConfigError> {
        let text = serde_json::to_string(&value)?;
        sqlx::query(
            r#"
            INSERT INTO guild_config (guild_id, config_key, value, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(guild_id, config_key) DO UPDATE SET
            value = excluded.value,
            updated_at = excluded.updated_at
            "#,
        )
        .bind(guild_id as i64)
        .bind(key)
        .bind(text)
        .bind(chrono::Utc::now())
        .execute(&self.pool)
        .await
        .map_err(storage)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::automod::automod_service::register_all_defaults;
    use crate::core::automod::rule::RuleSettings;
    use crate::core::automod::{GuildConfig, RuleKind};
    use serde_json::json;
    use std::sync::Arc;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_sqlite_persistence_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("automod.db");
        let path = path.to_str().unwrap();

        let store = SqliteConfigStore::new(path).await.unwrap();
        store
            .save(7, "inviterule", json!({"allowed_links": ["discord.gg/ours"]}))
            .await
            .unwrap();
        store
            .save(7, "inviterule", json!({"allowed_links": []}))
            .await
            .unwrap();
        drop(store);

        // Reopen from disk
        let store = SqliteConfigStore::new(path).await.unwrap();
        assert_eq!(
            store.load(7, "inviterule").await.unwrap(),
            Some(json!({"allowed_links": []}))
        );
        assert_eq!(store.load(8, "inviterule").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_rule_settings_survive_restart() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("automod.db");
        let path = path.to_str().unwrap();

        let config = GuildConfig::new(Arc::new(SqliteConfigStore::new(path).await.unwrap()));
        register_all_defaults(&config);
        let settings = RuleSettings::new(RuleKind::Spam, config);
        settings.toggle_enabled(3, true).await.unwrap();
        settings.set_mute_role(3, 44).await.unwrap();

        let config = GuildConfig::new(Arc::new(SqliteConfigStore::new(path).await.unwrap()));
        register_all_defaults(&config);
        let settings = RuleSettings::new(RuleKind::Spam, config);
        assert!(settings.is_enabled(3).await.unwrap());
        assert_eq!(settings.get_mute_role(3).await.unwrap(), Some(44));
        assert!(settings.get_should_delete(3).await.unwrap());
    }
}

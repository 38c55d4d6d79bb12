//! Durable settings access
//!
//! Read/write the ambience preferences from a SQLite settings table
//! (key-value store). Only one preference exists today — the mute flag —
//! but access goes through generic get/set helpers so additions stay cheap.

use crate::error::Result;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Sqlite};
use std::str::FromStr;
use tracing::debug;

/// Settings key for the persisted mute preference
const MUTED_KEY: &str = "audio_muted";

/// SQLite-backed key/value settings store
#[derive(Clone)]
pub struct SettingsStore {
    pool: Pool<Sqlite>,
}

impl SettingsStore {
    /// Wrap an existing pool, creating the settings table if needed
    pub async fn new(pool: Pool<Sqlite>) -> Result<Self> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await?;

        Ok(Self { pool })
    }

    /// Open (or create) a settings database at the given path
    pub async fn open(path: &str) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .connect(&format!("sqlite:{}?mode=rwc", path))
            .await?;
        Self::new(pool).await
    }

    /// In-memory store; state lives as long as the pool.
    ///
    /// Restricted to a single connection so every handle sees the same
    /// in-memory database.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        Self::new(pool).await
    }

    /// Get mute preference, initializing to unmuted on first read
    pub async fn get_muted(&self) -> Result<bool> {
        match self.get_setting::<bool>(MUTED_KEY).await? {
            Some(muted) => Ok(muted),
            None => {
                self.set_muted(false).await?;
                Ok(false)
            }
        }
    }

    /// Persist mute preference
    pub async fn set_muted(&self, muted: bool) -> Result<()> {
        self.set_setting(MUTED_KEY, muted).await
    }

    /// Generic setting getter, parsing the stored text value
    async fn get_setting<T: FromStr>(&self, key: &str) -> Result<Option<T>> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT value FROM settings WHERE key = ?")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;

        match row {
            Some((value,)) => match value.parse::<T>() {
                Ok(parsed) => Ok(Some(parsed)),
                Err(_) => {
                    debug!("setting {key:?} holds unparseable value {value:?}");
                    Ok(None)
                }
            },
            None => Ok(None),
        }
    }

    /// Generic setting setter, storing the value as text
    async fn set_setting<T: ToString>(&self, key: &str, value: T) -> Result<()> {
        sqlx::query(
            "INSERT INTO settings (key, value) VALUES (?, ?) \
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        )
        .bind(key)
        .bind(value.to_string())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn muted_defaults_to_false() {
        let store = SettingsStore::in_memory().await.unwrap();
        assert!(!store.get_muted().await.unwrap());
    }

    #[tokio::test]
    async fn muted_round_trips() {
        let store = SettingsStore::in_memory().await.unwrap();
        store.set_muted(true).await.unwrap();
        assert!(store.get_muted().await.unwrap());

        store.set_muted(false).await.unwrap();
        assert!(!store.get_muted().await.unwrap());
    }

    #[tokio::test]
    async fn cloned_handles_share_state() {
        let store = SettingsStore::in_memory().await.unwrap();
        let other = store.clone();

        store.set_muted(true).await.unwrap();
        assert!(other.get_muted().await.unwrap());
    }
}

use crate::domain::models::{Document, weekday_name};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::storage::{initialize_database, open_connection};
use async_trait::async_trait;
use chrono::{Utc, Weekday};
use rusqlite::{OptionalExtension, params};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub const TODAY_TASKS_KEY: &str = "todayTasks";
pub const TOMORROW_TASKS_KEY: &str = "tomorrowTasks";
pub const CUSTOM_PRIORITIES_KEY: &str = "customPriorities";
pub const TOMORROW_WRITTEN_ON_KEY: &str = "tomorrowWrittenOn";
pub const STORED_DATE_FORMAT: &str = "%Y-%m-%d";

pub fn routine_key(weekday: Weekday) -> String {
    format!("routine{}", weekday_name(weekday))
}

pub fn document_key(document: Document) -> String {
    match document {
        Document::Today => TODAY_TASKS_KEY.to_string(),
        Document::Tomorrow => TOMORROW_TASKS_KEY.to_string(),
        Document::Routine(weekday) => routine_key(weekday),
    }
}

pub fn last_run_key(task_name: &str) -> String {
    format!("lastRun:{task_name}")
}

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, InfraError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), InfraError>;
    async fn remove(&self, key: &str) -> Result<(), InfraError>;
}

#[derive(Debug, Clone)]
pub struct SqliteKeyValueStore {
    db_path: PathBuf,
}

impl SqliteKeyValueStore {
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self, InfraError> {
        let db_path = db_path.as_ref().to_path_buf();
        initialize_database(&db_path)?;
        Ok(Self { db_path })
    }

    fn get_blocking(&self, key: &str) -> Result<Option<String>, InfraError> {
        let connection = open_connection(&self.db_path)?;
        let value = connection
            .query_row(
                "SELECT value FROM kv_store WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set_blocking(&self, key: &str, value: &str) -> Result<(), InfraError> {
        let connection = open_connection(&self.db_path)?;
        connection.execute(
            "INSERT INTO kv_store (key, value, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET
               value = excluded.value,
               updated_at = excluded.updated_at",
            params![key, value, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    fn remove_blocking(&self, key: &str) -> Result<(), InfraError> {
        let connection = open_connection(&self.db_path)?;
        connection.execute("DELETE FROM kv_store WHERE key = ?1", params![key])?;
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for SqliteKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>, InfraError> {
        let store = self.clone();
        let key = key.to_string();
        tokio::task::spawn_blocking(move || store.get_blocking(&key)).await?
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), InfraError> {
        let store = self.clone();
        let key = key.to_string();
        let value = value.to_string();
        tokio::task::spawn_blocking(move || store.set_blocking(&key, &value)).await?
    }

    async fn remove(&self, key: &str) -> Result<(), InfraError> {
        let store = self.clone();
        let key = key.to_string();
        tokio::task::spawn_blocking(move || store.remove_blocking(&key)).await?
    }
}

#[derive(Debug, Default)]
pub struct InMemoryKeyValueStore {
    values: Mutex<HashMap<String, String>>,
}

impl InMemoryKeyValueStore {
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, InfraError> {
        self.values
            .lock()
            .map_err(|error| InfraError::Store(format!("in-memory store lock poisoned: {error}")))
    }
}

#[async_trait]
impl KeyValueStore for InMemoryKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>, InfraError> {
        Ok(self.lock()?.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), InfraError> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), InfraError> {
        self.lock()?.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static NEXT_TEMP_DB: AtomicUsize = AtomicUsize::new(0);

    struct TempDatabase {
        dir: PathBuf,
    }

    impl TempDatabase {
        fn new() -> Self {
            let sequence = NEXT_TEMP_DB.fetch_add(1, Ordering::Relaxed);
            let dir = std::env::temp_dir().join(format!(
                "timeblock-store-tests-{}-{}",
                std::process::id(),
                sequence
            ));
            fs::create_dir_all(&dir).expect("create temp dir");
            Self { dir }
        }

        fn path(&self) -> PathBuf {
            self.dir.join("state.sqlite")
        }
    }

    impl Drop for TempDatabase {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(&self.dir);
        }
    }

    async fn exercise(store: &dyn KeyValueStore) {
        assert_eq!(store.get(TODAY_TASKS_KEY).await.expect("get"), None);

        store.set(TODAY_TASKS_KEY, "[]").await.expect("set");
        store.set(TODAY_TASKS_KEY, "[1]").await.expect("overwrite");
        assert_eq!(
            store.get(TODAY_TASKS_KEY).await.expect("get"),
            Some("[1]".to_string())
        );

        store.remove(TODAY_TASKS_KEY).await.expect("remove");
        store.remove(TODAY_TASKS_KEY).await.expect("remove missing");
        assert_eq!(store.get(TODAY_TASKS_KEY).await.expect("get"), None);
    }

    #[tokio::test]
    async fn in_memory_store_last_write_wins() {
        exercise(&InMemoryKeyValueStore::default()).await;
    }

    #[tokio::test]
    async fn sqlite_store_last_write_wins() {
        let database = TempDatabase::new();
        let store = SqliteKeyValueStore::open(database.path()).expect("open store");
        exercise(&store).await;
    }

    #[tokio::test]
    async fn sqlite_store_survives_reopen() {
        let database = TempDatabase::new();
        let store = SqliteKeyValueStore::open(database.path()).expect("open store");
        store.set(CUSTOM_PRIORITIES_KEY, "{}").await.expect("set");

        let reopened = SqliteKeyValueStore::open(database.path()).expect("reopen store");
        assert_eq!(
            reopened.get(CUSTOM_PRIORITIES_KEY).await.expect("get"),
            Some("{}".to_string())
        );
    }

    #[test]
    fn document_keys_match_wire_names() {
        assert_eq!(document_key(Document::Today), "todayTasks");
        assert_eq!(document_key(Document::Tomorrow), "tomorrowTasks");
        assert_eq!(document_key(Document::Routine(Weekday::Wed)), "routineWednesday");
        assert_eq!(last_run_key("promoteTomorrow"), "lastRun:promoteTomorrow");
    }
}

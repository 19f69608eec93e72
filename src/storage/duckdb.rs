use super::traits::{Sink, StorageError, WatermarkStore};
use async_trait::async_trait;
use chrono::Utc;
use duckdb::Connection;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Check if a process with the given PID is still running
fn is_process_running(pid: u32) -> bool {
    #[cfg(unix)]
    {
        use std::process::Command;
        Command::new("ps")
            .arg("-p")
            .arg(pid.to_string())
            .output()
            .map(|output| output.status.success())
            .unwrap_or(false)
    }
    #[cfg(not(unix))]
    {
        let _ = pid;
        true
    }
}

/// Extract PID from DuckDB lock error message, e.g. "... (PID 12345) ..."
fn extract_pid_from_lock_error(error_msg: &str) -> Option<u32> {
    let start = error_msg.find("(PID ")? + 5;
    let end = error_msg[start..].find(')')?;
    error_msg[start..start + end].parse().ok()
}

fn remove_lock_files(db_path: &Path) -> std::io::Result<()> {
    for suffix in ["wal", "lock"] {
        let path = PathBuf::from(format!("{}.{}", db_path.display(), suffix));
        if path.exists() {
            std::fs::remove_file(&path)?;
            tracing::info!(path = %path.display(), "Removed stale database file");
        }
    }
    Ok(())
}

/// DuckDB-backed watermark store and sink sharing one database file.
pub struct DuckDbStorage {
    conn: Arc<Mutex<Connection>>,
}

impl DuckDbStorage {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        match Connection::open(path) {
            Ok(conn) => Ok(Self::from_connection(conn)),
            Err(e) => {
                let error_msg = e.to_string();
                if !error_msg.contains("Could not set lock") {
                    return Err(e.into());
                }

                tracing::warn!("Database lock detected: {}", error_msg);
                let pid = match extract_pid_from_lock_error(&error_msg) {
                    Some(pid) => pid,
                    None => return Err(e.into()),
                };

                if is_process_running(pid) {
                    tracing::error!(pid, "Lock holder is still running, cannot open database");
                    return Err(e.into());
                }

                tracing::warn!(pid, "Lock holder is gone, removing stale lock files");
                remove_lock_files(path)?;
                let conn = Connection::open(path)?;
                Ok(Self::from_connection(conn))
            }
        }
    }

    /// Create an in-memory DuckDB storage instance (for testing)
    pub fn in_memory() -> Result<Self, StorageError> {
        Ok(Self::from_connection(Connection::open_in_memory()?))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Runs `f` against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> Result<T, StorageError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T, StorageError> + Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|_| StorageError::Generic("database connection lock poisoned".to_string()))?;
            f(&mut conn)
        })
        .await
        .map_err(|e| StorageError::Generic(format!("storage task failed: {}", e)))?
    }

    pub async fn init_schema(&self) -> Result<(), StorageError> {
        self.with_conn(|conn| {
            conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS watermarks (
                    source_key VARCHAR PRIMARY KEY,
                    value VARCHAR NOT NULL,
                    updated_at BIGINT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS audit_log_entries (
                    entry_id VARCHAR PRIMARY KEY,
                    source_key VARCHAR NOT NULL,
                    entry VARCHAR NOT NULL,
                    collected_at BIGINT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_entries_source ON audit_log_entries(source_key);",
            )?;
            Ok(())
        })
        .await
    }

    pub async fn count_entries(&self, source_key: &str) -> Result<usize, StorageError> {
        let source_key = source_key.to_string();
        self.with_conn(move |conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM audit_log_entries WHERE source_key = ?",
                duckdb::params![source_key],
                |row| row.get(0),
            )?;
            Ok(count as usize)
        })
        .await
    }

    /// Entries for `source_key`, oldest batch first.
    pub async fn load_entries(&self, source_key: &str) -> Result<Vec<serde_json::Value>, StorageError> {
        let source_key = source_key.to_string();
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT entry FROM audit_log_entries
                 WHERE source_key = ?
                 ORDER BY collected_at, rowid",
            )?;
            let rows = stmt.query_map(duckdb::params![source_key], |row| row.get::<_, String>(0))?;

            let mut entries = Vec::new();
            for row in rows {
                entries.push(serde_json::from_str(&row?)?);
            }
            Ok(entries)
        })
        .await
    }
}

#[async_trait]
impl WatermarkStore for DuckDbStorage {
    async fn get(&self, key: &str) -> Result<String, StorageError> {
        let key = key.to_string();
        self.with_conn(move |conn| {
            let result = conn.query_row(
                "SELECT value FROM watermarks WHERE source_key = ?",
                duckdb::params![key],
                |row| row.get::<_, String>(0),
            );
            match result {
                Ok(value) => Ok(value),
                Err(duckdb::Error::QueryReturnedNoRows) => Err(StorageError::NotFound(key)),
                Err(e) => Err(e.into()),
            }
        })
        .await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let key = key.to_string();
        let value = value.to_string();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO watermarks (source_key, value, updated_at)
                 VALUES (?, ?, ?)",
                duckdb::params![key, value, Utc::now().timestamp_micros()],
            )?;
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl Sink for DuckDbStorage {
    async fn save(&self, source_key: &str, entries: &[serde_json::Value]) -> Result<(), StorageError> {
        if entries.is_empty() {
            return Ok(());
        }
        let source_key = source_key.to_string();
        let rows = entries
            .iter()
            .map(serde_json::to_string)
            .collect::<Result<Vec<_>, _>>()?;

        self.with_conn(move |conn| {
            let collected_at = Utc::now().timestamp_micros();
            let tx = conn.transaction()?;
            {
                let mut stmt = tx.prepare(
                    "INSERT INTO audit_log_entries (entry_id, source_key, entry, collected_at)
                     VALUES (?, ?, ?, ?)",
                )?;
                for entry in &rows {
                    stmt.execute(duckdb::params![
                        Uuid::new_v4().to_string(),
                        source_key,
                        entry,
                        collected_at
                    ])?;
                }
            }
            tx.commit()?;
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn setup_storage() -> DuckDbStorage {
        let storage = DuckDbStorage::in_memory().unwrap();
        storage.init_schema().await.unwrap();
        storage
    }

    #[test]
    fn test_extract_pid_from_lock_error() {
        let msg = "IO Error: Could not set lock on file \"x.duckdb\": Conflicting lock is held in /usr/bin/auditsync (PID 4242) by user ops";
        assert_eq!(extract_pid_from_lock_error(msg), Some(4242));
        assert_eq!(extract_pid_from_lock_error("no pid here"), None);
    }

    #[tokio::test]
    async fn test_watermark_not_found() {
        let storage = setup_storage().await;
        let err = storage.get("zendesk_audit_logs/acme").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_watermark_overwrite() {
        let storage = setup_storage().await;
        storage.set("k", "2023-12-06T00:00:00Z").await.unwrap();
        storage.set("k", "2023-12-07T17:50:08Z").await.unwrap();
        assert_eq!(storage.get("k").await.unwrap(), "2023-12-07T17:50:08Z");
    }

    #[tokio::test]
    async fn test_init_schema_is_idempotent() {
        let storage = setup_storage().await;
        storage.init_schema().await.unwrap();
    }

    #[tokio::test]
    async fn test_entries_accept_duplicates() {
        let storage = setup_storage().await;
        let batch = vec![json!({"id": 1, "action": "create"}), json!({"id": 2})];

        storage.save("k", &batch).await.unwrap();
        storage.save("k", &batch).await.unwrap();
        storage.save("other", &[json!({"id": 9})]).await.unwrap();

        assert_eq!(storage.count_entries("k").await.unwrap(), 4);
        assert_eq!(storage.count_entries("other").await.unwrap(), 1);

        let entries = storage.load_entries("other").await.unwrap();
        assert_eq!(entries, vec![json!({"id": 9})]);
    }

    #[tokio::test]
    async fn test_empty_batch_writes_nothing() {
        let storage = setup_storage().await;
        storage.save("k", &[]).await.unwrap();
        assert_eq!(storage.count_entries("k").await.unwrap(), 0);
    }
}

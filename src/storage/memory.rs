use super::traits::{Sink, StorageError, WatermarkStore};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

/// A batch as it reached the sink.
#[derive(Debug, Clone)]
pub struct SavedBatch {
    pub source_key: String,
    pub entries: Vec<serde_json::Value>,
}

/// In-process watermark store and sink, used by `--dry-run` and tests.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    watermarks: Mutex<HashMap<String, String>>,
    batches: Mutex<Vec<SavedBatch>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_watermark(self, key: &str, value: &str) -> Self {
        self.lock_watermarks()
            .insert(key.to_string(), value.to_string());
        self
    }

    pub fn watermark(&self, key: &str) -> Option<String> {
        self.lock_watermarks().get(key).cloned()
    }

    pub fn batches(&self) -> Vec<SavedBatch> {
        self.lock_batches().clone()
    }

    pub fn entry_count(&self) -> usize {
        self.lock_batches().iter().map(|b| b.entries.len()).sum()
    }

    fn lock_watermarks(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.watermarks.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_batches(&self) -> std::sync::MutexGuard<'_, Vec<SavedBatch>> {
        self.batches.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl WatermarkStore for MemoryStorage {
    async fn get(&self, key: &str) -> Result<String, StorageError> {
        self.lock_watermarks()
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.lock_watermarks()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[async_trait]
impl Sink for MemoryStorage {
    async fn save(&self, source_key: &str, entries: &[serde_json::Value]) -> Result<(), StorageError> {
        self.lock_batches().push(SavedBatch {
            source_key: source_key.to_string(),
            entries: entries.to_vec(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_missing_watermark_is_not_found() {
        let storage = MemoryStorage::new();
        let err = storage.get("zendesk_audit_logs/acme").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_empty_watermark_is_not_missing() {
        let storage = MemoryStorage::new();
        storage.set("key", "").await.unwrap();
        assert_eq!(storage.get("key").await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_batches_are_kept_in_order() {
        let storage = MemoryStorage::new();
        storage.save("key", &[json!({"id": 1}), json!({"id": 2})]).await.unwrap();
        storage.save("key", &[json!({"id": 3})]).await.unwrap();

        let batches = storage.batches();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].entries[1]["id"], 2);
        assert_eq!(storage.entry_count(), 3);
    }
}

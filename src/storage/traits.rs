use async_trait::async_trait;

/// Durable home of per-source watermarks.
#[async_trait]
pub trait WatermarkStore: Send + Sync {
    /// Returns `StorageError::NotFound` when no watermark was ever stored for `key`.
    async fn get(&self, key: &str) -> Result<String, StorageError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// Receives collected audit log entries, one batch per page.
///
/// Batches may be delivered again after a failed pass, so implementations
/// must accept duplicates.
#[async_trait]
pub trait Sink: Send + Sync {
    async fn save(&self, source_key: &str, entries: &[serde_json::Value]) -> Result<(), StorageError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("no watermark stored for '{0}'")]
    NotFound(String),

    #[error("database error: {0}")]
    DuckDb(#[from] duckdb::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage error: {0}")]
    Generic(String),
}

impl StorageError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound(_))
    }
}

use super::traits::{Sink, StorageError};
use async_trait::async_trait;
use serde::Serialize;
use std::io::Write;
use std::sync::Mutex;

#[derive(Serialize)]
struct Line<'a> {
    source: &'a str,
    entry: &'a serde_json::Value,
}

/// Writes every entry as one JSON line.
pub struct StdoutSink {
    out: Mutex<Box<dyn Write + Send>>,
}

impl StdoutSink {
    pub fn new() -> Self {
        Self::with_writer(Box::new(std::io::stdout()))
    }

    pub fn with_writer(out: Box<dyn Write + Send>) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }
}

impl Default for StdoutSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Sink for StdoutSink {
    async fn save(&self, source_key: &str, entries: &[serde_json::Value]) -> Result<(), StorageError> {
        if entries.is_empty() {
            return Ok(());
        }
        let mut out = self
            .out
            .lock()
            .map_err(|_| StorageError::Generic("stdout sink lock poisoned".to_string()))?;

        for entry in entries {
            serde_json::to_writer(&mut *out, &Line { source: source_key, entry })?;
            out.write_all(b"\n")?;
        }
        out.flush()?;
        Ok(())
    }
}

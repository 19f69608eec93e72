use crate::client::FetchClient;
use crate::collector::{source_key, Collector, PassSummary};
use crate::config::parse::{load_config, ConfigError};
use crate::config::types::{Config, OutputType};
use crate::storage::duckdb::DuckDbStorage;
use crate::storage::{MemoryStorage, Sink, StdoutSink, StorageError, WatermarkStore};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};

#[derive(Debug, Error)]
pub enum RunError {
    #[error(
        "config not found. Searched ~/.config/auditsync/config.yml and /etc/auditsync/config.yml; \
         use --config <path> or run 'auditsync config init' to generate one"
    )]
    ConfigNotFound,

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("unknown source '{0}'")]
    UnknownSource(String),

    #[error("{failed} of {total} source(s) failed")]
    SourcesFailed { failed: usize, total: usize },
}

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Only collect this source id.
    pub source: Option<String>,
    /// Keep watermarks in memory and print entries instead of storing them.
    pub dry_run: bool,
}

pub async fn run(config_path: Option<PathBuf>, options: RunOptions) -> Result<(), RunError> {
    let config_path = config_path.ok_or(RunError::ConfigNotFound)?;
    run_from_path(&config_path, &options).await.map(|_| ())
}

async fn run_from_path(config_path: &Path, options: &RunOptions) -> Result<Vec<PassSummary>, RunError> {
    info!(config_path = %config_path.display(), "Loading configuration");
    let config = load_config(config_path)?;
    run_sources(&config, options).await
}

/// Runs one pass per selected source, one after another.
///
/// A failing source does not stop the others; the error is logged and the
/// run as a whole reports `SourcesFailed` afterwards.
pub async fn run_sources(config: &Config, options: &RunOptions) -> Result<Vec<PassSummary>, RunError> {
    let (watermarks, sink) = open_storage(config, options.dry_run).await?;

    let selected: Vec<_> = match &options.source {
        Some(id) => {
            let source = config
                .sources
                .get(id)
                .ok_or_else(|| RunError::UnknownSource(id.clone()))?;
            vec![(id, source)]
        }
        None => config.sources.iter().collect(),
    };

    let total = selected.len();
    let mut summaries = Vec::with_capacity(total);
    let mut failed = 0;

    for (source_id, source) in selected {
        let key = source_key(&source.identity);
        info!(source_id = %source_id, source_key = %key, "Collecting source");

        let client = match FetchClient::new(&source.client_config()) {
            Ok(client) => client,
            Err(e) => {
                error!(source_id = %source_id, error = %e, "Failed to build API client");
                failed += 1;
                continue;
            }
        };
        let collector = Collector::new(key, Arc::new(client), watermarks.clone(), sink.clone())
            .with_lookback(source.lookback);

        match collector.collect().await {
            Ok(summary) => summaries.push(summary),
            Err(e) => {
                error!(source_id = %source_id, error = %e, "Collection pass failed");
                failed += 1;
            }
        }
    }

    if failed > 0 {
        return Err(RunError::SourcesFailed { failed, total });
    }

    info!(sources = total, "All sources collected");
    Ok(summaries)
}

async fn open_storage(
    config: &Config,
    dry_run: bool,
) -> Result<(Arc<dyn WatermarkStore>, Arc<dyn Sink>), RunError> {
    if dry_run {
        info!("Dry run: watermarks stay in memory, entries go to stdout");
        let watermarks: Arc<dyn WatermarkStore> = Arc::new(MemoryStorage::new());
        let sink: Arc<dyn Sink> = Arc::new(StdoutSink::new());
        return Ok((watermarks, sink));
    }

    info!(path = %config.storage.path.display(), "Initializing storage");
    let storage = Arc::new(DuckDbStorage::new(&config.storage.path)?);
    storage.init_schema().await?;

    let sink: Arc<dyn Sink> = match config.output.output_type {
        OutputType::Duckdb => storage.clone() as Arc<dyn Sink>,
        OutputType::Stdout => Arc::new(StdoutSink::new()),
    };
    let watermarks: Arc<dyn WatermarkStore> = storage;
    Ok((watermarks, sink))
}

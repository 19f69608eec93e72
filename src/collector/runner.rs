use super::clock::{Clock, SystemClock};
use crate::client::types::{format_timestamp, parse_timestamp};
use crate::client::{ClientError, PageRequest, PageSource, TimeWindow};
use crate::storage::{Sink, StorageError, WatermarkStore};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Name under which audit log watermarks are stored.
pub const CONNECTOR_NAME: &str = "zendesk_audit_logs";

/// Lookback used to seed a source that has never been collected.
pub const DEFAULT_LOOKBACK: Duration = Duration::from_secs(24 * 60 * 60);

pub fn source_key(identity: &str) -> String {
    format!("{}/{}", CONNECTOR_NAME, identity)
}

#[derive(Debug, Error)]
pub enum CollectorError {
    #[error("fetch error: {0}")]
    Client(#[from] ClientError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("lookback of {0:?} cannot be applied to the current time")]
    InvalidLookback(Duration),
}

/// Outcome of one successful collection pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassSummary {
    pub source_key: String,
    /// Watermark the pass started from.
    pub from: String,
    /// Watermark persisted at the end of the pass.
    pub to: String,
    pub pages: usize,
    pub entries: usize,
}

/// Drives one source from its stored watermark up to "now".
///
/// The first request of a pass filters on `created_at` between the watermark
/// and the pass start. Every later request follows the returned cursor and
/// nothing else, because the cursor already encodes the first request's filter.
/// Entries reach the sink page by page; the watermark moves only once the
/// last page has been delivered, so a failed pass is repeated in full.
pub struct Collector {
    source_key: String,
    pages: Arc<dyn PageSource>,
    watermarks: Arc<dyn WatermarkStore>,
    sink: Arc<dyn Sink>,
    clock: Arc<dyn Clock>,
    lookback: Duration,
}

impl Collector {
    pub fn new(
        source_key: impl Into<String>,
        pages: Arc<dyn PageSource>,
        watermarks: Arc<dyn WatermarkStore>,
        sink: Arc<dyn Sink>,
    ) -> Self {
        Self {
            source_key: source_key.into(),
            pages,
            watermarks,
            sink,
            clock: Arc::new(SystemClock),
            lookback: DEFAULT_LOOKBACK,
        }
    }

    pub fn with_lookback(mut self, lookback: Duration) -> Self {
        self.lookback = lookback;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn source_key(&self) -> &str {
        &self.source_key
    }

    /// Run one full pass.
    pub async fn collect(&self) -> Result<PassSummary, CollectorError> {
        // Fixed before any request so pagination never chases a moving "now".
        let now = self.clock.now();
        let to = format_timestamp(now);
        let from = self.resolve_watermark(now).await?;

        info!(source_key = %self.source_key, from = %from, to = %to, "Starting collection pass");

        let mut request = PageRequest::Window(TimeWindow::new(from.clone(), to.clone()));
        let mut pages = 0usize;
        let mut entries = 0usize;

        loop {
            let page = self.pages.fetch(request).await?;
            pages += 1;

            self.sink.save(&self.source_key, &page.entries).await?;
            entries += page.entries.len();

            debug!(
                source_key = %self.source_key,
                page = pages,
                entries = page.entries.len(),
                has_more = page.cursor.is_some(),
                "Delivered page"
            );

            match page.cursor {
                Some(cursor) => request = PageRequest::Cursor(cursor),
                None => break,
            }
        }

        self.warn_on_clock_skew(&from, now);
        let watermark = to;
        self.watermarks.set(&self.source_key, &watermark).await?;

        info!(
            source_key = %self.source_key,
            pages,
            entries,
            watermark = %watermark,
            "Collection pass complete"
        );

        Ok(PassSummary {
            source_key: self.source_key.clone(),
            from,
            to: watermark,
            pages,
            entries,
        })
    }

    /// Stored watermark, or `now - lookback` when none was ever stored.
    async fn resolve_watermark(&self, now: DateTime<Utc>) -> Result<String, CollectorError> {
        match self.watermarks.get(&self.source_key).await {
            Ok(watermark) => Ok(watermark),
            Err(StorageError::NotFound(_)) => {
                let lookback = chrono::Duration::from_std(self.lookback)
                    .map_err(|_| CollectorError::InvalidLookback(self.lookback))?;
                let seed = now
                    .checked_sub_signed(lookback)
                    .ok_or(CollectorError::InvalidLookback(self.lookback))?;
                let seed = format_timestamp(seed);
                info!(
                    source_key = %self.source_key,
                    watermark = %seed,
                    "No stored watermark, seeding from lookback"
                );
                Ok(seed)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// The pass start is persisted regardless; a stored watermark in the
    /// future only means an earlier pass ran on a skewed clock.
    fn warn_on_clock_skew(&self, from: &str, now: DateTime<Utc>) {
        if let Some(previous) = parse_timestamp(from) {
            if previous > now {
                warn!(
                    source_key = %self.source_key,
                    stored = %from,
                    now = %format_timestamp(now),
                    "Stored watermark is ahead of the clock, replacing it with the pass start"
                );
            }
        }
    }
}

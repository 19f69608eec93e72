use super::error::Result;
use super::types::{Page, PageRequest};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use std::time::Duration;

/// Used when a 429 carries no usable `Retry-After` header.
pub const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(1);

/// Anything that can return one page of audit logs for a request.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch(&self, request: PageRequest) -> Result<Page>;
}

/// Suspends the caller for the delay the server asked for.
#[async_trait]
pub trait Backoff: Send + Sync {
    async fn wait(&self, delay: Duration);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TokioBackoff;

#[async_trait]
impl Backoff for TokioBackoff {
    async fn wait(&self, delay: Duration) {
        tokio::time::sleep(delay).await;
    }
}

/// Reads `Retry-After` as whole seconds, falling back to `DEFAULT_RETRY_AFTER`.
pub fn retry_after(headers: &HeaderMap) -> Duration {
    headers
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_RETRY_AFTER)
}

#![allow(dead_code)]

use async_trait::async_trait;
use auditsync::client::{Backoff, ClientConfig, FetchClient};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wiremock::{Match, MockServer, Request};

pub const AUDIT_LOGS_PATH: &str = "/api/v2/audit_logs";

/// First fixture page: 3 entries and a cursor pointing at `next_page`.
pub fn page_one(next_page: &str) -> serde_json::Value {
    let raw = include_str!("../fixtures/audit_logs/001.json").replace("{{NEXT_PAGE}}", next_page);
    serde_json::from_str(&raw).unwrap()
}

/// Last fixture page: 1 entry and an empty cursor.
pub fn page_two() -> serde_json::Value {
    serde_json::from_str(include_str!("../fixtures/audit_logs/002.json")).unwrap()
}

pub fn cursor_url(server: &MockServer, cursor: &str) -> String {
    format!("{}{}?cursor={}", server.uri(), AUDIT_LOGS_PATH, cursor)
}

pub fn client_config(server: &MockServer, retry: bool) -> ClientConfig {
    ClientConfig {
        identity: "orgname".to_string(),
        username: "username".to_string(),
        token: "token".to_string(),
        retry,
        timeout: Duration::from_secs(5),
        api_base: Some(server.uri()),
    }
}

pub fn fetch_client(server: &MockServer, retry: bool, backoff: Arc<RecordingBackoff>) -> FetchClient {
    FetchClient::new(&client_config(server, retry))
        .unwrap()
        .with_backoff(backoff)
}

/// Records requested delays instead of sleeping.
#[derive(Default)]
pub struct RecordingBackoff {
    waits: Mutex<Vec<Duration>>,
}

impl RecordingBackoff {
    pub fn waits(&self) -> Vec<Duration> {
        self.waits.lock().unwrap().clone()
    }
}

#[async_trait]
impl Backoff for RecordingBackoff {
    async fn wait(&self, delay: Duration) {
        self.waits.lock().unwrap().push(delay);
    }
}

/// `filter[created_at][]` values of a request, in order.
pub fn created_at_filters(request: &Request) -> Vec<String> {
    request
        .url
        .query_pairs()
        .filter(|(key, _)| key == "filter[created_at][]")
        .map(|(_, value)| value.into_owned())
        .collect()
}

/// Matches the first request of a pass: both ends of the date window present.
pub struct DateWindow {
    pub from: String,
    pub to: String,
}

impl DateWindow {
    pub fn new(from: &str, to: &str) -> Self {
        Self {
            from: from.to_string(),
            to: to.to_string(),
        }
    }
}

impl Match for DateWindow {
    fn matches(&self, request: &Request) -> bool {
        created_at_filters(request) == vec![self.from.clone(), self.to.clone()]
    }
}

/// Matches any request carrying the date filter.
pub struct AnyDateWindow;

impl Match for AnyDateWindow {
    fn matches(&self, request: &Request) -> bool {
        !created_at_filters(request).is_empty()
    }
}

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use serde::Deserialize;
use std::fmt;

/// Wire format of every timestamp sent to or stored for the audit log API.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Query key the API expects twice, once for each end of the range.
pub const CREATED_AT_FILTER: &str = "filter[created_at][]";

pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Parses a wire timestamp. Returns `None` for anything not in `TIMESTAMP_FORMAT`.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT)
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// The `created_at` range used on the first request of a pass.
///
/// Kept as two named fields so both ends of the range always reach the wire,
/// even though they share a single query key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeWindow {
    pub from: String,
    pub to: String,
}

impl TimeWindow {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }

    pub fn query_pairs(&self) -> [(&'static str, &str); 2] {
        [
            (CREATED_AT_FILTER, self.from.as_str()),
            (CREATED_AT_FILTER, self.to.as_str()),
        ]
    }
}

/// Opaque continuation token returned by the API, usually a full next-page URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor(String);

impl Cursor {
    /// The API reports "no next page" as a missing field, `null` or `""`.
    /// All of them map to `None`.
    pub fn parse(raw: Option<&str>) -> Option<Cursor> {
        match raw {
            Some(value) if !value.is_empty() => Some(Cursor(value.to_string())),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Exactly one of a time window or a cursor governs each request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageRequest {
    Window(TimeWindow),
    Cursor(Cursor),
}

impl PageRequest {
    /// A cursor, when present, supersedes the window.
    pub fn new(cursor: Option<Cursor>, window: TimeWindow) -> Self {
        match cursor {
            Some(cursor) => PageRequest::Cursor(cursor),
            None => PageRequest::Window(window),
        }
    }

    pub fn is_cursor(&self) -> bool {
        matches!(self, PageRequest::Cursor(_))
    }
}

/// One page of audit log entries. Entries are passed through untouched.
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub entries: Vec<serde_json::Value>,
    pub cursor: Option<Cursor>,
}

impl Page {
    pub fn from_body(body: serde_json::Value) -> Result<Self, serde_json::Error> {
        let body: AuditLogsBody = serde_json::from_value(body)?;
        Ok(Self {
            entries: body.audit_logs.unwrap_or_default(),
            cursor: Cursor::parse(body.next_page.as_deref()),
        })
    }
}

#[derive(Debug, Deserialize)]
struct AuditLogsBody {
    #[serde(default)]
    audit_logs: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    next_page: Option<String>,
}

/// Decoded response returned by the retrying GET.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: serde_json::Value,
}

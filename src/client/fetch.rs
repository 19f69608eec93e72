use super::error::{ClientError, Result};
use super::traits::{retry_after, Backoff, PageSource, TokioBackoff};
use super::types::{HttpResponse, Page, PageRequest};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{StatusCode, Url};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const API_BASE_TEMPLATE: &str = "https://{identity}.zendesk.com";
const AUDIT_LOGS_PATH: &str = "/api/v2/audit_logs";

#[derive(Clone)]
pub struct ClientConfig {
    /// Tenant name pushed into the API host.
    pub identity: String,
    pub username: String,
    pub token: String,
    /// Retry automatically when rate limited.
    pub retry: bool,
    pub timeout: Duration,
    /// Replaces `https://{identity}.zendesk.com` when set.
    pub api_base: Option<String>,
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("identity", &self.identity)
            .field("username", &self.username)
            .field("token", &"<redacted>")
            .field("retry", &self.retry)
            .field("timeout", &self.timeout)
            .field("api_base", &self.api_base)
            .finish()
    }
}

/// Value of the `Authorization` header for Zendesk API token auth.
pub fn basic_auth_value(username: &str, token: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{}/token:{}", username, token)))
}

/// HTTP client for the audit log endpoint
pub struct FetchClient {
    client: reqwest::Client,
    base_url: String,
    base: Url,
    retry: bool,
    backoff: Arc<dyn Backoff>,
}

impl FetchClient {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let mut auth = HeaderValue::from_str(&basic_auth_value(&config.username, &config.token))
            .map_err(|e| ClientError::Config(format!("invalid credentials: {}", e)))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()?;

        let base_url = match &config.api_base {
            Some(base) => base.trim_end_matches('/').to_string(),
            None => API_BASE_TEMPLATE.replace("{identity}", &config.identity),
        };
        let base = Url::parse(&base_url)
            .map_err(|e| ClientError::Config(format!("invalid API base '{}': {}", base_url, e)))?;

        Ok(Self {
            client,
            base_url,
            base,
            retry: config.retry,
            backoff: Arc::new(TokioBackoff),
        })
    }

    pub fn with_backoff(mut self, backoff: Arc<dyn Backoff>) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn audit_logs_url(&self) -> String {
        format!("{}{}", self.base_url, AUDIT_LOGS_PATH)
    }

    /// Whether `url` points at the configured API host.
    pub fn is_same_origin(&self, url: &str) -> bool {
        Url::parse(url)
            .map(|u| u.origin() == self.base.origin())
            .unwrap_or(false)
    }

    /// GET `url`, waiting out 429s when retries are enabled.
    ///
    /// The same request is re-issued after each wait, for as long as the
    /// server keeps answering 429. Any other non-2xx status fails at once.
    pub async fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<HttpResponse> {
        loop {
            let mut request = self.client.get(url);
            if !query.is_empty() {
                request = request.query(query);
            }
            let response = request.send().await?;
            let status = response.status();

            if status == StatusCode::TOO_MANY_REQUESTS {
                warn!(url = %url, "Rate-limit was exceeded during request");
                if !self.retry {
                    return Err(ClientError::RateLimited {
                        url: url.to_string(),
                        status: status.as_u16(),
                        body: response.text().await.unwrap_or_default(),
                    });
                }

                let delay = retry_after(response.headers());
                debug!(url = %url, delay_secs = delay.as_secs(), "Waiting before retrying request");
                self.backoff.wait(delay).await;
                continue;
            }

            if !status.is_success() {
                return Err(ClientError::RequestFailed {
                    url: url.to_string(),
                    status: status.as_u16(),
                    body: response.text().await.unwrap_or_default(),
                });
            }

            let headers = response.headers().clone();
            let bytes = response.bytes().await?;
            let body = serde_json::from_slice(&bytes).map_err(|source| ClientError::Decode {
                url: url.to_string(),
                source,
            })?;

            return Ok(HttpResponse {
                status,
                headers,
                body,
            });
        }
    }

    /// Fetch one page of audit logs.
    pub async fn get_audit_logs(&self, request: &PageRequest) -> Result<Page> {
        let (url, response) = match request {
            PageRequest::Cursor(cursor) => {
                debug!(cursor = %cursor, "Collecting next page with provided cursor");
                let url = cursor.as_str().to_string();
                if !self.is_same_origin(&url) {
                    warn!(
                        cursor = %cursor,
                        base_url = %self.base_url,
                        "Cursor points outside the configured API host, credentials are sent anyway"
                    );
                }
                let response = self.get(&url, &[]).await?;
                (url, response)
            }
            PageRequest::Window(window) => {
                debug!(from = %window.from, to = %window.to, "Collecting first page");
                let url = self.audit_logs_url();
                let response = self.get(&url, &window.query_pairs()).await?;
                (url, response)
            }
        };

        Page::from_body(response.body).map_err(|source| ClientError::Decode { url, source })
    }
}

#[async_trait]
impl PageSource for FetchClient {
    async fn fetch(&self, request: PageRequest) -> Result<Page> {
        self.get_audit_logs(&request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(api_base: Option<&str>) -> ClientConfig {
        ClientConfig {
            identity: "orgname".to_string(),
            username: "username".to_string(),
            token: "token".to_string(),
            retry: true,
            timeout: Duration::from_secs(30),
            api_base: api_base.map(str::to_string),
        }
    }

    #[test]
    fn test_basic_auth_value() {
        // base64("username/token:token")
        assert_eq!(
            basic_auth_value("username", "token"),
            "Basic dXNlcm5hbWUvdG9rZW46dG9rZW4="
        );
    }

    #[test]
    fn test_client_builds_identity_url() {
        let client = FetchClient::new(&config(None)).unwrap();
        assert_eq!(client.base_url(), "https://orgname.zendesk.com");
        assert_eq!(
            client.audit_logs_url(),
            "https://orgname.zendesk.com/api/v2/audit_logs"
        );
    }

    #[test]
    fn test_client_honours_api_base_override() {
        let client = FetchClient::new(&config(Some("http://127.0.0.1:8080/"))).unwrap();
        assert_eq!(
            client.audit_logs_url(),
            "http://127.0.0.1:8080/api/v2/audit_logs"
        );
    }

    #[test]
    fn test_client_rejects_unparsable_api_base() {
        let err = FetchClient::new(&config(Some("http://"))).err().unwrap();
        assert!(matches!(err, ClientError::Config(ref msg) if msg.contains("invalid API base")));
    }

    #[test]
    fn test_same_origin_cursor() {
        let client = FetchClient::new(&config(None)).unwrap();
        assert!(client.is_same_origin("https://orgname.zendesk.com/api/v2/audit_logs?cursor=abc"));
        assert!(!client.is_same_origin("https://elsewhere.example.com/api/v2/audit_logs?cursor=abc"));
        assert!(!client.is_same_origin("http://orgname.zendesk.com/api/v2/audit_logs"));
        assert!(!client.is_same_origin("not a url"));
    }

    #[test]
    fn test_client_accepts_non_ascii_credentials() {
        let mut config = config(None);
        config.username = "usér\nname".to_string();
        assert!(FetchClient::new(&config).is_ok());
    }

    #[test]
    fn test_config_debug_redacts_token() {
        let mut config = config(None);
        config.token = "super-secret".to_string();
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("<redacted>"));
    }
}

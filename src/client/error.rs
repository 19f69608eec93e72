use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    /// A 429 was received while rate-limit retries are disabled.
    #[error("rate limit exceeded for {url} (status {status}, retries disabled): {body}")]
    RateLimited {
        url: String,
        status: u16,
        body: String,
    },

    #[error("request to {url} failed with status {status}: {body}")]
    RequestFailed {
        url: String,
        status: u16,
        body: String,
    },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid client configuration: {0}")]
    Config(String),
}

impl ClientError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, ClientError::RateLimited { .. })
    }

    /// HTTP status carried by the error, if the remote side answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::RateLimited { status, .. } | ClientError::RequestFailed { status, .. } => {
                Some(*status)
            }
            ClientError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;

use crate::client::ClientConfig;
use crate::collector::DEFAULT_LOOKBACK;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub sources: BTreeMap<String, SourceConfig>,
    pub storage: StorageConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Clone, Deserialize)]
pub struct SourceConfig {
    /// Tenant name, used to build the API host.
    pub identity: String,
    pub username: String,
    pub token: String,
    #[serde(default = "default_retry")]
    pub retry: bool,
    #[serde(default = "default_lookback", with = "humantime_serde")]
    pub lookback: Duration,
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,
    #[serde(default)]
    pub api_base: Option<String>,
}

impl SourceConfig {
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            identity: self.identity.clone(),
            username: self.username.clone(),
            token: self.token.clone(),
            retry: self.retry,
            timeout: self.timeout,
            api_base: self.api_base.clone(),
        }
    }
}

impl fmt::Debug for SourceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceConfig")
            .field("identity", &self.identity)
            .field("username", &self.username)
            .field("token", &"<redacted>")
            .field("retry", &self.retry)
            .field("lookback", &self.lookback)
            .field("timeout", &self.timeout)
            .field("api_base", &self.api_base)
            .finish()
    }
}

fn default_retry() -> bool {
    true
}

fn default_lookback() -> Duration {
    DEFAULT_LOOKBACK
}

fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub path: PathBuf,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputConfig {
    #[serde(rename = "type", default)]
    pub output_type: OutputType,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputType {
    #[default]
    Duckdb,
    Stdout,
}

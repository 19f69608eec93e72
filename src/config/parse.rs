use super::types::*;
use crate::config::{expand_env_vars, expand_tilde, env_var_pattern};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation failed:\n{}", .0.join("\n"))]
    ValidationList(Vec<String>),

    #[error("validation failed: {0}")]
    Validation(String),
}

pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let yaml_string = std::fs::read_to_string(path).map_err(|e| {
        ConfigError::Io(std::io::Error::new(
            e.kind(),
            format!("failed to read config file '{}': {}", path.display(), e),
        ))
    })?;

    parse_config(&yaml_string).map_err(|e| match e {
        ConfigError::YamlParse(e) => ConfigError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("in file '{}': {}", path.display(), e),
        )),
        other => other,
    })
}

/// Parse and validate a config held in memory.
pub fn parse_config(yaml: &str) -> Result<Config, ConfigError> {
    let yaml_string = expand_env_vars(yaml);
    check_unexpanded_vars(&yaml_string)?;

    let mut config: Config = serde_yaml::from_str(&yaml_string)?;
    config.storage.path = expand_tilde(&config.storage.path);

    validate_config(&config)?;
    Ok(config)
}

/// Checks for unexpanded environment variables and returns a helpful error
fn check_unexpanded_vars(yaml_string: &str) -> Result<(), ConfigError> {
    let mut unexpanded_vars: Vec<String> = env_var_pattern()
        .captures_iter(yaml_string)
        .filter_map(|cap| cap.get(1).map(|m| m.as_str().to_string()))
        .collect();

    if unexpanded_vars.is_empty() {
        return Ok(());
    }

    unexpanded_vars.sort();
    unexpanded_vars.dedup();

    let error_msg = if unexpanded_vars.len() == 1 {
        format!(
            "Environment variable $env{{{0}}} is not set.\n\
             \n\
             To fix this, either:\n\
             1. Set the environment variable: export {0}=...\n\
             2. Replace $env{{{0}}} in the config file with the actual value",
            unexpanded_vars[0]
        )
    } else {
        format!(
            "Environment variables are not set: {}\n\
             \n\
             Set them before running, or replace them in the config file.",
            unexpanded_vars.join(", ")
        )
    };

    Err(ConfigError::Validation(error_msg))
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let mut errors = Vec::new();

    if config.sources.is_empty() {
        errors.push("at least one source must be configured".to_string());
    }

    for (source_id, source) in &config.sources {
        if source.identity.trim().is_empty() {
            errors.push(format!("sources.{}: identity must not be empty", source_id));
        }
        if source.username.trim().is_empty() {
            errors.push(format!("sources.{}: username must not be empty", source_id));
        }
        if source.token.trim().is_empty() {
            errors.push(format!("sources.{}: token must not be empty", source_id));
        }
        if source.lookback.is_zero() {
            errors.push(format!("sources.{}: lookback must be greater than zero", source_id));
        }
        if let Some(api_base) = &source.api_base {
            if !api_base.starts_with("http://") && !api_base.starts_with("https://") {
                errors.push(format!(
                    "sources.{}: api_base '{}' must start with http:// or https://",
                    source_id, api_base
                ));
            }
        }
    }

    if config.storage.path.as_os_str().is_empty() {
        errors.push("storage.path must not be empty".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationList(errors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const MINIMAL: &str = r#"
sources:
  support:
    identity: orgname
    username: username
    token: token
storage:
  path: /tmp/auditsync.duckdb
"#;

    #[test]
    fn test_defaults() {
        let config = parse_config(MINIMAL).unwrap();
        let source = &config.sources["support"];

        assert!(source.retry);
        assert_eq!(source.lookback, Duration::from_secs(86400));
        assert_eq!(source.timeout, Duration::from_secs(30));
        assert_eq!(source.api_base, None);
        assert_eq!(config.output.output_type, OutputType::Duckdb);
    }

    #[test]
    fn test_full_source() {
        let yaml = r#"
sources:
  support:
    identity: orgname
    username: username
    token: token
    retry: false
    lookback: 7d
    timeout: 10s
    api_base: http://127.0.0.1:9000
storage:
  path: /tmp/auditsync.duckdb
output:
  type: stdout
"#;
        let config = parse_config(yaml).unwrap();
        let source = &config.sources["support"];

        assert!(!source.retry);
        assert_eq!(source.lookback, Duration::from_secs(7 * 86400));
        assert_eq!(source.timeout, Duration::from_secs(10));
        assert_eq!(source.api_base.as_deref(), Some("http://127.0.0.1:9000"));
        assert_eq!(config.output.output_type, OutputType::Stdout);

        let client = source.client_config();
        assert!(!client.retry);
        assert_eq!(client.identity, "orgname");
    }

    #[test]
    fn test_token_from_env() {
        std::env::set_var("AUDITSYNC_TEST_TOKEN", "from-env");
        let yaml = MINIMAL.replace("token: token", "token: $env{AUDITSYNC_TEST_TOKEN}");
        let config = parse_config(&yaml).unwrap();
        assert_eq!(config.sources["support"].token, "from-env");
        std::env::remove_var("AUDITSYNC_TEST_TOKEN");
    }

    #[test]
    fn test_unset_env_var_is_reported() {
        let yaml = MINIMAL.replace("token: token", "token: $env{AUDITSYNC_DEFINITELY_UNSET}");
        let err = parse_config(&yaml).unwrap_err();
        assert!(err.to_string().contains("AUDITSYNC_DEFINITELY_UNSET"));
    }

    #[test]
    fn test_validation_collects_all_errors() {
        let yaml = r#"
sources:
  broken:
    identity: ""
    username: ""
    token: token
    lookback: 0s
    api_base: ftp://example.com
storage:
  path: /tmp/auditsync.duckdb
"#;
        match parse_config(yaml).unwrap_err() {
            ConfigError::ValidationList(errors) => {
                assert_eq!(errors.len(), 4);
                assert!(errors.iter().any(|e| e.contains("identity")));
                assert!(errors.iter().any(|e| e.contains("username")));
                assert!(errors.iter().any(|e| e.contains("lookback")));
                assert!(errors.iter().any(|e| e.contains("api_base")));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_no_sources() {
        let yaml = "sources: {}\nstorage:\n  path: /tmp/x.duckdb\n";
        assert!(matches!(
            parse_config(yaml).unwrap_err(),
            ConfigError::ValidationList(_)
        ));
    }

    #[test]
    fn test_debug_redacts_token() {
        let yaml = MINIMAL.replace("token: token", "token: hunter2");
        let config = parse_config(&yaml).unwrap();
        assert!(!format!("{:?}", config).contains("hunter2"));
    }
}

pub mod generate;
pub mod parse;
pub mod types;

use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

pub use parse::{load_config, parse_config, ConfigError};
pub use types::{Config, OutputType, SourceConfig};

const USER_CONFIG: &str = ".config/auditsync/config.yml";
const SYSTEM_CONFIG: &str = "/etc/auditsync/config.yml";

/// Matches `$env{VAR_NAME}`, capturing the variable name.
pub(crate) fn env_var_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\$env\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("env var pattern is valid")
    })
}

/// Expands environment variables in a string.
/// Supports $env{VAR_NAME} syntax.
/// If an environment variable is not set, it's left unchanged.
pub fn expand_env_vars(text: &str) -> String {
    env_var_pattern()
        .replace_all(text, |caps: &regex::Captures| {
            std::env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_string())
        })
        .to_string()
}

/// Expands a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
    let path_str = path.to_string_lossy();

    if let Some(rest) = path_str.strip_prefix("~/") {
        if let Some(home_dir) = dirs::home_dir() {
            return home_dir.join(rest);
        }
    } else if path_str == "~" {
        if let Some(home_dir) = dirs::home_dir() {
            return home_dir;
        }
    }

    path.to_path_buf()
}

/// Resolves the config file path based on explicit argument or default locations.
/// Returns the first existing path from:
/// 1. Explicit path (if provided, with tilde expansion)
/// 2. ~/.config/auditsync/config.yml
/// 3. /etc/auditsync/config.yml
pub fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(expand_tilde(path));
    }

    if let Some(user_config) = user_config_path() {
        if user_config.exists() {
            return Some(user_config);
        }
    }

    let system_config = PathBuf::from(SYSTEM_CONFIG);
    if system_config.exists() {
        return Some(system_config);
    }

    None
}

pub fn user_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(USER_CONFIG))
}

pub fn system_config_path() -> PathBuf {
    PathBuf::from(SYSTEM_CONFIG)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_expand_env_vars_single() {
        std::env::set_var("AUDITSYNC_TEST_VAR", "test_value");
        let result = expand_env_vars("token: $env{AUDITSYNC_TEST_VAR}");
        assert_eq!(result, "token: test_value");
        std::env::remove_var("AUDITSYNC_TEST_VAR");
    }

    #[test]
    fn test_expand_env_vars_partial() {
        std::env::set_var("AUDITSYNC_SET_VAR", "exists");
        let result = expand_env_vars("$env{AUDITSYNC_SET_VAR}/$env{AUDITSYNC_UNSET_VAR}");
        assert_eq!(result, "exists/$env{AUDITSYNC_UNSET_VAR}");
        std::env::remove_var("AUDITSYNC_SET_VAR");
    }

    #[test]
    fn test_expand_env_vars_no_expansion() {
        let result = expand_env_vars("plain: value");
        assert_eq!(result, "plain: value");
    }

    #[test]
    fn test_expand_tilde_with_path() {
        let expanded = expand_tilde(Path::new("~/data/auditsync.duckdb"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expanded, home.join("data/auditsync.duckdb"));
        }
    }

    #[test]
    fn test_expand_tilde_no_expansion() {
        let expanded = expand_tilde(Path::new("/var/lib/auditsync.duckdb"));
        assert_eq!(expanded, Path::new("/var/lib/auditsync.duckdb"));
    }

    #[test]
    fn test_resolve_explicit_path() {
        let resolved = resolve_config_path(Some(Path::new("/opt/auditsync.yml")));
        assert_eq!(resolved, Some(PathBuf::from("/opt/auditsync.yml")));
    }
}

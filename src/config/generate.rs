pub fn generate_starter_config() -> String {
    r#"# =============================================================================
# AUDITSYNC CONFIGURATION
# =============================================================================
# Each source is one Zendesk account whose audit log is collected
# incrementally. Progress is tracked with a watermark per account, so every
# run only fetches entries created since the previous successful run.
#
# Config file locations (in order of precedence):
#   1. Path specified via --config argument
#   2. ~/.config/auditsync/config.yml
#   3. /etc/auditsync/config.yml
#
# Any value may reference an environment variable as $env{...}.

# =============================================================================
# SOURCES
# =============================================================================

sources:
  support:
    # Zendesk subdomain, i.e. https://<identity>.zendesk.com
    identity: example
    # Agent email used together with the API token
    username: admin@example.com
    token: $env{ZENDESK_API_TOKEN}
    # Wait out HTTP 429 responses for as long as Retry-After asks.
    # When false, a rate-limited request fails the run instead.
    retry: true
    # How far back the very first run reaches
    lookback: 1d
    # Per-request timeout
    timeout: 30s
    # Optional: override the API host (proxies, testing)
    # api_base: https://example.zendesk.com

# =============================================================================
# STORAGE
# =============================================================================
# Watermarks are always kept here. Entries are stored here too unless
# output.type is stdout.

storage:
  path: ~/.local/share/auditsync/auditsync.duckdb

# =============================================================================
# OUTPUT
# =============================================================================
# duckdb: append entries to the audit_log_entries table
# stdout: print one JSON line per entry

output:
  type: duckdb
"#
    .to_string()
}

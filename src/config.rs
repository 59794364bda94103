//! Configuration management
//!
//! Secrets and endpoints come from the environment (.env supported); tunable
//! thresholds come from an optional TOML file, with env overrides for the
//! timing knobs. Everything is resolved once at startup and immutable for the
//! process lifetime. A missing credential is a fatal startup error, never
//! retried.

use crate::filter::FilterConfig;
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Fully resolved process configuration.
#[derive(Debug, Clone)]
pub struct ScannerConfig {
    pub telegram_bot_token: String,
    pub telegram_chat_id: String,
    pub api_base_url: Option<String>,
    pub page_limit: u32,
    pub scan_interval: Duration,
    pub heartbeat_interval: Duration,
    pub seen_expiry: Duration,
    pub request_timeout: Duration,
    pub shutdown_grace: Duration,
    pub retry_max_attempts: u32,
    pub retry_base_delay: Duration,
    pub filter: FilterConfig,
}

/// TOML file shape: `[scanner]` timing knobs plus `[filter]` thresholds.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub scanner: ScannerSection,
    #[serde(default)]
    pub filter: Option<FilterConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScannerSection {
    #[serde(default = "default_scan_interval_secs")]
    pub scan_interval_secs: u64,
    #[serde(default = "default_heartbeat_interval_secs")]
    pub heartbeat_interval_secs: u64,
    #[serde(default = "default_seen_expiry_secs")]
    pub seen_expiry_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,
    #[serde(default = "default_page_limit")]
    pub page_limit: u32,
    #[serde(default = "default_retry_max_attempts")]
    pub retry_max_attempts: u32,
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
}

fn default_scan_interval_secs() -> u64 {
    20
}
fn default_heartbeat_interval_secs() -> u64 {
    3600
}
fn default_seen_expiry_secs() -> u64 {
    86_400
}
fn default_request_timeout_secs() -> u64 {
    10
}
fn default_shutdown_grace_secs() -> u64 {
    15
}
fn default_page_limit() -> u32 {
    50
}
fn default_retry_max_attempts() -> u32 {
    3
}
fn default_retry_base_delay_ms() -> u64 {
    500
}

impl Default for ScannerSection {
    fn default() -> Self {
        Self {
            scan_interval_secs: default_scan_interval_secs(),
            heartbeat_interval_secs: default_heartbeat_interval_secs(),
            seen_expiry_secs: default_seen_expiry_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            shutdown_grace_secs: default_shutdown_grace_secs(),
            page_limit: default_page_limit(),
            retry_max_attempts: default_retry_max_attempts(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
        }
    }
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content).context("Failed to parse TOML configuration")
    }
}

fn env_u64(key: &str) -> Result<Option<u64>> {
    match std::env::var(key) {
        Ok(raw) => {
            let parsed = raw
                .parse::<u64>()
                .with_context(|| format!("{} must be an integer, got '{}'", key, raw))?;
            Ok(Some(parsed))
        }
        Err(_) => Ok(None),
    }
}

/// Load configuration: `.env` + environment for secrets and endpoints,
/// optional TOML file for thresholds, env overrides for timing.
pub fn load_config(config_file: Option<&Path>) -> Result<ScannerConfig> {
    dotenv::dotenv().ok();

    let telegram_bot_token =
        std::env::var("TELEGRAM_BOT_TOKEN").context("TELEGRAM_BOT_TOKEN not set")?;
    let telegram_chat_id =
        std::env::var("TELEGRAM_CHAT_ID").context("TELEGRAM_CHAT_ID not set")?;
    if telegram_bot_token.trim().is_empty() {
        bail!("TELEGRAM_BOT_TOKEN is empty");
    }
    if telegram_chat_id.trim().is_empty() {
        bail!("TELEGRAM_CHAT_ID is empty");
    }

    let api_base_url = std::env::var("LAUNCHPAD_API_URL").ok();
    if let Some(url) = &api_base_url {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            bail!("LAUNCHPAD_API_URL must be an http(s) URL, got '{}'", url);
        }
    }

    let file = match config_file {
        Some(path) => FileConfig::load(path)?,
        None => FileConfig::default(),
    };
    let scanner = file.scanner;

    let scan_interval_secs = env_u64("SCAN_INTERVAL_SECS")?.unwrap_or(scanner.scan_interval_secs);
    let heartbeat_interval_secs =
        env_u64("HEARTBEAT_INTERVAL_SECS")?.unwrap_or(scanner.heartbeat_interval_secs);
    let seen_expiry_secs = env_u64("SEEN_EXPIRY_SECS")?.unwrap_or(scanner.seen_expiry_secs);

    if scan_interval_secs == 0 {
        bail!("scan interval must be positive");
    }
    if heartbeat_interval_secs == 0 {
        bail!("heartbeat interval must be positive");
    }

    Ok(ScannerConfig {
        telegram_bot_token,
        telegram_chat_id,
        api_base_url,
        page_limit: scanner.page_limit,
        scan_interval: Duration::from_secs(scan_interval_secs),
        heartbeat_interval: Duration::from_secs(heartbeat_interval_secs),
        seen_expiry: Duration::from_secs(seen_expiry_secs),
        request_timeout: Duration::from_secs(scanner.request_timeout_secs),
        shutdown_grace: Duration::from_secs(scanner.shutdown_grace_secs),
        retry_max_attempts: scanner.retry_max_attempts,
        retry_base_delay: Duration::from_millis(scanner.retry_base_delay_ms),
        filter: file.filter.unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_toml_with_overrides() {
        let toml_str = r#"
[scanner]
scan_interval_secs = 30
heartbeat_interval_secs = 1800

[filter]
min_liquidity_sol = 10.0
blacklist_keywords = ["honeypot"]
"#;
        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.scanner.scan_interval_secs, 30);
        assert_eq!(config.scanner.heartbeat_interval_secs, 1800);
        // Unspecified keys fall back to defaults
        assert_eq!(config.scanner.seen_expiry_secs, 86_400);
        assert_eq!(config.scanner.page_limit, 50);

        let filter = config.filter.unwrap();
        assert_eq!(filter.min_liquidity_sol, 10.0);
        assert_eq!(filter.blacklist_keywords, vec!["honeypot".to_string()]);
        // Filter defaults still apply to omitted fields
        assert_eq!(filter.min_age_secs, 45);
    }

    #[test]
    fn test_empty_toml_is_all_defaults() {
        let config: FileConfig = toml::from_str("").unwrap();
        assert_eq!(config.scanner.scan_interval_secs, 20);
        assert!(config.filter.is_none());
    }
}

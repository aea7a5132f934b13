//! Healthwatch Configuration
//!
//! Loads and saves the configuration from `~/.healthwatch/healthwatch.json`.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::types::{default_config, WatchConfig};

/// Config file name within the healthwatch directory.
const CONFIG_FILENAME: &str = "healthwatch.json";

/// Returns the healthwatch state directory: `~/.healthwatch`.
pub fn get_watch_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("/root"))
        .join(".healthwatch")
}

/// Returns the full path to the config file: `~/.healthwatch/healthwatch.json`.
pub fn get_config_path() -> PathBuf {
    get_watch_dir().join(CONFIG_FILENAME)
}

/// Load the config from disk.
///
/// Reads `~/.healthwatch/healthwatch.json` and merges missing fields
/// with defaults, so a hand-edited file only needs to carry the fields
/// the operator cares about.
///
/// Returns `None` if the config file does not exist or cannot be parsed.
pub fn load_config() -> Option<WatchConfig> {
    let config_path = get_config_path();
    if !config_path.exists() {
        return None;
    }

    let contents = fs::read_to_string(&config_path).ok()?;
    parse_config(&contents)
}

/// Parse a config document and merge defaults for unset fields.
pub fn parse_config(contents: &str) -> Option<WatchConfig> {
    let mut config: WatchConfig = serde_json::from_str(contents).ok()?;

    let defaults = default_config();

    if config.listen_addr.is_empty() {
        config.listen_addr = defaults.listen_addr;
    }
    if config.db_path.is_empty() {
        config.db_path = defaults.db_path;
    }
    if config.sweep_schedule.is_empty() {
        config.sweep_schedule = defaults.sweep_schedule;
    }
    if config.tick_interval_secs == 0 {
        config.tick_interval_secs = defaults.tick_interval_secs;
    }
    if config.api_url.is_empty() {
        config.api_url = defaults.api_url;
    }
    if config.archive_path.is_empty() {
        config.archive_path = defaults.archive_path;
    }
    if config.version.is_empty() {
        config.version = defaults.version;
    }

    Some(config)
}

/// Save the config to disk at `~/.healthwatch/healthwatch.json`.
///
/// Creates the healthwatch directory with mode 0o700 if it does not
/// exist. The config file is written with mode 0o600 since it carries
/// the shared api token.
pub fn save_config(config: &WatchConfig) -> Result<()> {
    let dir = get_watch_dir();
    if !dir.exists() {
        fs::create_dir_all(&dir).context("Failed to create healthwatch directory")?;
        fs::set_permissions(&dir, fs::Permissions::from_mode(0o700))?;
    }

    let config_path = get_config_path();
    let json = serde_json::to_string_pretty(config).context("Failed to serialize config")?;

    fs::write(&config_path, &json).context("Failed to write config file")?;
    fs::set_permissions(&config_path, fs::Permissions::from_mode(0o600))?;

    Ok(())
}

/// Resolve a path that may start with `~` to an absolute path.
///
/// If the path starts with `~`, the tilde is replaced with the user's
/// home directory. Otherwise the path is returned as-is.
pub fn resolve_path(p: &str) -> String {
    if let Some(rest) = p.strip_prefix('~') {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("/root"));
        let rest = rest.strip_prefix('/').unwrap_or(rest);
        home.join(rest).to_string_lossy().to_string()
    } else {
        p.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LogLevel;

    #[test]
    fn test_resolve_path_with_tilde() {
        let resolved = resolve_path("~/some/path");
        assert!(!resolved.starts_with('~'));
        assert!(resolved.ends_with("some/path"));
    }

    #[test]
    fn test_resolve_path_without_tilde() {
        let path = "/absolute/path/to/file";
        assert_eq!(resolve_path(path), path);
    }

    #[test]
    fn test_default_config_values() {
        let config = default_config();
        assert_eq!(config.listen_addr, "127.0.0.1:8473");
        assert_eq!(config.sweep_schedule, "0 0 * * * *");
        assert_eq!(config.tick_interval_secs, 60);
        assert_eq!(config.log_level, LogLevel::Info);
        assert!(config.api_token.is_empty());
        assert!(!config.squelch);
    }

    #[test]
    fn test_config_uses_camel_case_keys() {
        let json = r#"{
            "listenAddr": "0.0.0.0:9000",
            "apiToken": "secret",
            "dbPath": "~/.healthwatch/watch.db",
            "sweepSchedule": "0 0 * * * *",
            "tickIntervalSecs": 30,
            "logLevel": "warn",
            "apiUrl": "https://watch.example.org",
            "webhookUrl": "https://hooks.example.org/alerts",
            "squelch": true,
            "archivePath": "~/.healthwatch/logs/alert_log",
            "version": "0.1.0"
        }"#;
        let config: WatchConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.listen_addr, "0.0.0.0:9000");
        assert_eq!(config.api_token, "secret");
        assert_eq!(config.tick_interval_secs, 30);
        assert_eq!(config.log_level, LogLevel::Warn);
        assert_eq!(
            config.webhook_url.as_deref(),
            Some("https://hooks.example.org/alerts")
        );
        assert!(config.squelch);
    }

    #[test]
    fn test_parse_config_fills_empty_fields_with_defaults() {
        let json = r#"{
            "listenAddr": "",
            "apiToken": "secret",
            "dbPath": "",
            "sweepSchedule": "",
            "tickIntervalSecs": 0,
            "logLevel": "info",
            "apiUrl": "",
            "squelch": false,
            "archivePath": "",
            "version": ""
        }"#;
        let config = parse_config(json).unwrap();
        let defaults = default_config();

        assert_eq!(config.listen_addr, defaults.listen_addr);
        assert_eq!(config.db_path, defaults.db_path);
        assert_eq!(config.sweep_schedule, defaults.sweep_schedule);
        assert_eq!(config.tick_interval_secs, defaults.tick_interval_secs);
        assert_eq!(config.api_url, defaults.api_url);
        assert_eq!(config.archive_path, defaults.archive_path);
        assert_eq!(config.version, defaults.version);
        // Operator-set fields survive the merge
        assert_eq!(config.api_token, "secret");
    }

    #[test]
    fn test_parse_config_rejects_malformed_json() {
        assert!(parse_config("{not json").is_none());
    }
}

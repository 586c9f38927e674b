use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::notice::Notice;

pub const DEFAULT_ENV_KEY: &str = "SERVICE_NAME";
pub const DEFAULT_ENV_VALUE: &str = "SageMakerUnifiedStudio";
pub const DEFAULT_STATUS_FILE: &str = "/tmp/.post-startup-status.json";
/// Quiet period before a file event is delivered, so partial writes are never read.
pub const DEFAULT_STABILITY_THRESHOLD_MS: u64 = 2000;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;
pub const MIN_POLL_INTERVAL_MS: u64 = 10;

/// Root configuration structure. Deserialized from `<data dir>/post-startup-notifier/config.toml`.
#[derive(Debug, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub activation: ActivationConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default = "default_notices")]
    pub notices: Vec<Notice>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            activation: ActivationConfig::default(),
            monitor: MonitorConfig::default(),
            notices: default_notices(),
        }
    }
}

/// Environment variable that must hold `env_value` for the daemon to do any work.
#[derive(Debug, Deserialize, PartialEq)]
pub struct ActivationConfig {
    #[serde(default = "default_env_key")]
    pub env_key: String,
    #[serde(default = "default_env_value")]
    pub env_value: String,
}

impl Default for ActivationConfig {
    fn default() -> Self {
        Self {
            env_key: DEFAULT_ENV_KEY.to_string(),
            env_value: DEFAULT_ENV_VALUE.to_string(),
        }
    }
}

impl ActivationConfig {
    /// Returns true when `value` (the current value of `env_key`) matches exactly.
    pub fn matches(&self, value: Option<&str>) -> bool {
        value == Some(self.env_value.as_str())
    }

    /// Checks the gate against the process environment.
    pub fn is_active(&self) -> bool {
        self.matches(std::env::var(&self.env_key).ok().as_deref())
    }
}

#[derive(Debug, Deserialize, PartialEq)]
pub struct MonitorConfig {
    /// Absolute path of the status file written by the startup scripts.
    #[serde(default = "default_status_file")]
    pub status_file: PathBuf,
    #[serde(default = "default_stability_threshold")]
    pub stability_threshold_ms: u64,
    /// Clamped to at least [`MIN_POLL_INTERVAL_MS`].
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            status_file: default_status_file(),
            stability_threshold_ms: DEFAULT_STABILITY_THRESHOLD_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl MonitorConfig {
    pub fn stability_threshold(&self) -> Duration {
        Duration::from_millis(self.stability_threshold_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(MIN_POLL_INTERVAL_MS))
    }
}

/// Loads the config file at `path`, returning `Config::default()` if the file does not exist.
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_or_default(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

fn default_env_key() -> String {
    DEFAULT_ENV_KEY.to_string()
}

fn default_env_value() -> String {
    DEFAULT_ENV_VALUE.to_string()
}

fn default_status_file() -> PathBuf {
    PathBuf::from(DEFAULT_STATUS_FILE)
}

fn default_stability_threshold() -> u64 {
    DEFAULT_STABILITY_THRESHOLD_MS
}

fn default_poll_interval() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

fn default_notices() -> Vec<Notice> {
    vec![Notice::q_cli()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notice::Q_CLI_NOTICE_ID;

    // ── defaults ──────────────────────────────────────────────────────────────

    #[test]
    fn monitor_config_default_values() {
        let m = MonitorConfig::default();
        assert_eq!(m.status_file, PathBuf::from(DEFAULT_STATUS_FILE));
        assert_eq!(m.stability_threshold(), Duration::from_millis(2000));
        assert_eq!(m.poll_interval(), Duration::from_millis(100));
    }

    #[test]
    fn config_default_has_q_cli_notice() {
        let c = Config::default();
        assert_eq!(c.notices.len(), 1);
        assert_eq!(c.notices[0].id, Q_CLI_NOTICE_ID);
    }

    #[test]
    fn poll_interval_is_clamped_to_minimum() {
        let m = MonitorConfig {
            poll_interval_ms: 0,
            ..Default::default()
        };
        assert_eq!(m.poll_interval(), Duration::from_millis(MIN_POLL_INTERVAL_MS));
    }

    // ── activation ────────────────────────────────────────────────────────────

    #[test]
    fn activation_matches_exact_value_only() {
        let a = ActivationConfig::default();
        assert!(a.matches(Some(DEFAULT_ENV_VALUE)));
        assert!(!a.matches(Some("wrong-value")));
        assert!(!a.matches(Some("")));
        assert!(!a.matches(None));
    }

    #[test]
    fn activation_reads_process_environment() {
        let a = ActivationConfig {
            env_key: "POST_STARTUP_NOTIFIER_TEST_GATE".to_string(),
            env_value: "on".to_string(),
        };
        assert!(!a.is_active());
    }

    // ── load_or_default ───────────────────────────────────────────────────────

    #[test]
    fn load_or_default_missing_file_returns_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nonexistent.toml");
        let config = load_or_default(&path).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn load_or_default_parses_valid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[activation]
env_key = "APP_ENV"
env_value = "studio"

[monitor]
status_file = "/var/run/startup.json"
stability_threshold_ms = 500
poll_interval_ms = 50

[[notices]]
id = "welcome"
message = "Welcome aboard"
"#,
        )
        .unwrap();

        let config = load_or_default(&path).unwrap();
        assert_eq!(config.activation.env_key, "APP_ENV");
        assert_eq!(config.activation.env_value, "studio");
        assert_eq!(config.monitor.status_file, PathBuf::from("/var/run/startup.json"));
        assert_eq!(config.monitor.stability_threshold_ms, 500);
        assert_eq!(config.monitor.poll_interval_ms, 50);
        assert_eq!(config.notices.len(), 1);
        assert_eq!(config.notices[0].id, "welcome");
        assert!(config.notices[0].action.is_none());
    }

    #[test]
    fn load_or_default_partial_toml_uses_field_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        // Only override one field; the rest should get their defaults.
        std::fs::write(&path, "[monitor]\nstability_threshold_ms = 750\n").unwrap();

        let config = load_or_default(&path).unwrap();
        assert_eq!(config.monitor.stability_threshold_ms, 750);
        assert_eq!(config.monitor.poll_interval_ms, DEFAULT_POLL_INTERVAL_MS);
        assert_eq!(config.monitor.status_file, PathBuf::from(DEFAULT_STATUS_FILE));
        assert_eq!(config.activation, ActivationConfig::default());
        assert_eq!(config.notices, default_notices());
    }

    #[test]
    fn load_or_default_empty_notice_list_disables_notices() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "notices = []\n").unwrap();

        let config = load_or_default(&path).unwrap();
        assert!(config.notices.is_empty());
    }

    #[test]
    fn load_or_default_invalid_toml_returns_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "this is not valid toml ][[[").unwrap();
        assert!(load_or_default(&path).is_err());
    }
}

//! Configuration management for cf-ddns.

use crate::error::{DdnsError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Cloudflare API v4 base URL.
pub const DEFAULT_API_BASE_URL: &str = "https://api.cloudflare.com/client/v4";

/// Main configuration structure.
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// API token (or environment variable name if prefixed with $).
    #[serde(default)]
    pub api_token: String,

    /// Zone ID.
    #[serde(default)]
    pub zone_id: String,

    /// DNS record name (e.g., "home.example.com").
    #[serde(default)]
    pub record_name: String,

    /// Check interval in seconds (default: 60).
    #[serde(default = "default_interval")]
    pub check_interval_secs: u64,

    /// IP detection services, tried in order.
    #[serde(default = "default_ip_services")]
    pub ip_services: Vec<String>,

    /// Provider API base URL.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Log filter used when RUST_LOG is not set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_interval() -> u64 {
    60
}

fn default_ip_services() -> Vec<String> {
    vec!["https://icanhazip.com".to_string()]
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_token: String::new(),
            zone_id: String::new(),
            record_name: String::new(),
            check_interval_secs: default_interval(),
            ip_services: default_ip_services(),
            api_base_url: default_api_base_url(),
            log_level: default_log_level(),
        }
    }
}

// Keeps the token out of logs.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("api_token", &"<REDACTED>")
            .field("zone_id", &self.zone_id)
            .field("record_name", &self.record_name)
            .field("check_interval_secs", &self.check_interval_secs)
            .field("ip_services", &self.ip_services)
            .field("api_base_url", &self.api_base_url)
            .field("log_level", &self.log_level)
            .finish()
    }
}

impl Config {
    /// Get the default config file path.
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| DdnsError::Config("Could not find config directory".to_string()))?;

        Ok(config_dir.join("cf-ddns").join("config.toml"))
    }

    /// Load configuration from a specific path.
    ///
    /// A missing file is not an error; defaults are returned instead.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text, resolving `$VAR` references.
    pub fn from_toml(content: &str) -> Result<Self> {
        let mut config: Config = toml::from_str(content)?;
        config.api_token = resolve_env(&config.api_token);
        config.zone_id = resolve_env(&config.zone_id);
        config.record_name = resolve_env(&config.record_name);
        config.set_interval(config.check_interval_secs)?;
        Ok(config)
    }

    /// Set the poll interval. Zero would turn the loop into a busy poll.
    pub fn set_interval(&mut self, secs: u64) -> Result<()> {
        if secs == 0 {
            return Err(DdnsError::Config(
                "check_interval_secs must be at least 1".to_string(),
            ));
        }
        self.check_interval_secs = secs;
        Ok(())
    }

    /// Override the record settings with values given on the command line
    /// or through the `APIKey`, `Zone` and `RecordName` environment variables.
    pub fn merge_overrides(
        &mut self,
        api_token: Option<String>,
        zone_id: Option<String>,
        record_name: Option<String>,
    ) {
        if let Some(token) = api_token {
            self.api_token = token;
        }
        if let Some(zone) = zone_id {
            self.zone_id = zone;
        }
        if let Some(name) = record_name {
            self.record_name = name;
        }
    }

    /// Names of the required settings that are still empty.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.api_token.is_empty() {
            missing.push("api_token");
        }
        if self.zone_id.is_empty() {
            missing.push("zone_id");
        }
        if self.record_name.is_empty() {
            missing.push("record_name");
        }
        missing
    }

    /// Poll interval as a duration.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs)
    }

    /// Render as TOML.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Generate example configuration.
    pub fn example() -> Self {
        Self {
            api_token: "$CF_API_TOKEN".to_string(),
            zone_id: "your-zone-id".to_string(),
            record_name: "home.example.com".to_string(),
            ..Self::default()
        }
    }
}

/// Resolve environment variable references (values starting with $).
pub(crate) fn resolve_env(value: &str) -> String {
    if let Some(var_name) = value.strip_prefix('$') {
        std::env::var(var_name).unwrap_or_else(|_| {
            tracing::warn!("Environment variable {} not set", var_name);
            value.to_string()
        })
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.check_interval_secs, 60);
        assert_eq!(config.interval(), Duration::from_secs(60));
        assert_eq!(config.ip_services, vec!["https://icanhazip.com"]);
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(
            config.missing_fields(),
            vec!["api_token", "zone_id", "record_name"]
        );
    }

    #[test]
    fn test_parse_minimal_toml() {
        let config = Config::from_toml(
            r#"
            api_token = "tok"
            zone_id = "zone-1"
            record_name = "home.example.com"
            "#,
        )
        .unwrap();

        assert_eq!(config.zone_id, "zone-1");
        assert_eq!(config.record_name, "home.example.com");
        assert_eq!(config.check_interval_secs, 60);
        assert!(config.missing_fields().is_empty());
    }

    #[test]
    fn test_parse_invalid_toml() {
        let result = Config::from_toml("check_interval_secs = \"soon\"");
        assert!(matches!(result, Err(DdnsError::Config(_))));
    }

    #[test]
    fn test_token_from_env() {
        std::env::set_var("TEST_CF_DDNS_TOKEN", "from-env");
        let config = Config::from_toml(r#"api_token = "$TEST_CF_DDNS_TOKEN""#).unwrap();
        std::env::remove_var("TEST_CF_DDNS_TOKEN");

        assert_eq!(config.api_token, "from-env");
    }

    #[test]
    fn test_resolve_env_with_missing_var() {
        assert_eq!(resolve_env("$NONEXISTENT_VAR_12345"), "$NONEXISTENT_VAR_12345");
        assert_eq!(resolve_env("plain_value"), "plain_value");
    }

    #[test]
    fn test_overrides_win() {
        let mut config = Config::example();
        config.merge_overrides(Some("tok".to_string()), None, Some("vpn.example.com".to_string()));

        assert_eq!(config.api_token, "tok");
        assert_eq!(config.zone_id, "your-zone-id");
        assert_eq!(config.record_name, "vpn.example.com");
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let config = Config::load_from(Path::new("/nonexistent/cf-ddns/config.toml")).unwrap();
        assert!(config.api_token.is_empty());
    }

    #[test]
    fn test_zero_interval_in_file_rejected() {
        let result = Config::from_toml("check_interval_secs = 0");
        assert!(matches!(result, Err(DdnsError::Config(_))));
    }

    #[test]
    fn test_zero_interval_override_rejected() {
        let mut config = Config::default();

        assert!(matches!(config.set_interval(0), Err(DdnsError::Config(_))));
        assert_eq!(config.check_interval_secs, 60);

        config.set_interval(300).unwrap();
        assert_eq!(config.interval(), Duration::from_secs(300));
    }

    #[test]
    fn test_debug_redacts_token() {
        let mut config = Config::default();
        config.api_token = "super-secret".to_string();
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("<REDACTED>"));
    }

    #[test]
    fn test_example_round_trips_through_toml() {
        let text = Config::example().to_toml().unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.record_name, "home.example.com");
    }
}

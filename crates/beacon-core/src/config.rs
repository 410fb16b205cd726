//! Beacon configuration
//!
//! Loaded from TOML, then overridden from the environment:
//!
//! | Variable | Field |
//! |---|---|
//! | `BEACON_API_URL` | `api_base_url` |
//! | `BEACON_TOKEN` | `token` |
//! | `BEACON_DATA_DIR` | `data_dir` |
//! | `BEACON_STORAGE_KEY` | `storage_key` |

use crate::error::BeaconError;
use crate::Result;
use beacon_store::DEFAULT_STORAGE_KEY;
use beacon_transport::{endpoint_url, TransportConfig, TransportError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Beacon configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BeaconConfig {
    /// REST API base; the push endpoint is derived from it
    pub api_base_url: String,
    /// Auth token; normally supplied by the environment
    #[serde(skip_serializing)]
    pub token: Option<String>,
    /// Storage key for the snapshot
    pub storage_key: String,
    /// Directory holding the snapshot file
    pub data_dir: Option<PathBuf>,
    /// Reconnect automatically
    pub auto_reconnect: bool,
    /// Heartbeat period in seconds (0 disables)
    pub heartbeat_interval_secs: u64,
    /// First reconnect delay in milliseconds
    pub reconnect_delay_ms: u64,
    /// Reconnect delay cap in milliseconds
    pub max_reconnect_delay_ms: u64,
    /// Consecutive failures before giving up (0 retries forever)
    pub max_reconnect_attempts: u32,
}

impl Default for BeaconConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000/api".to_string(),
            token: None,
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            data_dir: None,
            auto_reconnect: true,
            heartbeat_interval_secs: 30,
            reconnect_delay_ms: 3_000,
            max_reconnect_delay_ms: 30_000,
            max_reconnect_attempts: 10,
        }
    }
}

impl BeaconConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With API base URL
    #[inline]
    #[must_use]
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    /// With auth token
    #[inline]
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// With storage key
    #[inline]
    #[must_use]
    pub fn with_storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = key.into();
        self
    }

    /// With data directory
    #[inline]
    #[must_use]
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(dir.into());
        self
    }

    /// With auto-reconnect flag
    #[inline]
    #[must_use]
    pub fn with_auto_reconnect(mut self, enabled: bool) -> Self {
        self.auto_reconnect = enabled;
        self
    }

    /// Parse TOML
    ///
    /// # Errors
    /// - `BeaconError::ConfigParse` if the text is not valid TOML
    /// - `BeaconError::Config` if a value is out of range
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load TOML from a file
    ///
    /// # Errors
    /// - `BeaconError::Io` if the file cannot be read
    /// - see [`BeaconConfig::from_toml_str`]
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| BeaconError::io_error(path, e))?;
        Self::from_toml_str(&text)
    }

    /// Apply overrides from a variable lookup
    ///
    /// Empty values are ignored.
    #[must_use]
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(url) = get("BEACON_API_URL") {
            self.api_base_url = url;
        }
        if let Some(token) = get("BEACON_TOKEN") {
            self.token = Some(token);
        }
        if let Some(dir) = get("BEACON_DATA_DIR") {
            self.data_dir = Some(PathBuf::from(dir));
        }
        if let Some(key) = get("BEACON_STORAGE_KEY") {
            self.storage_key = key;
        }
        self
    }

    /// Apply overrides from the process environment
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    /// Check value ranges
    ///
    /// # Errors
    /// - `BeaconError::Config` naming the offending field
    /// - `BeaconError::Transport` if no push endpoint can be derived from
    ///   `api_base_url`
    pub fn validate(&self) -> Result<()> {
        if self.storage_key.trim().is_empty() {
            return Err(BeaconError::Config("storage_key must not be empty".to_string()));
        }
        if self.reconnect_delay_ms == 0 {
            return Err(BeaconError::Config("reconnect_delay_ms must be positive".to_string()));
        }
        if self.max_reconnect_delay_ms < self.reconnect_delay_ms {
            return Err(BeaconError::Config(
                "max_reconnect_delay_ms must not be below reconnect_delay_ms".to_string(),
            ));
        }
        endpoint_url(&self.api_base_url)?;
        Ok(())
    }

    /// Directory the snapshot file lives in
    #[must_use]
    pub fn resolved_data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .map(|dir| dir.join("beacon"))
                .unwrap_or_else(|| PathBuf::from(".beacon"))
        })
    }

    /// Transport configuration for `token`
    ///
    /// # Errors
    /// - `TransportError::InvalidUrl` if `api_base_url` is unusable
    pub fn transport_config(&self, token: &str) -> std::result::Result<TransportConfig, TransportError> {
        let endpoint = endpoint_url(&self.api_base_url)?;
        Ok(TransportConfig::new(endpoint, token)
            .with_auto_reconnect(self.auto_reconnect)
            .with_heartbeat(Duration::from_secs(self.heartbeat_interval_secs))
            .with_backoff(
                Duration::from_millis(self.reconnect_delay_ms),
                Duration::from_millis(self.max_reconnect_delay_ms),
            )
            .with_max_attempts((self.max_reconnect_attempts > 0).then_some(self.max_reconnect_attempts)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    #[test]
    fn defaults() {
        let config = BeaconConfig::new();
        assert_eq!(config.storage_key, "beacon:notifications");
        assert_eq!(config.heartbeat_interval_secs, 30);
        assert!(config.auto_reconnect);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = BeaconConfig::from_toml_str(
            r#"
            api_base_url = "https://crm.example.com/api"
            max_reconnect_attempts = 0
            "#,
        )
        .unwrap();

        assert_eq!(config.api_base_url, "https://crm.example.com/api");
        assert_eq!(config.reconnect_delay_ms, 3_000);

        let transport = config.transport_config("t").unwrap();
        assert_eq!(transport.endpoint.as_str(), "wss://crm.example.com/ws/notifications");
        assert_eq!(transport.max_reconnect_attempts, None);
    }

    #[test]
    fn invalid_toml_is_a_parse_error() {
        assert!(matches!(
            BeaconConfig::from_toml_str("api_base_url = "),
            Err(BeaconError::ConfigParse(_))
        ));
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        let err = BeaconConfig::from_toml_str("reconnect_delay_ms = 5000\nmax_reconnect_delay_ms = 10").unwrap_err();
        assert!(matches!(err, BeaconError::Config(_)));
        assert!(err.requires_user_action());
    }

    #[test]
    fn unusable_api_url_is_rejected() {
        let err = BeaconConfig::from_toml_str("api_base_url = \"ftp://crm.example.com/api\"").unwrap_err();
        assert!(matches!(err, BeaconError::Transport(TransportError::InvalidUrl(_))));
        assert!(err.requires_user_action());
        assert!(!err.is_retryable());
    }

    #[test]
    fn overrides_apply_and_skip_blank() {
        let vars: HashMap<&str, &str> = [
            ("BEACON_API_URL", "https://other/api"),
            ("BEACON_TOKEN", "tok"),
            ("BEACON_DATA_DIR", "  "),
        ]
        .into_iter()
        .collect();

        let config = BeaconConfig::new()
            .with_data_dir("/var/lib/beacon")
            .with_overrides(|name| vars.get(name).map(|v| (*v).to_string()));

        assert_eq!(config.api_base_url, "https://other/api");
        assert_eq!(config.token.as_deref(), Some("tok"));
        assert_eq!(config.data_dir, Some(PathBuf::from("/var/lib/beacon")));
    }

    #[test]
    fn token_is_never_serialized() {
        let text = toml::to_string(&BeaconConfig::new().with_token("secret")).unwrap();
        assert!(!text.contains("secret"));
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("beacon.toml");
        std::fs::write(&path, "storage_key = \"crm:user-7\"\n").unwrap();

        assert_eq!(BeaconConfig::load(&path).unwrap().storage_key, "crm:user-7");
        assert!(matches!(
            BeaconConfig::load(dir.path().join("missing.toml")),
            Err(BeaconError::Io { .. })
        ));
    }
}

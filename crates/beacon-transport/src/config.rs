//! Transport configuration and endpoint derivation

use crate::error::TransportError;
use std::time::Duration;
use url::Url;

/// Path of the push endpoint relative to the server root
pub const NOTIFICATION_PATH: &str = "/ws/notifications";

/// Derive the push endpoint from the REST API base URL
///
/// `http`/`https` map to `ws`/`wss`, a trailing `/api` segment is dropped and
/// [`NOTIFICATION_PATH`] appended. Query and fragment are discarded.
///
/// # Errors
/// - `TransportError::InvalidUrl` if the base is not an http(s) or ws(s) URL
pub fn endpoint_url(api_base: &str) -> Result<Url, TransportError> {
    let mut url = Url::parse(api_base.trim())
        .map_err(|e| TransportError::InvalidUrl(format!("{api_base}: {e}")))?;

    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => {
            return Err(TransportError::InvalidUrl(format!(
                "unsupported scheme '{other}' in {api_base}"
            )))
        }
    };
    url.set_scheme(scheme)
        .map_err(|()| TransportError::InvalidUrl(format!("cannot switch {api_base} to {scheme}")))?;

    let base = url.path().trim_end_matches('/');
    let base = base.strip_suffix("/api").unwrap_or(base).to_string();
    url.set_path(&format!("{base}{NOTIFICATION_PATH}"));
    url.set_query(None);
    url.set_fragment(None);

    Ok(url)
}

/// Transport configuration
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Push endpoint, without credentials
    pub endpoint: Url,
    /// Auth token attached to each connection
    token: String,
    /// Reconnect automatically after a close or failed attempt
    pub auto_reconnect: bool,
    /// Heartbeat period; `None` disables heartbeats
    pub heartbeat_interval: Option<Duration>,
    /// First reconnect delay
    pub reconnect_delay: Duration,
    /// Upper bound for reconnect delay
    pub max_reconnect_delay: Duration,
    /// Consecutive failed attempts before giving up; `None` retries forever
    pub max_reconnect_attempts: Option<u32>,
}

impl TransportConfig {
    /// Create configuration with default timings
    #[inline]
    #[must_use]
    pub fn new(endpoint: Url, token: impl Into<String>) -> Self {
        Self {
            endpoint,
            token: token.into(),
            auto_reconnect: true,
            heartbeat_interval: Some(Duration::from_secs(30)),
            reconnect_delay: Duration::from_secs(3),
            max_reconnect_delay: Duration::from_secs(30),
            max_reconnect_attempts: Some(10),
        }
    }

    /// With auto-reconnect flag
    #[inline]
    #[must_use]
    pub fn with_auto_reconnect(mut self, enabled: bool) -> Self {
        self.auto_reconnect = enabled;
        self
    }

    /// With heartbeat interval (zero disables)
    #[inline]
    #[must_use]
    pub fn with_heartbeat(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = (!interval.is_zero()).then_some(interval);
        self
    }

    /// With reconnect backoff bounds
    #[inline]
    #[must_use]
    pub fn with_backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.reconnect_delay = initial;
        self.max_reconnect_delay = max.max(initial);
        self
    }

    /// With attempt limit
    #[inline]
    #[must_use]
    pub fn with_max_attempts(mut self, max: Option<u32>) -> Self {
        self.max_reconnect_attempts = max;
        self
    }

    /// URL actually dialled, token included
    #[must_use]
    pub fn request_url(&self) -> String {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut().append_pair("token", &self.token);
        url.to_string()
    }

    /// Delay before retry number `retry` (zero-based)
    #[must_use]
    pub fn retry_delay(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.min(16));
        self.reconnect_delay
            .saturating_mul(factor)
            .min(self.max_reconnect_delay)
    }

    /// Check whether `failures` consecutive failures exhaust the policy
    #[inline]
    #[must_use]
    pub fn gives_up_after(&self, failures: u32) -> bool {
        !self.auto_reconnect || self.max_reconnect_attempts.is_some_and(|max| failures >= max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn endpoint_from_api_base() {
        assert_eq!(
            endpoint_url("http://localhost:8000/api").unwrap().as_str(),
            "ws://localhost:8000/ws/notifications"
        );
        assert_eq!(
            endpoint_url("https://crm.example.com/api/").unwrap().as_str(),
            "wss://crm.example.com/ws/notifications"
        );
        assert_eq!(
            endpoint_url("https://crm.example.com/backend?x=1").unwrap().as_str(),
            "wss://crm.example.com/backend/ws/notifications"
        );
    }

    #[test]
    fn endpoint_rejects_other_schemes() {
        assert!(matches!(endpoint_url("ftp://x/api"), Err(TransportError::InvalidUrl(_))));
        assert!(matches!(endpoint_url("not a url"), Err(TransportError::InvalidUrl(_))));
    }

    #[test]
    fn token_is_attached_as_query() {
        let config = TransportConfig::new(endpoint_url("http://h/api").unwrap(), "a b&c");
        assert_eq!(config.request_url(), "ws://h/ws/notifications?token=a+b%26c");
    }

    #[test]
    fn retry_delay_grows_and_caps() {
        let config = TransportConfig::new(endpoint_url("http://h").unwrap(), "t")
            .with_backoff(Duration::from_secs(1), Duration::from_secs(10));

        assert_eq!(config.retry_delay(0), Duration::from_secs(1));
        assert_eq!(config.retry_delay(1), Duration::from_secs(2));
        assert_eq!(config.retry_delay(3), Duration::from_secs(8));
        assert_eq!(config.retry_delay(4), Duration::from_secs(10));
        assert_eq!(config.retry_delay(u32::MAX), Duration::from_secs(10));
    }

    #[test]
    fn give_up_policy() {
        let config = TransportConfig::new(endpoint_url("http://h").unwrap(), "t").with_max_attempts(Some(3));
        assert!(!config.gives_up_after(2));
        assert!(config.gives_up_after(3));

        let unbounded = config.clone().with_max_attempts(None);
        assert!(!unbounded.gives_up_after(1000));

        let manual = unbounded.with_auto_reconnect(false);
        assert!(manual.gives_up_after(0));
    }

    #[test]
    fn zero_heartbeat_disables() {
        let config = TransportConfig::new(endpoint_url("http://h").unwrap(), "t").with_heartbeat(Duration::ZERO);
        assert_eq!(config.heartbeat_interval, None);
    }
}

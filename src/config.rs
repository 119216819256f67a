use clap::Parser;
use std::time::Duration;
use tracing::warn;

use crate::capabilities::decode_push_key;
use crate::matches::api_football::DEFAULT_BASE_URL;

/// Live football match tracker
#[derive(Parser, Debug, Clone)]
#[command(name = "matchee", version, about)]
pub struct Config {
    /// API-Football key; without it every fetch serves the demo fixtures
    #[arg(long, env = "FOOTBALL_API_KEY")]
    pub football_api_key: Option<String>,

    /// API-Football base URL
    #[arg(long, env = "FOOTBALL_API_URL", default_value = DEFAULT_BASE_URL)]
    pub football_api_url: String,

    /// VAPID public key (URL-safe base64) enabling push notifications
    #[arg(long, env = "VAPID_PUBLIC_KEY")]
    pub vapid_public_key: Option<String>,

    /// Auto-refresh period in seconds (0 disables auto-refresh)
    #[arg(long, env = "REFRESH_INTERVAL_SECS", default_value = "30")]
    pub refresh_interval_secs: u64,

    /// Upstream request timeout in seconds
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value = "10")]
    pub request_timeout_secs: u64,

    /// JSON API listen address
    #[arg(long, env = "LISTEN_ADDR", default_value = "0.0.0.0:8080")]
    pub listen_addr: String,

    /// SQLite database path for preferences
    #[arg(long, env = "PREFERENCES_PATH", default_value = "matchee.db")]
    pub preferences_path: String,
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        if let Err(e) = url::Url::parse(&self.football_api_url) {
            anyhow::bail!("FOOTBALL_API_URL is not a valid URL: {}", e);
        }
        if self.request_timeout_secs == 0 {
            anyhow::bail!("request_timeout_secs must be positive");
        }
        if let Some(key) = &self.vapid_public_key {
            if let Err(e) = decode_push_key(key) {
                anyhow::bail!("VAPID_PUBLIC_KEY is invalid: {}", e);
            }
        }
        if !self.has_api_key() {
            warn!("FOOTBALL_API_KEY is not set; serving demo fixtures only");
        }
        Ok(())
    }

    pub fn has_api_key(&self) -> bool {
        self.football_api_key
            .as_deref()
            .is_some_and(|k| !k.trim().is_empty())
    }

    /// `None` when auto-refresh is disabled.
    pub fn refresh_period(&self) -> Option<Duration> {
        (self.refresh_interval_secs > 0).then(|| Duration::from_secs(self.refresh_interval_secs))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Decoded push key, if one is configured and valid.
    pub fn push_key(&self) -> Option<Vec<u8>> {
        self.vapid_public_key
            .as_deref()
            .and_then(|k| decode_push_key(k).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matches::gateway::DEFAULT_REQUEST_TIMEOUT;
    use crate::refresh::DEFAULT_REFRESH_PERIOD;

    fn parse(args: &[&str]) -> Config {
        let mut argv = vec!["matchee"];
        argv.extend_from_slice(args);
        Config::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = parse(&[]);
        assert!(config.validate().is_ok());
        assert_eq!(config.refresh_period(), Some(DEFAULT_REFRESH_PERIOD));
        assert_eq!(config.request_timeout(), DEFAULT_REQUEST_TIMEOUT);
        assert!(config.push_key().is_none());
    }

    #[test]
    fn test_zero_interval_disables_refresh() {
        let config = parse(&["--refresh-interval-secs", "0"]);
        assert_eq!(config.refresh_period(), None);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(parse(&["--request-timeout-secs", "0"]).validate().is_err());
        assert!(parse(&["--football-api-url", "not a url"]).validate().is_err());
        assert!(parse(&["--vapid-public-key", "AAAA"]).validate().is_err());
    }

    #[test]
    fn test_blank_api_key_counts_as_missing() {
        assert!(!parse(&["--football-api-key", "  "]).has_api_key());
        assert!(parse(&["--football-api-key", "abc"]).has_api_key());
    }
}

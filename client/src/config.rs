/// Configuration management for the murmur client
///
/// Loads configuration from environment variables with sensible defaults
/// for everything except the remote service address.
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Remote service transport settings
    pub backend: BackendConfig,
    /// Feed behavior settings
    pub feed: FeedConfig,
}

/// Remote service transport settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the remote service
    pub base_url: String,
    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl BackendConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Feed behavior settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Auto-refresh interval in seconds while the feed is mounted
    #[serde(default = "default_feed_refresh_secs")]
    pub refresh_secs: u64,
}

impl FeedConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_secs)
    }
}

// Default values
fn default_connect_timeout_secs() -> u64 {
    5
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_feed_refresh_secs() -> u64 {
    10
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

impl ClientConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let backend = BackendConfig {
            base_url: std::env::var("MURMUR_BACKEND_URL")
                .context("MURMUR_BACKEND_URL environment variable not set")?,
            connect_timeout_secs: env_or(
                "MURMUR_CONNECT_TIMEOUT_SECS",
                default_connect_timeout_secs(),
            ),
            request_timeout_secs: env_or(
                "MURMUR_REQUEST_TIMEOUT_SECS",
                default_request_timeout_secs(),
            ),
        };

        let feed = FeedConfig {
            refresh_secs: env_or("MURMUR_FEED_REFRESH_SECS", default_feed_refresh_secs()),
        };

        Ok(ClientConfig { backend, feed })
    }
}

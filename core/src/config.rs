//! Client configuration.

use std::time::Duration;

/// Base URL used when `API_URL` is not set.
pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";

/// Request timeout used when `API_TIMEOUT_SECS` is not set or invalid.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Read `API_URL` and `API_TIMEOUT_SECS` from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let base_url = lookup("API_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let timeout = lookup("API_TIMEOUT_SECS")
            .and_then(|secs| secs.trim().parse::<u64>().ok())
            .map_or(DEFAULT_TIMEOUT, Duration::from_secs);
        Self { base_url, timeout }
    }
}

//! Gateway and client configuration.

use std::time::Duration;

/// Default moderation endpoint.
pub const DEFAULT_API_URL: &str = "https://api.openai.com/v1/moderations";

/// Default moderation model.
pub const DEFAULT_MODEL: &str = "text-moderation-latest";

/// Configuration for the moderation gateway and its HTTP client.
#[derive(Debug, Clone)]
pub struct ModerationConfig {
    /// Moderation endpoint URL
    pub api_url: String,
    /// Bearer token sent with each request
    pub api_key: Option<String>,
    /// Model name sent with each request
    pub model: String,
    /// Request timeout
    pub timeout: Duration,
    /// Global ceiling on external calls per second
    pub max_requests_per_second: u32,
    /// Maximum cached verdicts; `None` keeps every verdict for the process lifetime
    pub cache_capacity: Option<u64>,
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            timeout: Duration::from_secs(30),
            max_requests_per_second: 10,
            cache_capacity: None,
        }
    }
}

impl ModerationConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_url: std::env::var("MODERATION_API_URL").unwrap_or(defaults.api_url),
            api_key: std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.trim().is_empty()),
            model: std::env::var("MODERATION_MODEL").unwrap_or(defaults.model),
            timeout: Duration::from_secs(
                std::env::var("MODERATION_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
            max_requests_per_second: std::env::var("MODERATION_MAX_RPS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|rps: &u32| *rps > 0)
                .unwrap_or(defaults.max_requests_per_second),
            cache_capacity: std::env::var("MODERATION_CACHE_CAPACITY")
                .ok()
                .and_then(|s| s.parse().ok()),
        }
    }

    /// Set the request rate ceiling.
    pub fn with_max_requests_per_second(mut self, rps: u32) -> Self {
        self.max_requests_per_second = rps;
        self
    }

    /// Set the endpoint URL.
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    /// Set the bearer token.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Cap the verdict cache.
    pub fn with_cache_capacity(mut self, capacity: u64) -> Self {
        self.cache_capacity = Some(capacity);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = ModerationConfig::default();
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.model, "text-moderation-latest");
        assert_eq!(config.max_requests_per_second, 10);
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(config.cache_capacity.is_none());
    }
}

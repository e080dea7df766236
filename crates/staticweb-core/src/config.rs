//! Static web configuration.
//!
//! Provides [`StaticWebConfig`] for configuring the middleware and the server that
//! hosts it. Values are loaded from environment variables.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::error::{StaticWebError, StaticWebResult};

/// Static web configuration.
///
/// # Examples
///
/// ```
/// use staticweb_core::config::StaticWebConfig;
///
/// let config = StaticWebConfig::default();
/// assert_eq!(config.cache_timeout_secs, 300);
/// assert_eq!(config.remote_user_header, "x-remote-user");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct StaticWebConfig {
    /// Bind address for the server (e.g. `"0.0.0.0:8090"`).
    #[builder(default = String::from("0.0.0.0:8090"))]
    pub gateway_listen: String,

    /// Base URL of the object-storage backend.
    #[builder(default = String::from("http://127.0.0.1:8080"))]
    pub backend_url: String,

    /// Seconds to cache a container's index, error and listing stylesheet settings.
    #[builder(default = 300)]
    pub cache_timeout_secs: u64,

    /// Request header set by upstream auth when the caller is authenticated.
    #[builder(default = String::from("x-remote-user"))]
    pub remote_user_header: String,

    /// Log level filter string (e.g. `"info"`, `"debug"`).
    #[builder(default = String::from("info"))]
    pub log_level: String,
}

impl Default for StaticWebConfig {
    fn default() -> Self {
        Self {
            gateway_listen: String::from("0.0.0.0:8090"),
            backend_url: String::from("http://127.0.0.1:8080"),
            cache_timeout_secs: 300,
            remote_user_header: String::from("x-remote-user"),
            log_level: String::from("info"),
        }
    }
}

impl StaticWebConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `GATEWAY_LISTEN` | `0.0.0.0:8090` |
    /// | `STATICWEB_BACKEND_URL` | `http://127.0.0.1:8080` |
    /// | `STATICWEB_CACHE_TIMEOUT` | `300` |
    /// | `STATICWEB_REMOTE_USER_HEADER` | `x-remote-user` |
    /// | `LOG_LEVEL` | `info` |
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(v) = std::env::var("GATEWAY_LISTEN") {
            config.gateway_listen = v;
        }
        if let Ok(v) = std::env::var("STATICWEB_BACKEND_URL") {
            config.backend_url = v;
        }
        if let Ok(v) = std::env::var("STATICWEB_CACHE_TIMEOUT") {
            if let Ok(n) = v.trim().parse::<u64>() {
                config.cache_timeout_secs = n;
            }
        }
        if let Ok(v) = std::env::var("STATICWEB_REMOTE_USER_HEADER") {
            config.remote_user_header = v.to_ascii_lowercase();
        }
        if let Ok(v) = std::env::var("LOG_LEVEL") {
            config.log_level = v;
        }

        config
    }

    /// The metadata cache TTL.
    #[must_use]
    pub fn cache_timeout(&self) -> Duration {
        Duration::from_secs(self.cache_timeout_secs)
    }

    /// Check the values that cannot be defaulted at use time.
    pub fn validate(&self) -> StaticWebResult<()> {
        if !self.backend_url.starts_with("http://") {
            return Err(StaticWebError::Config(format!(
                "backend url must be plain http: {}",
                self.backend_url
            )));
        }
        if http::HeaderName::from_bytes(self.remote_user_header.as_bytes()).is_err() {
            return Err(StaticWebError::Config(format!(
                "invalid remote user header name: {}",
                self.remote_user_header
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_create_default_config() {
        let config = StaticWebConfig::default();
        assert_eq!(config.gateway_listen, "0.0.0.0:8090");
        assert_eq!(config.backend_url, "http://127.0.0.1:8080");
        assert_eq!(config.cache_timeout(), Duration::from_secs(300));
        assert_eq!(config.log_level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_should_build_with_typed_builder() {
        let config = StaticWebConfig::builder()
            .backend_url("http://swift:8080".into())
            .cache_timeout_secs(5)
            .build();

        assert_eq!(config.backend_url, "http://swift:8080");
        assert_eq!(config.cache_timeout_secs, 5);
        assert_eq!(config.remote_user_header, "x-remote-user");
    }

    #[test]
    fn test_should_reject_non_plain_http_backend() {
        let config = StaticWebConfig::builder()
            .backend_url("https://swift".into())
            .build();
        assert!(matches!(config.validate(), Err(StaticWebError::Config(_))));
    }

    #[test]
    fn test_should_reject_invalid_header_name() {
        let config = StaticWebConfig::builder()
            .remote_user_header("bad header".into())
            .build();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_should_serialize_to_camel_case_json() {
        let config = StaticWebConfig::default();
        let json = serde_json::to_string(&config).expect("test serialization");
        assert!(json.contains("cacheTimeoutSecs"));
        assert!(json.contains("backendUrl"));
    }
}

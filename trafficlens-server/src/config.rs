use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use trafficlens_core::Error;

pub const DEFAULT_BRIDGE_URL: &str = "http://127.0.0.1:5001";
pub const BRIDGE_URL_ENV: &str = "BRIDGE_URL";

/// Server settings read from a TOML file; every field is optional.
///
/// ```toml
/// listen = "127.0.0.1:3000"
/// bridge_url = "http://127.0.0.1:5001"
/// poll_interval_ms = 1000
/// network_path = "public/network/network.json"
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub listen: SocketAddr,
    pub bridge_url: String,
    /// Relay period per stream connection
    pub poll_interval_ms: u64,
    /// Upper bound on one `/api/state` request and on each bridge fetch
    pub request_timeout_ms: u64,
    pub keep_alive_secs: u64,
    pub network_path: Option<PathBuf>,
    pub max_concurrent_requests: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([127, 0, 0, 1], 3000)),
            bridge_url: DEFAULT_BRIDGE_URL.to_string(),
            poll_interval_ms: 1000,
            request_timeout_ms: 5000,
            keep_alive_secs: 15,
            network_path: None,
            max_concurrent_requests: 64,
        }
    }
}

impl ServerConfig {
    pub fn from_toml_str(toml: &str) -> Result<Self, Error> {
        let config: Self = toml::from_str(toml).map_err(|e| Error::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads `path` when given, falling back to defaults otherwise, then
    /// applies the `BRIDGE_URL` environment override.
    pub fn load(path: Option<&Path>) -> Result<Self, Error> {
        let mut config = match path {
            Some(path) => {
                let contents = std::fs::read_to_string(path).map_err(|e| {
                    std::io::Error::new(
                        e.kind(),
                        format!("Failed to read config '{}': {}", path.display(), e),
                    )
                })?;
                Self::from_toml_str(&contents)?
            }
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(BRIDGE_URL_ENV).filter(|url| !url.trim().is_empty()) {
            self.bridge_url = url;
        }
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.poll_interval_ms == 0 {
            return Err(Error::InvalidConfig("poll_interval_ms must be positive".into()));
        }
        if self.request_timeout_ms == 0 {
            return Err(Error::InvalidConfig("request_timeout_ms must be positive".into()));
        }
        if self.keep_alive_secs == 0 {
            return Err(Error::InvalidConfig("keep_alive_secs must be positive".into()));
        }
        if self.max_concurrent_requests == 0 {
            return Err(Error::InvalidConfig(
                "max_concurrent_requests must be positive".into(),
            ));
        }
        if !(self.bridge_url.starts_with("http://") || self.bridge_url.starts_with("https://")) {
            return Err(Error::InvalidConfig(format!(
                "bridge_url must be an http(s) URL, got '{}'",
                self.bridge_url
            )));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.keep_alive_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_is_all_defaults() {
        assert_eq!(ServerConfig::from_toml_str("").unwrap(), ServerConfig::default());
    }

    #[test]
    fn parses_partial_document() {
        let config = ServerConfig::from_toml_str(
            r#"
            listen = "0.0.0.0:8080"
            poll_interval_ms = 250
            network_path = "public/network/network.json"
            "#,
        )
        .unwrap();
        assert_eq!(config.listen.port(), 8080);
        assert_eq!(config.poll_interval(), Duration::from_millis(250));
        assert_eq!(config.bridge_url, DEFAULT_BRIDGE_URL);
        assert_eq!(
            config.network_path.as_deref(),
            Some(Path::new("public/network/network.json"))
        );
    }

    #[test]
    fn rejects_unknown_and_invalid_fields() {
        assert!(ServerConfig::from_toml_str("pol_interval_ms = 5").is_err());
        assert!(ServerConfig::from_toml_str("poll_interval_ms = 0").is_err());
        assert!(ServerConfig::from_toml_str(r#"bridge_url = "localhost:5001""#).is_err());
    }

    #[test]
    fn environment_overrides_bridge_url() {
        let mut config = ServerConfig::default();
        config.apply_env(|key| (key == BRIDGE_URL_ENV).then(|| "http://sim:9000".to_string()));
        assert_eq!(config.bridge_url, "http://sim:9000");

        config.apply_env(|_| Some("  ".to_string()));
        assert_eq!(config.bridge_url, "http://sim:9000");
    }
}

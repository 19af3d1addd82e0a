//! HTTP client for the traffic simulator's bridge.

use std::time::Duration;

use trafficlens_core::{Error, Snapshot, SnapshotSource};

/// Fetches snapshots with `GET {base}/state`
#[derive(Debug, Clone)]
pub struct HttpBridge {
    client: reqwest::Client,
    state_url: String,
}

impl HttpBridge {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::InvalidConfig(format!("failed to build bridge client: {e}")))?;
        Ok(Self {
            client,
            state_url: format!("{}/state", base_url.trim_end_matches('/')),
        })
    }

    pub fn state_url(&self) -> &str {
        &self.state_url
    }
}

impl SnapshotSource for HttpBridge {
    async fn fetch(&self) -> Result<Snapshot, Error> {
        let response = self
            .client
            .get(&self.state_url)
            .send()
            .await
            .map_err(|e| Error::Upstream(format!("request to {} failed: {e}", self.state_url)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Upstream(format!(
                "{} answered {status}",
                self.state_url
            )));
        }

        response
            .json::<Snapshot>()
            .await
            .map_err(|e| Error::Upstream(format!("malformed snapshot from bridge: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_url_ignores_trailing_slash() {
        let bridge = HttpBridge::new("http://127.0.0.1:5001/", Duration::from_secs(1)).unwrap();
        assert_eq!(bridge.state_url(), "http://127.0.0.1:5001/state");
    }

    #[tokio::test]
    async fn unreachable_bridge_is_upstream_error() {
        // port 9 (discard) is not expected to run an HTTP server
        let bridge = HttpBridge::new("http://127.0.0.1:9", Duration::from_millis(500)).unwrap();
        assert!(matches!(bridge.fetch().await, Err(Error::Upstream(_))));
    }
}

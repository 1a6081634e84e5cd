use std::time::Duration;

use tracing::debug;

use crate::provider::AssetProbe;

/// `HEAD`-based reachability check for poster/background URLs.
pub struct HttpAssetProbe {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpAssetProbe {
    pub fn new(client: reqwest::Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }
}

#[async_trait::async_trait]
impl AssetProbe for HttpAssetProbe {
    async fn probe(&self, url: &str) -> bool {
        if url.is_empty() {
            return false;
        }
        match self.client.head(url).timeout(self.timeout).send().await {
            Ok(resp) => {
                let ok = resp.status().is_success();
                if !ok {
                    debug!(url, status = %resp.status(), "asset unreachable");
                }
                ok
            }
            Err(err) => {
                debug!(url, error = %err, "asset probe failed");
                false
            }
        }
    }
}

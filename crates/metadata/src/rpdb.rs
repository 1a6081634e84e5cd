//! RatingPosterDB: premium poster substitution keyed by a user API key.

use tracing::debug;

use crate::MetadataError;
use crate::provider::PremiumPosterService;

const BASE_URL: &str = "https://api.ratingposterdb.com";

pub struct RpdbClient {
    client: reqwest::Client,
    base_url: String,
}

impl RpdbClient {
    pub fn new(client: reqwest::Client) -> Self {
        Self::with_base_url(client, BASE_URL)
    }

    pub fn with_base_url(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait::async_trait]
impl PremiumPosterService for RpdbClient {
    async fn validate(&self, key: &str) -> Result<bool, MetadataError> {
        let key = key.trim();
        if key.is_empty() {
            return Ok(false);
        }
        let url = format!("{}/{}/isValid", self.base_url, urlencoding::encode(key));
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| MetadataError::Network(e.to_string()))?;

        if !resp.status().is_success() {
            debug!(status = %resp.status(), "premium key rejected");
            return Ok(false);
        }

        let data: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| MetadataError::Provider(format!("parse JSON: {e}")))?;
        Ok(data["valid"].as_bool().unwrap_or(false))
    }

    fn poster_url(&self, key: &str, id: &str) -> String {
        format!(
            "{}/{}/imdb/poster-default/{id}.jpg?fallback=true",
            self.base_url,
            urlencoding::encode(key.trim())
        )
    }
}

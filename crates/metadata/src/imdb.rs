//! IMDb suggestion endpoint, used as the fallback identifier lookup.

use binged_core::types::is_canonical_id;
use tracing::debug;

use crate::MetadataError;
use crate::provider::{Suggestion, SuggestionSource};

const BASE_URL: &str = "https://v3.sg.media-imdb.com/suggestion";

pub struct ImdbSuggestClient {
    client: reqwest::Client,
    base_url: String,
}

impl ImdbSuggestClient {
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

/// The endpoint shards by the first character of the lower-cased query.
fn suggestion_path(query: &str) -> Option<String> {
    let query = query.trim().to_lowercase();
    let first = query.chars().find(|c| c.is_alphanumeric())?;
    Some(format!("/{first}/{}.json", urlencoding::encode(&query)))
}

#[async_trait::async_trait]
impl SuggestionSource for ImdbSuggestClient {
    fn name(&self) -> &str {
        "imdb-suggest"
    }

    async fn suggest(&self, query: &str) -> Result<Vec<Suggestion>, MetadataError> {
        let Some(path) = suggestion_path(query) else {
            return Ok(Vec::new());
        };
        let url = format!("{}{path}", self.base_url);
        debug!(url = %url, "IMDb suggestion request");

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| MetadataError::Network(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(MetadataError::Provider(format!(
                "IMDb suggestion returned {}",
                resp.status()
            )));
        }

        let data: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| MetadataError::Provider(format!("parse JSON: {e}")))?;
        Ok(parse_suggestions(&data))
    }
}

/// Title candidates only; name (`nm…`) and company entries are skipped.
fn parse_suggestions(data: &serde_json::Value) -> Vec<Suggestion> {
    let Some(entries) = data["d"].as_array() else {
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|entry| {
            let id = entry["id"].as_str()?;
            if !is_canonical_id(id) {
                return None;
            }
            Some(Suggestion {
                id: id.to_string(),
                title: entry["l"].as_str().unwrap_or_default().to_string(),
                year: entry["y"].as_i64().and_then(|y| i32::try_from(y).ok()),
                kind: entry["qid"]
                    .as_str()
                    .or_else(|| entry["q"].as_str())
                    .map(str::to_string),
            })
        })
        .collect()
}

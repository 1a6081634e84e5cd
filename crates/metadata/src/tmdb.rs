//! TMDB (The Movie Database) client, used for precise release dates.
//!
//! Uses TMDB API v3 `find` by external IMDb id: https://developer.themoviedb.org/docs

use chrono::NaiveDate;
use tracing::debug;

use crate::provider::ReleaseDateSource;
use crate::{MetadataError, parse_date_prefix};

const BASE_URL: &str = "https://api.themoviedb.org/3";

pub struct TmdbClient {
    api_key: String,
    client: reqwest::Client,
    base_url: String,
}

impl TmdbClient {
    pub fn new(api_key: String, client: reqwest::Client) -> Self {
        Self {
            api_key,
            client,
            base_url: BASE_URL.to_string(),
        }
    }

    async fn get_json(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<serde_json::Value, MetadataError> {
        let mut all_params = vec![("api_key", self.api_key.as_str())];
        all_params.extend_from_slice(params);

        let url = format!("{}{path}", self.base_url);
        debug!(url = %url, "TMDB request");

        let resp = self
            .client
            .get(&url)
            .query(&all_params)
            .send()
            .await
            .map_err(|e| MetadataError::Network(e.to_string()))?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(MetadataError::NotFound);
        }

        if !resp.status().is_success() {
            return Err(MetadataError::Provider(format!(
                "TMDB returned {}",
                resp.status()
            )));
        }

        resp.json()
            .await
            .map_err(|e| MetadataError::Provider(format!("parse JSON: {e}")))
    }
}

#[async_trait::async_trait]
impl ReleaseDateSource for TmdbClient {
    async fn release_date(&self, id: &str) -> Result<Option<NaiveDate>, MetadataError> {
        match self
            .get_json(&format!("/find/{id}"), &[("external_source", "imdb_id")])
            .await
        {
            Ok(data) => Ok(parse_find_release_date(&data)),
            Err(MetadataError::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Movie release date, else the series' first air date.
fn parse_find_release_date(data: &serde_json::Value) -> Option<NaiveDate> {
    let first = |key: &str, field: &str| {
        data[key]
            .as_array()
            .and_then(|results| results.first())
            .and_then(|r| r[field].as_str())
            .and_then(parse_date_prefix)
    };
    first("movie_results", "release_date").or_else(|| first("tv_results", "first_air_date"))
}

//! Cinemeta client: name search (primary identifier lookup) and per-title meta.

use binged_core::types::{ContentType, Link, Trailer, is_canonical_id};
use tracing::debug;

use crate::provider::{IdentifierLookup, MetadataSource};
use crate::{MetadataError, MetadataRecord, parse_date_prefix};

const BASE_URL: &str = "https://v3-cinemeta.strem.io";

pub struct CinemetaClient {
    client: reqwest::Client,
    base_url: String,
}

impl CinemetaClient {
    pub fn new(client: reqwest::Client) -> Self {
        Self::with_base_url(client, BASE_URL)
    }

    pub fn with_base_url(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn get_json(&self, path: &str) -> Result<serde_json::Value, MetadataError> {
        let url = format!("{}{path}", self.base_url);
        debug!(url = %url, "Cinemeta request");

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| MetadataError::Network(e.to_string()))?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(MetadataError::NotFound);
        }

        if !resp.status().is_success() {
            return Err(MetadataError::Provider(format!(
                "Cinemeta returned {}",
                resp.status()
            )));
        }

        resp.json()
            .await
            .map_err(|e| MetadataError::Provider(format!("parse JSON: {e}")))
    }
}

#[async_trait::async_trait]
impl IdentifierLookup for CinemetaClient {
    fn name(&self) -> &str {
        "cinemeta"
    }

    async fn lookup(
        &self,
        title: &str,
        content_type: ContentType,
        year: Option<i32>,
    ) -> Result<Option<String>, MetadataError> {
        let path = format!(
            "/catalog/{content_type}/top/search={}.json",
            urlencoding::encode(title)
        );
        match self.get_json(&path).await {
            Ok(data) => Ok(pick_search_hit(&data, year)),
            Err(MetadataError::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[async_trait::async_trait]
impl MetadataSource for CinemetaClient {
    fn name(&self) -> &str {
        "cinemeta"
    }

    async fn get_meta(
        &self,
        content_type: ContentType,
        id: &str,
    ) -> Result<Option<MetadataRecord>, MetadataError> {
        match self.get_json(&format!("/meta/{content_type}/{id}.json")).await {
            Ok(data) => Ok(data.get("meta").filter(|m| m.is_object()).map(parse_meta)),
            Err(MetadataError::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// First canonical hit whose release info starts with `year`, else the first canonical hit.
fn pick_search_hit(data: &serde_json::Value, year: Option<i32>) -> Option<String> {
    let metas = data["metas"].as_array()?;
    let ids: Vec<(&str, Option<&str>)> = metas
        .iter()
        .filter_map(|m| {
            let id = m["imdb_id"].as_str().or_else(|| m["id"].as_str())?;
            is_canonical_id(id).then_some((id, m["releaseInfo"].as_str()))
        })
        .collect();

    if let Some(year) = year {
        let year = year.to_string();
        if let Some((id, _)) = ids
            .iter()
            .find(|(_, info)| info.is_some_and(|i| i.starts_with(&year)))
        {
            return Some(id.to_string());
        }
    }

    ids.first().map(|(id, _)| id.to_string())
}

fn string_list(value: &serde_json::Value) -> Option<Vec<String>> {
    let items: Vec<String> = value
        .as_array()?
        .iter()
        .filter_map(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if items.is_empty() { None } else { Some(items) }
}

fn non_empty_str(value: &serde_json::Value) -> Option<String> {
    value
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn parse_meta(meta: &serde_json::Value) -> MetadataRecord {
    let trailers: Vec<Trailer> = meta["trailers"]
        .as_array()
        .map(|ts| {
            ts.iter()
                .filter_map(|t| serde_json::from_value(t.clone()).ok())
                .collect()
        })
        .unwrap_or_default();
    let links: Vec<Link> = meta["links"]
        .as_array()
        .map(|ls| {
            ls.iter()
                .filter_map(|l| serde_json::from_value(l.clone()).ok())
                .collect()
        })
        .unwrap_or_default();

    MetadataRecord {
        description: non_empty_str(&meta["description"]),
        genres: string_list(&meta["genres"]).or_else(|| string_list(&meta["genre"])),
        cast: string_list(&meta["cast"]),
        director: string_list(&meta["director"]),
        writer: string_list(&meta["writer"]),
        rating: non_empty_str(&meta["imdbRating"])
            .or_else(|| meta["imdbRating"].as_f64().map(|r| r.to_string())),
        runtime: non_empty_str(&meta["runtime"]),
        trailers: if trailers.is_empty() { None } else { Some(trailers) },
        links: if links.is_empty() { None } else { Some(links) },
        released: meta["released"].as_str().and_then(parse_date_prefix),
    }
}

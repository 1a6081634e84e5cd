use std::time::Duration;

use binged_core::types::{ContentType, RawItem};
use tracing::{debug, info, warn};

use crate::ScrapeError;
use crate::parser::parse_envelope;

const ENDPOINT: &str = "https://www.binged.com/wp-admin/admin-ajax.php";
const REFERER: &str = "https://www.binged.com/streaming-premiere-dates/";

/// How much of the release list a refresh pulls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    /// Whole list; the result replaces the cached partition.
    Full,
    /// Newest page only; the result is merged into the cached partition.
    Incremental,
}

impl FetchMode {
    pub fn page_length(self) -> u32 {
        match self {
            Self::Full => 500,
            Self::Incremental => 100,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Incremental => "incremental",
        }
    }
}

impl std::fmt::Display for FetchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fixed attempt count and fixed delay between attempts.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay: Duration::from_secs(2),
        }
    }
}

/// Where raw release items come from.
#[async_trait::async_trait]
pub trait CatalogSource: Send + Sync {
    async fn fetch(
        &self,
        content_type: ContentType,
        mode: FetchMode,
    ) -> Result<Vec<RawItem>, ScrapeError>;
}

pub struct BingedClient {
    client: reqwest::Client,
    endpoint: String,
    retry: RetryPolicy,
}

impl BingedClient {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            endpoint: ENDPOINT.to_string(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn fetch_once(
        &self,
        content_type: ContentType,
        mode: FetchMode,
    ) -> Result<Vec<RawItem>, ScrapeError> {
        let length = mode.page_length().to_string();
        let form = form_params(content_type, &length);
        debug!(endpoint = %self.endpoint, content_type = %content_type, mode = %mode, "scrape request");

        let resp = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::ACCEPT, "*/*")
            .header("x-requested-with", "XMLHttpRequest")
            .header(reqwest::header::REFERER, REFERER)
            .form(&form)
            .send()
            .await
            .map_err(|e| ScrapeError::Network(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(ScrapeError::Status(resp.status().as_u16()));
        }

        let body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| ScrapeError::Parse(format!("parse JSON: {e}")))?;
        parse_envelope(&body)
    }
}

fn category(content_type: ContentType) -> &'static str {
    match content_type {
        ContentType::Movie => "Film",
        ContentType::Series => "Tv show",
    }
}

fn form_params(content_type: ContentType, length: &str) -> Vec<(&'static str, &str)> {
    vec![
        ("filters[category][]", category(content_type)),
        ("filters[mode]", "streaming-now"),
        ("filters[page]", "0"),
        ("action", "mi_events_load_data"),
        ("mode", "streaming-now"),
        ("start", "0"),
        ("length", length),
        ("customcatalog", "0"),
    ]
}

#[async_trait::async_trait]
impl CatalogSource for BingedClient {
    async fn fetch(
        &self,
        content_type: ContentType,
        mode: FetchMode,
    ) -> Result<Vec<RawItem>, ScrapeError> {
        let attempts = self.retry.attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.fetch_once(content_type, mode).await {
                Ok(items) => {
                    info!(content_type = %content_type, mode = %mode, count = items.len(), attempt, "scrape fetched");
                    return Ok(items);
                }
                Err(err) if attempt < attempts => {
                    warn!(content_type = %content_type, attempt, error = %err, "scrape failed, retrying");
                    tokio::time::sleep(self.retry.delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn form_targets_the_right_category() {
        let form = form_params(ContentType::Series, "100");
        assert!(form.contains(&("filters[category][]", "Tv show")));
        assert!(form.contains(&("length", "100")));
        assert!(form.contains(&("action", "mi_events_load_data")));
        let form = form_params(ContentType::Movie, "500");
        assert!(form.contains(&("filters[category][]", "Film")));
    }

    #[test]
    fn page_lengths() {
        assert_eq!(FetchMode::Full.page_length(), 500);
        assert_eq!(FetchMode::Incremental.page_length(), 100);
    }

    #[tokio::test]
    async fn unreachable_source_fails_after_all_attempts() {
        let client = BingedClient::new(reqwest::Client::new())
            .with_endpoint("http://127.0.0.1:9/admin-ajax.php")
            .with_retry(RetryPolicy {
                attempts: 2,
                delay: Duration::from_millis(1),
            });
        let err = client
            .fetch(ContentType::Movie, FetchMode::Incremental)
            .await
            .unwrap_err();
        assert!(matches!(err, ScrapeError::Network(_)));
    }

    #[tokio::test]
    async fn retries_until_the_source_answers() {
        use axum::http::StatusCode;
        use axum::routing::post;
        use std::sync::Arc;
        use std::sync::atomic::{AtomicUsize, Ordering};

        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let app = axum::Router::new().route(
            "/admin-ajax.php",
            post(move || {
                let counter = counter.clone();
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                        (StatusCode::SERVICE_UNAVAILABLE, String::new())
                    } else {
                        (StatusCode::OK, r#"{"data":[{"id":7,"title":"Foo"}]}"#.to_string())
                    }
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

        let client = BingedClient::new(reqwest::Client::new())
            .with_endpoint(format!("http://{addr}/admin-ajax.php"))
            .with_retry(RetryPolicy {
                attempts: 3,
                delay: Duration::from_millis(1),
            });
        let items = client.fetch(ContentType::Movie, FetchMode::Full).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Foo");
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }
}

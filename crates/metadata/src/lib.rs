#![allow(clippy::collapsible_if)]
pub mod cinemeta;
pub mod enricher;
pub mod imdb;
pub mod probe;
pub mod provider;
pub mod release_dates;
pub mod resolver;
pub mod rpdb;
pub mod tmdb;

use std::time::Duration;

use binged_core::types::{Link, Trailer};
use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("provider error: {0}")]
    Provider(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("not found")]
    NotFound,
    #[error("db error: {0}")]
    Db(#[from] sqlx::Error),
}

/// Descriptive fields a metadata service may return for one title.
/// Every field is optional; an omitted field is "absent", not an error.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MetadataRecord {
    pub description: Option<String>,
    pub genres: Option<Vec<String>>,
    pub cast: Option<Vec<String>>,
    pub director: Option<Vec<String>>,
    pub writer: Option<Vec<String>>,
    pub rating: Option<String>,
    pub runtime: Option<String>,
    pub trailers: Option<Vec<Trailer>>,
    pub links: Option<Vec<Link>>,
    pub released: Option<NaiveDate>,
}

/// Build the shared HTTP client. The timeout bounds every outbound call.
pub fn http_client(timeout: Duration) -> Result<reqwest::Client, MetadataError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("binged-catalog/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| MetadataError::Network(e.to_string()))
}

/// Parse the leading `YYYY-MM-DD` of a date or RFC 3339 timestamp.
pub(crate) fn parse_date_prefix(value: &str) -> Option<NaiveDate> {
    let day = value.get(..10)?;
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_prefix_accepts_dates_and_timestamps() {
        let expected = NaiveDate::from_ymd_opt(2025, 2, 7);
        assert_eq!(parse_date_prefix("2025-02-07"), expected);
        assert_eq!(parse_date_prefix("2025-02-07T00:00:00.000Z"), expected);
        assert_eq!(parse_date_prefix("2025"), None);
        assert_eq!(parse_date_prefix("not-a-date"), None);
    }
}

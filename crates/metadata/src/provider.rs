use binged_core::types::ContentType;
use chrono::NaiveDate;

use crate::{MetadataError, MetadataRecord};

/// Primary name-based identifier lookup.
#[async_trait::async_trait]
pub trait IdentifierLookup: Send + Sync {
    fn name(&self) -> &str;

    /// Look up the canonical id for a title. `Ok(None)` means no match.
    async fn lookup(
        &self,
        title: &str,
        content_type: ContentType,
        year: Option<i32>,
    ) -> Result<Option<String>, MetadataError>;
}

/// Fallback free-text suggestion service.
#[async_trait::async_trait]
pub trait SuggestionSource: Send + Sync {
    fn name(&self) -> &str;

    /// Ranked candidates for a text query, best first.
    async fn suggest(&self, query: &str) -> Result<Vec<Suggestion>, MetadataError>;
}

/// Read-only metadata service keyed by canonical id.
#[async_trait::async_trait]
pub trait MetadataSource: Send + Sync {
    fn name(&self) -> &str;

    async fn get_meta(
        &self,
        content_type: ContentType,
        id: &str,
    ) -> Result<Option<MetadataRecord>, MetadataError>;
}

/// Reachability check for image URLs. Failures are `false`, never errors.
#[async_trait::async_trait]
pub trait AssetProbe: Send + Sync {
    async fn probe(&self, url: &str) -> bool;
}

/// Precise release-date service keyed by canonical id.
#[async_trait::async_trait]
pub trait ReleaseDateSource: Send + Sync {
    async fn release_date(&self, id: &str) -> Result<Option<NaiveDate>, MetadataError>;
}

/// Paid poster substitution service selected by a per-request key.
#[async_trait::async_trait]
pub trait PremiumPosterService: Send + Sync {
    async fn validate(&self, key: &str) -> Result<bool, MetadataError>;

    fn poster_url(&self, key: &str, id: &str) -> String;
}

/// One candidate returned by a [`SuggestionSource`].
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Suggestion {
    pub id: String,
    pub title: String,
    pub year: Option<i32>,
    /// Kind tag as reported by the service, e.g. `movie`, `tvSeries`, `TV mini-series`.
    pub kind: Option<String>,
}

impl Suggestion {
    /// Whether the reported kind agrees with the requested content type.
    pub fn matches(&self, content_type: ContentType) -> bool {
        let Some(kind) = self.kind.as_deref() else {
            return false;
        };
        let kind = kind.to_ascii_lowercase();
        match content_type {
            ContentType::Movie => matches!(kind.as_str(), "movie" | "feature"),
            ContentType::Series => matches!(
                kind.as_str(),
                "tvseries" | "tvminiseries" | "tv series" | "tv mini-series" | "tv mini series"
            ),
        }
    }
}

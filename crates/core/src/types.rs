use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Prefix for ids fabricated from the scrape source's own item id.
pub const SYNTHETIC_ID_PREFIX: &str = "binged:";

static CANONICAL_ID_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^tt\d+$").unwrap());

/// Whether `id` is an IMDb-style canonical identifier (`tt` followed by digits).
pub fn is_canonical_id(id: &str) -> bool {
    CANONICAL_ID_RE.is_match(id)
}

/// Build the fallback id for an item that could not be resolved.
pub fn synthetic_id(site_id: &str) -> String {
    format!("{SYNTHETIC_ID_PREFIX}{site_id}")
}

/// Catalog content type. Each type owns its own cache partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Movie,
    Series,
}

impl ContentType {
    pub const ALL: [ContentType; 2] = [ContentType::Movie, ContentType::Series];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Movie => "movie",
            Self::Series => "series",
        }
    }

    /// Parse a wire type name. Unknown names yield `None`, never an error.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "movie" => Some(Self::Movie),
            "series" => Some(Self::Series),
            _ => None,
        }
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Site recommendation codes and their display labels.
pub const RECOMMENDATIONS: &[(&str, &str)] = &[
    ("A", "Must Watch"),
    ("B", "Good"),
    ("H", "Satisfactory"),
    ("C", "Passable"),
    ("D", "Poor"),
    ("F", "Skip"),
];

/// Translate a raw site code into its label. Unmapped codes have no label.
pub fn recommendation_label(code: &str) -> Option<&'static str> {
    RECOMMENDATIONS
        .iter()
        .find(|(c, _)| c.eq_ignore_ascii_case(code.trim()))
        .map(|(_, label)| *label)
}

/// Reverse lookup used by the recommendation filter.
pub fn recommendation_code(label: &str) -> Option<&'static str> {
    RECOMMENDATIONS
        .iter()
        .find(|(_, l)| l.eq_ignore_ascii_case(label.trim()))
        .map(|(code, _)| *code)
}

/// One entry as scraped from the release site, before any enrichment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawItem {
    pub site_id: String,
    pub title: String,
    pub release_year: Option<i32>,
    /// Comma-joined genre names.
    pub genre: String,
    /// Comma-joined language names.
    pub languages: String,
    pub streaming_date: String,
    /// Single-letter site code, empty when the site has no verdict.
    pub recommendation: String,
    /// Site-provided image, used whenever a canonical asset is unreachable.
    pub image: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trailer {
    pub source: String,
    #[serde(rename = "type", default)]
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub url: String,
}

fn default_poster_shape() -> String {
    "poster".to_string()
}

/// Canonical catalog entry, serialized in the addon meta-preview shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub content_type: ContentType,
    pub name: String,
    pub poster: String,
    #[serde(default = "default_poster_shape")]
    pub poster_shape: String,
    pub background: String,
    pub description: String,
    pub release_info: String,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub languages: Vec<String>,
    #[serde(default)]
    pub cast: Vec<String>,
    #[serde(default)]
    pub director: Vec<String>,
    #[serde(default)]
    pub writer: Vec<String>,
    #[serde(rename = "imdbRating", default)]
    pub rating: Option<String>,
    #[serde(default)]
    pub runtime: Option<String>,
    #[serde(default)]
    pub trailers: Vec<Trailer>,
    #[serde(default)]
    pub links: Vec<Link>,
    #[serde(default)]
    pub recommendation_code: Option<String>,
}

impl CatalogRecord {
    /// A minimal record; every optional field empty.
    pub fn new(id: impl Into<String>, content_type: ContentType, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content_type,
            name: name.into(),
            poster: String::new(),
            poster_shape: default_poster_shape(),
            background: String::new(),
            description: String::new(),
            release_info: "Unknown".to_string(),
            genres: Vec::new(),
            languages: Vec::new(),
            cast: Vec::new(),
            director: Vec::new(),
            writer: Vec::new(),
            rating: None,
            runtime: None,
            trailers: Vec::new(),
            links: Vec::new(),
            recommendation_code: None,
        }
    }

    pub fn has_canonical_id(&self) -> bool {
        is_canonical_id(&self.id)
    }

    /// Dedup key: titles compare case-insensitively.
    pub fn name_key(&self) -> String {
        self.name.to_lowercase()
    }

    pub fn recommendation_label(&self) -> Option<&'static str> {
        self.recommendation_code
            .as_deref()
            .and_then(recommendation_label)
    }
}

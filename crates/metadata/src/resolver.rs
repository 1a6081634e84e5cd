//! Title → canonical identifier resolution.
//!
//! Lookup order:
//! 1. Primary name lookup (with year hint).
//! 2. Suggestion search, filtered by the candidate's reported kind.
//!
//! Every failure along the way resolves to `None`.

use std::sync::{Arc, LazyLock};

use binged_core::types::{ContentType, is_canonical_id};
use regex::Regex;
use tracing::{debug, warn};

use crate::provider::{IdentifierLookup, SuggestionSource};

// Trailing "(2024)", "(Hindi)", "(Season 2)" and similar qualifiers.
static RE_TRAILING_PAREN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\([^()]*\)\s*$").unwrap());

// "Season 2", "S02", "- Season 3 Part 1": the marker and everything after it.
static RE_SEASON_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)[\s:,\-–]*\b(?:season\s*\d+|s\d{1,2})\b.*$").unwrap()
});

static RE_WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Reduce a display title to the form the lookup services match best.
pub fn clean_title(title: &str) -> String {
    let mut cleaned = title.replace('#', "");
    // Qualifiers can stack: "Foo (Hindi) (2024)"
    while RE_TRAILING_PAREN.is_match(&cleaned) {
        cleaned = RE_TRAILING_PAREN.replace(&cleaned, "").into_owned();
    }
    let cleaned = RE_SEASON_MARKER.replace(&cleaned, "");
    RE_WHITESPACE.replace_all(cleaned.trim(), " ").into_owned()
}

pub struct Resolver {
    primary: Arc<dyn IdentifierLookup>,
    fallback: Arc<dyn SuggestionSource>,
}

impl Resolver {
    pub fn new(primary: Arc<dyn IdentifierLookup>, fallback: Arc<dyn SuggestionSource>) -> Self {
        Self { primary, fallback }
    }

    pub async fn resolve(
        &self,
        title: &str,
        content_type: ContentType,
        year: Option<i32>,
    ) -> Option<String> {
        let query = clean_title(title);
        if query.is_empty() {
            return None;
        }

        match self.primary.lookup(&query, content_type, year).await {
            Ok(Some(id)) if is_canonical_id(&id) => {
                debug!(title = %query, id = %id, provider = self.primary.name(), "resolved");
                return Some(id);
            }
            Ok(_) => {}
            Err(err) => {
                warn!(title = %query, provider = self.primary.name(), error = %err, "primary lookup failed");
            }
        }

        match self.fallback.suggest(&query).await {
            Ok(candidates) => {
                let hit = candidates
                    .into_iter()
                    .find(|c| c.matches(content_type) && is_canonical_id(&c.id))
                    .map(|c| c.id);
                debug!(title = %query, id = ?hit, provider = self.fallback.name(), "fallback lookup finished");
                hit
            }
            Err(err) => {
                warn!(title = %query, provider = self.fallback.name(), error = %err, "fallback lookup failed");
                None
            }
        }
    }
}

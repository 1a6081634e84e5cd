//! Raw scrape item + lookups → canonical [`CatalogRecord`]. Pure, no I/O.

use binged_core::types::{CatalogRecord, ContentType, RawItem, synthetic_id};
use binged_metadata::MetadataRecord;
use binged_scraper::parser::{decode_entities, split_list};
use chrono::NaiveDate;

const POSTER_BASE: &str = "https://live.metahub.space/poster/small";
const BACKGROUND_BASE: &str = "https://live.metahub.space/background/medium";

pub fn canonical_poster_url(id: &str) -> String {
    format!("{POSTER_BASE}/{id}/img")
}

pub fn canonical_background_url(id: &str) -> String {
    format!("{BACKGROUND_BASE}/{id}/img")
}

/// Reachability of the canonical assets for one item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssetCheck {
    pub poster: bool,
    pub background: bool,
}

/// `DD Mon YYYY`, e.g. `07 Feb 2025`.
pub fn format_release_date(date: NaiveDate) -> String {
    date.format("%d %b %Y").to_string()
}

fn release_info(raw: &RawItem, metadata: Option<&MetadataRecord>) -> String {
    if !raw.streaming_date.trim().is_empty() {
        return raw.streaming_date.trim().to_string();
    }
    if let Some(date) = metadata.and_then(|m| m.released) {
        return format_release_date(date);
    }
    match raw.release_year {
        Some(year) => year.to_string(),
        None => "Unknown".to_string(),
    }
}

fn synthesized_description(name: &str, year: Option<i32>, genre: &str) -> String {
    match year {
        Some(year) if !name.ends_with(&format!("({year})")) => format!("{name} ({year}) - {genre}"),
        _ => format!("{name} - {genre}"),
    }
}

pub fn normalize(
    raw: &RawItem,
    content_type: ContentType,
    resolved_id: Option<&str>,
    metadata: Option<&MetadataRecord>,
    assets: AssetCheck,
) -> CatalogRecord {
    let name = decode_entities(&raw.title);
    let id = resolved_id
        .map(str::to_string)
        .unwrap_or_else(|| synthetic_id(&raw.site_id));

    let (poster, background) = match resolved_id {
        Some(rid) => (
            if assets.poster { canonical_poster_url(rid) } else { raw.image.clone() },
            if assets.background { canonical_background_url(rid) } else { raw.image.clone() },
        ),
        None => (raw.image.clone(), raw.image.clone()),
    };

    let meta = metadata.cloned().unwrap_or_default();
    let description = meta
        .description
        .unwrap_or_else(|| synthesized_description(&name, raw.release_year, &raw.genre));
    let recommendation = raw.recommendation.trim();

    let mut record = CatalogRecord::new(id, content_type, name);
    record.poster = poster;
    record.background = background;
    record.description = description;
    record.release_info = release_info(raw, metadata);
    record.genres = meta.genres.unwrap_or_else(|| split_list(&raw.genre));
    record.languages = split_list(&raw.languages);
    record.cast = meta.cast.unwrap_or_default();
    record.director = meta.director.unwrap_or_default();
    record.writer = meta.writer.unwrap_or_default();
    record.rating = meta.rating;
    record.runtime = meta.runtime;
    record.trailers = meta.trailers.unwrap_or_default();
    record.links = meta.links.unwrap_or_default();
    record.recommendation_code = (!recommendation.is_empty()).then(|| recommendation.to_string());
    record
}

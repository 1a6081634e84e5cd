//! One refresh pass: scrape, then resolve/enrich/probe every item, then normalize.

use std::sync::Arc;

use binged_catalog::normalize::{
    AssetCheck, canonical_background_url, canonical_poster_url, normalize,
};
use binged_core::types::{CatalogRecord, ContentType, RawItem};
use binged_metadata::MetadataRecord;
use binged_metadata::enricher::Enricher;
use binged_metadata::provider::AssetProbe;
use binged_metadata::release_dates::ReleaseDateLookup;
use binged_metadata::resolver::Resolver;
use binged_scraper::ScrapeError;
use binged_scraper::parser::decode_entities;
use binged_scraper::source::{CatalogSource, FetchMode};
use futures::future::join_all;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum RefreshError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] ScrapeError),
}

/// Lookups gathered for one raw item before normalization.
struct Resolved {
    raw: RawItem,
    id: Option<String>,
    metadata: Option<MetadataRecord>,
    assets: AssetCheck,
}

pub struct RefreshPipeline {
    source: Arc<dyn CatalogSource>,
    resolver: Resolver,
    enricher: Enricher,
    probe: Arc<dyn AssetProbe>,
    release_dates: Option<ReleaseDateLookup>,
}

impl RefreshPipeline {
    pub fn new(
        source: Arc<dyn CatalogSource>,
        resolver: Resolver,
        enricher: Enricher,
        probe: Arc<dyn AssetProbe>,
    ) -> Self {
        Self {
            source,
            resolver,
            enricher,
            probe,
            release_dates: None,
        }
    }

    pub fn with_release_dates(mut self, lookup: ReleaseDateLookup) -> Self {
        self.release_dates = Some(lookup);
        self
    }

    /// Fetch and normalize one partition's worth of records, in source order.
    pub async fn fetch_records(
        &self,
        content_type: ContentType,
        mode: FetchMode,
    ) -> Result<Vec<CatalogRecord>, RefreshError> {
        let raw = self.source.fetch(content_type, mode).await?;
        Ok(self.build_records(content_type, raw).await)
    }

    pub async fn build_records(
        &self,
        content_type: ContentType,
        items: Vec<RawItem>,
    ) -> Vec<CatalogRecord> {
        let total = items.len();
        let mut resolved: Vec<Resolved> = join_all(
            items
                .into_iter()
                .map(|raw| self.resolve_item(content_type, raw)),
        )
        .await;

        self.fill_release_dates(&mut resolved).await;

        let records: Vec<CatalogRecord> = resolved
            .iter()
            .map(|r| {
                normalize(
                    &r.raw,
                    content_type,
                    r.id.as_deref(),
                    r.metadata.as_ref(),
                    r.assets,
                )
            })
            .collect();

        let canonical = records.iter().filter(|r| r.has_canonical_id()).count();
        info!(
            content_type = %content_type,
            total,
            canonical,
            synthetic = total - canonical,
            "records built"
        );
        records
    }

    async fn resolve_item(&self, content_type: ContentType, raw: RawItem) -> Resolved {
        let title = decode_entities(&raw.title);
        let id = self
            .resolver
            .resolve(&title, content_type, raw.release_year)
            .await;

        let Some(id) = id else {
            debug!(title = %raw.title, "unresolved, keeping site assets");
            return Resolved {
                raw,
                id: None,
                metadata: None,
                assets: AssetCheck::default(),
            };
        };

        let poster_url = canonical_poster_url(&id);
        let background_url = canonical_background_url(&id);
        let (metadata, poster, background) = futures::join!(
            self.enricher.enrich(content_type, Some(&id)),
            self.probe.probe(&poster_url),
            self.probe.probe(&background_url),
        );
        Resolved {
            raw,
            id: Some(id),
            metadata,
            assets: AssetCheck { poster, background },
        }
    }

    /// Precise dates only matter for items without a streaming date.
    async fn fill_release_dates(&self, resolved: &mut [Resolved]) {
        let Some(lookup) = &self.release_dates else {
            return;
        };
        let wanted: Vec<String> = resolved
            .iter()
            .filter(|r| r.raw.streaming_date.trim().is_empty())
            .filter(|r| r.metadata.as_ref().is_none_or(|m| m.released.is_none()))
            .filter_map(|r| r.id.clone())
            .collect();
        if wanted.is_empty() {
            return;
        }

        let dates = lookup.lookup_many(&wanted).await;
        for item in resolved.iter_mut() {
            let Some(date) = item.id.as_ref().and_then(|id| dates.get(id)) else {
                continue;
            };
            item.metadata.get_or_insert_with(MetadataRecord::default).released = Some(*date);
        }
    }
}

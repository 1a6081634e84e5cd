use std::sync::Arc;

use binged_core::types::{ContentType, is_canonical_id};
use tracing::{debug, warn};

use crate::MetadataRecord;
use crate::provider::MetadataSource;

/// Wraps a [`MetadataSource`] so lookups never fail past this point.
pub struct Enricher {
    source: Arc<dyn MetadataSource>,
}

impl Enricher {
    pub fn new(source: Arc<dyn MetadataSource>) -> Self {
        Self { source }
    }

    /// Metadata for a canonical id; `None` for absent/synthetic ids and on any failure.
    pub async fn enrich(
        &self,
        content_type: ContentType,
        id: Option<&str>,
    ) -> Option<MetadataRecord> {
        let id = id.filter(|id| is_canonical_id(id))?;
        match self.source.get_meta(content_type, id).await {
            Ok(meta) => {
                debug!(id, found = meta.is_some(), provider = self.source.name(), "enrichment finished");
                meta
            }
            Err(err) => {
                warn!(id, provider = self.source.name(), error = %err, "enrichment failed");
                None
            }
        }
    }
}

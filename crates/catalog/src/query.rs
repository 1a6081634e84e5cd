//! Read path: partition selection, poster substitution, filters, paging.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use binged_core::types::{CatalogRecord, ContentType, is_canonical_id, recommendation_code};
use binged_metadata::provider::PremiumPosterService;
use lru::LruCache;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::store::{CacheStore, PartitionKey, key_fingerprint};

/// One catalog request as understood by the query layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogQuery {
    pub content_type: String,
    pub language: Option<String>,
    pub recommendation: Option<String>,
    pub premium_key: Option<String>,
    pub skip: Option<usize>,
    pub limit: Option<usize>,
}

/// Rewrite posters of canonical-id records to the premium service. Synthetic ids keep theirs.
pub fn substitute_posters(
    records: &mut [CatalogRecord],
    premium: &dyn PremiumPosterService,
    key: &str,
) {
    for record in records.iter_mut().filter(|r| is_canonical_id(&r.id)) {
        record.poster = premium.poster_url(key, &record.id);
    }
}

/// Validation answers kept per side of the cache.
pub const KEY_CACHE_CAPACITY: usize = 1024;
/// How long a validation answer is trusted before asking again.
pub const KEY_CACHE_TTL: Duration = Duration::from_secs(6 * 60 * 60);

/// Key fingerprint -> expiry. Accepted and rejected keys are bounded
/// separately so a flood of junk keys cannot evict the good ones.
struct KeyCache {
    accepted: LruCache<String, Instant>,
    rejected: LruCache<String, Instant>,
    ttl: Duration,
}

impl KeyCache {
    fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            accepted: LruCache::new(capacity),
            rejected: LruCache::new(capacity),
            ttl,
        }
    }

    fn get(&mut self, fingerprint: &str) -> Option<bool> {
        let now = Instant::now();
        for (cache, valid) in [(&mut self.accepted, true), (&mut self.rejected, false)] {
            match cache.get(fingerprint).copied() {
                Some(expires_at) if now < expires_at => return Some(valid),
                Some(_) => {
                    cache.pop(fingerprint);
                }
                None => {}
            }
        }
        None
    }

    fn insert(&mut self, fingerprint: String, valid: bool) {
        let expires_at = Instant::now() + self.ttl;
        let (cache, other) = if valid {
            (&mut self.accepted, &mut self.rejected)
        } else {
            (&mut self.rejected, &mut self.accepted)
        };
        other.pop(&fingerprint);
        cache.put(fingerprint, expires_at);
    }

    fn purge_expired(&mut self) -> usize {
        let now = Instant::now();
        let mut purged = 0;
        for cache in [&mut self.accepted, &mut self.rejected] {
            let stale: Vec<String> = cache
                .iter()
                .filter(|(_, expires_at)| **expires_at <= now)
                .map(|(fingerprint, _)| fingerprint.clone())
                .collect();
            for fingerprint in &stale {
                cache.pop(fingerprint);
            }
            purged += stale.len();
        }
        purged
    }
}

pub struct QueryService {
    store: Arc<CacheStore>,
    premium: Arc<dyn PremiumPosterService>,
    preferred_key: Option<String>,
    validated: Mutex<KeyCache>,
}

impl QueryService {
    pub fn new(
        store: Arc<CacheStore>,
        premium: Arc<dyn PremiumPosterService>,
        preferred_key: Option<String>,
    ) -> Self {
        Self {
            store,
            premium,
            preferred_key: preferred_key
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty()),
            validated: Mutex::new(KeyCache::new(KEY_CACHE_CAPACITY, KEY_CACHE_TTL)),
        }
    }

    pub fn with_key_cache(mut self, capacity: usize, ttl: Duration) -> Self {
        self.validated = Mutex::new(KeyCache::new(capacity, ttl));
        self
    }

    pub fn store(&self) -> &Arc<CacheStore> {
        &self.store
    }

    pub fn premium(&self) -> &Arc<dyn PremiumPosterService> {
        &self.premium
    }

    pub fn preferred_key(&self) -> Option<&str> {
        self.preferred_key.as_deref()
    }

    /// Whether a premium key validates. Answers are cached per key until they
    /// expire; lookup errors are not cached.
    pub async fn is_valid_key(&self, key: &str) -> bool {
        let fingerprint = key_fingerprint(key);
        if let Some(valid) = self.validated.lock().await.get(&fingerprint) {
            return valid;
        }
        match self.premium.validate(key).await {
            Ok(valid) => {
                debug!(key = %fingerprint, valid, "premium key validated");
                self.validated.lock().await.insert(fingerprint, valid);
                valid
            }
            Err(err) => {
                warn!(key = %fingerprint, error = %err, "premium key validation failed");
                false
            }
        }
    }

    /// Drop expired validation answers.
    pub async fn purge_expired_keys(&self) -> usize {
        self.validated.lock().await.purge_expired()
    }

    pub async fn query(&self, query: &CatalogQuery) -> Vec<CatalogRecord> {
        let Some(content_type) = ContentType::parse(&query.content_type) else {
            debug!(content_type = %query.content_type, "unsupported content type");
            return Vec::new();
        };
        let key = query
            .premium_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty());

        // (a) partition selection
        let prerendered = match key {
            Some(k) if Some(k) == self.preferred_key.as_deref() => {
                self.store.get(&PartitionKey::premium(content_type, k)).await
            }
            _ => None,
        };
        let substitute = prerendered.is_none();
        let partition = match prerendered {
            Some(p) => p,
            None => match self.store.get(&PartitionKey::plain(content_type)).await {
                Some(p) => p,
                None => return Vec::new(),
            },
        };
        let mut records = Vec::clone(&partition);

        // (b) per-request substitution, never written back
        if let Some(k) = key.filter(|_| substitute) {
            if self.is_valid_key(k).await {
                substitute_posters(&mut records, self.premium.as_ref(), k);
            }
        }

        // (c) language membership
        if let Some(language) = query.language.as_deref().map(str::trim).filter(|l| !l.is_empty()) {
            records.retain(|r| r.languages.iter().any(|l| l.eq_ignore_ascii_case(language)));
        }

        // (d) recommendation label; an unknown label filters nothing
        if let Some(code) = query.recommendation.as_deref().and_then(recommendation_code) {
            records.retain(|r| {
                r.recommendation_code
                    .as_deref()
                    .is_some_and(|c| c.trim().eq_ignore_ascii_case(code))
            });
        }

        // (e) window
        let skip = query.skip.unwrap_or(0);
        let limit = query.limit.unwrap_or(usize::MAX);
        records.into_iter().skip(skip).take(limit).collect()
    }
}

//! In-memory partition cache with whole-partition TTL.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use binged_core::types::{CatalogRecord, ContentType};
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;
use tokio::time::Instant;

pub const DEFAULT_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Short, stable digest of a premium key. Raw keys never become cache keys or log fields.
pub fn key_fingerprint(key: &str) -> String {
    let digest = Sha256::digest(key.trim().as_bytes());
    hex::encode(&digest[..8])
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PosterSource {
    Plain,
    /// Pre-rendered with the premium key whose fingerprint is stored here.
    Premium(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PartitionKey {
    pub content_type: ContentType,
    pub poster_source: PosterSource,
}

impl PartitionKey {
    pub fn plain(content_type: ContentType) -> Self {
        Self {
            content_type,
            poster_source: PosterSource::Plain,
        }
    }

    pub fn premium(content_type: ContentType, key: &str) -> Self {
        Self {
            content_type,
            poster_source: PosterSource::Premium(key_fingerprint(key)),
        }
    }
}

impl std::fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.poster_source {
            PosterSource::Plain => write!(f, "{}", self.content_type),
            PosterSource::Premium(fp) => write!(f, "{}:premium:{fp}", self.content_type),
        }
    }
}

struct Entry {
    records: Arc<Vec<CatalogRecord>>,
    written_at: DateTime<Utc>,
    expires_at: Instant,
}

impl Entry {
    fn is_live(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

/// Summary of one live partition, for health reporting.
#[derive(Debug, Clone, serde::Serialize)]
pub struct PartitionStats {
    pub partition: String,
    pub records: usize,
    pub written_at: DateTime<Utc>,
    pub expires_in_secs: u64,
}

/// Process-wide catalog cache. Constructed once in `main` and shared by `Arc`.
pub struct CacheStore {
    entries: RwLock<HashMap<PartitionKey, Entry>>,
    default_ttl: Duration,
}

impl Default for CacheStore {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl CacheStore {
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            default_ttl,
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Live records for a partition; expired partitions read as absent.
    pub async fn get(&self, key: &PartitionKey) -> Option<Arc<Vec<CatalogRecord>>> {
        self.entries
            .read()
            .await
            .get(key)
            .filter(|e| e.is_live())
            .map(|e| e.records.clone())
    }

    pub async fn has(&self, key: &PartitionKey) -> bool {
        self.entries
            .read()
            .await
            .get(key)
            .is_some_and(Entry::is_live)
    }

    /// Replace a partition and restart its TTL.
    pub async fn set(
        &self,
        key: PartitionKey,
        records: Vec<CatalogRecord>,
        ttl: Duration,
    ) -> Arc<Vec<CatalogRecord>> {
        let records = Arc::new(records);
        let entry = Entry {
            records: records.clone(),
            written_at: Utc::now(),
            expires_at: Instant::now() + ttl,
        };
        self.entries.write().await.insert(key, entry);
        records
    }

    /// Drop expired partitions; returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, e| e.is_live());
        before - entries.len()
    }

    pub async fn stats(&self) -> Vec<PartitionStats> {
        let now = Instant::now();
        let mut stats: Vec<PartitionStats> = self
            .entries
            .read()
            .await
            .iter()
            .filter(|(_, e)| e.is_live())
            .map(|(key, e)| PartitionStats {
                partition: key.to_string(),
                records: e.records.len(),
                written_at: e.written_at,
                expires_in_secs: e.expires_at.saturating_duration_since(now).as_secs(),
            })
            .collect();
        stats.sort_by(|a, b| a.partition.cmp(&b.partition));
        stats
    }
}

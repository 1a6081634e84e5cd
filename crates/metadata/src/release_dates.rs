//! Precise release dates, throttled and cached on disk.
//!
//! Ids are served from the `release_date` table first. Remaining ids go to the
//! remote service in batches of `batch_size` concurrent calls with `pause`
//! between batches. Successful answers (including "no date") are written back;
//! failed calls are not cached and get retried on the next refresh.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use futures::future::join_all;
use sqlx::SqlitePool;
use tracing::{debug, info, warn};

use crate::parse_date_prefix;
use crate::provider::ReleaseDateSource;

pub const DEFAULT_BATCH_SIZE: usize = 10;
pub const DEFAULT_PAUSE: Duration = Duration::from_secs(1);

pub struct ReleaseDateLookup {
    source: Arc<dyn ReleaseDateSource>,
    pool: SqlitePool,
    batch_size: usize,
    pause: Duration,
}

impl ReleaseDateLookup {
    pub fn new(source: Arc<dyn ReleaseDateSource>, pool: SqlitePool) -> Self {
        Self {
            source,
            pool,
            batch_size: DEFAULT_BATCH_SIZE,
            pause: DEFAULT_PAUSE,
        }
    }

    pub fn with_throttle(mut self, batch_size: usize, pause: Duration) -> Self {
        self.batch_size = batch_size.max(1);
        self.pause = pause;
        self
    }

    /// Resolve dates for `ids`. Ids without a known date are absent from the map.
    pub async fn lookup_many(&self, ids: &[String]) -> HashMap<String, NaiveDate> {
        let mut unique: Vec<&str> = Vec::new();
        for id in ids {
            if !unique.contains(&id.as_str()) {
                unique.push(id);
            }
        }

        let cached: HashMap<String, Option<String>> =
            match binged_db::repo::release_dates::get_many(&self.pool, &unique).await {
                Ok(rows) => rows.into_iter().map(|r| (r.imdb_id, r.release_date)).collect(),
                Err(err) => {
                    warn!(error = %err, "release date cache read failed");
                    HashMap::new()
                }
            };

        let mut found = HashMap::new();
        let mut pending = Vec::new();
        for id in &unique {
            match cached.get(*id) {
                Some(date) => {
                    if let Some(date) = date.as_deref().and_then(parse_date_prefix) {
                        found.insert(id.to_string(), date);
                    }
                }
                None => pending.push(id.to_string()),
            }
        }

        if pending.is_empty() {
            return found;
        }
        info!(
            cached = unique.len() - pending.len(),
            remote = pending.len(),
            "looking up release dates"
        );

        for (index, batch) in pending.chunks(self.batch_size).enumerate() {
            if index > 0 {
                tokio::time::sleep(self.pause).await;
            }

            let results = join_all(batch.iter().map(|id| self.source.release_date(id))).await;
            for (id, result) in batch.iter().zip(results) {
                match result {
                    Ok(date) => {
                        let stored = date.map(|d| d.format("%Y-%m-%d").to_string());
                        if let Err(err) = binged_db::repo::release_dates::set(
                            &self.pool,
                            id,
                            stored.as_deref(),
                        )
                        .await
                        {
                            warn!(id = %id, error = %err, "release date cache write failed");
                        }
                        if let Some(date) = date {
                            found.insert(id.clone(), date);
                        }
                    }
                    Err(err) => debug!(id = %id, error = %err, "release date lookup failed"),
                }
            }
        }

        found
    }
}

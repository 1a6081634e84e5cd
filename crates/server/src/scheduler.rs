//! Periodic catalog refresh.
//!
//! Each partition moves `Idle -> Fetching -> {Committed | FailedRetainStale} -> Idle`.
//! Movie and series refresh in parallel; a partition never refreshes concurrently
//! with itself.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use binged_catalog::merge::{merge, replace_preserving_canonical};
use binged_catalog::query::{QueryService, substitute_posters};
use binged_catalog::store::PartitionKey;
use binged_core::types::{CatalogRecord, ContentType};
use binged_scraper::source::FetchMode;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::pipeline::RefreshPipeline;

// ---------------------------------------------------------------------------
// PeriodicTask
// ---------------------------------------------------------------------------

/// A job run on a fixed period until stopped. Panicking runs are logged and the
/// schedule continues.
pub struct PeriodicTask {
    name: &'static str,
    token: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl PeriodicTask {
    /// Start ticking. The first run happens one `period` after start.
    pub fn start<F, Fut>(name: &'static str, period: Duration, mut job: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let token = CancellationToken::new();
        let cancelled = token.clone();
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval.tick().await;

            loop {
                tokio::select! {
                    _ = cancelled.cancelled() => break,
                    _ = interval.tick() => {
                        let mut run = tokio::spawn(job());
                        tokio::select! {
                            _ = cancelled.cancelled() => {
                                run.abort();
                                break;
                            }
                            result = &mut run => match result {
                                Ok(()) => {}
                                Err(err) if err.is_panic() => {
                                    error!(task = name, "periodic run panicked");
                                }
                                Err(err) => warn!(task = name, error = %err, "periodic run aborted"),
                            },
                        }
                    }
                }
            }
            debug!(task = name, "periodic task stopped");
        });

        info!(task = name, period_secs = period.as_secs(), "periodic task started");
        Self {
            name,
            token,
            handle: Some(handle),
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Cancel and wait for the loop to exit. An in-flight run is aborted.
    pub async fn stop(mut self) {
        self.token.cancel();
        if let Some(handle) = self.handle.take() {
            if let Err(err) = handle.await {
                warn!(task = self.name, error = %err, "periodic task ended abnormally");
            }
        }
    }
}

impl Drop for PeriodicTask {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

// ---------------------------------------------------------------------------
// RefreshScheduler
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshState {
    Idle,
    Fetching,
    Committed,
    FailedRetainStale,
}

/// Observable state of one partition.
#[derive(Debug, Clone, Serialize)]
pub struct PartitionStatus {
    pub content_type: ContentType,
    pub state: RefreshState,
    pub last_outcome: Option<RefreshState>,
    pub last_mode: Option<&'static str>,
    pub last_success: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub records: usize,
}

struct Partition {
    lock: Mutex<()>,
    status: RwLock<PartitionStatus>,
}

impl Partition {
    fn new(content_type: ContentType) -> Self {
        Self {
            lock: Mutex::new(()),
            status: RwLock::new(PartitionStatus {
                content_type,
                state: RefreshState::Idle,
                last_outcome: None,
                last_mode: None,
                last_success: None,
                last_error: None,
                records: 0,
            }),
        }
    }
}

pub struct RefreshScheduler {
    pipeline: Arc<RefreshPipeline>,
    queries: Arc<QueryService>,
    ttl: Duration,
    full_refresh_every: u32,
    movie: Partition,
    series: Partition,
    ticks: AtomicU64,
}

impl RefreshScheduler {
    pub fn new(
        pipeline: Arc<RefreshPipeline>,
        queries: Arc<QueryService>,
        ttl: Duration,
        full_refresh_every: u32,
    ) -> Self {
        Self {
            pipeline,
            queries,
            ttl,
            full_refresh_every,
            movie: Partition::new(ContentType::Movie),
            series: Partition::new(ContentType::Series),
            ticks: AtomicU64::new(0),
        }
    }

    fn partition(&self, content_type: ContentType) -> &Partition {
        match content_type {
            ContentType::Movie => &self.movie,
            ContentType::Series => &self.series,
        }
    }

    /// Refresh one partition. Never fails: on error the stale partition (or
    /// nothing) is returned and the cache is left untouched.
    pub async fn refresh(
        &self,
        content_type: ContentType,
        mode: FetchMode,
    ) -> Arc<Vec<CatalogRecord>> {
        let partition = self.partition(content_type);
        let _guard = partition.lock.lock().await;

        let store = self.queries.store();
        let key = PartitionKey::plain(content_type);
        let cached = store.get(&key).await;

        // Nothing to merge into.
        let mode = match (mode, &cached) {
            (FetchMode::Incremental, None) => FetchMode::Full,
            _ => mode,
        };

        {
            let mut status = partition.status.write().await;
            status.state = RefreshState::Fetching;
            status.last_mode = Some(mode.as_str());
        }
        info!(content_type = %content_type, mode = %mode, "refresh started");

        let (outcome, records, failure) = match self.pipeline.fetch_records(content_type, mode).await {
            Ok(incoming) => {
                let existing = cached.map(|c| Vec::clone(&c)).unwrap_or_default();
                let merged = match mode {
                    FetchMode::Full => replace_preserving_canonical(existing, incoming),
                    FetchMode::Incremental => merge(existing, incoming),
                };
                info!(
                    content_type = %content_type,
                    mode = %mode,
                    added = merged.added,
                    upgraded = merged.upgraded,
                    total = merged.records.len(),
                    "partition committed"
                );
                let records = store.set(key, merged.records, self.ttl).await;
                self.write_premium(content_type, &records).await;
                (RefreshState::Committed, records, None)
            }
            Err(err) => {
                error!(
                    content_type = %content_type,
                    mode = %mode,
                    error = %err,
                    "refresh failed, keeping stale partition"
                );
                (
                    RefreshState::FailedRetainStale,
                    cached.unwrap_or_default(),
                    Some(err.to_string()),
                )
            }
        };

        let mut status = partition.status.write().await;
        status.state = RefreshState::Idle;
        status.last_outcome = Some(outcome);
        status.records = records.len();
        if failure.is_none() {
            status.last_success = Some(Utc::now());
        }
        status.last_error = failure;
        records
    }

    /// Re-render the preferred key's premium partition from fresh plain records.
    async fn write_premium(&self, content_type: ContentType, records: &[CatalogRecord]) {
        let Some(key) = self.queries.preferred_key() else {
            return;
        };
        if !self.queries.is_valid_key(key).await {
            warn!(content_type = %content_type, "preferred premium key did not validate");
            return;
        }
        let mut rendered = records.to_vec();
        substitute_posters(&mut rendered, self.queries.premium().as_ref(), key);
        self.queries
            .store()
            .set(PartitionKey::premium(content_type, key), rendered, self.ttl)
            .await;
        debug!(content_type = %content_type, "premium partition written");
    }

    pub async fn refresh_all(&self, mode: FetchMode) {
        futures::join!(
            self.refresh(ContentType::Movie, mode),
            self.refresh(ContentType::Series, mode),
        );
    }

    /// Mode for the n-th tick (1-based).
    fn mode_for_tick(&self, tick: u64) -> FetchMode {
        let every = u64::from(self.full_refresh_every);
        if every > 0 && tick % every == 0 {
            FetchMode::Full
        } else {
            FetchMode::Incremental
        }
    }

    pub async fn tick(&self) {
        let tick = self.ticks.fetch_add(1, Ordering::SeqCst) + 1;
        let mode = self.mode_for_tick(tick);
        debug!(tick, mode = %mode, "refresh tick");
        self.refresh_all(mode).await;

        let purged = self.queries.store().purge_expired().await;
        if purged > 0 {
            info!(purged, "expired partitions dropped");
        }
        let keys = self.queries.purge_expired_keys().await;
        if keys > 0 {
            debug!(keys, "expired key validations dropped");
        }
    }

    /// Spawn the periodic refresh. The start-up full fetch is the caller's job.
    pub fn start(self: &Arc<Self>, period: Duration) -> PeriodicTask {
        let scheduler = self.clone();
        PeriodicTask::start("catalog-refresh", period, move || {
            let scheduler = scheduler.clone();
            async move { scheduler.tick().await }
        })
    }

    pub async fn status(&self) -> Vec<PartitionStatus> {
        vec![
            self.movie.status.read().await.clone(),
            self.series.status.read().await.clone(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::tests::{FakeSource, pipeline, raw};
    use binged_catalog::store::{CacheStore, DEFAULT_TTL};
    use binged_metadata::MetadataError;
    use binged_metadata::provider::PremiumPosterService;
    use binged_scraper::ScrapeError;
    use std::sync::atomic::AtomicUsize;

    struct FakePremium;

    #[async_trait::async_trait]
    impl PremiumPosterService for FakePremium {
        async fn validate(&self, key: &str) -> Result<bool, MetadataError> {
            Ok(key == "pref")
        }

        fn poster_url(&self, key: &str, id: &str) -> String {
            format!("premium://{key}/{id}")
        }
    }

    fn scheduler(
        source: Arc<FakeSource>,
        table: &[(&str, &str)],
        preferred: Option<&str>,
        full_every: u32,
    ) -> Arc<RefreshScheduler> {
        let store = Arc::new(CacheStore::default());
        let queries = Arc::new(QueryService::new(
            store,
            Arc::new(FakePremium),
            preferred.map(str::to_string),
        ));
        Arc::new(RefreshScheduler::new(
            Arc::new(pipeline(source, table)),
            queries,
            DEFAULT_TTL,
            full_every,
        ))
    }

    fn ids(records: &[CatalogRecord]) -> Vec<&str> {
        records.iter().map(|r| r.id.as_str()).collect()
    }

    #[tokio::test]
    async fn incremental_merges_into_cached_partition() {
        let source = Arc::new(FakeSource::new(vec![
            Ok(vec![raw("1", "Bar"), raw("2", "Baz")]),
            Ok(vec![raw("3", "New"), raw("1", "Bar")]),
        ]));
        let sched = scheduler(source.clone(), &[], None, 0);

        let first = sched.refresh(ContentType::Movie, FetchMode::Incremental).await;
        assert_eq!(ids(&first), ["binged:1", "binged:2"]);

        let second = sched.refresh(ContentType::Movie, FetchMode::Incremental).await;
        assert_eq!(ids(&second), ["binged:3", "binged:1", "binged:2"]);

        // empty cache forced the first pass to a full fetch
        let modes: Vec<FetchMode> = source.calls.lock().unwrap().iter().map(|(_, m)| *m).collect();
        assert_eq!(modes, [FetchMode::Full, FetchMode::Incremental]);
    }

    #[tokio::test]
    async fn failure_retains_stale_partition() {
        let source = Arc::new(FakeSource::new(vec![
            Ok(vec![raw("1", "Kept")]),
            Err(ScrapeError::Status(500)),
            Ok(vec![raw("2", "After")]),
        ]));
        let sched = scheduler(source, &[], None, 0);

        sched.refresh(ContentType::Series, FetchMode::Full).await;
        let stale = sched.refresh(ContentType::Series, FetchMode::Incremental).await;
        assert_eq!(ids(&stale), ["binged:1"]);

        let status = sched.status().await;
        let series = status.iter().find(|s| s.content_type == ContentType::Series).unwrap();
        assert_eq!(series.state, RefreshState::Idle);
        assert_eq!(series.last_outcome, Some(RefreshState::FailedRetainStale));
        assert!(series.last_error.as_deref().unwrap().contains("500"));
        assert_eq!(series.records, 1);

        // next refresh still goes through
        let next = sched.refresh(ContentType::Series, FetchMode::Incremental).await;
        assert_eq!(ids(&next), ["binged:2", "binged:1"]);
        let status = sched.status().await;
        assert_eq!(status[1].last_outcome, Some(RefreshState::Committed));
        assert!(status[1].last_error.is_none());
    }

    #[tokio::test]
    async fn failure_with_empty_cache_returns_nothing() {
        let source = Arc::new(FakeSource::new(vec![Err(ScrapeError::Network("down".into()))]));
        let sched = scheduler(source, &[], None, 0);
        assert!(sched.refresh(ContentType::Movie, FetchMode::Full).await.is_empty());
    }

    #[tokio::test]
    async fn canonical_upgrade_reaches_the_cache() {
        let source = Arc::new(FakeSource::new(vec![
            Ok(vec![raw("1", "Bar")]),
            Ok(vec![raw("1", "Bar")]),
        ]));
        let sched = scheduler(source, &[], None, 0);
        sched.refresh(ContentType::Movie, FetchMode::Full).await;

        // second pass resolves the same title
        let source = Arc::new(FakeSource::new(vec![Ok(vec![raw("1", "Bar")])]));
        let upgraded = RefreshScheduler::new(
            Arc::new(pipeline(source, &[("Bar", "tt000123")])),
            sched.queries.clone(),
            DEFAULT_TTL,
            0,
        );
        let records = upgraded.refresh(ContentType::Movie, FetchMode::Incremental).await;
        assert_eq!(ids(&records), ["tt000123"]);
    }

    #[tokio::test]
    async fn full_fetch_keeps_cached_canonical_ids() {
        let first = Arc::new(FakeSource::new(vec![Ok(vec![raw("1", "Bar"), raw("2", "Gone")])]));
        let sched = scheduler(first, &[("Bar", "tt000123")], None, 0);
        let records = sched.refresh(ContentType::Movie, FetchMode::Full).await;
        assert_eq!(ids(&records), ["tt000123", "binged:2"]);

        // resolver unavailable on the next full pass
        let second = Arc::new(FakeSource::new(vec![Ok(vec![raw("3", "Fresh"), raw("1", "Bar")])]));
        let offline = RefreshScheduler::new(
            Arc::new(pipeline(second, &[])),
            sched.queries.clone(),
            DEFAULT_TTL,
            0,
        );
        let records = offline.refresh(ContentType::Movie, FetchMode::Full).await;
        assert_eq!(ids(&records), ["binged:3", "tt000123"]);
    }

    #[tokio::test]
    async fn same_partition_never_refreshes_concurrently() {
        let source = Arc::new(
            FakeSource::new(vec![Ok(vec![raw("1", "A")]), Ok(vec![raw("2", "B")])])
                .with_delay(Duration::from_millis(20)),
        );
        let sched = scheduler(source.clone(), &[], None, 0);

        futures::join!(
            sched.refresh(ContentType::Movie, FetchMode::Full),
            sched.refresh(ContentType::Movie, FetchMode::Incremental),
        );
        assert_eq!(source.calls.lock().unwrap().len(), 2);
        assert_eq!(source.peak.load(Ordering::SeqCst), 1);

        // the second run merged into the first one's commit
        let cached = sched
            .queries
            .store()
            .get(&PartitionKey::plain(ContentType::Movie))
            .await
            .unwrap();
        assert_eq!(ids(&cached), ["binged:2", "binged:1"]);
    }

    #[tokio::test]
    async fn different_partitions_refresh_in_parallel() {
        let source = Arc::new(FakeSource::new(vec![]).with_delay(Duration::from_millis(20)));
        let sched = scheduler(source.clone(), &[], None, 0);
        sched.refresh_all(FetchMode::Full).await;
        assert_eq!(source.peak.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn full_fetch_every_nth_tick() {
        let sched = scheduler(Arc::new(FakeSource::new(vec![])), &[], None, 3);
        let modes: Vec<FetchMode> = (1..=6).map(|n| sched.mode_for_tick(n)).collect();
        use FetchMode::{Full, Incremental};
        assert_eq!(modes, [Incremental, Incremental, Full, Incremental, Incremental, Full]);

        let never = scheduler(Arc::new(FakeSource::new(vec![])), &[], None, 0);
        assert!((1..=10).all(|n| never.mode_for_tick(n) == Incremental));
    }

    #[tokio::test]
    async fn tick_refreshes_both_partitions() {
        let source = Arc::new(FakeSource::new(vec![]));
        let sched = scheduler(source.clone(), &[], None, 0);
        sched.tick().await;
        let mut types: Vec<ContentType> = source.calls.lock().unwrap().iter().map(|(t, _)| *t).collect();
        types.sort_by_key(|t| t.as_str());
        assert_eq!(types, [ContentType::Movie, ContentType::Series]);
    }

    #[tokio::test]
    async fn commit_writes_premium_partition_for_preferred_key() {
        let source = Arc::new(FakeSource::new(vec![Ok(vec![raw("1", "Known"), raw("2", "Other")])]));
        let sched = scheduler(source, &[("Known", "tt42")], Some("pref"), 0);
        sched.refresh(ContentType::Movie, FetchMode::Full).await;

        let store = sched.queries.store();
        let premium = store
            .get(&PartitionKey::premium(ContentType::Movie, "pref"))
            .await
            .unwrap();
        assert_eq!(premium[0].poster, "premium://pref/tt42");
        assert_eq!(premium[1].poster, "https://site/2.jpg");

        let plain = store.get(&PartitionKey::plain(ContentType::Movie)).await.unwrap();
        assert_ne!(plain[0].poster, premium[0].poster);
    }

    #[tokio::test]
    async fn periodic_task_survives_panics_and_stops() {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = runs.clone();
        let task = PeriodicTask::start("test", Duration::from_millis(10), move || {
            let counter = counter.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    panic!("first run fails");
                }
            }
        });

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(task.is_running());
        task.stop().await;

        let seen = runs.load(Ordering::SeqCst);
        assert!(seen >= 2, "only {seen} runs");
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(runs.load(Ordering::SeqCst), seen);
    }
}

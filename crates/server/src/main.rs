use std::sync::Arc;

use anyhow::Context;
use binged_catalog::query::QueryService;
use binged_catalog::store::CacheStore;
use binged_metadata::cinemeta::CinemetaClient;
use binged_metadata::enricher::Enricher;
use binged_metadata::imdb::ImdbSuggestClient;
use binged_metadata::probe::HttpAssetProbe;
use binged_metadata::release_dates::ReleaseDateLookup;
use binged_metadata::resolver::Resolver;
use binged_metadata::rpdb::RpdbClient;
use binged_metadata::tmdb::TmdbClient;
use binged_scraper::source::{BingedClient, FetchMode};
use binged_server::config::Config;
use binged_server::pipeline::RefreshPipeline;
use binged_server::scheduler::RefreshScheduler;
use binged_server::state::AppState;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Cached "no date" answers older than this are looked up again.
const RELEASE_DATE_MISS_TTL_SECS: i64 = 30 * 24 * 60 * 60;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::from_env().context("invalid configuration")?;

    info!(db_path = %config.db_path, "connecting to database");
    let pool = binged_db::connect(&config.db_path)
        .await
        .context("failed to connect to database")?;
    binged_db::migrate::run(&pool)
        .await
        .context("failed to run migrations")?;
    info!("migrations complete");

    let cutoff = chrono::Utc::now().timestamp() - RELEASE_DATE_MISS_TTL_SECS;
    match binged_db::repo::release_dates::delete_misses_before(&pool, cutoff).await {
        Ok(0) => {}
        Ok(removed) => info!(removed, "expired release date misses dropped"),
        Err(e) => warn!(error = %e, "failed to prune release date cache"),
    }

    let client = binged_metadata::http_client(config.http_timeout)
        .context("failed to build HTTP client")?;

    // Refresh pipeline
    let cinemeta = Arc::new(CinemetaClient::new(client.clone()));
    let resolver = Resolver::new(
        cinemeta.clone(),
        Arc::new(ImdbSuggestClient::new(client.clone())),
    );
    let mut pipeline = RefreshPipeline::new(
        Arc::new(BingedClient::new(client.clone())),
        resolver,
        Enricher::new(cinemeta),
        Arc::new(HttpAssetProbe::new(client.clone(), config.http_timeout)),
    );
    match &config.tmdb_key {
        Some(key) => {
            let tmdb = Arc::new(TmdbClient::new(key.clone(), client.clone()));
            pipeline = pipeline.with_release_dates(ReleaseDateLookup::new(tmdb, pool.clone()));
        }
        None => info!("BINGED_TMDB_KEY not set, precise release dates disabled"),
    }

    // Cache + query layer
    let store = Arc::new(CacheStore::new(config.cache_ttl));
    let queries = Arc::new(QueryService::new(
        store,
        Arc::new(RpdbClient::new(client)),
        config.preferred_rpdb_key.clone(),
    ));

    let scheduler = Arc::new(RefreshScheduler::new(
        Arc::new(pipeline),
        queries.clone(),
        config.cache_ttl,
        config.full_refresh_every,
    ));

    // Initial full fetch runs in the background; catalogs are empty until it commits.
    {
        let scheduler = scheduler.clone();
        tokio::spawn(async move {
            info!("starting initial full fetch");
            scheduler.refresh_all(FetchMode::Full).await;
            info!("initial full fetch completed");
        });
    }
    let refresh_task = scheduler.start(config.refresh_interval);

    let app_state = AppState {
        db: pool,
        queries,
        scheduler,
        page_size: config.page_size,
    };
    let app = binged_server::routes::build_router(app_state);

    let listener = tokio::net::TcpListener::bind(&config.bind)
        .await
        .context("failed to bind")?;
    info!(addr = %config.bind, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
        })
        .await?;

    info!("shutting down");
    refresh_task.stop().await;
    Ok(())
}

use axum::extract::{Path, State};
use axum::http::Uri;
use axum::routing::get;
use axum::{Json, Router};
use binged_catalog::query::CatalogQuery;
use binged_catalog::store::PartitionStats;
use binged_core::error::ApiError;
use binged_core::types::CatalogRecord;
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::debug;

use crate::error::{AppError, RequestError};
use crate::manifest::{CATALOG_ID, Manifest, manifest};
use crate::request::{CatalogPath, CatalogRequest, parse_manifest_path};
use crate::scheduler::PartitionStatus;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/manifest.json", get(get_manifest))
        .route("/{config}/manifest.json", get(get_configured_manifest))
        .route("/catalog/{type}/{id}", get(get_catalog))
        .route("/catalog/{type}/{id}/{extra}", get(get_catalog))
        .route("/{config}/catalog/{type}/{id}", get(get_catalog))
        .route("/{config}/catalog/{type}/{id}/{extra}", get(get_catalog))
        .fallback(not_found)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    partitions: Vec<PartitionStatus>,
    cache: Vec<PartitionStats>,
}

async fn health(State(state): State<AppState>) -> Result<Json<HealthResponse>, AppError> {
    sqlx::query("SELECT 1")
        .execute(&state.db)
        .await
        .map_err(|e| ApiError::Internal(format!("database check failed: {e}")))?;

    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        partitions: state.scheduler.status().await,
        cache: state.queries.store().stats().await,
    }))
}

// ---------------------------------------------------------------------------
// Manifest
// ---------------------------------------------------------------------------

async fn get_manifest() -> Json<Manifest> {
    Json(manifest())
}

async fn get_configured_manifest(uri: Uri) -> Result<Json<Manifest>, AppError> {
    parse_manifest_path(uri.path())?;
    Ok(Json(manifest()))
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct CatalogResponse {
    metas: Vec<CatalogRecord>,
}

async fn get_catalog(
    State(state): State<AppState>,
    Path(params): Path<CatalogPath>,
    uri: Uri,
) -> Result<Json<CatalogResponse>, AppError> {
    let request = CatalogRequest::from_path(params, uri.path())?;
    if request.catalog_id != CATALOG_ID {
        debug!(catalog = %request.catalog_id, "unknown catalog id");
        return Ok(Json(CatalogResponse { metas: Vec::new() }));
    }

    let query = CatalogQuery {
        content_type: request.content_type,
        language: request.extra.language,
        recommendation: request.extra.recommendation,
        premium_key: request.config.rpdb_key,
        skip: request.extra.skip,
        limit: Some(state.page_size),
    };
    let metas = state.queries.query(&query).await;
    debug!(
        content_type = %query.content_type,
        language = ?query.language,
        skip = ?query.skip,
        count = metas.len(),
        "catalog served"
    );
    Ok(Json(CatalogResponse { metas }))
}

async fn not_found(uri: Uri) -> AppError {
    RequestError::Route(uri.path().to_string()).into()
}

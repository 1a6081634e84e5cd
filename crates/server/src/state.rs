use std::sync::Arc;

use binged_catalog::query::QueryService;
use sqlx::SqlitePool;

use crate::scheduler::RefreshScheduler;

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub queries: Arc<QueryService>,
    pub scheduler: Arc<RefreshScheduler>,
    /// Upper bound on records per catalog response.
    pub page_size: usize,
}

use sqlx::{QueryBuilder, Sqlite, SqlitePool};

/// Ids bound per `IN (...)` query.
const MAX_BINDS: usize = 500;

/// A cached precise-date lookup. `release_date` is `None` when the remote
/// service had no date; the miss is cached too so it is not re-queried.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct ReleaseDateRow {
    pub imdb_id: String,
    pub release_date: Option<String>,
    pub fetched_ts: i64,
}

pub async fn get(pool: &SqlitePool, imdb_id: &str) -> Result<Option<ReleaseDateRow>, sqlx::Error> {
    sqlx::query_as("SELECT imdb_id, release_date, fetched_ts FROM release_date WHERE imdb_id = ?")
        .bind(imdb_id)
        .fetch_optional(pool)
        .await
}

/// Upsert a lookup result (`None` records a miss).
pub async fn set(
    pool: &SqlitePool,
    imdb_id: &str,
    release_date: Option<&str>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO release_date (imdb_id, release_date, fetched_ts) VALUES (?, ?, ?) \
         ON CONFLICT(imdb_id) DO UPDATE SET release_date = excluded.release_date, \
         fetched_ts = excluded.fetched_ts",
    )
    .bind(imdb_id)
    .bind(release_date)
    .bind(chrono::Utc::now().timestamp())
    .execute(pool)
    .await?;
    Ok(())
}

/// Fetch cached rows for several ids. Ids with no row are simply absent.
pub async fn get_many(
    pool: &SqlitePool,
    imdb_ids: &[&str],
) -> Result<Vec<ReleaseDateRow>, sqlx::Error> {
    let mut rows = Vec::with_capacity(imdb_ids.len());
    for chunk in imdb_ids.chunks(MAX_BINDS) {
        let mut query = QueryBuilder::<Sqlite>::new(
            "SELECT imdb_id, release_date, fetched_ts FROM release_date WHERE imdb_id IN (",
        );
        let mut ids = query.separated(", ");
        for id in chunk {
            ids.push_bind(*id);
        }
        ids.push_unseparated(")");
        rows.extend(
            query
                .build_query_as::<ReleaseDateRow>()
                .fetch_all(pool)
                .await?,
        );
    }
    Ok(rows)
}

/// Forget cached misses older than `cutoff_ts` so they are looked up again.
pub async fn delete_misses_before(pool: &SqlitePool, cutoff_ts: i64) -> Result<u64, sqlx::Error> {
    let result =
        sqlx::query("DELETE FROM release_date WHERE release_date IS NULL AND fetched_ts < ?")
            .bind(cutoff_ts)
            .execute(pool)
            .await?;
    Ok(result.rows_affected())
}

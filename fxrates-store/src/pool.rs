use fxrates_core::{FxError, FxResult};
use sqlx::postgres::{PgPool, PgPoolOptions};

/// Open a connection pool eagerly: a bad `database_url` should fail the
/// process at startup, not surface as a lazily-discovered runtime error.
pub async fn connect(database_url: &str, max_connections: u32) -> FxResult<PgPool> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
        .map_err(|e| FxError::Internal(format!("connecting to postgres: {e}")))
}

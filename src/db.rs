//! SQLite pool construction, schema migrations, and store-error helpers
//! shared by the catalog and asset services.

use sqlx::{
    Sqlite, SqlitePool, Transaction,
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
};
use std::{future::Future, path::Path, str::FromStr, time::Duration};
use tracing::{info, warn};

/// Open the SQLite pool described by `database_url`, creating the file and
/// its parent directory if needed.
pub async fn connect(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    // Extract the local file path SQLx will use
    let db_path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .trim_start_matches("file:");
    let in_memory = db_path.starts_with(":memory:");

    if !in_memory {
        if let Some(parent) = Path::new(db_path).parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
                info!("Created missing directory {:?}", parent);
            }
        }
    }

    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(5));
    let options = if in_memory {
        options
    } else {
        options.journal_mode(SqliteJournalMode::Wal)
    };

    // An in-memory database lives and dies with its single connection.
    let pool_options = if in_memory {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new().max_connections(5)
    };

    pool_options.connect_with(options).await
}

/// Apply the embedded migrations. Safe to run on every start.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    info!("Database migrations applied");
    Ok(())
}

/// Open a write transaction that takes the database write lock up front.
///
/// A deferred transaction that reads before it writes cannot wait for the
/// lock once another writer commits; it fails with `SQLITE_BUSY_SNAPSHOT`
/// instead. Taking the lock at `BEGIN` lets the busy timeout queue writers.
pub async fn begin_immediate(pool: &SqlitePool) -> Result<Transaction<'static, Sqlite>, sqlx::Error> {
    pool.begin_with("BEGIN IMMEDIATE").await
}

/// Return true if SQLx error indicates a unique constraint violation.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db_err) if db_err.is_unique_violation()
            || db_err.message().to_ascii_lowercase().contains("unique")
    )
}

/// Errors worth another attempt: a busy or locked database (including a
/// stale WAL snapshot), an exhausted pool, or a dropped connection.
pub fn is_transient(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => true,
        sqlx::Error::Database(db_err) => {
            let code = db_err.code();
            matches!(
                code.as_deref(),
                Some("5") | Some("6") | Some("261") | Some("262") | Some("517")
            )
                || db_err.message().contains("database is locked")
        }
        _ => false,
    }
}

/// Run an idempotent store operation, retrying transient failures with
/// exponential backoff. `attempts` counts the first try.
pub async fn with_retry<T, F, Fut>(attempts: u32, what: &str, mut op: F) -> Result<T, sqlx::Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, sqlx::Error>>,
{
    let attempts = attempts.max(1);
    let mut delay = Duration::from_millis(25);
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < attempts && is_transient(&err) => {
                warn!(attempt, error = %err, "transient store error during {}, retrying", what);
                tokio::time::sleep(delay).await;
                delay *= 2;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
pub(crate) async fn test_pool() -> SqlitePool {
    let pool = connect("sqlite::memory:").await.unwrap();
    run_migrations(&pool).await.unwrap();
    pool
}

/// A file-backed pool with the production settings (WAL, five connections),
/// for tests that need writers on separate connections.
#[cfg(test)]
pub(crate) async fn file_pool() -> (tempfile::TempDir, SqlitePool) {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("catalog.db").display());
    let pool = connect(&url).await.unwrap();
    run_migrations(&pool).await.unwrap();
    (dir, pool)
}

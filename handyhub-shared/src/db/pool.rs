/// SQLite connection pool
///
/// This module opens the SQLite connection pool used by every HandyHub component.
/// Foreign keys are always enforced, file databases run in WAL mode with a busy
/// timeout, and a health check runs before the pool is handed out.
///
/// # Example
///
/// ```no_run
/// use handyhub_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), sqlx::Error> {
/// // Tests and tools get a private database that disappears with the pool
/// let scratch = create_pool(DatabaseConfig::in_memory()).await?;
///
/// let store = create_pool(DatabaseConfig {
///     url: "sqlite:///var/lib/handyhub/store.db".to_string(),
///     max_connections: 8,
///     ..Default::default()
/// })
/// .await?;
///
/// let users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
///     .fetch_one(&store)
///     .await?;
/// # drop((scratch, users));
/// # Ok(())
/// # }
/// ```

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};

/// URL used when no `DATABASE_URL` is configured
pub const DEFAULT_DATABASE_URL: &str = "sqlite://handyhub.db";

/// URL of a private in-memory database
pub const IN_MEMORY_DATABASE_URL: &str = "sqlite::memory:";

/// Configuration for the database connection pool
///
/// All timeouts are specified in seconds (milliseconds for the busy timeout) so they can
/// be read straight from environment variables.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// SQLite connection URL (e.g., "sqlite://handyhub.db" or "sqlite::memory:")
    pub url: String,

    /// Upper bound on open connections
    ///
    /// Default: 5. SQLite serializes writers, so a small pool is enough.
    pub max_connections: u32,

    /// Connections kept open while idle
    ///
    /// Default: 1
    pub min_connections: u32,

    /// How long `acquire` may wait for a free connection (seconds)
    ///
    /// Default: 30 seconds
    pub connect_timeout_seconds: u64,

    /// Idle time after which a connection is closed (seconds)
    ///
    /// Default: Some(600). None = never closed for idleness.
    pub idle_timeout_seconds: Option<u64>,

    /// Age at which a connection is replaced (seconds)
    ///
    /// Default: Some(1800)
    pub max_lifetime_seconds: Option<u64>,

    /// How long a connection waits on a locked database before failing (milliseconds)
    ///
    /// Default: 5000
    pub busy_timeout_ms: u64,

    /// Ping connections before handing them out
    ///
    /// Default: true
    pub test_before_acquire: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_DATABASE_URL.to_string(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout_seconds: 30,
            idle_timeout_seconds: Some(600),
            max_lifetime_seconds: Some(1800),
            busy_timeout_ms: 5_000,
            test_before_acquire: true,
        }
    }
}

impl DatabaseConfig {
    /// Configuration for a private in-memory database
    ///
    /// An in-memory database lives only as long as one of its connections, so the pool
    /// is pinned to a single connection that is never recycled.
    pub fn in_memory() -> Self {
        Self {
            url: IN_MEMORY_DATABASE_URL.to_string(),
            max_connections: 1,
            min_connections: 1,
            idle_timeout_seconds: None,
            max_lifetime_seconds: None,
            ..Default::default()
        }
    }

    /// Whether the URL points at an in-memory database
    pub fn is_in_memory(&self) -> bool {
        is_in_memory_url(&self.url)
    }

    /// Builds the connect options for this configuration
    pub fn connect_options(&self) -> Result<SqliteConnectOptions, sqlx::Error> {
        let mut options = SqliteConnectOptions::from_str(&self.url)?
            .foreign_keys(true)
            .create_if_missing(true)
            .busy_timeout(Duration::from_millis(self.busy_timeout_ms));

        if !self.is_in_memory() {
            options = options.journal_mode(SqliteJournalMode::Wal);
        }

        Ok(options)
    }
}

pub(crate) fn is_in_memory_url(url: &str) -> bool {
    url.contains(":memory:") || url.contains("mode=memory")
}

/// Creates and initializes a SQLite connection pool
///
/// This function:
/// 1. Builds connect options (foreign keys on, WAL for files, file created if missing)
/// 2. Creates a pool with the specified limits
/// 3. Performs a health check and fails if the database does not answer
///
/// # Errors
///
/// Returns an error if the URL is invalid, the database cannot be opened, or the
/// health check fails.
pub async fn create_pool(config: DatabaseConfig) -> Result<SqlitePool, sqlx::Error> {
    info!(
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        connect_timeout_seconds = config.connect_timeout_seconds,
        in_memory = config.is_in_memory(),
        "Opening SQLite pool"
    );

    let connect_options = config.connect_options()?;

    let pool_options = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.connect_timeout_seconds))
        .test_before_acquire(config.test_before_acquire)
        .idle_timeout(config.idle_timeout_seconds.map(Duration::from_secs))
        .max_lifetime(config.max_lifetime_seconds.map(Duration::from_secs));

    if config.is_in_memory() && config.max_connections > 1 {
        warn!(
            max_connections = config.max_connections,
            "In-memory database with several connections may report table locks"
        );
    }

    debug!(
        idle_timeout_seconds = ?config.idle_timeout_seconds,
        max_lifetime_seconds = ?config.max_lifetime_seconds,
        busy_timeout_ms = config.busy_timeout_ms,
        "Pool timeouts configured"
    );

    let pool = pool_options.connect_with(connect_options).await?;

    health_check(&pool).await?;

    info!("SQLite pool ready");
    Ok(pool)
}

/// Runs `SELECT 1` against the pool
///
/// # Errors
///
/// Returns the store error if the query fails or answers anything but 1
pub async fn health_check(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    debug!("Checking database health");

    let result: (i64,) = sqlx::query_as("SELECT 1").fetch_one(pool).await?;

    if result.0 == 1 {
        debug!("Database is healthy");
        Ok(())
    } else {
        warn!(value = result.0, "Health check answered an unexpected value");
        Err(sqlx::Error::Protocol(format!(
            "health check answered {} instead of 1",
            result.0
        )))
    }
}

/// Snapshot of the pool's connection counts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolStats {
    /// Checked out right now
    pub active_connections: usize,

    /// Open and waiting in the pool
    pub idle_connections: usize,

    pub total_connections: usize,
}

pub fn get_pool_stats(pool: &SqlitePool) -> PoolStats {
    let size = pool.size() as usize;
    let idle = pool.num_idle();

    PoolStats {
        active_connections: size.saturating_sub(idle),
        idle_connections: idle,
        total_connections: size,
    }
}

/// Waits for checked-out connections to return, then closes every connection
///
/// Closing the last connection of an in-memory database discards its contents.
pub async fn close_pool(pool: SqlitePool) {
    let stats = get_pool_stats(&pool);
    info!(open_connections = stats.total_connections, "Closing database pool");
    pool.close().await;
    debug!("Database pool closed");
}

/// Database migration runner
///
/// Migrations are embedded at compile time from `handyhub-shared/migrations/`.
/// Each migration is a reversible pair:
/// - `{version}_{name}.up.sql`
/// - `{version}_{name}.down.sql`
///
/// # Example
///
/// ```no_run
/// use handyhub_shared::db::pool::{create_pool, DatabaseConfig};
/// use handyhub_shared::db::migrations::{run_migrations, get_migration_status};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
/// run_migrations(&pool).await?;
///
/// let status = get_migration_status(&pool).await?;
/// assert!(status.is_up_to_date);
/// # Ok(())
/// # }
/// ```

use sqlx::{migrate::MigrateDatabase, migrate::Migrator, sqlite::SqlitePool, Sqlite};
use tracing::{debug, info, warn};

use super::pool::is_in_memory_url;

/// Every schema migration shipped with this crate
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Where the schema stands relative to the embedded migrations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationStatus {
    /// Successfully applied migrations
    pub applied_migrations: usize,

    /// Latest applied migration version
    pub latest_version: Option<i64>,

    /// Number of migrations embedded in this build
    pub known_migrations: usize,

    /// Whether the latest embedded migration has been applied
    pub is_up_to_date: bool,
}

/// Applies every embedded migration not yet recorded in `_sqlx_migrations`
///
/// Already applied migrations are skipped, so running this twice is a no-op.
///
/// # Errors
///
/// Returns an error if a migration fails to apply, or if an applied migration's
/// checksum no longer matches the embedded file.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::migrate::MigrateError> {
    info!(
        known_migrations = MIGRATOR.iter().count(),
        "Starting database migrations"
    );

    match MIGRATOR.run(pool).await {
        Ok(()) => {
            info!("Schema migrations applied");
            Ok(())
        }
        Err(e) => {
            warn!(error = %e, "Schema migration failed");
            Err(e)
        }
    }
}

/// Latest up-migration version embedded in this build
pub fn latest_known_version() -> Option<i64> {
    MIGRATOR
        .iter()
        .filter(|m| m.migration_type.is_up_migration())
        .map(|m| m.version)
        .max()
}

/// Reads the applied migrations and compares them with the embedded ones
///
/// # Errors
///
/// Returns an error if the migrations table cannot be queried.
pub async fn get_migration_status(pool: &SqlitePool) -> Result<MigrationStatus, sqlx::Error> {
    debug!("Reading migration status");

    let known_migrations = MIGRATOR
        .iter()
        .filter(|m| m.migration_type.is_up_migration())
        .count();

    let table_exists: bool = sqlx::query_scalar(
        "SELECT EXISTS (
            SELECT 1 FROM sqlite_master
            WHERE type = 'table' AND name = '_sqlx_migrations'
        )",
    )
    .fetch_one(pool)
    .await?;

    if !table_exists {
        debug!("No migration has run against this database");
        return Ok(MigrationStatus {
            applied_migrations: 0,
            latest_version: None,
            known_migrations,
            is_up_to_date: known_migrations == 0,
        });
    }

    let (count, latest_version): (i64, Option<i64>) = sqlx::query_as(
        "SELECT
            COUNT(*) AS count,
            MAX(version) AS latest_version
         FROM _sqlx_migrations
         WHERE success = TRUE",
    )
    .fetch_one(pool)
    .await?;

    debug!(
        applied_migrations = count,
        latest_version = ?latest_version,
        known_migrations,
        "Migration status retrieved"
    );

    Ok(MigrationStatus {
        applied_migrations: count as usize,
        latest_version,
        known_migrations,
        is_up_to_date: latest_version == latest_known_version(),
    })
}

/// Creates the database file if it doesn't exist
///
/// In-memory URLs have nothing to create and return immediately.
pub async fn ensure_database_exists(database_url: &str) -> Result<(), sqlx::Error> {
    if is_in_memory_url(database_url) {
        debug!("In-memory database, nothing to create");
        return Ok(());
    }

    debug!(database_url, "Looking for database file");

    if !Sqlite::database_exists(database_url).await? {
        info!(database_url, "Creating database file");
        Sqlite::create_database(database_url).await?;
        info!("Database file created");
    } else {
        debug!("Database file already present");
    }

    Ok(())
}

/// Drops the database file (USE WITH CAUTION!)
///
/// Permanently deletes every record. Only meant for development and tests.
pub async fn drop_database(database_url: &str) -> Result<(), sqlx::Error> {
    if is_in_memory_url(database_url) {
        debug!("In-memory database, nothing to drop");
        return Ok(());
    }

    warn!(database_url, "Dropping database");

    if Sqlite::database_exists(database_url).await? {
        Sqlite::drop_database(database_url).await?;
        info!("Database file removed");
    } else {
        debug!("No database file to remove");
    }

    Ok(())
}

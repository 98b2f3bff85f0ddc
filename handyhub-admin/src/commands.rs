/// Subcommand implementations
///
/// Each command takes an open pool so it can run against any database, including a
/// private in-memory one in tests.

use handyhub_shared::catalog::CatalogManager;
use handyhub_shared::db::migrations::{get_migration_status, run_migrations, MigrationStatus};
use handyhub_shared::db::pool::{get_pool_stats, health_check};
use handyhub_shared::models::service::Service;
use handyhub_shared::models::user::User;
use handyhub_shared::models::worker_profile::WorkerProfile;
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::info;

/// Snapshot printed by `status`
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub version: &'static str,
    pub healthy: bool,
    pub migrations: MigrationReport,
    pub pool: PoolReport,

    /// Row counts, present once the schema exists
    pub records: Option<RecordCounts>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MigrationReport {
    pub applied: usize,
    pub known: usize,
    pub latest_version: Option<i64>,
    pub up_to_date: bool,
}

impl From<MigrationStatus> for MigrationReport {
    fn from(status: MigrationStatus) -> Self {
        MigrationReport {
            applied: status.applied_migrations,
            known: status.known_migrations,
            latest_version: status.latest_version,
            up_to_date: status.is_up_to_date,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PoolReport {
    pub active_connections: usize,
    pub idle_connections: usize,
    pub total_connections: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecordCounts {
    pub users: i64,
    pub worker_profiles: i64,
    pub services: usize,
}

/// Applies pending migrations and returns the resulting status
pub async fn migrate(pool: &SqlitePool) -> anyhow::Result<MigrationStatus> {
    run_migrations(pool).await?;

    let status = get_migration_status(pool).await?;
    info!(
        applied = status.applied_migrations,
        latest_version = ?status.latest_version,
        "Database schema is current"
    );

    Ok(status)
}

/// Migrates, then upserts the default catalog
pub async fn seed(pool: &SqlitePool) -> anyhow::Result<Vec<Service>> {
    migrate(pool).await?;

    let services = CatalogManager::new(pool.clone()).seed_catalog().await?;
    Ok(services)
}

/// Collects health, migration and pool figures
pub async fn status(pool: &SqlitePool) -> anyhow::Result<StatusReport> {
    let healthy = health_check(pool).await.is_ok();
    let migrations = get_migration_status(pool).await?;

    let records = if migrations.applied_migrations > 0 {
        Some(RecordCounts {
            users: User::count(pool).await?,
            worker_profiles: WorkerProfile::count(pool).await?,
            services: CatalogManager::new(pool.clone()).list_services().await?.len(),
        })
    } else {
        None
    };

    let stats = get_pool_stats(pool);

    Ok(StatusReport {
        version: handyhub_shared::VERSION,
        healthy,
        migrations: migrations.into(),
        pool: PoolReport {
            active_connections: stats.active_connections,
            idle_connections: stats.idle_connections,
            total_connections: stats.total_connections,
        },
        records,
    })
}

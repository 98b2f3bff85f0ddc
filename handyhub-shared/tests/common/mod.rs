//! Common test utilities for integration tests
//!
//! Every test gets its own migrated database plus a small marketplace: a homeowner,
//! a worker with a profile, an admin, one service and the worker's offering for it.
//!
//! `TestContext::new` uses a single-connection in-memory database. `TestContext::on_file`
//! uses a WAL database file behind the default multi-connection pool, so writes and
//! reads land on different connections.

#![allow(dead_code)]

use chrono::{NaiveDate, NaiveTime};
use handyhub_shared::auth::CallerContext;
use handyhub_shared::catalog::CatalogManager;
use handyhub_shared::db::migrations::run_migrations;
use handyhub_shared::db::pool::{create_pool, DatabaseConfig};
use handyhub_shared::identity::IdentityManager;
use handyhub_shared::models::booking::CreateBooking;
use handyhub_shared::models::offering::Offering;
use handyhub_shared::models::service::Service;
use handyhub_shared::models::user::{SyncUser, User, UserRole};
use sqlx::SqlitePool;
use tempfile::TempDir;
use uuid::Uuid;

pub const HOMEOWNER_ID: &str = "user_home_1";
pub const WORKER_ID: &str = "user_work_1";
pub const ADMIN_ID: &str = "user_admin_1";

/// Fresh migrated in-memory database
pub async fn test_pool() -> anyhow::Result<SqlitePool> {
    let pool = create_pool(DatabaseConfig::in_memory()).await?;
    run_migrations(&pool).await?;
    Ok(pool)
}

/// Fresh migrated database file with the default pool settings
///
/// The directory must outlive the pool.
pub async fn file_test_pool() -> anyhow::Result<(TempDir, SqlitePool)> {
    let dir = TempDir::new()?;
    let config = DatabaseConfig {
        url: format!("sqlite://{}", dir.path().join("handyhub.db").display()),
        ..Default::default()
    };
    assert!(config.max_connections > 1);

    let pool = create_pool(config).await?;
    run_migrations(&pool).await?;
    Ok((dir, pool))
}

pub fn sync_payload(id: &str, name: &str, role: UserRole) -> SyncUser {
    SyncUser {
        id: id.to_string(),
        email: format!("{}@example.com", id),
        name: name.to_string(),
        role,
        phone_number: None,
        avatar_url: None,
    }
}

/// Syncs a user through the identity manager
pub async fn sync_user(pool: &SqlitePool, id: &str, name: &str, role: UserRole) -> anyhow::Result<User> {
    let outcome = IdentityManager::new(pool.clone())
        .sync_user(sync_payload(id, name, role))
        .await?;
    Ok(outcome.user)
}

/// Test context containing a populated marketplace
pub struct TestContext {
    pub db: SqlitePool,
    pub homeowner: CallerContext,
    pub worker: CallerContext,
    pub admin: CallerContext,
    pub service: Service,
    pub offering: Offering,
    _dir: Option<TempDir>,
}

impl TestContext {
    pub async fn new() -> anyhow::Result<Self> {
        Self::populate(test_pool().await?, None).await
    }

    /// Same marketplace on a multi-connection file database
    pub async fn on_file() -> anyhow::Result<Self> {
        let (dir, db) = file_test_pool().await?;
        Self::populate(db, Some(dir)).await
    }

    async fn populate(db: SqlitePool, dir: Option<TempDir>) -> anyhow::Result<Self> {
        sync_user(&db, HOMEOWNER_ID, "Hannah Homeowner", UserRole::Homeowner).await?;
        sync_user(&db, WORKER_ID, "Walt Worker", UserRole::Worker).await?;
        sync_user(&db, ADMIN_ID, "Ada Admin", UserRole::Admin).await?;

        let homeowner = CallerContext::resolve(&db, HOMEOWNER_ID).await?;
        let worker = CallerContext::resolve(&db, WORKER_ID).await?;
        let admin = CallerContext::resolve(&db, ADMIN_ID).await?;

        let catalog = CatalogManager::new(db.clone());
        let service = catalog
            .create_service(&admin, "Plumbing", Some("Pipes, taps and leaks"))
            .await?;
        let offering = catalog
            .create_or_update_offering(&worker, service.id, 5_000, 15_000)
            .await?;

        Ok(TestContext {
            db,
            homeowner,
            worker,
            admin,
            service,
            offering,
            _dir: dir,
        })
    }

    /// Adds another worker with a profile and returns their caller context
    pub async fn add_worker(&self, id: &str, name: &str) -> anyhow::Result<CallerContext> {
        sync_user(&self.db, id, name, UserRole::Worker).await?;
        Ok(CallerContext::resolve(&self.db, id).await?)
    }

    /// Adds another homeowner and returns their caller context
    pub async fn add_homeowner(&self, id: &str, name: &str) -> anyhow::Result<CallerContext> {
        sync_user(&self.db, id, name, UserRole::Homeowner).await?;
        Ok(CallerContext::resolve(&self.db, id).await?)
    }

    pub fn booking_request(&self) -> CreateBooking {
        booking_request(self.offering.id)
    }
}

pub fn booking_request(offering_id: Uuid) -> CreateBooking {
    CreateBooking {
        worker_service_id: offering_id,
        scheduled_date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
        scheduled_time: NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
        address: "12 Elm Street".to_string(),
        agreed_price: Some(9_500),
    }
}

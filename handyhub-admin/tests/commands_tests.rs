/// Integration tests for the admin commands
///
/// Each test runs against its own in-memory database.
/// Run with: cargo test -p handyhub-admin --test commands_tests

use handyhub_admin::commands;
use handyhub_shared::catalog::DEFAULT_CATALOG;
use handyhub_shared::db::migrations::latest_known_version;
use handyhub_shared::db::pool::{close_pool, create_pool, DatabaseConfig};

#[tokio::test]
async fn test_migrate_brings_schema_up_to_date() {
    let pool = create_pool(DatabaseConfig::in_memory())
        .await
        .expect("Failed to create pool");

    let status = commands::migrate(&pool).await.expect("Migrate failed");
    assert!(status.is_up_to_date);
    assert_eq!(status.latest_version, latest_known_version());

    // Running again changes nothing
    let again = commands::migrate(&pool).await.expect("Second migrate failed");
    assert_eq!(status, again);

    close_pool(pool).await;
}

#[tokio::test]
async fn test_seed_is_idempotent() {
    let pool = create_pool(DatabaseConfig::in_memory())
        .await
        .expect("Failed to create pool");

    let first = commands::seed(&pool).await.expect("Seed failed");
    let second = commands::seed(&pool).await.expect("Second seed failed");

    assert_eq!(first.len(), DEFAULT_CATALOG.len());
    assert_eq!(
        first.iter().map(|s| s.id).collect::<Vec<_>>(),
        second.iter().map(|s| s.id).collect::<Vec<_>>()
    );

    close_pool(pool).await;
}

#[tokio::test]
async fn test_status_before_and_after_seed() {
    let pool = create_pool(DatabaseConfig::in_memory())
        .await
        .expect("Failed to create pool");

    let report = commands::status(&pool).await.expect("Status failed");
    assert!(report.healthy);
    assert_eq!(report.migrations.applied, 0);
    assert!(!report.migrations.up_to_date);
    assert!(report.records.is_none());

    commands::seed(&pool).await.expect("Seed failed");

    let report = commands::status(&pool).await.expect("Status failed");
    assert!(report.migrations.up_to_date);
    assert_eq!(report.pool.total_connections, 1);

    let records = report
        .records
        .as_ref()
        .expect("Counts should be present after migrating");
    assert_eq!(records.users, 0);
    assert_eq!(records.worker_profiles, 0);
    assert_eq!(records.services, DEFAULT_CATALOG.len());

    let json = serde_json::to_value(&report).expect("Report should serialize");
    assert_eq!(json["migrations"]["up_to_date"], serde_json::Value::Bool(true));

    close_pool(pool).await;
}

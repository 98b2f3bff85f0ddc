/// Integration tests for the service catalog and worker offerings
///
/// Each test runs against its own in-memory database.
/// Run with: cargo test --test catalog_tests

mod common;

use common::{TestContext, WORKER_ID};
use handyhub_shared::catalog::{CatalogManager, DEFAULT_CATALOG};
use handyhub_shared::models::offering::Offering;
use handyhub_shared::models::service::UpdateService;
use handyhub_shared::models::user::User;
use handyhub_shared::{ConstraintKind, CoreError};
use uuid::Uuid;

#[tokio::test]
async fn test_create_service_requires_admin() {
    let ctx = TestContext::new().await.expect("Failed to set up context");
    let catalog = CatalogManager::new(ctx.db.clone());

    let err = catalog
        .create_service(&ctx.homeowner, "Tiling", None)
        .await
        .expect_err("Homeowner must not create services");
    assert!(matches!(err, CoreError::Forbidden(_)));

    let err = catalog
        .create_service(&ctx.worker, "Tiling", None)
        .await
        .expect_err("Worker must not create services");
    assert!(matches!(err, CoreError::Forbidden(_)));

    let service = catalog
        .create_service(&ctx.admin, "  Tiling ", Some("Floors and walls"))
        .await
        .expect("Admin should create services");
    assert_eq!(service.name, "Tiling");
    assert_eq!(service.description.as_deref(), Some("Floors and walls"));
}

#[tokio::test]
async fn test_create_service_rejects_blank_and_duplicate_names() {
    let ctx = TestContext::new().await.expect("Failed to set up context");
    let catalog = CatalogManager::new(ctx.db.clone());

    let err = catalog
        .create_service(&ctx.admin, "   ", None)
        .await
        .expect_err("Blank name should fail");
    assert!(matches!(err, CoreError::ValidationFailure(_)));

    let err = catalog
        .create_service(&ctx.admin, "Plumbing", None)
        .await
        .expect_err("Duplicate name should fail");
    assert!(matches!(
        err,
        CoreError::ConstraintViolation {
            kind: ConstraintKind::Unique,
            ..
        }
    ));
    assert!(err.is_conflict());
}

#[tokio::test]
async fn test_update_service() {
    let ctx = TestContext::new().await.expect("Failed to set up context");
    let catalog = CatalogManager::new(ctx.db.clone());

    let updated = catalog
        .update_service(
            &ctx.admin,
            ctx.service.id,
            UpdateService {
                name: Some("Plumbing & Heating".to_string()),
                description: Some(None),
            },
        )
        .await
        .expect("Update should succeed");

    assert_eq!(updated.id, ctx.service.id);
    assert_eq!(updated.name, "Plumbing & Heating");
    assert_eq!(updated.description, None);
    assert!(updated.updated_at >= ctx.service.updated_at);

    let err = catalog
        .update_service(&ctx.worker, ctx.service.id, UpdateService::default())
        .await
        .expect_err("Worker must not update services");
    assert!(matches!(err, CoreError::Forbidden(_)));

    let err = catalog
        .update_service(&ctx.admin, Uuid::new_v4(), UpdateService::default())
        .await
        .expect_err("Unknown service should fail");
    assert!(matches!(err, CoreError::NotFound { .. }));
}

#[tokio::test]
async fn test_delete_service_blocked_by_offerings() {
    let ctx = TestContext::new().await.expect("Failed to set up context");
    let catalog = CatalogManager::new(ctx.db.clone());

    let err = catalog
        .delete_service(&ctx.admin, ctx.service.id)
        .await
        .expect_err("Service with offerings must not be deleted");
    assert!(matches!(
        err,
        CoreError::ConstraintViolation {
            kind: ConstraintKind::ForeignKey,
            ..
        }
    ));

    // Still there
    catalog
        .get_service(ctx.service.id)
        .await
        .expect("Service should survive the failed delete");
}

#[tokio::test]
async fn test_delete_service_returns_deleted_record() {
    let ctx = TestContext::new().await.expect("Failed to set up context");
    let catalog = CatalogManager::new(ctx.db.clone());

    let service = catalog
        .create_service(&ctx.admin, "Masonry", None)
        .await
        .expect("Failed to create service");

    let deleted = catalog
        .delete_service(&ctx.admin, service.id)
        .await
        .expect("Delete should succeed");
    assert_eq!(deleted, service);

    let err = catalog
        .get_service(service.id)
        .await
        .expect_err("Deleted service should be gone");
    assert!(matches!(err, CoreError::NotFound { .. }));

    let err = catalog
        .delete_service(&ctx.admin, service.id)
        .await
        .expect_err("Second delete should fail");
    assert!(matches!(err, CoreError::NotFound { .. }));
}

#[tokio::test]
async fn test_seed_catalog_is_idempotent() {
    let ctx = TestContext::new().await.expect("Failed to set up context");
    let catalog = CatalogManager::new(ctx.db.clone());

    let first = catalog.seed_catalog().await.expect("First seed failed");
    let second = catalog.seed_catalog().await.expect("Second seed failed");

    assert_eq!(first.len(), DEFAULT_CATALOG.len());
    let first_ids: Vec<Uuid> = first.iter().map(|s| s.id).collect();
    let second_ids: Vec<Uuid> = second.iter().map(|s| s.id).collect();
    assert_eq!(first_ids, second_ids, "Seeding twice must not create new rows");

    // "Plumbing" already existed, so the catalog holds exactly the seeded names
    let services = catalog.list_services().await.expect("Failed to list services");
    assert_eq!(services.len(), DEFAULT_CATALOG.len());

    let names: Vec<&str> = services.iter().map(|s| s.name.as_str()).collect();
    let mut sorted = names.clone();
    sorted.sort();
    assert_eq!(names, sorted, "Services should be listed by name");
}

#[tokio::test]
async fn test_upsert_service_by_name_updates_description() {
    let ctx = TestContext::new().await.expect("Failed to set up context");
    let catalog = CatalogManager::new(ctx.db.clone());

    let service = catalog
        .upsert_service_by_name("Plumbing", Some("Emergency repairs too"))
        .await
        .expect("Upsert should succeed");

    assert_eq!(service.id, ctx.service.id);
    assert_eq!(service.description.as_deref(), Some("Emergency repairs too"));
}

#[tokio::test]
async fn test_offering_price_validation() {
    let ctx = TestContext::new().await.expect("Failed to set up context");
    let catalog = CatalogManager::new(ctx.db.clone());

    let gardening = catalog
        .create_service(&ctx.admin, "Gardening", None)
        .await
        .expect("Failed to create service");

    for (min, max) in [(-1, 100), (0, -5), (200, 100)] {
        let err = catalog
            .create_or_update_offering(&ctx.worker, gardening.id, min, max)
            .await
            .expect_err("Invalid price range should fail");
        assert!(
            matches!(err, CoreError::ValidationFailure(_)),
            "({}, {}) gave {:?}",
            min,
            max,
            err
        );
    }

    let count = Offering::count_by_pair(&ctx.db, WORKER_ID, gardening.id)
        .await
        .expect("Failed to count offerings");
    assert_eq!(count, 0, "A rejected offering must write nothing");

    for (min, max) in [(0, 0), (1_000, 1_000), (1_000, 5_000)] {
        let offering = catalog
            .create_or_update_offering(&ctx.worker, gardening.id, min, max)
            .await
            .expect("Valid price range should succeed");
        assert_eq!((offering.price_min, offering.price_max), (min, max));
    }
}

#[tokio::test]
async fn test_offering_upsert_keeps_one_row() {
    let ctx = TestContext::new().await.expect("Failed to set up context");
    let catalog = CatalogManager::new(ctx.db.clone());

    let updated = catalog
        .create_or_update_offering(&ctx.worker, ctx.service.id, 7_000, 20_000)
        .await
        .expect("Update should succeed");

    assert_eq!(updated.id, ctx.offering.id);
    assert_eq!(updated.price_min, 7_000);
    assert_eq!(updated.price_max, 20_000);

    let (a, b) = tokio::join!(
        catalog.create_or_update_offering(&ctx.worker, ctx.service.id, 8_000, 9_000),
        catalog.create_or_update_offering(&ctx.worker, ctx.service.id, 8_000, 9_000),
    );
    assert_eq!(a.expect("First call failed").id, ctx.offering.id);
    assert_eq!(b.expect("Second call failed").id, ctx.offering.id);

    let count = Offering::count_by_pair(&ctx.db, WORKER_ID, ctx.service.id)
        .await
        .expect("Failed to count offerings");
    assert_eq!(count, 1);
}

#[tokio::test]
async fn test_offering_requires_worker_and_known_service() {
    let ctx = TestContext::new().await.expect("Failed to set up context");
    let catalog = CatalogManager::new(ctx.db.clone());

    let err = catalog
        .create_or_update_offering(&ctx.homeowner, ctx.service.id, 100, 200)
        .await
        .expect_err("Homeowner must not publish offerings");
    assert!(matches!(err, CoreError::Forbidden(_)));

    let err = catalog
        .create_or_update_offering(&ctx.worker, Uuid::new_v4(), 100, 200)
        .await
        .expect_err("Unknown service should fail");
    assert!(matches!(err, CoreError::NotFound { .. }));
}

#[tokio::test]
async fn test_list_workers_for_service() {
    let ctx = TestContext::new().await.expect("Failed to set up context");
    let catalog = CatalogManager::new(ctx.db.clone());

    let cheaper = ctx
        .add_worker("user_work_2", "Bea Builder")
        .await
        .expect("Failed to add worker");
    catalog
        .create_or_update_offering(&cheaper, ctx.service.id, 2_000, 4_000)
        .await
        .expect("Failed to create offering");

    let listings = catalog
        .list_workers_for_service(ctx.service.id)
        .await
        .expect("Listing should succeed");

    assert_eq!(listings.len(), 2);
    assert_eq!(listings[0].worker_id, "user_work_2");
    assert_eq!(listings[0].worker_name, "Bea Builder");
    assert_eq!(listings[0].price_min, 2_000);
    assert_eq!(listings[1].worker_id, WORKER_ID);
    assert_eq!(listings[1].offering_id, ctx.offering.id);
    assert!(listings.iter().all(|l| l.service_name == "Plumbing"));

    let err = catalog
        .list_workers_for_service(Uuid::new_v4())
        .await
        .expect_err("Unknown service should fail");
    assert!(matches!(err, CoreError::NotFound { .. }));
}

#[tokio::test]
async fn test_offerings_removed_with_worker() {
    let ctx = TestContext::new().await.expect("Failed to set up context");
    let catalog = CatalogManager::new(ctx.db.clone());

    let offerings = catalog
        .list_offerings_for_worker(WORKER_ID)
        .await
        .expect("Failed to list offerings");
    assert_eq!(offerings.len(), 1);

    // A worker without bookings can leave; their offerings go with them
    let temp = ctx
        .add_worker("user_work_3", "Temp Worker")
        .await
        .expect("Failed to resolve worker");
    catalog
        .create_or_update_offering(&temp, ctx.service.id, 100, 200)
        .await
        .expect("Failed to create offering");

    User::delete(&ctx.db, "user_work_3")
        .await
        .expect("Failed to delete user");

    let remaining = catalog
        .list_offerings_for_worker("user_work_3")
        .await
        .expect("Failed to list offerings");
    assert!(remaining.is_empty());
}

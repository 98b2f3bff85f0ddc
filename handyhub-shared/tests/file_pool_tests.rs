/// Integration tests against a WAL database file behind the default pool
///
/// Several connections are open at once, so a write and the read that depends on it
/// usually run on different connections.
/// Run with: cargo test --test file_pool_tests

mod common;

use common::{booking_request, TestContext, HOMEOWNER_ID, WORKER_ID};
use handyhub_shared::bookings::BookingEngine;
use handyhub_shared::catalog::CatalogManager;
use handyhub_shared::conversations::ConversationManager;
use handyhub_shared::models::booking::{Booking, BookingStatus};
use handyhub_shared::models::chat::Chat;
use handyhub_shared::models::message::MessageType;
use handyhub_shared::models::offering::Offering;
use handyhub_shared::models::review::NewReview;
use handyhub_shared::models::service::{CreateService, Service, UpdateService};
use handyhub_shared::reviews::ReviewLedger;
use handyhub_shared::CoreError;
use serde_json::json;

#[tokio::test]
async fn test_returning_write_is_committed_before_it_returns() {
    let ctx = TestContext::on_file().await.expect("Failed to set up context");

    let mut writer = ctx.db.acquire().await.expect("Failed to acquire writer");
    let mut reader = ctx.db.acquire().await.expect("Failed to acquire reader");

    let service = Service::create(
        &mut *writer,
        &CreateService {
            name: "Glazing".to_string(),
            description: None,
        },
    )
    .await
    .expect("Insert should succeed");

    // The writer stays idle, so nothing else could finish its statement.
    let seen = Service::find_by_id(&mut *reader, service.id)
        .await
        .expect("Read should succeed");
    assert_eq!(seen.map(|s| s.id), Some(service.id));

    let renamed = Service::update(
        &mut *writer,
        service.id,
        &UpdateService {
            name: Some("Window Glazing".to_string()),
            description: None,
        },
    )
    .await
    .expect("Update should succeed")
    .expect("Service should exist");

    let seen = Service::find_by_id(&mut *reader, service.id)
        .await
        .expect("Read should succeed")
        .expect("Service should exist");
    assert_eq!(seen.name, renamed.name);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_writes_are_visible_to_the_next_request() {
    let ctx = TestContext::on_file().await.expect("Failed to set up context");
    let catalog = CatalogManager::new(ctx.db.clone());
    let engine = BookingEngine::new(ctx.db.clone());
    let reviews = ReviewLedger::new(ctx.db.clone());

    for round in 0..25 {
        let service = catalog
            .create_service(&ctx.admin, &format!("Service {}", round), None)
            .await
            .expect("Service creation should succeed");

        let fetched = catalog
            .get_service(service.id)
            .await
            .expect("New service should be readable");
        assert_eq!(fetched.id, service.id);

        let offering = catalog
            .create_or_update_offering(&ctx.worker, service.id, 1_000, 2_000)
            .await
            .expect("Offering for a new service should succeed");

        let booking = engine
            .create_booking(&ctx.homeowner, booking_request(offering.id))
            .await
            .expect("Booking for a new offering should succeed");

        engine
            .update_status(&ctx.worker, booking.id, BookingStatus::Confirmed)
            .await
            .expect("Confirm should see the new booking");
        engine
            .update_status(&ctx.worker, booking.id, BookingStatus::Completed)
            .await
            .expect("Complete should see the confirmed booking");

        let review = reviews
            .add_review(
                &ctx.homeowner,
                NewReview {
                    booking_id: booking.id,
                    rating: 4,
                    comment: "Tidy work".to_string(),
                },
            )
            .await
            .expect("Review should see the completed booking");

        let listed = reviews
            .reviews_for_booking(booking.id)
            .await
            .expect("Failed to list reviews");
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, review.id);
    }

    let offerings = catalog
        .list_offerings_for_worker(WORKER_ID)
        .await
        .expect("Failed to list offerings");
    assert_eq!(offerings.len(), 26);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_spawned_get_or_create_yields_one_chat() {
    let ctx = TestContext::on_file().await.expect("Failed to set up context");
    let conversations = ConversationManager::new(ctx.db.clone());

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let conversations = conversations.clone();
            tokio::spawn(async move { conversations.get_or_create_chat(HOMEOWNER_ID, WORKER_ID).await })
        })
        .collect();

    let mut ids = Vec::new();
    for handle in handles {
        let chat = handle
            .await
            .expect("Task panicked")
            .expect("get_or_create_chat failed");
        ids.push(chat.id);
    }
    ids.dedup();
    assert_eq!(ids.len(), 1);

    let count = Chat::count_by_pair(&ctx.db, HOMEOWNER_ID, WORKER_ID)
        .await
        .expect("Failed to count chats");
    assert_eq!(count, 1);

    let message = conversations
        .append_message(&ctx.homeowner, ids[0], MessageType::Text, json!({ "text": "hello" }))
        .await
        .expect("Fresh chat should accept messages");
    assert_eq!(message.chat_id, ids[0]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_spawned_offering_upserts_keep_one_row() {
    let ctx = TestContext::on_file().await.expect("Failed to set up context");
    let catalog = CatalogManager::new(ctx.db.clone());

    let service = catalog
        .create_service(&ctx.admin, "Roofing", None)
        .await
        .expect("Service creation should succeed");

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let catalog = catalog.clone();
            let worker = ctx.worker.clone();
            let service_id = service.id;
            tokio::spawn(async move {
                catalog
                    .create_or_update_offering(&worker, service_id, 1_000 + i, 5_000)
                    .await
            })
        })
        .collect();

    let mut ids = Vec::new();
    for handle in handles {
        let offering = handle
            .await
            .expect("Task panicked")
            .expect("Offering upsert failed");
        ids.push(offering.id);
    }
    ids.dedup();
    assert_eq!(ids.len(), 1);

    let count = Offering::count_by_pair(&ctx.db, WORKER_ID, service.id)
        .await
        .expect("Failed to count offerings");
    assert_eq!(count, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_spawned_transitions_never_lose_a_status() {
    let ctx = TestContext::on_file().await.expect("Failed to set up context");
    let engine = BookingEngine::new(ctx.db.clone());

    for _ in 0..10 {
        let booking = engine
            .create_booking(&ctx.homeowner, ctx.booking_request())
            .await
            .expect("Booking should succeed");
        let booking_id = booking.id;

        let confirm = {
            let engine = engine.clone();
            let worker = ctx.worker.clone();
            tokio::spawn(async move {
                engine
                    .update_status(&worker, booking_id, BookingStatus::Confirmed)
                    .await
            })
        };
        let cancel = {
            let engine = engine.clone();
            let homeowner = ctx.homeowner.clone();
            tokio::spawn(async move { engine.cancel(&homeowner, booking_id).await })
        };

        let confirm = confirm.await.expect("Task panicked");
        let cancel = cancel.await.expect("Task panicked");

        let stored = Booking::find_by_id(&ctx.db, booking_id)
            .await
            .expect("Failed to load booking")
            .expect("Booking should exist");

        match (confirm, cancel) {
            (Ok(_), Ok(_)) => assert_eq!(stored.status, BookingStatus::Cancelled),
            (Ok(_), Err(err)) => {
                assert!(matches!(err, CoreError::InvalidTransition(_)));
                assert_eq!(stored.status, BookingStatus::Confirmed);
            }
            (Err(err), Ok(_)) => {
                assert!(matches!(err, CoreError::InvalidTransition(_)));
                assert_eq!(stored.status, BookingStatus::Cancelled);
            }
            (Err(a), Err(b)) => panic!("At least one transition must win: {:?} / {:?}", a, b),
        }
    }
}

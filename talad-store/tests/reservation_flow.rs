use std::sync::Arc;

use chrono::{Duration, Utc};
use uuid::Uuid;

use talad_booking::{BookingStatus, PaymentStatus, StallPeriod, Vendor};
use talad_catalog::{Lot, LotPatch, LotStatus, Section, ZoneType};
use talad_core::repository::{BookingRepository, LotRepository};
use talad_core::reservation::{BookingRequest, ReservationCoordinator};
use talad_core::EngineError;
use talad_shared::money::baht;
use talad_store::MemoryStore;

fn coordinator(store: &MemoryStore) -> ReservationCoordinator {
    let repo: Arc<MemoryStore> = Arc::new(store.clone());
    ReservationCoordinator::new(repo.clone(), repo)
}

fn sample_lot(number: &str) -> Lot {
    Lot::new(
        number.to_string(),
        Section::RowA,
        ZoneType::Standard,
        "Row A (left edge)".to_string(),
        "2x2 m".to_string(),
        baht(100),
    )
}

fn sample_vendor() -> Vendor {
    Vendor::new(
        "Somchai Noodles".to_string(),
        "0812345678".to_string(),
        "somchai@example.com".to_string(),
        "food".to_string(),
        None,
    )
}

fn open_request(lot_id: Uuid) -> BookingRequest {
    BookingRequest {
        lot_id,
        vendor: sample_vendor(),
        period: StallPeriod::new(Utc::now(), None),
        notes: None,
    }
}

#[tokio::test]
async fn test_create_booking_reserves_lot() {
    let store = MemoryStore::new();
    let engine = coordinator(&store);
    let a07 = sample_lot("A07");
    store.insert_lot(&a07).await.unwrap();

    let booking = engine.create_booking(open_request(a07.id)).await.unwrap();

    assert_eq!(booking.status, BookingStatus::Pending);
    assert_eq!(booking.payment_status, PaymentStatus::Pending);
    // Open-ended periods charge one month up front.
    assert_eq!(booking.total_satang, baht(100));
    assert_eq!(
        store.get_lot(a07.id).await.unwrap().unwrap().status,
        LotStatus::Reserved
    );
}

#[tokio::test]
async fn test_total_charges_whole_months_rounded_up() {
    let store = MemoryStore::new();
    let engine = coordinator(&store);
    let a07 = sample_lot("A07");
    store.insert_lot(&a07).await.unwrap();

    let start = Utc::now();
    let request = BookingRequest {
        lot_id: a07.id,
        vendor: sample_vendor(),
        period: StallPeriod::new(start, Some(start + Duration::days(45))),
        notes: None,
    };

    let booking = engine.create_booking(request).await.unwrap();
    assert_eq!(booking.total_satang, 2 * baht(100));
}

#[tokio::test]
async fn test_second_booking_on_same_lot_is_refused() {
    let store = MemoryStore::new();
    let engine = coordinator(&store);
    let a07 = sample_lot("A07");
    store.insert_lot(&a07).await.unwrap();

    engine.create_booking(open_request(a07.id)).await.unwrap();
    let err = engine
        .create_booking(open_request(a07.id))
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::LotUnavailable(_)));
    let tallies = store.booking_tallies().await.unwrap();
    assert_eq!(tallies.total, 1, "the loser must not insert anything");
}

#[tokio::test]
async fn test_concurrent_claims_yield_exactly_one_winner() {
    let store = MemoryStore::new();
    let engine = coordinator(&store);
    let a07 = sample_lot("A07");
    store.insert_lot(&a07).await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..16 {
        let engine = engine.clone();
        let lot_id = a07.id;
        handles.push(tokio::spawn(async move {
            engine.create_booking(open_request(lot_id)).await
        }));
    }

    let mut wins = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => wins += 1,
            Err(err) => assert!(matches!(err, EngineError::LotUnavailable(_))),
        }
    }

    assert_eq!(wins, 1);
    assert_eq!(store.booking_tallies().await.unwrap().total, 1);
    assert_eq!(
        store.get_lot(a07.id).await.unwrap().unwrap().status,
        LotStatus::Reserved
    );
}

#[tokio::test]
async fn test_validation_failures_touch_nothing() {
    let store = MemoryStore::new();
    let engine = coordinator(&store);
    let a07 = sample_lot("A07");
    store.insert_lot(&a07).await.unwrap();

    let mut request = open_request(a07.id);
    request.vendor = Vendor::new(
        "Somchai Noodles".to_string(),
        "12".to_string(),
        "somchai@example.com".to_string(),
        "food".to_string(),
        None,
    );

    let err = engine.create_booking(request).await.unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
    assert_eq!(
        store.get_lot(a07.id).await.unwrap().unwrap().status,
        LotStatus::Available
    );
    assert_eq!(store.booking_tallies().await.unwrap().total, 0);
}

#[tokio::test]
async fn test_booking_unknown_lot_is_not_found() {
    let store = MemoryStore::new();
    let engine = coordinator(&store);

    let err = engine
        .create_booking(open_request(Uuid::new_v4()))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound { .. }));
}

#[tokio::test]
async fn test_cancel_releases_lot_and_fails_payment() {
    let store = MemoryStore::new();
    let engine = coordinator(&store);
    let a07 = sample_lot("A07");
    store.insert_lot(&a07).await.unwrap();
    let booking = engine.create_booking(open_request(a07.id)).await.unwrap();

    let cancelled = engine
        .cancel_booking(booking.id, Some("changed plans".to_string()))
        .await
        .unwrap();

    assert_eq!(cancelled.status, BookingStatus::Cancelled);
    assert_eq!(cancelled.payment_status, PaymentStatus::Failed);
    assert_eq!(cancelled.cancel_reason.as_deref(), Some("changed plans"));
    assert_eq!(
        store.get_lot(a07.id).await.unwrap().unwrap().status,
        LotStatus::Available
    );
}

#[tokio::test]
async fn test_cancel_twice_is_idempotent() {
    let store = MemoryStore::new();
    let engine = coordinator(&store);
    let a07 = sample_lot("A07");
    store.insert_lot(&a07).await.unwrap();
    let booking = engine.create_booking(open_request(a07.id)).await.unwrap();

    let first = engine
        .cancel_booking(booking.id, Some("changed plans".to_string()))
        .await
        .unwrap();
    let second = engine.cancel_booking(booking.id, None).await.unwrap();

    assert_eq!(second.status, BookingStatus::Cancelled);
    // The original reason survives the replay.
    assert_eq!(second.cancel_reason, first.cancel_reason);
    assert_eq!(
        store.get_lot(a07.id).await.unwrap().unwrap().status,
        LotStatus::Available
    );
}

#[tokio::test]
async fn test_cancel_leaves_maintenance_lot_alone() {
    let store = MemoryStore::new();
    let engine = coordinator(&store);
    let a07 = sample_lot("A07");
    store.insert_lot(&a07).await.unwrap();
    let booking = engine.create_booking(open_request(a07.id)).await.unwrap();

    // Simulate the lot having drifted into Maintenance underneath the
    // booking; the release guard only flips Reserved lots.
    assert!(store
        .update_lot_status_if(a07.id, LotStatus::Reserved, LotStatus::Maintenance)
        .await
        .unwrap());

    engine.cancel_booking(booking.id, None).await.unwrap();
    assert_eq!(
        store.get_lot(a07.id).await.unwrap().unwrap().status,
        LotStatus::Maintenance
    );
}

#[tokio::test]
async fn test_delete_booking_releases_lot() {
    let store = MemoryStore::new();
    let engine = coordinator(&store);
    let a07 = sample_lot("A07");
    store.insert_lot(&a07).await.unwrap();
    let booking = engine.create_booking(open_request(a07.id)).await.unwrap();

    engine.delete_booking(booking.id).await.unwrap();

    assert!(store.get_booking(booking.id).await.unwrap().is_none());
    assert_eq!(
        store.get_lot(a07.id).await.unwrap().unwrap().status,
        LotStatus::Available
    );

    let err = engine.delete_booking(booking.id).await.unwrap_err();
    assert!(matches!(err, EngineError::NotFound { .. }));
}

#[tokio::test]
async fn test_create_lot_rejects_duplicate_number() {
    let store = MemoryStore::new();
    let engine = coordinator(&store);

    engine.create_lot(sample_lot("A07")).await.unwrap();
    let err = engine.create_lot(sample_lot("A07")).await.unwrap_err();
    assert!(matches!(err, EngineError::DuplicateLotNumber(_)));
}

#[tokio::test]
async fn test_lot_patch_and_maintenance_toggle() {
    let store = MemoryStore::new();
    let engine = coordinator(&store);
    let a07 = engine.create_lot(sample_lot("A07")).await.unwrap();

    let patch = LotPatch {
        price_satang: Some(baht(150)),
        status: Some(LotStatus::Maintenance),
        ..LotPatch::default()
    };
    let updated = engine.update_lot(a07.id, patch).await.unwrap();
    assert_eq!(updated.price_satang, baht(150));
    assert_eq!(updated.status, LotStatus::Maintenance);

    let back = engine
        .update_lot(
            a07.id,
            LotPatch {
                status: Some(LotStatus::Available),
                ..LotPatch::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(back.status, LotStatus::Available);
}

#[tokio::test]
async fn test_lot_status_cannot_be_forced_to_reserved() {
    let store = MemoryStore::new();
    let engine = coordinator(&store);
    let a07 = engine.create_lot(sample_lot("A07")).await.unwrap();

    let err = engine
        .update_lot(
            a07.id,
            LotPatch {
                status: Some(LotStatus::Reserved),
                ..LotPatch::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}

#[tokio::test]
async fn test_booked_lot_cannot_be_toggled_or_deleted() {
    let store = MemoryStore::new();
    let engine = coordinator(&store);
    let a07 = engine.create_lot(sample_lot("A07")).await.unwrap();
    let booking = engine.create_booking(open_request(a07.id)).await.unwrap();

    let toggle = engine
        .update_lot(
            a07.id,
            LotPatch {
                status: Some(LotStatus::Maintenance),
                ..LotPatch::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(toggle, EngineError::Conflict(_)));

    let delete = engine.delete_lot(a07.id).await.unwrap_err();
    assert!(matches!(delete, EngineError::LotHasActiveBooking(_)));

    // Even after cancellation the booking row still references the lot, so
    // deletion surfaces the constraint as a conflict.
    engine.cancel_booking(booking.id, None).await.unwrap();
    let delete = engine.delete_lot(a07.id).await.unwrap_err();
    assert!(matches!(delete, EngineError::Conflict(_)));
}

#[tokio::test]
async fn test_seed_installs_full_plan_once() {
    let store = MemoryStore::new();
    let engine = coordinator(&store);

    let plan = engine.seed_market().await.unwrap();
    assert_eq!(plan.len(), 100);

    let tallies = store.lot_tallies().await.unwrap();
    assert_eq!(tallies.total, 100);
    assert_eq!(tallies.available, 100, "seeding never fabricates claims");

    // Reseeding an empty market is fine and replaces the plan.
    engine.seed_market().await.unwrap();
    assert_eq!(store.lot_tallies().await.unwrap().total, 100);

    let a07 = store.get_lot_by_number("A07").await.unwrap().unwrap();
    engine.create_booking(open_request(a07.id)).await.unwrap();

    let err = engine.seed_market().await.unwrap_err();
    assert!(matches!(err, EngineError::Conflict(_)));
}

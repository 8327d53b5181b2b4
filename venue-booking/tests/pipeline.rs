//! End-to-end runs of the reservation/confirmation pipeline against the
//! in-memory ports: hold, confirm, reconcile, read back.

use std::sync::Arc;
use std::time::Duration;

use venue_booking::confirmation::{ConfirmationHandler, ConfirmationOutcome};
use venue_booking::coordinator::{BookingCoordinator, BookingError};
use venue_booking::holds::HoldManager;
use venue_booking::status::StatusAggregator;
use venue_booking::worker::ConfirmationWorker;
use venue_core::ports::BookingRepository;

use venue_core::memory::{
    InMemoryBookingRepository, InMemoryLockStore, InMemoryPaymentRepository, InMemoryQueue,
    InMemorySeatRepository,
};
use venue_core::models::{PaymentStatus, Seat, SeatRef, SeatStatus};
use venue_core::ports::{PaymentRepository, SeatRepository};

struct Stack {
    seats: Arc<InMemorySeatRepository>,
    bookings: Arc<InMemoryBookingRepository>,
    payments: Arc<InMemoryPaymentRepository>,
    queue: Arc<InMemoryQueue>,
    holds: Arc<HoldManager>,
    coordinator: BookingCoordinator,
    confirmation: ConfirmationHandler,
    aggregator: StatusAggregator,
}

fn stack_with_ttl(ttl_seconds: u64) -> Stack {
    let seats = Arc::new(InMemorySeatRepository::with_seats(vec![
        seat("A1", "A"),
        seat("A2", "A"),
        seat("B1", "B"),
    ]));
    let bookings = Arc::new(InMemoryBookingRepository::new(seats.clone()));
    let payments = Arc::new(InMemoryPaymentRepository::new());
    let queue = Arc::new(InMemoryQueue::new());
    let holds = Arc::new(HoldManager::new(
        Arc::new(InMemoryLockStore::new()),
        ttl_seconds,
    ));

    Stack {
        coordinator: BookingCoordinator::new(seats.clone(), holds.clone()),
        confirmation: ConfirmationHandler::new(holds.clone(), payments.clone(), queue.clone()),
        aggregator: StatusAggregator::new(seats.clone(), holds.clone()),
        seats,
        bookings,
        payments,
        queue,
        holds,
    }
}

fn stack() -> Stack {
    stack_with_ttl(120)
}

fn seat(seat_id: &str, section_id: &str) -> Seat {
    Seat {
        seat_id: seat_id.to_string(),
        section_id: section_id.to_string(),
        status: SeatStatus::Available,
    }
}

fn seat_ref(seat_id: &str, section_id: &str) -> SeatRef {
    SeatRef {
        seat_id: seat_id.to_string(),
        section_id: section_id.to_string(),
    }
}

fn worker(s: &Stack) -> ConfirmationWorker {
    ConfirmationWorker::new(
        s.queue.clone(),
        s.bookings.clone(),
        s.payments.clone(),
        s.holds.clone(),
        5,
        Duration::from_millis(10),
    )
}

fn display_status(sections: &[venue_booking::status::SectionView], seat_id: &str) -> &'static str {
    sections
        .iter()
        .flat_map(|s| &s.seats)
        .find(|s| s.seat_id == seat_id)
        .unwrap()
        .status
}

#[tokio::test]
async fn hold_confirm_reconcile_round_trip() {
    let s = stack();

    // Hold two seats under one booking.
    let receipt = s
        .coordinator
        .place_hold(&[seat_ref("A1", "A"), seat_ref("A2", "A")], "u1")
        .await
        .unwrap();

    let sections = s.aggregator.seat_map().await.unwrap();
    assert_eq!(display_status(&sections, "A1"), "HOLD");
    assert_eq!(display_status(&sections, "A2"), "HOLD");

    // Confirm payment: response is immediate, persistence is queued.
    let outcome = s.confirmation.confirm(receipt.booking_id, None).await.unwrap();
    match outcome {
        ConfirmationOutcome::Confirmed { seats, .. } => assert_eq!(seats.len(), 2),
        other => panic!("unexpected: {:?}", other),
    }

    // Before the worker runs: reads show BOOKED while the durable rows are
    // still AVAILABLE.
    let sections = s.aggregator.seat_map().await.unwrap();
    assert_eq!(display_status(&sections, "A1"), "BOOKED");
    assert_eq!(
        s.seats.get_seat("A1").await.unwrap().unwrap().status,
        SeatStatus::Available
    );

    // Worker drains the queue.
    assert_eq!(worker(&s).run_cycle().await, 2);

    assert_eq!(
        s.seats.get_seat("A1").await.unwrap().unwrap().status,
        SeatStatus::Booked
    );
    assert_eq!(
        s.seats.get_seat("A2").await.unwrap().unwrap().status,
        SeatStatus::Booked
    );
    assert_eq!(
        s.bookings.get_bookings(receipt.booking_id).await.unwrap().len(),
        2
    );
    assert!(!s.holds.is_held("A1").await.unwrap());
    assert!(!s.holds.is_held("A2").await.unwrap());

    let record = s
        .payments
        .get_by_key(&receipt.booking_id.to_string())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.status, PaymentStatus::Confirmed);

    // Reads stay BOOKED afterwards.
    let sections = s.aggregator.seat_map().await.unwrap();
    assert_eq!(display_status(&sections, "A1"), "BOOKED");
}

#[tokio::test]
async fn duplicate_confirmation_before_reconciliation_stays_exactly_once() {
    let s = stack();
    let receipt = s
        .coordinator
        .place_hold(&[seat_ref("A1", "A")], "u1")
        .await
        .unwrap();

    let key = Some("retry-key".to_string());
    let first = s
        .confirmation
        .confirm(receipt.booking_id, key.clone())
        .await
        .unwrap();
    let second = s
        .confirmation
        .confirm(receipt.booking_id, key.clone())
        .await
        .unwrap();

    // Both confirmations report the same outcome; the queue carries the
    // duplicate, which the worker absorbs.
    for outcome in [&first, &second] {
        match outcome {
            ConfirmationOutcome::Confirmed { booking_id, seats } => {
                assert_eq!(*booking_id, receipt.booking_id);
                assert_eq!(seats.len(), 1);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }
    assert_eq!(s.queue.pending_len(), 2);

    let w = worker(&s);
    while w.run_cycle().await > 0 {}

    assert_eq!(s.bookings.row_count(), 1);
    assert_eq!(s.payments.record_count(), 1);

    // A later retry replays the stored record.
    let replay = s.confirmation.confirm(receipt.booking_id, key).await.unwrap();
    match replay {
        ConfirmationOutcome::Replayed { record } => {
            assert_eq!(record.status, PaymentStatus::Confirmed)
        }
        other => panic!("unexpected: {:?}", other),
    }
}

#[tokio::test]
async fn expired_hold_fails_payment_and_frees_the_seat() {
    let s = stack_with_ttl(0);

    let receipt = s
        .coordinator
        .place_hold(&[seat_ref("A1", "A")], "u1")
        .await
        .unwrap();

    // The TTL has already lapsed: the seat reads as available again.
    let sections = s.aggregator.seat_map().await.unwrap();
    assert_eq!(display_status(&sections, "A1"), "AVAILABLE");

    let outcome = s.confirmation.confirm(receipt.booking_id, None).await.unwrap();
    assert!(matches!(outcome, ConfirmationOutcome::Failed { .. }));

    let record = s
        .payments
        .get_by_key(&receipt.booking_id.to_string())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.status, PaymentStatus::Failed);
    assert_eq!(s.queue.pending_len(), 0);
    assert_eq!(s.bookings.row_count(), 0);
}

#[tokio::test]
async fn booked_seat_stays_booked_for_later_holds() {
    let s = stack();
    let receipt = s
        .coordinator
        .place_hold(&[seat_ref("A1", "A")], "u1")
        .await
        .unwrap();
    s.confirmation.confirm(receipt.booking_id, None).await.unwrap();
    worker(&s).run_cycle().await;

    // Durable status is monotonic; another hold attempt conflicts.
    match s.coordinator.place_hold(&[seat_ref("A1", "A")], "u2").await {
        Err(BookingError::SeatTaken(id)) => assert_eq!(id, "A1"),
        other => panic!("unexpected: {:?}", other),
    }
}

use async_trait::async_trait;
use uuid::Uuid;

use crate::events::SeatUpdate;
use crate::models::{Booking, PaymentRecord, QueueMessage, Seat};

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Key/value store with per-key expiry and atomic set-if-absent.
/// The hold manager is the only component that writes through this trait.
#[async_trait]
pub trait LockStore: Send + Sync {
    /// Atomic "write only if absent" with a TTL. Returns false if a live
    /// value already exists under the key.
    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl_seconds: u64,
    ) -> Result<bool, BoxError>;

    /// Unconditional write; `ttl_seconds = None` means no expiry.
    async fn set(&self, key: &str, value: &str, ttl_seconds: Option<u64>) -> Result<(), BoxError>;

    async fn get(&self, key: &str) -> Result<Option<String>, BoxError>;

    async fn delete(&self, key: &str) -> Result<(), BoxError>;
}

/// Read access to durable seat rows.
#[async_trait]
pub trait SeatRepository: Send + Sync {
    async fn get_seat(&self, seat_id: &str) -> Result<Option<Seat>, BoxError>;

    /// All seats ordered by section id, then seat id.
    async fn list_seats(&self) -> Result<Vec<Seat>, BoxError>;
}

/// Durable booking persistence. `persist_booking` must run the seat update
/// and the booking insert in one transaction and must be safe to retry: a
/// (bookingId, seatId) conflict is "already applied", not an error.
#[async_trait]
pub trait BookingRepository: Send + Sync {
    async fn persist_booking(&self, booking: &Booking) -> Result<(), BoxError>;

    async fn get_bookings(&self, booking_id: Uuid) -> Result<Vec<Booking>, BoxError>;
}

/// Durable payment records, unique on idempotency key.
#[async_trait]
pub trait PaymentRepository: Send + Sync {
    async fn get_by_key(&self, idempotency_key: &str) -> Result<Option<PaymentRecord>, BoxError>;

    /// Insert-if-absent keyed by idempotency key; returns the stored record,
    /// which is the pre-existing one on conflict.
    async fn save(&self, record: &PaymentRecord) -> Result<PaymentRecord, BoxError>;
}

/// Producer side of the at-least-once delivery queue.
#[async_trait]
pub trait DeliveryQueue: Send + Sync {
    async fn enqueue(&self, message: &QueueMessage) -> Result<(), BoxError>;
}

/// A received message plus the opaque handle needed to acknowledge it.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub message: QueueMessage,
    pub receipt: String,
}

/// Consumer side of the delivery queue. Messages not acknowledged are
/// redelivered; `receive` blocks at most a bounded long-poll wait.
#[async_trait]
pub trait QueueConsumer: Send + Sync {
    async fn receive(&self, max_messages: usize) -> Result<Vec<Delivery>, BoxError>;

    async fn ack(&self, delivery: &Delivery) -> Result<(), BoxError>;
}

/// Fan-out of seat state changes to viewers. Best-effort only.
#[async_trait]
pub trait SeatUpdatePublisher: Send + Sync {
    async fn publish(&self, update: &SeatUpdate) -> Result<(), BoxError>;
}

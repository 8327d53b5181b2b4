//! In-memory implementations of the ports, used by tests and local runs
//! without Redis/Postgres/Kafka. TTLs are enforced lazily, on read.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use uuid::Uuid;

use crate::events::SeatUpdate;
use crate::models::{Booking, PaymentRecord, QueueMessage, Seat, SeatStatus};
use crate::ports::{
    BookingRepository, BoxError, Delivery, DeliveryQueue, LockStore, PaymentRepository,
    QueueConsumer, SeatRepository, SeatUpdatePublisher,
};

#[derive(Default)]
pub struct InMemoryLockStore {
    entries: Mutex<HashMap<String, LockEntry>>,
}

struct LockEntry {
    value: String,
    deadline: Option<Instant>,
}

impl LockEntry {
    fn is_expired(&self) -> bool {
        match self.deadline {
            Some(deadline) => Instant::now() >= deadline,
            None => false,
        }
    }
}

impl InMemoryLockStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn deadline(ttl_seconds: u64) -> Instant {
        Instant::now() + Duration::from_secs(ttl_seconds)
    }
}

#[async_trait]
impl LockStore for InMemoryLockStore {
    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl_seconds: u64,
    ) -> Result<bool, BoxError> {
        let mut entries = self.entries.lock().unwrap();
        if let Some(existing) = entries.get(key) {
            if !existing.is_expired() {
                return Ok(false);
            }
        }
        entries.insert(
            key.to_string(),
            LockEntry {
                value: value.to_string(),
                deadline: Some(Self::deadline(ttl_seconds)),
            },
        );
        Ok(true)
    }

    async fn set(&self, key: &str, value: &str, ttl_seconds: Option<u64>) -> Result<(), BoxError> {
        let mut entries = self.entries.lock().unwrap();
        entries.insert(
            key.to_string(),
            LockEntry {
                value: value.to_string(),
                deadline: ttl_seconds.map(Self::deadline),
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, BoxError> {
        let mut entries = self.entries.lock().unwrap();
        if let Some(entry) = entries.get(key) {
            if entry.is_expired() {
                entries.remove(key);
                return Ok(None);
            }
            return Ok(Some(entry.value.clone()));
        }
        Ok(None)
    }

    async fn delete(&self, key: &str) -> Result<(), BoxError> {
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }
}

pub struct InMemorySeatRepository {
    seats: Mutex<HashMap<String, Seat>>,
}

impl InMemorySeatRepository {
    pub fn with_seats(seats: Vec<Seat>) -> Self {
        let map = seats
            .into_iter()
            .map(|seat| (seat.seat_id.clone(), seat))
            .collect();
        Self { seats: Mutex::new(map) }
    }

    pub fn mark_booked(&self, seat_id: &str) {
        let mut seats = self.seats.lock().unwrap();
        if let Some(seat) = seats.get_mut(seat_id) {
            seat.status = SeatStatus::Booked;
        }
    }
}

#[async_trait]
impl SeatRepository for InMemorySeatRepository {
    async fn get_seat(&self, seat_id: &str) -> Result<Option<Seat>, BoxError> {
        Ok(self.seats.lock().unwrap().get(seat_id).cloned())
    }

    async fn list_seats(&self) -> Result<Vec<Seat>, BoxError> {
        let mut all: Vec<Seat> = self.seats.lock().unwrap().values().cloned().collect();
        all.sort_by(|a, b| {
            (a.section_id.as_str(), a.seat_id.as_str())
                .cmp(&(b.section_id.as_str(), b.seat_id.as_str()))
        });
        Ok(all)
    }
}

/// Booking persistence over the in-memory seat table. The seat update and
/// row insert happen under one lock, mirroring the store's transaction.
pub struct InMemoryBookingRepository {
    seats: Arc<InMemorySeatRepository>,
    rows: Mutex<HashMap<(Uuid, String), Booking>>,
}

impl InMemoryBookingRepository {
    pub fn new(seats: Arc<InMemorySeatRepository>) -> Self {
        Self {
            seats,
            rows: Mutex::new(HashMap::new()),
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.lock().unwrap().len()
    }
}

#[async_trait]
impl BookingRepository for InMemoryBookingRepository {
    async fn persist_booking(&self, booking: &Booking) -> Result<(), BoxError> {
        let mut rows = self.rows.lock().unwrap();
        self.seats.mark_booked(&booking.seat_id);
        rows.entry((booking.booking_id, booking.seat_id.clone()))
            .or_insert_with(|| booking.clone());
        Ok(())
    }

    async fn get_bookings(&self, booking_id: Uuid) -> Result<Vec<Booking>, BoxError> {
        let rows = self.rows.lock().unwrap();
        let mut found: Vec<Booking> = rows
            .values()
            .filter(|b| b.booking_id == booking_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| a.seat_id.cmp(&b.seat_id));
        Ok(found)
    }
}

#[derive(Default)]
pub struct InMemoryPaymentRepository {
    records: Mutex<HashMap<String, PaymentRecord>>,
}

impl InMemoryPaymentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_count(&self) -> usize {
        self.records.lock().unwrap().len()
    }
}

#[async_trait]
impl PaymentRepository for InMemoryPaymentRepository {
    async fn get_by_key(&self, idempotency_key: &str) -> Result<Option<PaymentRecord>, BoxError> {
        Ok(self.records.lock().unwrap().get(idempotency_key).cloned())
    }

    async fn save(&self, record: &PaymentRecord) -> Result<PaymentRecord, BoxError> {
        let mut records = self.records.lock().unwrap();
        let stored = records
            .entry(record.idempotency_key.clone())
            .or_insert_with(|| record.clone());
        Ok(stored.clone())
    }
}

/// In-memory queue with explicit acknowledgment. Unacknowledged deliveries
/// stay in flight; `redeliver` makes them visible again, simulating the
/// queue's redelivery timeout.
#[derive(Default)]
pub struct InMemoryQueue {
    pending: Mutex<VecDeque<Delivery>>,
    in_flight: Mutex<HashMap<String, Delivery>>,
    next_receipt: AtomicU64,
}

impl InMemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.lock().unwrap().len()
    }

    pub fn in_flight_len(&self) -> usize {
        self.in_flight.lock().unwrap().len()
    }

    /// Move every unacknowledged delivery back to the front of the queue.
    /// Lock order is pending then in_flight, matching `receive`.
    pub fn redeliver(&self) {
        let mut pending = self.pending.lock().unwrap();
        let mut in_flight = self.in_flight.lock().unwrap();
        for (_, delivery) in in_flight.drain() {
            pending.push_front(delivery);
        }
    }
}

#[async_trait]
impl DeliveryQueue for InMemoryQueue {
    async fn enqueue(&self, message: &QueueMessage) -> Result<(), BoxError> {
        let receipt = self.next_receipt.fetch_add(1, Ordering::SeqCst).to_string();
        self.pending.lock().unwrap().push_back(Delivery {
            message: message.clone(),
            receipt,
        });
        Ok(())
    }
}

#[async_trait]
impl QueueConsumer for InMemoryQueue {
    async fn receive(&self, max_messages: usize) -> Result<Vec<Delivery>, BoxError> {
        let mut pending = self.pending.lock().unwrap();
        let mut in_flight = self.in_flight.lock().unwrap();
        let mut out = Vec::new();
        while out.len() < max_messages {
            match pending.pop_front() {
                Some(delivery) => {
                    in_flight.insert(delivery.receipt.clone(), delivery.clone());
                    out.push(delivery);
                }
                None => break,
            }
        }
        Ok(out)
    }

    async fn ack(&self, delivery: &Delivery) -> Result<(), BoxError> {
        self.in_flight.lock().unwrap().remove(&delivery.receipt);
        Ok(())
    }
}

/// Publisher that records events instead of sending them anywhere.
#[derive(Default)]
pub struct RecordingPublisher {
    events: Mutex<Vec<SeatUpdate>>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<SeatUpdate> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl SeatUpdatePublisher for RecordingPublisher {
    async fn publish(&self, update: &SeatUpdate) -> Result<(), BoxError> {
        self.events.lock().unwrap().push(update.clone());
        Ok(())
    }
}

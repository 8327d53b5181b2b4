use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Durable seat row. Mutated only by the confirmation worker, exactly once
/// per seat (AVAILABLE -> BOOKED).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Seat {
    pub seat_id: String,
    pub section_id: String,
    pub status: SeatStatus,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SeatStatus {
    Available,
    Booked,
}

impl SeatStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SeatStatus::Available => "AVAILABLE",
            SeatStatus::Booked => "BOOKED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "AVAILABLE" => Some(SeatStatus::Available),
            "BOOKED" => Some(SeatStatus::Booked),
            _ => None,
        }
    }
}

/// Reference to a seat as supplied by a caller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SeatRef {
    pub seat_id: String,
    pub section_id: String,
}

/// Structured hold value stored in the lock store under `hold:seat:{seatId}`.
/// Validated on read; a value that fails to deserialize is treated as absent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HoldRecord {
    pub user_id: String,
    pub booking_id: Uuid,
    pub section_id: String,
    /// Wall-clock deadline in epoch milliseconds, re-checked on read even
    /// though the store enforces its own TTL.
    pub expires_at_ms: i64,
}

impl HoldRecord {
    pub fn is_expired(&self, now_ms: i64) -> bool {
        self.expires_at_ms <= now_ms
    }
}

/// Reverse index stored under `booking:{bookingId}`, same TTL as the holds it
/// points at.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BookingIndex {
    pub seat_ids: Vec<String>,
}

/// No-expiry flag stored under `seat:status:{seatId}` meaning "booked,
/// durable write pending". Carries the booking linkage so it stays resolvable
/// after the hold's TTL-bound index is gone.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AuthoritativeMark {
    pub booking_id: Uuid,
    pub user_id: String,
}

/// Ephemeral view of a seat, overriding the durable status for reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthoritativeStatus {
    Held,
    Booked,
}

/// Durable booking row, one per (bookingId, seatId) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub booking_id: Uuid,
    pub seat_id: String,
    pub section_id: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Confirmed,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Confirmed => "CONFIRMED",
            PaymentStatus::Failed => "FAILED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "CONFIRMED" => Some(PaymentStatus::Confirmed),
            "FAILED" => Some(PaymentStatus::Failed),
            _ => None,
        }
    }
}

/// Durable payment outcome, unique on idempotency key.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRecord {
    pub booking_id: Uuid,
    pub idempotency_key: String,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
}

/// Message on the delivery queue, one per seat per booking.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "data")]
pub enum QueueMessage {
    #[serde(rename = "BOOKING_CONFIRMED")]
    BookingConfirmed(BookingConfirmed),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BookingConfirmed {
    pub booking_id: Uuid,
    pub seat_id: String,
    pub section_id: String,
    pub user_id: String,
    pub idempotency_key: String,
}

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Seat state-change notification pushed to the external broadcaster.
/// Best-effort, fire-and-forget; never required for correctness.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SeatUpdate {
    pub seat_id: String,
    pub status: SeatUpdateStatus,
    pub booking_id: Option<Uuid>,
    /// Epoch milliseconds when the hold lapses, when applicable.
    pub hold_until: Option<i64>,
    pub ts: i64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SeatUpdateStatus {
    Held,
    Booked,
    Available,
}

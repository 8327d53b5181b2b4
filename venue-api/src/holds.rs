use axum::{extract::State, routing::post, Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use venue_core::events::{SeatUpdate, SeatUpdateStatus};
use venue_core::models::SeatRef;

use crate::error::AppError;
use crate::state::AppState;

/// Both accepted request shapes. The batch form is canonical; the single-seat
/// form is kept for older clients and treated as a one-element batch.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum BookSeatRequest {
    Batch {
        #[serde(rename = "userId")]
        user_id: String,
        seats: Vec<SeatRef>,
    },
    Single {
        #[serde(rename = "userId")]
        user_id: String,
        #[serde(rename = "seatId")]
        seat_id: String,
        #[serde(rename = "sectionId")]
        section_id: String,
    },
}

impl BookSeatRequest {
    fn normalize(self) -> (String, Vec<SeatRef>) {
        match self {
            BookSeatRequest::Batch { user_id, seats } => (user_id, seats),
            BookSeatRequest::Single {
                user_id,
                seat_id,
                section_id,
            } => (
                user_id,
                vec![SeatRef {
                    seat_id,
                    section_id,
                }],
            ),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BookSeatResponse {
    booking_id: Uuid,
    seats: Vec<SeatRef>,
    status: &'static str,
    expires_in: u64,
    count: usize,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/api/book-seat", post(book_seat))
}

async fn book_seat(
    State(state): State<AppState>,
    Json(request): Json<BookSeatRequest>,
) -> Result<Json<BookSeatResponse>, AppError> {
    let (user_id, seats) = request.normalize();
    let receipt = state.coordinator.place_hold(&seats, &user_id).await?;

    // Fan-out is best-effort; a failed publish never fails the hold.
    for seat in &receipt.seats {
        let update = SeatUpdate {
            seat_id: seat.seat_id.clone(),
            status: SeatUpdateStatus::Held,
            booking_id: Some(receipt.booking_id),
            hold_until: Some(receipt.hold_until_ms),
            ts: Utc::now().timestamp_millis(),
        };
        if let Err(e) = state.updates.publish(&update).await {
            warn!(seat_id = %seat.seat_id, error = %e, "seat update publish failed");
        }
    }

    let count = receipt.seats.len();
    Ok(Json(BookSeatResponse {
        booking_id: receipt.booking_id,
        seats: receipt.seats,
        status: "HOLD",
        expires_in: receipt.expires_in,
        count,
    }))
}

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use venue_booking::ConfirmationOutcome;
use venue_core::events::{SeatUpdate, SeatUpdateStatus};
use venue_core::models::PaymentStatus;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PayRequest {
    booking_id: Uuid,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PayResponse {
    booking_id: Uuid,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    seats_booked: Option<usize>,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/api/pay", post(pay))
}

async fn pay(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<PayRequest>,
) -> Result<Response, AppError> {
    let idempotency_key = headers
        .get("idempotency-key")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let outcome = state
        .confirmations
        .confirm(request.booking_id, idempotency_key)
        .await?;

    let response = match outcome {
        ConfirmationOutcome::Confirmed { booking_id, seats } => {
            for seat in &seats {
                let update = SeatUpdate {
                    seat_id: seat.seat_id.clone(),
                    status: SeatUpdateStatus::Booked,
                    booking_id: Some(booking_id),
                    hold_until: None,
                    ts: Utc::now().timestamp_millis(),
                };
                if let Err(e) = state.updates.publish(&update).await {
                    warn!(seat_id = %seat.seat_id, error = %e, "seat update publish failed");
                }
            }
            (
                StatusCode::OK,
                Json(PayResponse {
                    booking_id,
                    status: "CONFIRMED",
                    seats_booked: Some(seats.len()),
                }),
            )
        }
        ConfirmationOutcome::Failed { booking_id } => (
            StatusCode::BAD_REQUEST,
            Json(PayResponse {
                booking_id,
                status: "PAYMENT_FAILED",
                seats_booked: None,
            }),
        ),
        // Replays answer with the stored outcome and the matching status code.
        ConfirmationOutcome::Replayed { record } => match record.status {
            PaymentStatus::Confirmed => (
                StatusCode::OK,
                Json(PayResponse {
                    booking_id: record.booking_id,
                    status: "CONFIRMED",
                    seats_booked: None,
                }),
            ),
            PaymentStatus::Failed => (
                StatusCode::BAD_REQUEST,
                Json(PayResponse {
                    booking_id: record.booking_id,
                    status: "PAYMENT_FAILED",
                    seats_booked: None,
                }),
            ),
        },
    };

    Ok(response.into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pay_request_shape_parses() {
        let body = r#"{"bookingId":"6f6b2c5e-0000-0000-0000-000000000001"}"#;
        let request: PayRequest = serde_json::from_str(body).unwrap();
        assert_eq!(
            request.booking_id.to_string(),
            "6f6b2c5e-0000-0000-0000-000000000001"
        );
    }

    #[test]
    fn confirmed_response_carries_seat_count() {
        let response = PayResponse {
            booking_id: Uuid::nil(),
            status: "CONFIRMED",
            seats_booked: Some(2),
        };
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["status"], "CONFIRMED");
        assert_eq!(value["seatsBooked"], 2);
    }

    #[test]
    fn failed_response_omits_seat_count() {
        let response = PayResponse {
            booking_id: Uuid::nil(),
            status: "PAYMENT_FAILED",
            seats_booked: None,
        };
        let value = serde_json::to_value(&response).unwrap();
        assert!(value.get("seatsBooked").is_none());
    }
}

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use venue_booking::BookingError;

#[derive(Debug)]
pub enum AppError {
    BadRequest { code: &'static str, message: String, seat_id: Option<String> },
    NotFound { code: &'static str, message: String, seat_id: Option<String> },
    Conflict { code: &'static str, message: String, seat_id: Option<String> },
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message, seat_id) = match self {
            AppError::BadRequest { code, message, seat_id } => {
                (StatusCode::BAD_REQUEST, code, message, seat_id)
            }
            AppError::NotFound { code, message, seat_id } => {
                (StatusCode::NOT_FOUND, code, message, seat_id)
            }
            AppError::Conflict { code, message, seat_id } => {
                (StatusCode::CONFLICT, code, message, seat_id)
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "Internal Server Error".to_string(),
                    None,
                )
            }
        };

        let mut body = json!({
            "error": code,
            "message": message,
        });
        if let Some(seat_id) = seat_id {
            body["seatId"] = json!(seat_id);
        }

        (status, Json(body)).into_response()
    }
}

impl From<BookingError> for AppError {
    fn from(err: BookingError) -> Self {
        let message = err.to_string();
        match err {
            BookingError::InvalidRequest => AppError::BadRequest {
                code: "INVALID_REQUEST",
                message,
                seat_id: None,
            },
            BookingError::SeatNotFound(seat_id) => AppError::NotFound {
                code: "SEAT_NOT_FOUND",
                message,
                seat_id: Some(seat_id),
            },
            BookingError::SectionMismatch(seat_id) => AppError::BadRequest {
                code: "SEAT_SECTION_MISMATCH",
                message,
                seat_id: Some(seat_id),
            },
            BookingError::SeatTaken(seat_id) => AppError::Conflict {
                code: "SEAT_ALREADY_TAKEN",
                message,
                seat_id: Some(seat_id),
            },
            BookingError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

impl From<venue_core::BoxError> for AppError {
    fn from(err: venue_core::BoxError) -> Self {
        AppError::Internal(err.to_string())
    }
}

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use venue_booking::SectionView;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
struct SeatMapResponse {
    sections: Vec<SectionView>,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/api/seats", get(get_seats))
}

async fn get_seats(State(state): State<AppState>) -> Result<Json<SeatMapResponse>, AppError> {
    let sections = state.aggregator.seat_map().await?;
    Ok(Json(SeatMapResponse { sections }))
}

//! Read-side merge of durable seat rows with the ephemeral view, so clients
//! see HELD/BOOKED transitions before the worker has caught up.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

use venue_core::models::{AuthoritativeStatus, SeatStatus};
use venue_core::ports::{BoxError, SeatRepository};

use crate::holds::HoldManager;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SectionView {
    pub section_id: String,
    pub seats: Vec<SeatView>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SeatView {
    pub seat_id: String,
    pub status: &'static str,
}

pub struct StatusAggregator {
    seats: Arc<dyn SeatRepository>,
    holds: Arc<HoldManager>,
}

impl StatusAggregator {
    pub fn new(seats: Arc<dyn SeatRepository>, holds: Arc<HoldManager>) -> Self {
        Self { seats, holds }
    }

    /// All seats grouped by section, with the ephemeral status overriding
    /// the durable one. A durably BOOKED seat never shows as available.
    pub async fn seat_map(&self) -> Result<Vec<SectionView>, BoxError> {
        let rows = self.seats.list_seats().await?;
        let mut sections: BTreeMap<String, Vec<SeatView>> = BTreeMap::new();

        for seat in rows {
            let status = match seat.status {
                SeatStatus::Booked => "BOOKED",
                SeatStatus::Available => {
                    match self.holds.authoritative_status(&seat.seat_id).await? {
                        Some(AuthoritativeStatus::Booked) => "BOOKED",
                        Some(AuthoritativeStatus::Held) => "HOLD",
                        None => "AVAILABLE",
                    }
                }
            };
            sections.entry(seat.section_id).or_default().push(SeatView {
                seat_id: seat.seat_id,
                status,
            });
        }

        Ok(sections
            .into_iter()
            .map(|(section_id, seats)| SectionView { section_id, seats })
            .collect())
    }
}

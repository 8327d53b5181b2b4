//! Validates hold requests against durable seat data and drives atomic
//! acquisition through the hold manager.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use venue_core::models::{SeatRef, SeatStatus};
use venue_core::ports::SeatRepository;

use crate::holds::{HoldManager, MultiHoldOutcome};

#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("request is malformed")]
    InvalidRequest,

    #[error("seat {0} not found")]
    SeatNotFound(String),

    #[error("seat {0} does not belong to the requested section")]
    SectionMismatch(String),

    #[error("seat {0} is already taken")]
    SeatTaken(String),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Successful hold: one booking id covering every requested seat.
#[derive(Debug, Clone)]
pub struct HoldReceipt {
    pub booking_id: Uuid,
    pub seats: Vec<SeatRef>,
    pub expires_in: u64,
    pub hold_until_ms: i64,
}

pub struct BookingCoordinator {
    seats: Arc<dyn SeatRepository>,
    holds: Arc<HoldManager>,
}

impl BookingCoordinator {
    pub fn new(seats: Arc<dyn SeatRepository>, holds: Arc<HoldManager>) -> Self {
        Self { seats, holds }
    }

    /// Validate every seat, then acquire all of them under a fresh booking
    /// id. Any failure aborts the whole request with no side effects and
    /// names the offending seat.
    pub async fn place_hold(
        &self,
        seats: &[SeatRef],
        user_id: &str,
    ) -> Result<HoldReceipt, BookingError> {
        if seats.is_empty() || user_id.trim().is_empty() {
            return Err(BookingError::InvalidRequest);
        }

        for seat in seats {
            if seat.seat_id.trim().is_empty() || seat.section_id.trim().is_empty() {
                return Err(BookingError::InvalidRequest);
            }

            let row = self
                .seats
                .get_seat(&seat.seat_id)
                .await
                .map_err(|e| BookingError::Internal(e.to_string()))?
                .ok_or_else(|| BookingError::SeatNotFound(seat.seat_id.clone()))?;

            if row.section_id != seat.section_id {
                return Err(BookingError::SectionMismatch(seat.seat_id.clone()));
            }
            if row.status == SeatStatus::Booked {
                return Err(BookingError::SeatTaken(seat.seat_id.clone()));
            }
            if self
                .holds
                .is_held(&seat.seat_id)
                .await
                .map_err(|e| BookingError::Internal(e.to_string()))?
            {
                return Err(BookingError::SeatTaken(seat.seat_id.clone()));
            }
        }

        let booking_id = Uuid::new_v4();
        let hold_until_ms = self.holds.hold_until_ms();

        // A lost race between validation and acquisition surfaces here as a
        // conflict; nothing durable was touched, so no compensation runs.
        if seats.len() == 1 {
            let seat = &seats[0];
            let acquired = self
                .holds
                .create_hold(&seat.seat_id, user_id, booking_id, &seat.section_id)
                .await
                .map_err(|e| BookingError::Internal(e.to_string()))?;
            if !acquired {
                return Err(BookingError::SeatTaken(seat.seat_id.clone()));
            }
        } else {
            let outcome = self
                .holds
                .create_multiple_holds(seats, user_id, booking_id)
                .await
                .map_err(|e| BookingError::Internal(e.to_string()))?;
            if let MultiHoldOutcome::Contended { seat_id } = outcome {
                return Err(BookingError::SeatTaken(seat_id));
            }
        }

        info!(booking_id = %booking_id, seats = seats.len(), "hold placed");
        Ok(HoldReceipt {
            booking_id,
            seats: seats.to_vec(),
            expires_in: self.holds.ttl_seconds(),
            hold_until_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use venue_core::memory::{InMemoryLockStore, InMemorySeatRepository};
    use venue_core::models::Seat;

    fn seat_row(seat_id: &str, section_id: &str, status: SeatStatus) -> Seat {
        Seat {
            seat_id: seat_id.to_string(),
            section_id: section_id.to_string(),
            status,
        }
    }

    fn seat_ref(seat_id: &str, section_id: &str) -> SeatRef {
        SeatRef {
            seat_id: seat_id.to_string(),
            section_id: section_id.to_string(),
        }
    }

    fn fixture() -> (Arc<InMemorySeatRepository>, Arc<HoldManager>, BookingCoordinator) {
        let seats = Arc::new(InMemorySeatRepository::with_seats(vec![
            seat_row("A1", "A", SeatStatus::Available),
            seat_row("A2", "A", SeatStatus::Available),
            seat_row("B1", "B", SeatStatus::Available),
            seat_row("B2", "B", SeatStatus::Booked),
        ]));
        let holds = Arc::new(HoldManager::new(Arc::new(InMemoryLockStore::new()), 120));
        let coordinator = BookingCoordinator::new(seats.clone(), holds.clone());
        (seats, holds, coordinator)
    }

    #[tokio::test]
    async fn single_seat_hold_succeeds() {
        let (_, holds, coordinator) = fixture();
        let receipt = coordinator
            .place_hold(&[seat_ref("A1", "A")], "u1")
            .await
            .unwrap();

        assert_eq!(receipt.expires_in, 120);
        assert_eq!(receipt.seats.len(), 1);
        let hold = holds.get_hold("A1").await.unwrap().unwrap();
        assert_eq!(hold.booking_id, receipt.booking_id);
    }

    #[tokio::test]
    async fn multi_seat_hold_shares_booking_id() {
        let (_, holds, coordinator) = fixture();
        let receipt = coordinator
            .place_hold(&[seat_ref("A1", "A"), seat_ref("A2", "A")], "u1")
            .await
            .unwrap();

        let resolved = holds
            .get_hold_by_booking_id(receipt.booking_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(resolved.seats.len(), 2);
    }

    #[tokio::test]
    async fn empty_request_is_rejected() {
        let (_, _, coordinator) = fixture();
        assert!(matches!(
            coordinator.place_hold(&[], "u1").await,
            Err(BookingError::InvalidRequest)
        ));
        assert!(matches!(
            coordinator.place_hold(&[seat_ref("A1", "A")], "  ").await,
            Err(BookingError::InvalidRequest)
        ));
    }

    #[tokio::test]
    async fn unknown_seat_names_the_seat() {
        let (_, _, coordinator) = fixture();
        match coordinator.place_hold(&[seat_ref("Z9", "A")], "u1").await {
            Err(BookingError::SeatNotFound(id)) => assert_eq!(id, "Z9"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn section_mismatch_names_the_seat() {
        let (_, _, coordinator) = fixture();
        match coordinator.place_hold(&[seat_ref("A1", "B")], "u1").await {
            Err(BookingError::SectionMismatch(id)) => assert_eq!(id, "A1"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn durably_booked_seat_conflicts() {
        let (_, _, coordinator) = fixture();
        match coordinator.place_hold(&[seat_ref("B2", "B")], "u1").await {
            Err(BookingError::SeatTaken(id)) => assert_eq!(id, "B2"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn held_seat_conflicts_and_batch_leaves_nothing_behind() {
        let (_, holds, coordinator) = fixture();
        assert!(holds
            .create_hold("A2", "someone-else", Uuid::new_v4(), "A")
            .await
            .unwrap());

        match coordinator
            .place_hold(&[seat_ref("A1", "A"), seat_ref("A2", "A")], "u1")
            .await
        {
            Err(BookingError::SeatTaken(id)) => assert_eq!(id, "A2"),
            other => panic!("unexpected: {:?}", other),
        }
        assert!(!holds.is_held("A1").await.unwrap());
    }

    #[tokio::test]
    async fn repeat_hold_on_same_seat_conflicts() {
        let (_, _, coordinator) = fixture();
        coordinator
            .place_hold(&[seat_ref("A1", "A")], "u1")
            .await
            .unwrap();
        match coordinator.place_hold(&[seat_ref("A1", "A")], "u2").await {
            Err(BookingError::SeatTaken(id)) => assert_eq!(id, "A1"),
            other => panic!("unexpected: {:?}", other),
        }
    }
}

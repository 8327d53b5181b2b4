//! Idempotent payment confirmation. Converts a held booking into the
//! authoritatively-booked state and schedules durable persistence; the
//! durable write itself happens off the response path, in the worker.

use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use venue_core::models::{
    BookingConfirmed, PaymentRecord, PaymentStatus, QueueMessage,
};
use venue_core::ports::{BoxError, DeliveryQueue, PaymentRepository};

use crate::holds::{HeldSeat, HoldManager};

#[derive(Debug, Clone)]
pub enum ConfirmationOutcome {
    /// Holds were found: seats are marked booked and persistence is queued.
    Confirmed {
        booking_id: Uuid,
        seats: Vec<HeldSeat>,
    },
    /// No live hold for the booking (expired or unknown). A FAILED payment
    /// record was written under the idempotency key.
    Failed { booking_id: Uuid },
    /// A payment record already existed for the key; its stored outcome is
    /// returned verbatim with no further side effects.
    Replayed { record: PaymentRecord },
}

pub struct ConfirmationHandler {
    holds: Arc<HoldManager>,
    payments: Arc<dyn PaymentRepository>,
    queue: Arc<dyn DeliveryQueue>,
}

impl ConfirmationHandler {
    pub fn new(
        holds: Arc<HoldManager>,
        payments: Arc<dyn PaymentRepository>,
        queue: Arc<dyn DeliveryQueue>,
    ) -> Self {
        Self {
            holds,
            payments,
            queue,
        }
    }

    /// Confirm payment for a booking. Safe to retry with the same
    /// idempotency key: replays return the stored outcome, and the queued
    /// messages are idempotent downstream.
    pub async fn confirm(
        &self,
        booking_id: Uuid,
        idempotency_key: Option<String>,
    ) -> Result<ConfirmationOutcome, BoxError> {
        let key = idempotency_key.unwrap_or_else(|| booking_id.to_string());

        if let Some(record) = self.payments.get_by_key(&key).await? {
            info!(booking_id = %booking_id, "payment replayed from stored record");
            return Ok(ConfirmationOutcome::Replayed { record });
        }

        let holds = match self.holds.get_hold_by_booking_id(booking_id).await? {
            Some(holds) => holds,
            None => {
                self.payments
                    .save(&PaymentRecord {
                        booking_id,
                        idempotency_key: key,
                        status: PaymentStatus::Failed,
                        created_at: Utc::now(),
                    })
                    .await?;
                info!(booking_id = %booking_id, "payment failed: no live hold");
                return Ok(ConfirmationOutcome::Failed { booking_id });
            }
        };

        for seat in &holds.seats {
            self.holds
                .set_authoritatively_booked(&seat.seat_id, booking_id, &holds.user_id)
                .await?;
            self.queue
                .enqueue(&QueueMessage::BookingConfirmed(BookingConfirmed {
                    booking_id,
                    seat_id: seat.seat_id.clone(),
                    section_id: seat.section_id.clone(),
                    user_id: holds.user_id.clone(),
                    idempotency_key: key.clone(),
                }))
                .await?;
        }

        info!(
            booking_id = %booking_id,
            seats = holds.seats.len(),
            "payment confirmed, persistence queued"
        );
        Ok(ConfirmationOutcome::Confirmed {
            booking_id,
            seats: holds.seats,
        })
    }
}

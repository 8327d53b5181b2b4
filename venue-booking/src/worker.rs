//! Background reconciliation: drains the delivery queue, persists bookings
//! durably, releases holds, finalizes payment records. Runs independently of
//! request handling; one failed cycle never stops the next poll.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use venue_core::models::{Booking, BookingConfirmed, PaymentRecord, PaymentStatus, QueueMessage};
use venue_core::ports::{BookingRepository, BoxError, PaymentRepository, QueueConsumer};

use crate::holds::HoldManager;

pub struct ConfirmationWorker {
    consumer: Arc<dyn QueueConsumer>,
    bookings: Arc<dyn BookingRepository>,
    payments: Arc<dyn PaymentRepository>,
    holds: Arc<HoldManager>,
    batch_size: usize,
    poll_interval: Duration,
}

impl ConfirmationWorker {
    pub fn new(
        consumer: Arc<dyn QueueConsumer>,
        bookings: Arc<dyn BookingRepository>,
        payments: Arc<dyn PaymentRepository>,
        holds: Arc<HoldManager>,
        batch_size: usize,
        poll_interval: Duration,
    ) -> Self {
        Self {
            consumer,
            bookings,
            payments,
            holds,
            batch_size,
            poll_interval,
        }
    }

    /// Start the polling loop as a supervised task. Consumes the worker, so
    /// a second start of the same instance is impossible by construction.
    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!("confirmation worker started");
        loop {
            self.run_cycle().await;

            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("confirmation worker stopping");
                        break;
                    }
                }
            }
        }
    }

    /// One poll cycle: bounded receive, then strictly sequential processing
    /// to keep per-seat ordering simple. Returns how many messages were
    /// applied and acknowledged.
    pub async fn run_cycle(&self) -> usize {
        let deliveries = match self.consumer.receive(self.batch_size).await {
            Ok(deliveries) => deliveries,
            Err(e) => {
                error!(error = %e, "queue receive failed");
                return 0;
            }
        };

        let mut processed = 0usize;
        for delivery in deliveries {
            let QueueMessage::BookingConfirmed(msg) = &delivery.message;
            match self.apply(msg).await {
                Ok(()) => match self.consumer.ack(&delivery).await {
                    Ok(()) => processed += 1,
                    Err(e) => {
                        // Applied but not acked: the redelivery is absorbed
                        // by the idempotent apply path.
                        error!(booking_id = %msg.booking_id, error = %e, "ack failed");
                    }
                },
                Err(e) => {
                    // Stop the batch here. On offset-based queues an ack of a
                    // later message implicitly acknowledges this one, so
                    // acking past an unapplied message would lose it; from
                    // this point everything is left for redelivery.
                    error!(
                        booking_id = %msg.booking_id,
                        seat_id = %msg.seat_id,
                        error = %e,
                        "failed to persist booking, leaving the rest of the batch queued"
                    );
                    break;
                }
            }
        }
        processed
    }

    /// Apply one message. Every step tolerates having already run: the
    /// durable insert treats a key conflict as applied, the release is a
    /// no-op once the hold is gone, and the payment write is keyed.
    async fn apply(&self, msg: &BookingConfirmed) -> Result<(), BoxError> {
        self.bookings
            .persist_booking(&Booking {
                booking_id: msg.booking_id,
                seat_id: msg.seat_id.clone(),
                section_id: msg.section_id.clone(),
                user_id: msg.user_id.clone(),
                created_at: Utc::now(),
            })
            .await?;

        let released = self
            .holds
            .release_hold(&msg.seat_id, &msg.user_id)
            .await?;
        if !released {
            debug!(seat_id = %msg.seat_id, "hold already released or expired");
        }

        self.payments
            .save(&PaymentRecord {
                booking_id: msg.booking_id,
                idempotency_key: msg.idempotency_key.clone(),
                status: PaymentStatus::Confirmed,
                created_at: Utc::now(),
            })
            .await?;

        info!(booking_id = %msg.booking_id, seat_id = %msg.seat_id, "booking persisted");
        Ok(())
    }
}

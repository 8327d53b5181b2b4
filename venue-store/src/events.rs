use std::time::Duration;

use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::util::Timeout;
use tracing::{debug, error};

use venue_core::events::SeatUpdate;
use venue_core::ports::{BoxError, SeatUpdatePublisher};

const SEAT_UPDATED_TOPIC: &str = "seat.updated";

/// Publishes seat state changes for the external fan-out service. Delivery
/// is best-effort; callers drop failures.
#[derive(Clone)]
pub struct EventProducer {
    producer: FutureProducer,
}

impl EventProducer {
    pub fn new(brokers: &str) -> Result<Self, rdkafka::error::KafkaError> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("message.timeout.ms", "5000")
            .create()?;

        Ok(Self { producer })
    }
}

#[async_trait]
impl SeatUpdatePublisher for EventProducer {
    async fn publish(&self, update: &SeatUpdate) -> Result<(), BoxError> {
        let payload = serde_json::to_string(update)?;
        let record = FutureRecord::to(SEAT_UPDATED_TOPIC)
            .key(&update.seat_id)
            .payload(&payload);

        match self
            .producer
            .send(record, Timeout::After(Duration::from_secs(0)))
            .await
        {
            Ok(_) => {
                debug!(seat_id = %update.seat_id, "seat update published");
                Ok(())
            }
            Err((e, _msg)) => {
                error!(seat_id = %update.seat_id, error = %e, "seat update publish failed");
                Err(Box::new(e))
            }
        }
    }
}

use std::time::Duration;

use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::message::Message;
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::util::Timeout;
use rdkafka::{Offset, TopicPartitionList};
use tracing::{error, info};

use venue_core::models::QueueMessage;
use venue_core::ports::{BoxError, Delivery, DeliveryQueue, QueueConsumer};

pub const CONFIRMATION_TOPIC: &str = "booking.confirmed";

/// Producer side of the delivery queue.
pub struct KafkaDeliveryQueue {
    producer: FutureProducer,
    topic: String,
}

impl KafkaDeliveryQueue {
    pub fn new(brokers: &str) -> Result<Self, rdkafka::error::KafkaError> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("message.timeout.ms", "5000")
            .create()?;

        Ok(Self {
            producer,
            topic: CONFIRMATION_TOPIC.to_string(),
        })
    }
}

#[async_trait]
impl DeliveryQueue for KafkaDeliveryQueue {
    async fn enqueue(&self, message: &QueueMessage) -> Result<(), BoxError> {
        let QueueMessage::BookingConfirmed(body) = message;
        let key = body.booking_id.to_string();
        let payload = serde_json::to_string(message)?;

        let record = FutureRecord::to(&self.topic).key(&key).payload(&payload);
        match self
            .producer
            .send(record, Timeout::After(Duration::from_secs(0)))
            .await
        {
            Ok(delivery) => {
                info!(
                    booking_id = %key,
                    partition = delivery.partition,
                    offset = delivery.offset,
                    "queued confirmation message"
                );
                Ok(())
            }
            Err((e, _msg)) => {
                error!(booking_id = %key, error = %e, "failed to queue confirmation message");
                Err(Box::new(e))
            }
        }
    }
}

/// Consumer side. Auto-commit is off: an offset is committed only after the
/// worker has fully applied the message, so unapplied messages come back
/// after a restart or rebalance.
pub struct KafkaQueueConsumer {
    consumer: StreamConsumer,
    topic: String,
    wait: Duration,
}

impl KafkaQueueConsumer {
    pub fn new(
        brokers: &str,
        group_id: &str,
        wait: Duration,
    ) -> Result<Self, rdkafka::error::KafkaError> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("group.id", group_id)
            .set("enable.auto.commit", "false")
            .set("auto.offset.reset", "earliest")
            .create()?;

        consumer.subscribe(&[CONFIRMATION_TOPIC])?;

        Ok(Self {
            consumer,
            topic: CONFIRMATION_TOPIC.to_string(),
            wait,
        })
    }
}

#[async_trait]
impl QueueConsumer for KafkaQueueConsumer {
    async fn receive(&self, max_messages: usize) -> Result<Vec<Delivery>, BoxError> {
        let start = std::time::Instant::now();
        let mut out = Vec::new();

        while out.len() < max_messages {
            let elapsed = start.elapsed();
            if elapsed >= self.wait {
                break;
            }

            let msg = match tokio::time::timeout(self.wait - elapsed, self.consumer.recv()).await {
                Err(_) => break, // long-poll bound reached
                Ok(Err(e)) => {
                    error!(error = %e, "kafka receive error");
                    return Err(Box::new(e));
                }
                Ok(Ok(msg)) => msg,
            };

            let payload = match msg.payload_view::<str>() {
                Some(Ok(payload)) => payload,
                _ => {
                    error!(
                        partition = msg.partition(),
                        offset = msg.offset(),
                        "skipping message with unreadable payload"
                    );
                    continue;
                }
            };

            match serde_json::from_str::<QueueMessage>(payload) {
                Ok(message) => out.push(Delivery {
                    message,
                    receipt: format!("{}:{}", msg.partition(), msg.offset()),
                }),
                Err(e) => {
                    error!(
                        partition = msg.partition(),
                        offset = msg.offset(),
                        error = %e,
                        "skipping malformed queue message"
                    );
                }
            }
        }

        Ok(out)
    }

    async fn ack(&self, delivery: &Delivery) -> Result<(), BoxError> {
        let (partition, offset) = delivery
            .receipt
            .split_once(':')
            .ok_or_else(|| BoxError::from(format!("bad receipt '{}'", delivery.receipt)))?;
        let partition: i32 = partition.parse()?;
        let offset: i64 = offset.parse()?;

        let mut tpl = TopicPartitionList::new();
        tpl.add_partition_offset(&self.topic, partition, Offset::Offset(offset + 1))?;
        self.consumer.commit(&tpl, CommitMode::Async)?;
        Ok(())
    }
}

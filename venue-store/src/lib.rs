pub mod app_config;
pub mod booking_repo;
pub mod database;
pub mod events;
pub mod payment_repo;
pub mod queue;
pub mod redis_lock;
pub mod seat_repo;

pub use database::DbClient;
pub use events::EventProducer;
pub use queue::{KafkaDeliveryQueue, KafkaQueueConsumer};
pub use redis_lock::RedisLockStore;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use venue_api::{app, AppState};
use venue_booking::{
    BookingCoordinator, ConfirmationHandler, ConfirmationWorker, HoldManager, StatusAggregator,
};
use venue_core::ports::{
    BookingRepository, DeliveryQueue, LockStore, PaymentRepository, QueueConsumer, SeatRepository,
    SeatUpdatePublisher,
};
use venue_store::booking_repo::PostgresBookingRepository;
use venue_store::payment_repo::PostgresPaymentRepository;
use venue_store::seat_repo::PostgresSeatRepository;
use venue_store::{DbClient, EventProducer, KafkaDeliveryQueue, KafkaQueueConsumer, RedisLockStore};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "venue_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = venue_store::app_config::Config::load().expect("Failed to load config");
    tracing::info!("Starting Venue API on port {}", config.server.port);

    let db = DbClient::new(&config.database.url)
        .await
        .expect("Failed to connect to Postgres");

    let locks: Arc<dyn LockStore> = Arc::new(
        RedisLockStore::new(&config.redis.url).expect("Failed to create Redis client"),
    );

    let delivery_queue: Arc<dyn DeliveryQueue> = Arc::new(
        KafkaDeliveryQueue::new(&config.kafka.brokers).expect("Failed to create Kafka producer"),
    );
    let consumer: Arc<dyn QueueConsumer> = Arc::new(
        KafkaQueueConsumer::new(
            &config.kafka.brokers,
            &config.kafka.group_id,
            Duration::from_millis(config.business_rules.queue_wait_ms),
        )
        .expect("Failed to create Kafka consumer"),
    );
    let updates: Arc<dyn SeatUpdatePublisher> = Arc::new(
        EventProducer::new(&config.kafka.brokers).expect("Failed to create Kafka producer"),
    );

    let seats: Arc<dyn SeatRepository> = Arc::new(PostgresSeatRepository::new(db.pool.clone()));
    let bookings: Arc<dyn BookingRepository> =
        Arc::new(PostgresBookingRepository::new(db.pool.clone()));
    let payments: Arc<dyn PaymentRepository> =
        Arc::new(PostgresPaymentRepository::new(db.pool.clone()));

    let holds = Arc::new(HoldManager::new(
        locks,
        config.business_rules.seat_hold_seconds,
    ));
    let coordinator = Arc::new(BookingCoordinator::new(seats.clone(), holds.clone()));
    let confirmations = Arc::new(ConfirmationHandler::new(
        holds.clone(),
        payments.clone(),
        delivery_queue,
    ));
    let aggregator = Arc::new(StatusAggregator::new(seats.clone(), holds.clone()));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let worker = ConfirmationWorker::new(
        consumer,
        bookings,
        payments,
        holds.clone(),
        config.business_rules.worker_batch_size,
        Duration::from_millis(config.business_rules.worker_poll_ms),
    );
    let worker_handle = worker.spawn(shutdown_rx);

    let app_state = AppState {
        coordinator,
        confirmations,
        aggregator,
        updates,
    };

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listener");
    axum::serve(listener, app(app_state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .expect("Server error");

    // Server is down; stop the worker and let the in-flight cycle finish.
    let _ = shutdown_tx.send(true);
    let _ = worker_handle.await;
}

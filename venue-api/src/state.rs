use std::sync::Arc;

use venue_booking::{BookingCoordinator, ConfirmationHandler, StatusAggregator};
use venue_core::ports::SeatUpdatePublisher;

#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<BookingCoordinator>,
    pub confirmations: Arc<ConfirmationHandler>,
    pub aggregator: Arc<StatusAggregator>,
    pub updates: Arc<dyn SeatUpdatePublisher>,
}

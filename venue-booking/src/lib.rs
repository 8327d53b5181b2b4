pub mod confirmation;
pub mod coordinator;
pub mod holds;
pub mod status;
pub mod worker;

pub use confirmation::{ConfirmationHandler, ConfirmationOutcome};
pub use coordinator::{BookingCoordinator, BookingError, HoldReceipt};
pub use holds::{BookingHolds, HeldSeat, HoldManager, MultiHoldOutcome};
pub use status::{SeatView, SectionView, StatusAggregator};
pub use worker::ConfirmationWorker;

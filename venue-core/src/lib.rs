pub mod events;
pub mod memory;
pub mod models;
pub mod ports;

pub use ports::BoxError;

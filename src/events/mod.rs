//! In-process event bus: typed topics, synchronous delivery, no replay

pub mod bus;
pub mod messages;

pub use bus::EventBus;
pub use messages::{Event, Topic};

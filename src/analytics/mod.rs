pub mod events;
pub mod logger;
pub mod reporter;

pub use events::{Event, EventEntry};
pub use logger::EventLog;

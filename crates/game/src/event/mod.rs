mod queue;
mod types;

pub use queue::{EventQueue, PendingEvent};
pub use types::{GameEvent, Retention};

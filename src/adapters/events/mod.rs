//! Operation event handler adapters.
//!
//! - `LoggingEventHandler` - Writes every event to the tracing subscriber
//! - `CollectingEventHandler` - Records events for assertions and blocking waits

mod collecting;
mod logging;

pub use collecting::CollectingEventHandler;
pub use logging::LoggingEventHandler;

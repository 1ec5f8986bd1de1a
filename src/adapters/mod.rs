//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the conversation engine to its surroundings:
//! - `message_bus` - Message bus implementations (in-memory)
//! - `scheduler` - Timer service on the tokio runtime
//! - `events` - Observers of operation events (logging, collecting)
//! - `simulation` - Scripted pillars for demos and tests

pub mod events;
pub mod message_bus;
pub mod scheduler;
pub mod simulation;

pub use events::{CollectingEventHandler, LoggingEventHandler};
pub use message_bus::InMemoryMessageBus;
pub use scheduler::TokioTimerService;
pub use simulation::{IdentifyBehavior, OperationBehavior, SimulatedContributor};

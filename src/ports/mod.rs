//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the conversation domain and the outside world. Adapters implement them.
//!
//! - `MessageBus` / `MessageListener` - The publish/subscribe transport
//! - `OperationEventHandler` - Caller-supplied observer of lifecycle events
//! - `TimerService` - Shared scheduler for phase timeouts

mod message_bus;
mod operation_event_handler;
mod timer_service;

pub use message_bus::{MessageBus, MessageBusError, MessageListener};
pub use operation_event_handler::OperationEventHandler;
pub use timer_service::{TimerHandle, TimerService};

//! Foundation module - Shared domain primitives.
//!
//! Contains identifiers, the timestamp value object, error types and the
//! state machine trait that the conversation domain is built from.

mod errors;
mod ids;
mod state_machine;
mod timestamp;

pub use errors::{DomainError, ErrorCode, ValidationError};
pub use ids::{CollectionId, ComponentId, ConversationId, Destination};
pub use state_machine::StateMachine;
pub use timestamp::Timestamp;

//! MessageBus port - Interface to the publish/subscribe transport.
//!
//! Conversations send requests through this port and the mediator receives
//! responses through a `MessageListener` registered on the client's inbox.
//! The transport itself (broker, serialization, security) lives behind it.

use async_trait::async_trait;
use std::sync::Arc;

use crate::domain::conversation::Message;
use crate::domain::foundation::{Destination, DomainError, ErrorCode};

/// Errors raised by message bus adapters.
#[derive(Debug, thiserror::Error)]
pub enum MessageBusError {
    /// The broker refused or dropped the message.
    #[error("Failed to send message to {destination}: {reason}")]
    SendFailed { destination: String, reason: String },

    /// The bus has been shut down.
    #[error("Message bus is closed")]
    Closed,
}

impl From<MessageBusError> for DomainError {
    fn from(err: MessageBusError) -> Self {
        let destination = match &err {
            MessageBusError::SendFailed { destination, .. } => Some(destination.clone()),
            MessageBusError::Closed => None,
        };
        let error = DomainError::new(ErrorCode::MessageBusError, err.to_string());
        match destination {
            Some(destination) => error.with_detail("destination", destination),
            None => error,
        }
    }
}

/// Receiver of messages delivered to a destination.
///
/// Implementations should be:
/// - **Tolerant of duplicates** - delivery is at-least-once
/// - **Order-agnostic** - messages from different senders may interleave
/// - **Quick** - the transport may deliver on a shared worker
#[async_trait]
pub trait MessageListener: Send + Sync {
    /// Handle one delivered message.
    async fn on_message(&self, message: Message) -> Result<(), DomainError>;

    /// Listener name for logging and for removal.
    fn name(&self) -> &'static str;
}

/// Port for sending messages and registering listeners.
///
/// Delivery is asynchronous, at-least-once, with no ordering guarantee
/// across senders. `send` returning `Ok` means the transport accepted the
/// message, not that anybody received it.
#[async_trait]
pub trait MessageBus: Send + Sync {
    /// Send a message to `message.to`.
    async fn send(&self, message: Message) -> Result<(), MessageBusError>;

    /// Start delivering messages sent to `destination` to `listener`.
    fn add_listener(&self, destination: &Destination, listener: Arc<dyn MessageListener>);

    /// Stop delivering to the listener with the given name.
    fn remove_listener(&self, destination: &Destination, listener_name: &str);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[allow(dead_code)]
    fn assert_bus_object_safe(_: &dyn MessageBus) {}

    #[allow(dead_code)]
    fn assert_listener_object_safe(_: &dyn MessageListener) {}

    #[test]
    fn send_failure_converts_to_domain_error_with_destination() {
        let err = MessageBusError::SendFailed {
            destination: "pillar-1.queue".to_string(),
            reason: "broker unavailable".to_string(),
        };
        let domain: DomainError = err.into();

        assert_eq!(domain.code, ErrorCode::MessageBusError);
        assert_eq!(
            domain.details.get("destination"),
            Some(&"pillar-1.queue".to_string())
        );
        assert!(domain.message.contains("broker unavailable"));
    }

    #[test]
    fn closed_converts_without_destination() {
        let domain: DomainError = MessageBusError::Closed.into();
        assert_eq!(domain.code, ErrorCode::MessageBusError);
        assert!(domain.details.is_empty());
    }
}

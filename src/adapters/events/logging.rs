//! Event handler that writes every event to the tracing subscriber.

use async_trait::async_trait;

use crate::domain::conversation::{OperationEvent, OperationEventType};
use crate::domain::foundation::DomainError;
use crate::ports::OperationEventHandler;

/// Traces events: failures at warn, terminal events at info, the rest at debug.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingEventHandler;

impl LoggingEventHandler {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl OperationEventHandler for LoggingEventHandler {
    async fn handle_event(&self, event: OperationEvent) -> Result<(), DomainError> {
        let conversation_id = event.conversation_id.as_str();
        let contributor = event.contributor().map(|c| c.as_str()).unwrap_or("-");
        let event_type = event.event_type();

        match event_type {
            OperationEventType::Failed
            | OperationEventType::ComponentFailed
            | OperationEventType::IdentifyTimeout
            | OperationEventType::Warning => {
                tracing::warn!(
                    conversation_id,
                    operation = %event.operation,
                    ?event_type,
                    contributor,
                    info = %event.info,
                    "Operation event"
                );
            }
            OperationEventType::Complete => {
                tracing::info!(
                    conversation_id,
                    operation = %event.operation,
                    ?event_type,
                    info = %event.info,
                    "Operation event"
                );
            }
            _ => {
                tracing::debug!(
                    conversation_id,
                    operation = %event.operation,
                    ?event_type,
                    contributor,
                    info = %event.info,
                    "Operation event"
                );
            }
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "LoggingEventHandler"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::conversation::{OperationEventKind, OperationKind};
    use crate::domain::foundation::{CollectionId, ConversationId, Timestamp};

    #[tokio::test]
    async fn never_fails() {
        let handler = LoggingEventHandler::new();
        let event = OperationEvent {
            conversation_id: ConversationId::from_string("c1"),
            collection_id: CollectionId::new("books").unwrap(),
            operation: OperationKind::DeleteFile,
            file_id: Some("f".to_string()),
            info: "boom".to_string(),
            occurred_at: Timestamp::now(),
            kind: OperationEventKind::Failed { failures: vec![] },
        };

        assert!(handler.handle_event(event).await.is_ok());
        assert_eq!(handler.name(), "LoggingEventHandler");
    }
}

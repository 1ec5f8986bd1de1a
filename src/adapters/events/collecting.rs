//! Event handler that records every event it receives.
//!
//! # Security Note
//!
//! Intended for tests and demos. It uses `.expect()` on lock operations which
//! will panic if locks are poisoned.

use async_trait::async_trait;
use std::sync::RwLock;
use std::time::Duration;
use tokio::sync::watch;

use crate::domain::conversation::{OperationEvent, OperationEventType};
use crate::domain::foundation::{ConversationId, DomainError};
use crate::ports::OperationEventHandler;

/// Records events for assertions and lets callers await the terminal one.
///
/// # Panics
///
/// Methods may panic if internal locks are poisoned.
///
/// # Example
///
/// ```ignore
/// let events = Arc::new(CollectingEventHandler::new());
/// let conversation = client.start_conversation(request, policy, Some(events.clone())).await?;
///
/// let terminal = events.wait_for_terminal(Duration::from_secs(1)).await;
/// assert_eq!(events.event_types().last(), Some(&OperationEventType::Complete));
/// ```
pub struct CollectingEventHandler {
    events: RwLock<Vec<OperationEvent>>,
    terminal: watch::Sender<Option<OperationEvent>>,
}

impl CollectingEventHandler {
    pub fn new() -> Self {
        let (terminal, _) = watch::channel(None);
        Self {
            events: RwLock::new(Vec::new()),
            terminal,
        }
    }

    /// Returns all received events in arrival order.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn events(&self) -> Vec<OperationEvent> {
        self.events
            .read()
            .expect("CollectingEventHandler: events lock poisoned")
            .clone()
    }

    pub fn event_types(&self) -> Vec<OperationEventType> {
        self.events().iter().map(OperationEvent::event_type).collect()
    }

    pub fn events_of_type(&self, event_type: OperationEventType) -> Vec<OperationEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.event_type() == event_type)
            .collect()
    }

    pub fn events_for(&self, conversation_id: &ConversationId) -> Vec<OperationEvent> {
        self.events()
            .into_iter()
            .filter(|e| &e.conversation_id == conversation_id)
            .collect()
    }

    pub fn has_event(&self, event_type: OperationEventType) -> bool {
        self.events().iter().any(|e| e.event_type() == event_type)
    }

    pub fn event_count(&self) -> usize {
        self.events
            .read()
            .expect("CollectingEventHandler: events lock poisoned")
            .len()
    }

    /// First terminal event received, if any.
    pub fn terminal(&self) -> Option<OperationEvent> {
        self.terminal.borrow().clone()
    }

    /// Waits for the first terminal event; `None` if none arrives in time.
    pub async fn wait_for_terminal(&self, timeout: Duration) -> Option<OperationEvent> {
        let mut receiver = self.terminal.subscribe();
        let event = match tokio::time::timeout(timeout, receiver.wait_for(Option::is_some)).await {
            Ok(Ok(event)) => (*event).clone(),
            _ => None,
        };
        event
    }

    /// Clears recorded events (for test isolation).
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn clear(&self) {
        self.events
            .write()
            .expect("CollectingEventHandler: events write lock poisoned")
            .clear();
        self.terminal.send_replace(None);
    }
}

impl Default for CollectingEventHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OperationEventHandler for CollectingEventHandler {
    async fn handle_event(&self, event: OperationEvent) -> Result<(), DomainError> {
        let terminal = event.is_terminal();
        self.events
            .write()
            .expect("CollectingEventHandler: events write lock poisoned")
            .push(event.clone());

        if terminal {
            self.terminal.send_if_modified(|current| {
                if current.is_some() {
                    return false;
                }
                *current = Some(event);
                true
            });
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "CollectingEventHandler"
    }
}

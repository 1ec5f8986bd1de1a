//! In-memory message bus for tests and the demo binary.
//!
//! Every delivery runs on its own spawned task, so a listener never runs on
//! the sender's stack and delivery order across listeners is not fixed, the
//! same as with a real broker.
//!
//! # Security Note
//!
//! This adapter is for **testing and demos only**. It uses `.expect()` on lock
//! operations which will panic if locks are poisoned.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use crate::domain::conversation::Message;
use crate::domain::foundation::Destination;
use crate::ports::{MessageBus, MessageBusError, MessageListener};

/// In-memory publish/subscribe bus.
///
/// Features:
/// - Asynchronous delivery to every listener of the destination
/// - Message capture for assertions
/// - Can be closed to simulate a broken broker
///
/// # Panics
///
/// Methods may panic if internal locks are poisoned. This is acceptable
/// for test code but this adapter should NOT be used in production.
///
/// # Example
///
/// ```ignore
/// let bus = Arc::new(InMemoryMessageBus::new());
/// bus.add_listener(&inbox, mediator.clone());
///
/// bus.send(message).await?;
///
/// assert_eq!(bus.messages_to(&topic).len(), 1);
/// ```
pub struct InMemoryMessageBus {
    listeners: RwLock<HashMap<Destination, Vec<Arc<dyn MessageListener>>>>,
    sent: RwLock<Vec<Message>>,
    closed: AtomicBool,
}

impl InMemoryMessageBus {
    pub fn new() -> Self {
        Self {
            listeners: RwLock::new(HashMap::new()),
            sent: RwLock::new(Vec::new()),
            closed: AtomicBool::new(false),
        }
    }

    /// Makes every further `send` fail with `MessageBusError::Closed`.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    // === Test Helpers ===

    /// Returns all sent messages, in send order.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn sent_messages(&self) -> Vec<Message> {
        self.sent
            .read()
            .expect("InMemoryMessageBus: sent lock poisoned")
            .clone()
    }

    /// Returns messages sent to one destination.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn messages_to(&self, destination: &Destination) -> Vec<Message> {
        self.sent_messages()
            .into_iter()
            .filter(|m| &m.to == destination)
            .collect()
    }

    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn message_count(&self) -> usize {
        self.sent
            .read()
            .expect("InMemoryMessageBus: sent lock poisoned")
            .len()
    }

    /// Number of listeners on a destination.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn listener_count(&self, destination: &Destination) -> usize {
        self.listeners
            .read()
            .expect("InMemoryMessageBus: listeners lock poisoned")
            .get(destination)
            .map(Vec::len)
            .unwrap_or(0)
    }

    /// Clears captured messages (for test isolation).
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn clear(&self) {
        self.sent
            .write()
            .expect("InMemoryMessageBus: sent write lock poisoned")
            .clear();
    }
}

impl Default for InMemoryMessageBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageBus for InMemoryMessageBus {
    async fn send(&self, message: Message) -> Result<(), MessageBusError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(MessageBusError::Closed);
        }

        self.sent
            .write()
            .expect("InMemoryMessageBus: sent write lock poisoned")
            .push(message.clone());

        // Clone listeners to release the lock before spawning
        let targets: Vec<Arc<dyn MessageListener>> = {
            let listeners = self
                .listeners
                .read()
                .expect("InMemoryMessageBus: listeners lock poisoned");
            listeners.get(&message.to).cloned().unwrap_or_default()
        };

        if targets.is_empty() {
            tracing::debug!(
                destination = %message.to,
                kind = message.kind_name(),
                "No listener on destination"
            );
        }

        for listener in targets {
            let message = message.clone();
            tokio::spawn(async move {
                let correlation_id = message.correlation_id.clone();
                if let Err(e) = listener.on_message(message).await {
                    tracing::warn!(
                        listener = listener.name(),
                        %correlation_id,
                        error = %e,
                        "Listener failed to handle message"
                    );
                }
            });
        }

        Ok(())
    }

    fn add_listener(&self, destination: &Destination, listener: Arc<dyn MessageListener>) {
        let mut listeners = self
            .listeners
            .write()
            .expect("InMemoryMessageBus: listeners write lock poisoned");
        listeners
            .entry(destination.clone())
            .or_default()
            .push(listener);
    }

    fn remove_listener(&self, destination: &Destination, listener_name: &str) {
        let mut listeners = self
            .listeners
            .write()
            .expect("InMemoryMessageBus: listeners write lock poisoned");
        if let Some(registered) = listeners.get_mut(destination) {
            registered.retain(|l| l.name() != listener_name);
        }
    }
}

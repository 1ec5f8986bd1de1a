//! ConversationMediator - Routes inbound messages and collects stale conversations.
//!
//! The mediator listens on the client's inbox, looks every message up by its
//! correlation id and hands it to the owning conversation. A background sweep
//! removes ended conversations and force-fails those that outlived the
//! conversation timeout.
//!
//! ## Configuration
//!
//! | Setting | Default | Description |
//! |---------|---------|-------------|
//! | `cleanup_interval` | 1s | How often the sweep runs |
//! | `conversation_timeout` | 2h | Age after which a conversation is failed |
//!
//! ## Graceful Shutdown
//!
//! `shutdown` unsubscribes from the inbox and stops the sweep loop after its
//! current pass. Conversations still registered are left as they are.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time;

use super::registry::ConversationRegistry;
use crate::domain::conversation::{Conversation, Message, DEFAULT_CONVERSATION_TIMEOUT};
use crate::domain::foundation::{ConversationId, Destination, DomainError};
use crate::ports::{MessageBus, MessageListener};

/// Configuration for the ConversationMediator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediatorConfig {
    /// How often the sweep runs.
    pub cleanup_interval: Duration,

    /// Conversations older than this are failed by the sweep.
    pub conversation_timeout: Duration,
}

impl Default for MediatorConfig {
    fn default() -> Self {
        Self {
            cleanup_interval: Duration::from_secs(1),
            conversation_timeout: DEFAULT_CONVERSATION_TIMEOUT,
        }
    }
}

impl MediatorConfig {
    pub fn with_cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval = interval;
        self
    }

    pub fn with_conversation_timeout(mut self, timeout: Duration) -> Self {
        self.conversation_timeout = timeout;
        self
    }
}

/// Outcome of one sweep pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Ended conversations removed from the registry.
    pub removed: usize,
    /// Over-age conversations whose failure was dispatched.
    pub expired: usize,
}

pub struct ConversationMediator {
    registry: ConversationRegistry,
    bus: Arc<dyn MessageBus>,
    receiver: Destination,
    config: MediatorConfig,
    shutdown: watch::Sender<bool>,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl ConversationMediator {
    pub fn new(bus: Arc<dyn MessageBus>, receiver: Destination, config: MediatorConfig) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            registry: ConversationRegistry::new(),
            bus,
            receiver,
            config,
            shutdown,
            sweeper: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &MediatorConfig {
        &self.config
    }

    /// Makes `conversation` reachable for routing. Call before starting it.
    pub async fn register(&self, conversation: Arc<Conversation>) -> Result<(), DomainError> {
        tracing::debug!(conversation_id = %conversation.id(), "Registering conversation");
        self.registry.insert(conversation).await
    }

    pub async fn conversation(&self, id: &ConversationId) -> Option<Arc<Conversation>> {
        self.registry.get(id).await
    }

    pub async fn conversation_count(&self) -> usize {
        self.registry.len().await
    }

    /// Delivers `message` to its conversation. Returns false if none matched.
    pub async fn route(&self, message: Message) -> bool {
        match self.registry.get(&message.correlation_id).await {
            Some(conversation) => {
                conversation.on_message(message).await;
                true
            }
            None => {
                tracing::debug!(
                    correlation_id = %message.correlation_id,
                    kind = message.kind_name(),
                    from = %message.from,
                    "Message for unknown conversation, dropping"
                );
                false
            }
        }
    }

    /// Runs one sweep pass.
    ///
    /// Ended conversations are removed. Over-age conversations are failed on
    /// spawned tasks, so a slow observer never holds up the sweep, and are
    /// removed by a later pass once they have ended.
    pub async fn sweep(&self) -> SweepReport {
        let max_age = self.config.conversation_timeout;
        let pass = self.registry.collect(max_age).await;

        for conversation in &pass.expired {
            tracing::warn!(
                conversation_id = %conversation.id(),
                age = ?conversation.age(),
                "Conversation exceeded its lifetime, failing it"
            );
            let conversation = conversation.clone();
            tokio::spawn(async move {
                conversation
                    .fail_conversation(format!(
                        "Failing conversation: exceeded the time limit of {} ms",
                        max_age.as_millis()
                    ))
                    .await;
            });
        }

        let report = SweepReport {
            removed: pass.removed.len(),
            expired: pass.expired.len(),
        };
        if report != SweepReport::default() {
            tracing::debug!(removed = report.removed, expired = report.expired, "Sweep pass");
        }
        report
    }

    /// Run the sweep loop until shutdown signal is received.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = time::interval(self.config.cleanup_interval);

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        return;
                    }
                }

                _ = interval.tick() => {
                    self.sweep().await;
                }
            }
        }
    }

    /// Subscribes to the inbox and spawns the sweep loop.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn start(self: &Arc<Self>) {
        self.bus.add_listener(&self.receiver, self.clone());

        let mediator = self.clone();
        let shutdown = self.shutdown.subscribe();
        let handle = tokio::spawn(async move { mediator.run(shutdown).await });
        let previous = self
            .sweeper
            .lock()
            .expect("ConversationMediator: sweeper lock poisoned")
            .replace(handle);
        if let Some(previous) = previous {
            previous.abort();
        }

        tracing::info!(
            receiver = %self.receiver,
            interval = ?self.config.cleanup_interval,
            "Conversation mediator started"
        );
    }

    /// Unsubscribes from the inbox and stops the sweep loop.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub async fn shutdown(&self) {
        self.bus.remove_listener(&self.receiver, self.name());
        self.shutdown.send_replace(true);

        let handle = self
            .sweeper
            .lock()
            .expect("ConversationMediator: sweeper lock poisoned")
            .take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "Sweep loop ended abnormally");
            }
        }
        tracing::info!(receiver = %self.receiver, "Conversation mediator stopped");
    }
}

#[async_trait]
impl MessageListener for ConversationMediator {
    async fn on_message(&self, message: Message) -> Result<(), DomainError> {
        self.route(message).await;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "ConversationMediator"
    }
}

//! ConversationRegistry - Correlation id to live conversation.
//!
//! The only structure shared across conversations. Lookups clone the `Arc`
//! and release the lock before the caller touches the conversation, so no
//! conversation ever runs while the registry is locked.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::domain::conversation::Conversation;
use crate::domain::foundation::{ConversationId, DomainError, ErrorCode};

struct RegistryEntry {
    conversation: Arc<Conversation>,
    failure_dispatched: bool,
}

/// Result of one registry pass.
#[derive(Debug, Default)]
pub struct RegistryPass {
    /// Ended conversations taken out of the registry.
    pub removed: Vec<ConversationId>,
    /// Over-age conversations to fail, each returned by exactly one pass.
    pub expired: Vec<Arc<Conversation>>,
}

#[derive(Default)]
pub struct ConversationRegistry {
    entries: RwLock<HashMap<ConversationId, RegistryEntry>>,
}

impl ConversationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a conversation under its correlation id.
    ///
    /// # Errors
    ///
    /// `InternalError` if the id is already registered.
    pub async fn insert(&self, conversation: Arc<Conversation>) -> Result<(), DomainError> {
        let mut entries = self.entries.write().await;
        let id = conversation.id().clone();
        if entries.contains_key(&id) {
            return Err(DomainError::new(
                ErrorCode::InternalError,
                format!("Conversation {} is already registered", id),
            ));
        }
        entries.insert(
            id,
            RegistryEntry {
                conversation,
                failure_dispatched: false,
            },
        );
        Ok(())
    }

    pub async fn get(&self, id: &ConversationId) -> Option<Arc<Conversation>> {
        self.entries
            .read()
            .await
            .get(id)
            .map(|entry| entry.conversation.clone())
    }

    pub async fn remove(&self, id: &ConversationId) -> Option<Arc<Conversation>> {
        self.entries
            .write()
            .await
            .remove(id)
            .map(|entry| entry.conversation)
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Removes ended conversations and collects those older than `max_age`
    /// whose failure has not been dispatched yet.
    pub async fn collect(&self, max_age: Duration) -> RegistryPass {
        let mut entries = self.entries.write().await;
        let mut pass = RegistryPass::default();

        entries.retain(|id, entry| {
            if entry.conversation.has_ended() {
                pass.removed.push(id.clone());
                return false;
            }
            if !entry.failure_dispatched && entry.conversation.age() > max_age {
                entry.failure_dispatched = true;
                pass.expired.push(entry.conversation.clone());
            }
            true
        });

        pass
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{InMemoryMessageBus, TokioTimerService};
    use crate::domain::conversation::{
        ConversationContext, ConversationSettings, OperationKind, OperationRequest,
        SelectionPolicy,
    };
    use crate::domain::foundation::{CollectionId, ComponentId, Destination};

    fn conversation() -> Arc<Conversation> {
        let settings = ConversationSettings::new(
            ComponentId::new("client").unwrap(),
            Destination::new("books.topic").unwrap(),
            Destination::new("client.inbox").unwrap(),
        );
        let context = ConversationContext::new(
            settings,
            Arc::new(InMemoryMessageBus::new()),
            Arc::new(TokioTimerService::new()),
        );
        let request = OperationRequest::new(
            OperationKind::GetStatus,
            CollectionId::new("books").unwrap(),
            vec![ComponentId::new("p1").unwrap()],
        );
        let selector = SelectionPolicy::AllContributors.selector_for(&request.contributors);
        Conversation::new(context, request, selector, None)
    }

    #[tokio::test]
    async fn insert_then_get() {
        let registry = ConversationRegistry::new();
        let c = conversation();

        registry.insert(c.clone()).await.unwrap();

        assert!(registry.get(c.id()).await.is_some());
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn duplicate_insert_is_rejected() {
        let registry = ConversationRegistry::new();
        let c = conversation();
        registry.insert(c.clone()).await.unwrap();

        let err = registry.insert(c).await.unwrap_err();

        assert_eq!(err.code, ErrorCode::InternalError);
    }

    #[tokio::test]
    async fn collect_removes_ended_conversations() {
        let registry = ConversationRegistry::new();
        let c = conversation();
        registry.insert(c.clone()).await.unwrap();
        c.fail_conversation("done").await;

        let pass = registry.collect(Duration::from_secs(60)).await;

        assert_eq!(pass.removed, vec![c.id().clone()]);
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn expired_conversation_is_returned_once() {
        let registry = ConversationRegistry::new();
        let c = conversation();
        registry.insert(c.clone()).await.unwrap();

        let first = registry.collect(Duration::ZERO).await;
        let second = registry.collect(Duration::ZERO).await;

        assert_eq!(first.expired.len(), 1);
        assert!(second.expired.is_empty());
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn young_conversation_is_kept() {
        let registry = ConversationRegistry::new();
        registry.insert(conversation()).await.unwrap();

        let pass = registry.collect(Duration::from_secs(3600)).await;

        assert!(pass.removed.is_empty());
        assert!(pass.expired.is_empty());
    }
}

//! ConversationClient - Entry point for callers performing collection operations.
//!
//! Builds conversations from requests, registers them with the mediator
//! before they send anything, and starts them in either callback style or
//! blocking style.

use std::sync::Arc;

use super::mediator::ConversationMediator;
use crate::domain::conversation::{
    ContributorResult, Conversation, ConversationContext, OperationKind, OperationRequest,
    SelectionPolicy,
};
use crate::domain::foundation::{CollectionId, ComponentId, DomainError};
use crate::ports::OperationEventHandler;

pub struct ConversationClient {
    context: ConversationContext,
    mediator: Arc<ConversationMediator>,
    collection_id: CollectionId,
    contributors: Vec<ComponentId>,
}

impl ConversationClient {
    pub fn new(
        context: ConversationContext,
        mediator: Arc<ConversationMediator>,
        collection_id: CollectionId,
        contributors: Vec<ComponentId>,
    ) -> Self {
        Self {
            context,
            mediator,
            collection_id,
            contributors,
        }
    }

    pub fn mediator(&self) -> &Arc<ConversationMediator> {
        &self.mediator
    }

    /// A request for `operation` against the client's collection and all of
    /// its known contributors.
    pub fn request(&self, operation: OperationKind) -> OperationRequest {
        OperationRequest::new(
            operation,
            self.collection_id.clone(),
            self.contributors.clone(),
        )
    }

    /// Creates, registers and starts a conversation; events go to `observer`.
    ///
    /// # Errors
    ///
    /// Returns the error of `Conversation::start`, or a registry error.
    pub async fn start_conversation(
        &self,
        request: OperationRequest,
        policy: &SelectionPolicy,
        observer: Option<Arc<dyn OperationEventHandler>>,
    ) -> Result<Arc<Conversation>, DomainError> {
        let conversation = self.create(request, policy, observer).await?;
        conversation.start().await?;
        Ok(conversation)
    }

    /// Performs the operation and waits for the per-contributor results.
    ///
    /// # Errors
    ///
    /// - `NoContributorSelected` if no contributor could perform it
    /// - `OperationFailed` if the conversation failed
    /// - `ConversationTimeout` if it did not finish in time
    pub async fn perform(
        &self,
        request: OperationRequest,
        policy: &SelectionPolicy,
    ) -> Result<Vec<ContributorResult>, DomainError> {
        let conversation = self.create(request, policy, None).await?;
        conversation.start_and_wait().await
    }

    async fn create(
        &self,
        request: OperationRequest,
        policy: &SelectionPolicy,
        observer: Option<Arc<dyn OperationEventHandler>>,
    ) -> Result<Arc<Conversation>, DomainError> {
        let selector = policy.selector_for(&request.contributors);
        let conversation = Conversation::new(self.context.clone(), request, selector, observer);
        self.mediator.register(conversation.clone()).await?;
        Ok(conversation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{
        CollectingEventHandler, InMemoryMessageBus, SimulatedContributor, TokioTimerService,
    };
    use crate::application::MediatorConfig;
    use crate::domain::conversation::{ConversationSettings, OperationEventType};
    use crate::domain::foundation::{Destination, ErrorCode};
    use std::time::Duration;

    fn destination(name: &str) -> Destination {
        Destination::new(name).unwrap()
    }

    fn client(bus: &Arc<InMemoryMessageBus>, contributors: &[&str]) -> ConversationClient {
        let settings = ConversationSettings::new(
            ComponentId::new("client").unwrap(),
            destination("books.topic"),
            destination("client.inbox"),
        )
        .with_identification_timeout(Duration::from_millis(100))
        .with_conversation_timeout(Duration::from_secs(2));
        let context = ConversationContext::new(settings, bus.clone(), Arc::new(TokioTimerService::new()));
        let mediator = Arc::new(ConversationMediator::new(
            bus.clone(),
            destination("client.inbox"),
            MediatorConfig::default(),
        ));
        mediator.start();
        ConversationClient::new(
            context,
            mediator,
            CollectionId::new("books").unwrap(),
            contributors
                .iter()
                .map(|c| ComponentId::new(*c).unwrap())
                .collect(),
        )
    }

    fn attach_pillar(bus: &Arc<InMemoryMessageBus>, name: &str) {
        let pillar = Arc::new(SimulatedContributor::new(
            ComponentId::new(name).unwrap(),
            destination(&format!("{}.queue", name)),
            bus.clone(),
        ));
        pillar.attach(&destination("books.topic"));
    }

    #[tokio::test]
    async fn request_targets_all_known_contributors() {
        let bus = Arc::new(InMemoryMessageBus::new());
        let client = client(&bus, &["p1", "p2"]);

        let request = client.request(OperationKind::GetFileIds);

        assert_eq!(request.contributors.len(), 2);
        assert_eq!(request.collection_id.as_str(), "books");
    }

    #[tokio::test]
    async fn start_conversation_registers_before_starting() {
        let bus = Arc::new(InMemoryMessageBus::new());
        let client = client(&bus, &["p1"]);
        attach_pillar(&bus, "p1");
        let events = Arc::new(CollectingEventHandler::new());

        let conversation = client
            .start_conversation(
                client.request(OperationKind::GetChecksums),
                &SelectionPolicy::AllContributors,
                Some(events.clone()),
            )
            .await
            .unwrap();

        let terminal = events.wait_for_terminal(Duration::from_secs(1)).await;
        assert_eq!(
            terminal.map(|e| e.event_type()),
            Some(OperationEventType::Complete)
        );
        assert!(conversation.has_ended());
    }

    #[tokio::test]
    async fn perform_returns_results() {
        let bus = Arc::new(InMemoryMessageBus::new());
        let client = client(&bus, &["p1", "p2"]);
        attach_pillar(&bus, "p1");
        attach_pillar(&bus, "p2");

        let results = client
            .perform(
                client.request(OperationKind::GetChecksums),
                &SelectionPolicy::AllContributors,
            )
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
    }

    #[tokio::test]
    async fn perform_without_pillars_fails() {
        let bus = Arc::new(InMemoryMessageBus::new());
        let client = client(&bus, &["p1"]);

        let err = client
            .perform(
                client.request(OperationKind::GetFile).with_file_id("f"),
                &SelectionPolicy::FirstPositive,
            )
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::NoContributorSelected);
        assert!(err.message.contains("No contributor found"));
    }
}

//! Builds lifecycle events for one conversation and hands them to its observer.
//!
//! Also accumulates the per-contributor results and failures of the
//! performing phase, which the terminal event carries.
//!
//! Events are built while the conversation's state is locked but delivered
//! after the lock is released, through an [`EventDispatcher`]. An observer may
//! therefore call back into its own conversation.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use super::{
    ContributorFailure, ContributorResult, ConversationOutcome, OperationEvent,
    OperationEventKind, OperationKind, OperationRequest,
};
use crate::domain::foundation::{CollectionId, ComponentId, ConversationId, Timestamp};
use crate::ports::OperationEventHandler;

/// Renders failures as the human-readable part of a `Failed` event.
pub fn describe_failures(failures: &[ContributorFailure]) -> String {
    let mut text = String::from("Failed operation. Cause(s):");
    for failure in failures {
        text.push_str("\n  ");
        text.push_str(&failure.to_string());
    }
    text
}

/// Ordered outbox of one conversation's events.
///
/// Only one task delivers at a time. A task that finds delivery in progress
/// leaves its events to the running drain, which keeps going until the queue
/// is empty.
pub struct EventDispatcher {
    observer: Option<Arc<dyn OperationEventHandler>>,
    queue: Mutex<VecDeque<OperationEvent>>,
    delivering: AtomicBool,
}

impl EventDispatcher {
    pub fn new(observer: Option<Arc<dyn OperationEventHandler>>) -> Self {
        Self {
            observer,
            queue: Mutex::new(VecDeque::new()),
            delivering: AtomicBool::new(false),
        }
    }

    /// Queues `event` for delivery. Dropped if there is no observer.
    pub fn enqueue(&self, event: OperationEvent) {
        if self.observer.is_none() {
            return;
        }
        self.lock_queue().push_back(event);
    }

    /// Number of events waiting for delivery.
    pub fn pending(&self) -> usize {
        self.lock_queue().len()
    }

    /// Delivers queued events in order, unless another task already is.
    pub async fn dispatch(&self) {
        let Some(observer) = &self.observer else {
            return;
        };

        loop {
            if self
                .delivering
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
            {
                return;
            }

            loop {
                let next = self.lock_queue().pop_front();
                let Some(event) = next else {
                    break;
                };
                let conversation_id = event.conversation_id.clone();
                if let Err(e) = observer.handle_event(event).await {
                    tracing::warn!(
                        %conversation_id,
                        observer = observer.name(),
                        error = %e,
                        "Event observer failed"
                    );
                }
            }

            self.delivering.store(false, Ordering::Release);
            // An event queued between the last pop and the release above
            // found delivery busy; pick it up here.
            if self.lock_queue().is_empty() {
                return;
            }
        }
    }

    fn lock_queue(&self) -> std::sync::MutexGuard<'_, VecDeque<OperationEvent>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub struct EventMonitor {
    conversation_id: ConversationId,
    collection_id: CollectionId,
    operation: OperationKind,
    file_id: Option<String>,
    dispatcher: Arc<EventDispatcher>,
    results: Vec<ContributorResult>,
    failures: Vec<ContributorFailure>,
}

impl EventMonitor {
    pub fn new(
        conversation_id: ConversationId,
        request: &OperationRequest,
        dispatcher: Arc<EventDispatcher>,
    ) -> Self {
        Self {
            conversation_id,
            collection_id: request.collection_id.clone(),
            operation: request.operation,
            file_id: request.file_id.clone(),
            dispatcher,
            results: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub fn results(&self) -> &[ContributorResult] {
        &self.results
    }

    pub fn failures(&self) -> &[ContributorFailure] {
        &self.failures
    }

    pub fn identify_request_sent(&mut self, info: String) {
        self.notify(OperationEventKind::IdentifyRequestSent, info);
    }

    pub fn component_identified(&mut self, contributor: ComponentId) {
        let info = format!("{} identified for {}", contributor, self.operation);
        self.notify(OperationEventKind::ComponentIdentified { contributor }, info);
    }

    pub fn identify_timeout(&mut self, unresponsive: Vec<ComponentId>) {
        let mut info = String::from("Time has run out for identifying contributors");
        if !unresponsive.is_empty() {
            let names: Vec<&str> = unresponsive.iter().map(|id| id.as_str()).collect();
            info.push_str(&format!(
                ". The following contributors didn't respond: {}",
                names.join(", ")
            ));
        }
        self.notify(OperationEventKind::IdentifyTimeout { unresponsive }, info);
    }

    /// Emits `IdentificationComplete` and starts a clean failure list for
    /// the performing phase.
    pub fn identification_complete(&mut self, selected: Vec<ComponentId>) {
        self.failures.clear();
        let names: Vec<&str> = selected.iter().map(|id| id.as_str()).collect();
        let info = format!("Selected contributors: {}", names.join(", "));
        self.notify(OperationEventKind::IdentificationComplete { selected }, info);
    }

    pub fn request_sent(&mut self, contributor: ComponentId) {
        let info = format!("Sent {} request to {}", self.operation, contributor);
        self.notify(OperationEventKind::RequestSent { contributor }, info);
    }

    pub fn progress(&mut self, contributor: ComponentId, info: String) {
        self.notify(OperationEventKind::Progress { contributor }, info);
    }

    pub fn component_complete(&mut self, result: ContributorResult) {
        self.results.push(result.clone());
        let info = result.info.clone();
        self.notify(OperationEventKind::ComponentComplete { result }, info);
    }

    pub fn component_failed(&mut self, failure: ContributorFailure) {
        self.failures.push(failure.clone());
        let info = failure.to_string();
        self.notify(OperationEventKind::ComponentFailed { failure }, info);
    }

    pub fn warning(&mut self, contributor: Option<ComponentId>, info: String) {
        self.notify(OperationEventKind::Warning { contributor }, info);
    }

    /// Emits `Complete` with every result collected so far.
    pub fn complete(&mut self) -> ConversationOutcome {
        let results = self.results.clone();
        let info = format!(
            "{} completed by {} contributor(s)",
            self.operation,
            results.len()
        );
        self.notify(
            OperationEventKind::Complete {
                results: results.clone(),
            },
            info,
        );
        ConversationOutcome::Completed { results }
    }

    /// Emits `Failed` with every failure collected so far.
    pub fn operation_failed(&mut self, info: String) -> ConversationOutcome {
        let failures = self.emit_failed(info.clone());
        ConversationOutcome::Failed { info, failures }
    }

    /// Emits `Failed` for an identification that selected nobody.
    ///
    /// The identify-phase failures explain why, so they are kept here.
    pub fn no_contributor(&mut self, info: String) -> ConversationOutcome {
        let failures = self.emit_failed(info.clone());
        ConversationOutcome::NoContributor { info, failures }
    }

    fn emit_failed(&self, info: String) -> Vec<ContributorFailure> {
        let failures = self.failures.clone();
        self.notify(
            OperationEventKind::Failed {
                failures: failures.clone(),
            },
            info,
        );
        failures
    }

    fn notify(&self, kind: OperationEventKind, info: String) {
        let event = OperationEvent {
            conversation_id: self.conversation_id.clone(),
            collection_id: self.collection_id.clone(),
            operation: self.operation,
            file_id: self.file_id.clone(),
            info,
            occurred_at: Timestamp::now(),
            kind,
        };
        tracing::debug!(conversation_id = %self.conversation_id, %event, "Operation event");
        self.dispatcher.enqueue(event);
    }
}

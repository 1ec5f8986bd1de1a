//! Conversation aggregate - one identify-then-perform exchange with pillars.
//!
//! # Lifecycle
//!
//! ```text
//! Created --start--> Identifying --selection--> Performing --all answered--> Finished
//!                        |                          |
//!                        +--- empty selection ------+--- fail_conversation -->  Finished
//! ```
//!
//! Every entry point (`start`, `on_message`, timer expiry, `fail_conversation`)
//! runs under the conversation's own async mutex, so status bookkeeping and
//! the phase transition happen atomically. Events are queued while the lock is
//! held and handed to the observer in order once it is released, so an
//! observer may call back into the conversation. The terminal outcome is
//! published on a `watch` channel, so waiters never hold the lock.

use futures::FutureExt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use tokio::sync::{watch, Mutex};

use super::monitor::{describe_failures, EventDispatcher};
use super::{
    ContributorFailure, ContributorOutcome, ContributorRecord, ContributorResult,
    ContributorSelector, ConversationContext, ConversationOutcome, ConversationPhase,
    EventMonitor, FailureCause, Message, MessageBody, OperationKind, OperationRequest,
    ResponseOutcome, ResponseStatus, SuccessPolicy,
};
use crate::domain::foundation::{
    ComponentId, ConversationId, DomainError, ErrorCode, StateMachine, Timestamp,
};
use crate::ports::{OperationEventHandler, TimerHandle};

/// Mutable part of a conversation, guarded by its mutex.
struct ConversationState {
    phase: ConversationPhase,
    status: ResponseStatus,
    selector: Box<dyn ContributorSelector>,
    selected: Vec<ContributorRecord>,
    monitor: EventMonitor,
    timer: Option<TimerHandle>,
}

pub struct Conversation {
    id: ConversationId,
    request: OperationRequest,
    context: ConversationContext,
    created_at: Timestamp,
    started: Instant,
    ended: AtomicBool,
    outcome: watch::Sender<Option<ConversationOutcome>>,
    state: Mutex<ConversationState>,
    events: Arc<EventDispatcher>,
    this: Weak<Conversation>,
}

impl Conversation {
    /// Creates a conversation in the `Created` phase with a fresh id.
    pub fn new(
        context: ConversationContext,
        request: OperationRequest,
        selector: Box<dyn ContributorSelector>,
        observer: Option<Arc<dyn OperationEventHandler>>,
    ) -> Arc<Self> {
        let id = ConversationId::new();
        let events = Arc::new(EventDispatcher::new(observer));
        let monitor = EventMonitor::new(id.clone(), &request, events.clone());
        let (outcome, _) = watch::channel(None);

        Arc::new_cyclic(|this| Self {
            id,
            request,
            context,
            created_at: Timestamp::now(),
            started: Instant::now(),
            ended: AtomicBool::new(false),
            outcome,
            state: Mutex::new(ConversationState {
                phase: ConversationPhase::Created,
                status: ResponseStatus::new(),
                selector,
                selected: Vec::new(),
                monitor,
                timer: None,
            }),
            events,
            this: this.clone(),
        })
    }

    pub fn id(&self) -> &ConversationId {
        &self.id
    }

    pub fn operation(&self) -> OperationKind {
        self.request.operation
    }

    pub fn request(&self) -> &OperationRequest {
        &self.request
    }

    pub fn created_at(&self) -> &Timestamp {
        &self.created_at
    }

    /// Time since the conversation was created.
    pub fn age(&self) -> Duration {
        self.started.elapsed()
    }

    /// True once a terminal event has been emitted.
    pub fn has_ended(&self) -> bool {
        self.ended.load(Ordering::SeqCst)
    }

    pub async fn phase(&self) -> ConversationPhase {
        self.state.lock().await.phase
    }

    /// The terminal outcome, once there is one.
    pub fn outcome(&self) -> Option<ConversationOutcome> {
        self.outcome.borrow().clone()
    }

    /// Enters `Identifying` and broadcasts the identify request.
    ///
    /// Returns immediately; the outcome is delivered to the observer and
    /// through `wait_for_outcome`.
    ///
    /// # Errors
    ///
    /// - `ConversationAlreadyStarted` if called more than once
    /// - `MessageBusError` if the identify request cannot be sent; the
    ///   conversation has failed by then
    pub async fn start(&self) -> Result<(), DomainError> {
        let started = self.begin().await;
        self.events.dispatch().await;
        started
    }

    async fn begin(&self) -> Result<(), DomainError> {
        let mut state = self.state.lock().await;
        if state.phase != ConversationPhase::Created {
            return Err(DomainError::new(
                ErrorCode::ConversationAlreadyStarted,
                format!("Conversation {} has already been started", self.id),
            ));
        }
        state.phase = state.phase.transition_to(ConversationPhase::Identifying)?;
        state.status.register(self.request.contributors.iter().cloned());

        tracing::info!(
            conversation_id = %self.id,
            operation = %self.request.operation,
            contributors = self.request.contributors.len(),
            selector = state.selector.name(),
            "Starting conversation"
        );

        if state.status.is_complete() {
            self.complete_identification(&mut state).await;
            return Ok(());
        }

        let identify = self.identify_request();
        let destination = identify.to.clone();
        if let Err(e) = self.context.bus.send(identify).await {
            let info = format!("Unable to send identify request: {}", e);
            self.finish_failed(&mut state, info).await;
            return Err(e.into());
        }

        state
            .monitor
            .identify_request_sent(format!(
                "Identifying contributors for {} on {}",
                self.request.operation, destination
            ));
        let timeout = self.context.settings.identification_timeout;
        self.arm_timer(&mut state, ConversationPhase::Identifying, timeout);
        Ok(())
    }

    /// Starts the conversation and waits for its outcome, for at most the
    /// configured conversation timeout.
    ///
    /// # Errors
    ///
    /// - `NoContributorSelected` if identification selected nobody
    /// - `OperationFailed` carrying the aggregated failure description
    /// - `ConversationTimeout` if no outcome arrived in time; the
    ///   conversation is failed before returning
    pub async fn start_and_wait(&self) -> Result<Vec<ContributorResult>, DomainError> {
        self.start().await?;

        let timeout = self.context.settings.conversation_timeout;
        match self.wait_for_outcome(timeout).await {
            Some(ConversationOutcome::Completed { results }) => Ok(results),
            Some(ConversationOutcome::Failed { info, failures }) => Err(DomainError::new(
                ErrorCode::OperationFailed,
                info,
            )
            .with_detail("conversation_id", self.id.as_str())
            .with_detail("failed_contributors", failures.len().to_string())),
            Some(ConversationOutcome::NoContributor { info, failures }) => Err(DomainError::new(
                ErrorCode::NoContributorSelected,
                info,
            )
            .with_detail("conversation_id", self.id.as_str())
            .with_detail("declined_contributors", failures.len().to_string())),
            None => {
                self.fail_conversation(format!(
                    "No result received within {} ms",
                    timeout.as_millis()
                ))
                .await;
                Err(DomainError::new(
                    ErrorCode::ConversationTimeout,
                    format!("Conversation {} timed out", self.id),
                )
                .with_detail("timeout_ms", timeout.as_millis().to_string()))
            }
        }
    }

    /// Waits until the conversation has an outcome; `None` on timeout.
    pub async fn wait_for_outcome(&self, timeout: Duration) -> Option<ConversationOutcome> {
        let mut receiver = self.outcome.subscribe();
        let outcome = match tokio::time::timeout(timeout, receiver.wait_for(Option::is_some)).await {
            Ok(Ok(outcome)) => (*outcome).clone(),
            _ => None,
        };
        outcome
    }

    /// Handles one inbound message correlated to this conversation.
    pub async fn on_message(&self, message: Message) {
        self.receive(message).await;
        self.events.dispatch().await;
    }

    async fn receive(&self, message: Message) {
        let mut state = self.state.lock().await;

        match (state.phase, &message.body) {
            (ConversationPhase::Created | ConversationPhase::Finished, _) => {
                tracing::debug!(
                    conversation_id = %self.id,
                    phase = %state.phase,
                    kind = message.kind_name(),
                    from = %message.from,
                    "Conversation is not active, dropping message"
                );
            }
            (_, MessageBody::IdentifyRequest { .. } | MessageBody::OperationRequest { .. }) => {
                tracing::debug!(
                    conversation_id = %self.id,
                    kind = message.kind_name(),
                    from = %message.from,
                    "Ignoring request message"
                );
            }
            (ConversationPhase::Identifying, MessageBody::IdentifyResponse { .. }) => {
                self.handle_identify_response(&mut state, message).await;
            }
            (ConversationPhase::Identifying, _) => {
                tracing::warn!(
                    conversation_id = %self.id,
                    kind = message.kind_name(),
                    from = %message.from,
                    "Out-of-sequence operation response during identification"
                );
            }
            (ConversationPhase::Performing, MessageBody::IdentifyResponse { .. }) => {
                tracing::debug!(
                    conversation_id = %self.id,
                    from = %message.from,
                    "Late identify response after selection, dropping"
                );
            }
            (ConversationPhase::Performing, MessageBody::ProgressResponse { .. }) => {
                self.handle_progress(&mut state, message).await;
            }
            (ConversationPhase::Performing, MessageBody::FinalResponse { .. }) => {
                self.handle_final_response(&mut state, message).await;
            }
        }
    }

    /// Fires when the timer armed for `phase` expires.
    ///
    /// A timer that outlived its phase does nothing.
    pub async fn on_timeout(&self, phase: ConversationPhase) {
        self.expire(phase).await;
        self.events.dispatch().await;
    }

    async fn expire(&self, phase: ConversationPhase) {
        let mut state = self.state.lock().await;
        if state.phase != phase {
            tracing::debug!(
                conversation_id = %self.id,
                timer_phase = %phase,
                phase = %state.phase,
                "Ignoring stale timer"
            );
            return;
        }
        // This is the timer's own task; it must not be aborted from here.
        state.timer = None;

        match phase {
            ConversationPhase::Identifying => {
                let unresponsive = state.status.force_remaining(ContributorOutcome::Failure);
                tracing::info!(
                    conversation_id = %self.id,
                    unresponsive = unresponsive.len(),
                    "Identification timed out"
                );
                state.monitor.identify_timeout(unresponsive);
                self.complete_identification(&mut state).await;
            }
            ConversationPhase::Performing => {
                let outstanding = state.status.force_remaining(ContributorOutcome::Failure);
                tracing::info!(
                    conversation_id = %self.id,
                    outstanding = outstanding.len(),
                    "Operation timed out"
                );
                for contributor in outstanding {
                    let info = format!(
                        "Time has run out waiting for {} to finish {}",
                        contributor, self.request.operation
                    );
                    state
                        .monitor
                        .component_failed(ContributorFailure {
                            contributor,
                            cause: FailureCause::Timeout,
                            info,
                        });
                }
                self.finish_operation(&mut state).await;
            }
            ConversationPhase::Created | ConversationPhase::Finished => {}
        }
    }

    /// Forces the conversation to `Failed` with `reason` as failure info.
    ///
    /// Returns false, and does nothing, if it has already finished.
    pub async fn fail_conversation(&self, reason: impl Into<String>) -> bool {
        let failed = self.force_fail(reason.into()).await;
        self.events.dispatch().await;
        failed
    }

    async fn force_fail(&self, reason: String) -> bool {
        let mut state = self.state.lock().await;
        if state.phase.is_terminal() {
            tracing::debug!(conversation_id = %self.id, "Conversation already finished");
            return false;
        }
        tracing::warn!(conversation_id = %self.id, phase = %state.phase, %reason, "Failing conversation");
        self.finish_failed(&mut state, reason).await;
        true
    }

    async fn handle_identify_response(&self, state: &mut ConversationState, message: Message) {
        let sender = message.from.clone();
        if !state.status.is_expected(&sender) {
            tracing::debug!(
                conversation_id = %self.id,
                from = %sender,
                "Ignoring identify response from irrelevant component"
            );
            return;
        }
        let Some(record) = ContributorRecord::from_identify_response(&message) else {
            return;
        };
        let code = record.response.code;

        match code.outcome() {
            ResponseOutcome::Positive => {
                if !state.status.record_success(&sender) {
                    return;
                }
                state.selector.consider(record);
                state.monitor.component_identified(sender);
            }
            ResponseOutcome::Negative | ResponseOutcome::Failure => {
                if !state.status.record_failure(&sender) {
                    return;
                }
                let info = record.response.describe();
                state.selector.consider(record);
                state
                    .monitor
                    .component_failed(ContributorFailure {
                        contributor: sender,
                        cause: FailureCause::Response(code),
                        info,
                    });
            }
            ResponseOutcome::Progress => {
                state
                    .monitor
                    .warning(
                        Some(sender),
                        format!("Unexpected {} in identify response", code),
                    );
                return;
            }
        }

        if state.status.is_complete() || state.selector.is_satisfied() {
            self.complete_identification(state).await;
        }
    }

    async fn handle_progress(&self, state: &mut ConversationState, message: Message) {
        let MessageBody::ProgressResponse { response, .. } = &message.body else {
            return;
        };
        if !state.status.is_pending(&message.from) {
            tracing::debug!(
                conversation_id = %self.id,
                from = %message.from,
                "Ignoring progress from component that is not pending"
            );
            return;
        }
        state
            .monitor
            .progress(message.from.clone(), response.describe());
    }

    async fn handle_final_response(&self, state: &mut ConversationState, message: Message) {
        let MessageBody::FinalResponse { response, payload } = message.body else {
            return;
        };
        let sender = message.from;
        if !state.status.is_expected(&sender) {
            tracing::debug!(
                conversation_id = %self.id,
                from = %sender,
                "Ignoring final response from component that was not selected"
            );
            return;
        }

        match response.code.outcome() {
            ResponseOutcome::Positive => {
                if !state.status.record_success(&sender) {
                    return;
                }
                state
                    .monitor
                    .component_complete(ContributorResult {
                        contributor: sender,
                        info: response.describe(),
                        payload,
                    });
            }
            ResponseOutcome::Negative | ResponseOutcome::Failure => {
                if !state.status.record_failure(&sender) {
                    return;
                }
                state
                    .monitor
                    .component_failed(ContributorFailure {
                        contributor: sender,
                        cause: FailureCause::Response(response.code),
                        info: response.describe(),
                    });
            }
            ResponseOutcome::Progress => {
                state
                    .monitor
                    .warning(
                        Some(sender),
                        format!("Unexpected {} in final response", response.code),
                    );
                return;
            }
        }

        if state.status.is_complete() {
            self.finish_operation(state).await;
        }
    }

    /// Leaves `Identifying`: either fails for lack of contributors or sends
    /// the operation request to every selected contributor.
    async fn complete_identification(&self, state: &mut ConversationState) {
        cancel_timer(state);

        let selected = state.selector.selection();
        if selected.is_empty() {
            let mut info = format!("No contributor found for {}", self.request.operation);
            if !state.monitor.failures().is_empty() {
                info.push_str(". ");
                info.push_str(&describe_failures(state.monitor.failures()));
            }
            cancel_timer(state);
            state.phase = ConversationPhase::Finished;
            let outcome = state.monitor.no_contributor(info);
            tracing::info!(
                conversation_id = %self.id,
                age = ?self.age(),
                "No contributor selected, conversation failed"
            );
            self.publish(outcome);
            return;
        }

        state.phase = match state.phase.transition_to(ConversationPhase::Performing) {
            Ok(phase) => phase,
            Err(e) => {
                tracing::error!(conversation_id = %self.id, error = %e, "Cannot start performing");
                return;
            }
        };

        let ids: Vec<ComponentId> = selected.iter().map(|r| r.contributor.clone()).collect();
        tracing::info!(
            conversation_id = %self.id,
            selected = ids.len(),
            "Identification complete"
        );
        state.monitor.identification_complete(ids.clone());
        state.status.register(ids);
        state.selected = selected;

        for record in state.selected.clone() {
            let request = self.operation_request(&record);
            if let Err(e) = self.context.bus.send(request).await {
                let info = format!(
                    "Unable to send {} request to {}: {}",
                    self.request.operation, record.contributor, e
                );
                self.finish_failed(state, info).await;
                return;
            }
            state.monitor.request_sent(record.contributor);
        }

        let timeout = self.operation_timeout(&state.selected);
        self.arm_timer(state, ConversationPhase::Performing, timeout);
    }

    /// Leaves `Performing` once every selected contributor has a result.
    async fn finish_operation(&self, state: &mut ConversationState) {
        cancel_timer(state);

        let succeeded = state.status.succeeded().len();
        let failed = state.status.failed().len();
        let success = match self.request.success_policy {
            SuccessPolicy::AllSelected => succeeded > 0 && failed == 0,
            SuccessPolicy::AnySelected => succeeded > 0,
        };

        if !success {
            let info = describe_failures(state.monitor.failures());
            self.finish_failed(state, info).await;
            return;
        }

        state.phase = ConversationPhase::Finished;
        let outcome = state.monitor.complete();
        tracing::info!(
            conversation_id = %self.id,
            succeeded,
            failed,
            age = ?self.age(),
            "Conversation completed"
        );
        self.publish(outcome);
    }

    async fn finish_failed(&self, state: &mut ConversationState, info: String) {
        cancel_timer(state);
        if state.phase.is_terminal() {
            return;
        }
        state.phase = ConversationPhase::Finished;
        let outcome = state.monitor.operation_failed(info);
        tracing::info!(
            conversation_id = %self.id,
            age = ?self.age(),
            "Conversation failed"
        );
        self.publish(outcome);
    }

    fn publish(&self, outcome: ConversationOutcome) {
        self.outcome.send_replace(Some(outcome));
        self.ended.store(true, Ordering::SeqCst);
    }

    fn arm_timer(&self, state: &mut ConversationState, phase: ConversationPhase, delay: Duration) {
        cancel_timer(state);
        let this = self.this.clone();
        let task = async move {
            if let Some(conversation) = this.upgrade() {
                conversation.on_timeout(phase).await;
            }
        }
        .boxed();
        tracing::debug!(
            conversation_id = %self.id,
            %phase,
            ?delay,
            "Arming phase timer"
        );
        state.timer = Some(self.context.timers.schedule(delay, task));
    }

    /// Client override, else the slowest selected estimate, else the default.
    fn operation_timeout(&self, selected: &[ContributorRecord]) -> Duration {
        self.request
            .operation_timeout
            .or_else(|| selected.iter().filter_map(|r| r.time_estimate).max())
            .unwrap_or(self.context.settings.operation_timeout)
    }

    fn identify_request(&self) -> Message {
        let settings = &self.context.settings;
        Message {
            correlation_id: self.id.clone(),
            collection_id: self.request.collection_id.clone(),
            operation: self.request.operation,
            from: settings.client_id.clone(),
            to: settings.collection_destination.clone(),
            reply_to: settings.receiver_destination.clone(),
            body: MessageBody::IdentifyRequest {
                file_id: self.request.file_id.clone(),
            },
        }
    }

    fn operation_request(&self, record: &ContributorRecord) -> Message {
        let settings = &self.context.settings;
        Message {
            correlation_id: self.id.clone(),
            collection_id: self.request.collection_id.clone(),
            operation: self.request.operation,
            from: settings.client_id.clone(),
            to: record.destination.clone(),
            reply_to: settings.receiver_destination.clone(),
            body: MessageBody::OperationRequest {
                recipient: record.contributor.clone(),
                file_id: self.request.file_id.clone(),
                payload: self.request.payload.clone(),
            },
        }
    }
}

fn cancel_timer(state: &mut ConversationState) {
    if let Some(timer) = state.timer.take() {
        timer.cancel();
    }
}

impl std::fmt::Debug for Conversation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Conversation")
            .field("id", &self.id)
            .field("operation", &self.request.operation)
            .field("ended", &self.has_ended())
            .finish()
    }
}

//! Scripted pillar that answers conversations over a message bus.
//!
//! Used by the demo binary and the integration tests in place of real
//! storage nodes. It listens on the collection topic for identify requests
//! and on its own destination for operation requests.

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::domain::conversation::{Message, MessageBody, ResponseCode, ResponseInfo};
use crate::domain::foundation::{ComponentId, Destination, DomainError};
use crate::ports::{MessageBus, MessageListener};

/// How the pillar answers identify requests.
#[derive(Debug, Clone, PartialEq)]
pub enum IdentifyBehavior {
    Positive { estimate: Option<Duration> },
    Negative,
    /// Never answers.
    Silent,
}

/// How the pillar answers operation requests addressed to it.
#[derive(Debug, Clone, PartialEq)]
pub enum OperationBehavior {
    /// Sends `progress_updates` progress responses, waits `delay`, then completes.
    Complete {
        progress_updates: usize,
        delay: Duration,
        payload: JsonValue,
    },
    /// Waits `delay`, then answers with a failure code.
    Fail {
        delay: Duration,
        code: ResponseCode,
        text: String,
    },
    /// Accepts with a progress response and never finishes.
    Stall,
}

impl OperationBehavior {
    pub fn complete(payload: JsonValue) -> Self {
        OperationBehavior::Complete {
            progress_updates: 0,
            delay: Duration::ZERO,
            payload,
        }
    }

    pub fn fail(code: ResponseCode, text: impl Into<String>) -> Self {
        OperationBehavior::Fail {
            delay: Duration::ZERO,
            code,
            text: text.into(),
        }
    }
}

pub struct SimulatedContributor {
    id: ComponentId,
    destination: Destination,
    bus: Arc<dyn MessageBus>,
    identify: IdentifyBehavior,
    identify_delay: Duration,
    operation: OperationBehavior,
    identify_requests: AtomicUsize,
    operation_requests: AtomicUsize,
}

impl SimulatedContributor {
    /// A pillar that identifies positively without an estimate and completes
    /// immediately with an empty payload.
    pub fn new(id: ComponentId, destination: Destination, bus: Arc<dyn MessageBus>) -> Self {
        Self {
            id,
            destination,
            bus,
            identify: IdentifyBehavior::Positive { estimate: None },
            identify_delay: Duration::ZERO,
            operation: OperationBehavior::complete(JsonValue::Null),
            identify_requests: AtomicUsize::new(0),
            operation_requests: AtomicUsize::new(0),
        }
    }

    pub fn with_identify(mut self, behavior: IdentifyBehavior) -> Self {
        self.identify = behavior;
        self
    }

    /// Delays every identify answer, to control arrival order.
    pub fn with_identify_delay(mut self, delay: Duration) -> Self {
        self.identify_delay = delay;
        self
    }

    pub fn with_operation(mut self, behavior: OperationBehavior) -> Self {
        self.operation = behavior;
        self
    }

    pub fn id(&self) -> &ComponentId {
        &self.id
    }

    pub fn destination(&self) -> &Destination {
        &self.destination
    }

    pub fn identify_requests(&self) -> usize {
        self.identify_requests.load(Ordering::SeqCst)
    }

    pub fn operation_requests(&self) -> usize {
        self.operation_requests.load(Ordering::SeqCst)
    }

    /// Subscribes the pillar to the collection topic and its own destination.
    pub fn attach(self: &Arc<Self>, collection_destination: &Destination) {
        self.bus.add_listener(collection_destination, self.clone());
        self.bus.add_listener(&self.destination, self.clone());
    }

    async fn answer_identify(&self, request: &Message) -> Result<(), DomainError> {
        self.identify_requests.fetch_add(1, Ordering::SeqCst);
        let (code, estimate) = match &self.identify {
            IdentifyBehavior::Positive { estimate } => {
                (ResponseCode::IdentificationPositive, *estimate)
            }
            IdentifyBehavior::Negative => (ResponseCode::IdentificationNegative, None),
            IdentifyBehavior::Silent => return Ok(()),
        };
        tokio::time::sleep(self.identify_delay).await;

        let reply = request.reply(
            self.id.clone(),
            self.destination.clone(),
            MessageBody::IdentifyResponse {
                response: ResponseInfo::new(code),
                time_estimate_ms: estimate
                    .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX)),
                payload: JsonValue::Null,
            },
        );
        self.bus.send(reply).await?;
        Ok(())
    }

    async fn perform(&self, request: &Message) -> Result<(), DomainError> {
        self.operation_requests.fetch_add(1, Ordering::SeqCst);

        match &self.operation {
            OperationBehavior::Complete {
                progress_updates,
                delay,
                payload,
            } => {
                for _ in 0..*progress_updates {
                    self.send_progress(request, ResponseCode::OperationProgress)
                        .await?;
                }
                tokio::time::sleep(*delay).await;
                self.send_final(
                    request,
                    ResponseInfo::new(ResponseCode::OperationCompleted),
                    payload.clone(),
                )
                .await
            }
            OperationBehavior::Fail { delay, code, text } => {
                tokio::time::sleep(*delay).await;
                self.send_final(
                    request,
                    ResponseInfo::new(*code).with_text(text.clone()),
                    JsonValue::Null,
                )
                .await
            }
            OperationBehavior::Stall => {
                self.send_progress(request, ResponseCode::OperationAcceptedProgress)
                    .await
            }
        }
    }

    async fn send_progress(&self, request: &Message, code: ResponseCode) -> Result<(), DomainError> {
        let reply = request.reply(
            self.id.clone(),
            self.destination.clone(),
            MessageBody::ProgressResponse {
                response: ResponseInfo::new(code),
                payload: JsonValue::Null,
            },
        );
        self.bus.send(reply).await?;
        Ok(())
    }

    async fn send_final(
        &self,
        request: &Message,
        response: ResponseInfo,
        payload: JsonValue,
    ) -> Result<(), DomainError> {
        let reply = request.reply(
            self.id.clone(),
            self.destination.clone(),
            MessageBody::FinalResponse { response, payload },
        );
        self.bus.send(reply).await?;
        Ok(())
    }
}

#[async_trait]
impl MessageListener for SimulatedContributor {
    async fn on_message(&self, message: Message) -> Result<(), DomainError> {
        match &message.body {
            MessageBody::IdentifyRequest { .. } => self.answer_identify(&message).await,
            MessageBody::OperationRequest { recipient, .. } if recipient == &self.id => {
                self.perform(&message).await
            }
            _ => Ok(()),
        }
    }

    fn name(&self) -> &'static str {
        "SimulatedContributor"
    }
}

//! Conversation domain module.
//!
//! Drives one identify-then-perform exchange between a client and the
//! pillars of a collection: selection of contributors, per-contributor
//! status tracking, phase timers and lifecycle events.

mod conversation;
mod events;
mod message;
mod monitor;
mod operation;
mod phase;
mod response_status;
mod selector;
mod settings;

pub use conversation::Conversation;
pub use events::{
    ContributorFailure, ContributorResult, ConversationOutcome, FailureCause, OperationEvent,
    OperationEventKind, OperationEventType,
};
pub use message::{Message, MessageBody, ResponseCode, ResponseInfo, ResponseOutcome};
pub use monitor::{describe_failures, EventMonitor};
pub use operation::{OperationKind, OperationRequest, SuccessPolicy};
pub use phase::ConversationPhase;
pub use response_status::{ContributorOutcome, ResponseStatus};
pub use selector::{
    AllContributorsSelector, ContributorRecord, ContributorSelector, FastestContributorSelector,
    FirstPositiveSelector, SelectionPolicy, SpecificContributorSelector,
};
pub use settings::{
    ConversationContext, ConversationSettings, DEFAULT_CONVERSATION_TIMEOUT,
    DEFAULT_IDENTIFICATION_TIMEOUT, DEFAULT_OPERATION_TIMEOUT,
};

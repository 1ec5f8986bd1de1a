//! Lifecycle events emitted by a conversation to its observer.
//!
//! Within one conversation events follow the phase order
//!
//! ```text
//! IdentifyRequestSent (ComponentIdentified | ComponentFailed | Warning)* IdentifyTimeout?
//!   IdentificationComplete RequestSent+ (Progress | ComponentComplete | ComponentFailed)*
//!   (Complete | Failed)
//! ```
//!
//! and any prefix of it may be cut short by `Failed`. Exactly one of
//! `Complete`/`Failed` is emitted, always last.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;

use super::{OperationKind, ResponseCode};
use crate::domain::foundation::{CollectionId, ComponentId, ConversationId, Timestamp};

/// Flat event type, convenient for assertions and filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationEventType {
    IdentifyRequestSent,
    ComponentIdentified,
    IdentificationComplete,
    RequestSent,
    Progress,
    ComponentComplete,
    ComponentFailed,
    Complete,
    Failed,
    IdentifyTimeout,
    Warning,
}

impl OperationEventType {
    /// True for `Complete` and `Failed`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OperationEventType::Complete | OperationEventType::Failed)
    }
}

/// Why a contributor is considered failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "code", rename_all = "snake_case")]
pub enum FailureCause {
    /// The contributor answered with this code.
    Response(ResponseCode),
    /// No answer arrived before the phase timer fired.
    Timeout,
}

impl fmt::Display for FailureCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureCause::Response(code) => write!(f, "{}", code),
            FailureCause::Timeout => write!(f, "no response received"),
        }
    }
}

/// A contributor's successful result, forwarded to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContributorResult {
    pub contributor: ComponentId,
    pub info: String,
    pub payload: JsonValue,
}

/// A contributor's failure, with enough detail to report it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributorFailure {
    pub contributor: ComponentId,
    pub cause: FailureCause,
    pub info: String,
}

impl fmt::Display for ContributorFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.contributor, self.cause, self.info)
    }
}

/// Event-specific data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OperationEventKind {
    IdentifyRequestSent,
    ComponentIdentified {
        contributor: ComponentId,
    },
    IdentificationComplete {
        selected: Vec<ComponentId>,
    },
    RequestSent {
        contributor: ComponentId,
    },
    Progress {
        contributor: ComponentId,
    },
    ComponentComplete {
        result: ContributorResult,
    },
    ComponentFailed {
        failure: ContributorFailure,
    },
    Complete {
        results: Vec<ContributorResult>,
    },
    Failed {
        failures: Vec<ContributorFailure>,
    },
    IdentifyTimeout {
        unresponsive: Vec<ComponentId>,
    },
    Warning {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        contributor: Option<ComponentId>,
    },
}

/// One lifecycle event with its conversation context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationEvent {
    pub conversation_id: ConversationId,
    pub collection_id: CollectionId,
    pub operation: OperationKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_id: Option<String>,
    pub info: String,
    pub occurred_at: Timestamp,
    pub kind: OperationEventKind,
}

impl OperationEvent {
    /// Returns the flat event type.
    pub fn event_type(&self) -> OperationEventType {
        match &self.kind {
            OperationEventKind::IdentifyRequestSent => OperationEventType::IdentifyRequestSent,
            OperationEventKind::ComponentIdentified { .. } => {
                OperationEventType::ComponentIdentified
            }
            OperationEventKind::IdentificationComplete { .. } => {
                OperationEventType::IdentificationComplete
            }
            OperationEventKind::RequestSent { .. } => OperationEventType::RequestSent,
            OperationEventKind::Progress { .. } => OperationEventType::Progress,
            OperationEventKind::ComponentComplete { .. } => OperationEventType::ComponentComplete,
            OperationEventKind::ComponentFailed { .. } => OperationEventType::ComponentFailed,
            OperationEventKind::Complete { .. } => OperationEventType::Complete,
            OperationEventKind::Failed { .. } => OperationEventType::Failed,
            OperationEventKind::IdentifyTimeout { .. } => OperationEventType::IdentifyTimeout,
            OperationEventKind::Warning { .. } => OperationEventType::Warning,
        }
    }

    /// The contributor this event concerns, if any.
    pub fn contributor(&self) -> Option<&ComponentId> {
        match &self.kind {
            OperationEventKind::ComponentIdentified { contributor }
            | OperationEventKind::RequestSent { contributor }
            | OperationEventKind::Progress { contributor } => Some(contributor),
            OperationEventKind::ComponentComplete { result } => Some(&result.contributor),
            OperationEventKind::ComponentFailed { failure } => Some(&failure.contributor),
            OperationEventKind::Warning { contributor } => contributor.as_ref(),
            _ => None,
        }
    }

    /// The failure cause, for `ComponentFailed` events.
    pub fn cause(&self) -> Option<FailureCause> {
        match &self.kind {
            OperationEventKind::ComponentFailed { failure } => Some(failure.cause),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.event_type().is_terminal()
    }
}

impl fmt::Display for OperationEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.event_type())?;
        if let Some(contributor) = self.contributor() {
            write!(f, " [{}]", contributor)?;
        }
        write!(f, " {} ({}): {}", self.operation, self.conversation_id, self.info)
    }
}

/// Terminal result of a conversation.
#[derive(Debug, Clone, PartialEq)]
pub enum ConversationOutcome {
    Completed {
        results: Vec<ContributorResult>,
    },
    Failed {
        info: String,
        failures: Vec<ContributorFailure>,
    },
    /// Identification ended without any contributor to perform the operation.
    NoContributor {
        info: String,
        failures: Vec<ContributorFailure>,
    },
}

impl ConversationOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ConversationOutcome::Completed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> ComponentId {
        ComponentId::new(s).unwrap()
    }

    fn event(kind: OperationEventKind) -> OperationEvent {
        OperationEvent {
            conversation_id: ConversationId::from_string("conv-1"),
            collection_id: CollectionId::new("books").unwrap(),
            operation: OperationKind::GetChecksums,
            file_id: None,
            info: "info".to_string(),
            occurred_at: Timestamp::now(),
            kind,
        }
    }

    #[test]
    fn only_complete_and_failed_are_terminal() {
        assert!(OperationEventType::Complete.is_terminal());
        assert!(OperationEventType::Failed.is_terminal());
        assert!(!OperationEventType::IdentifyTimeout.is_terminal());
        assert!(!OperationEventType::ComponentFailed.is_terminal());
    }

    #[test]
    fn contributor_and_cause_are_exposed() {
        let failed = event(OperationEventKind::ComponentFailed {
            failure: ContributorFailure {
                contributor: id("p1"),
                cause: FailureCause::Timeout,
                info: "Contributor timed out".to_string(),
            },
        });

        assert_eq!(failed.event_type(), OperationEventType::ComponentFailed);
        assert_eq!(failed.contributor(), Some(&id("p1")));
        assert_eq!(failed.cause(), Some(FailureCause::Timeout));
        assert!(event(OperationEventKind::IdentifyRequestSent).contributor().is_none());
    }

    #[test]
    fn failure_display_names_contributor_and_reason() {
        let failure = ContributorFailure {
            contributor: id("p2"),
            cause: FailureCause::Response(ResponseCode::FileNotFoundFailure),
            info: "no such file".to_string(),
        };
        assert_eq!(failure.to_string(), "p2 (FileNotFoundFailure): no such file");

        let timeout = ContributorFailure {
            cause: FailureCause::Timeout,
            ..failure
        };
        assert!(timeout.to_string().contains("no response received"));
    }

    #[test]
    fn event_serializes_with_type_tag() {
        let sent = event(OperationEventKind::RequestSent { contributor: id("p1") });
        let value = serde_json::to_value(&sent).unwrap();

        assert_eq!(value["kind"]["type"], "request_sent");
        assert_eq!(value["kind"]["contributor"], "p1");
        assert_eq!(value["operation"], "get_checksums");
    }

    #[test]
    fn display_includes_type_and_contributor() {
        let sent = event(OperationEventKind::Progress { contributor: id("p3") });
        let text = sent.to_string();
        assert!(text.starts_with("Progress [p3] GetChecksums"));
    }
}

//! Wire envelope exchanged between clients and pillars.
//!
//! All message kinds share one envelope; the kind-specific part is the
//! `MessageBody` tagged union. The conversation engine only inspects the
//! correlation id, sender, response code and time estimate. Payloads pass
//! through untouched.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use std::time::Duration;

use super::OperationKind;
use crate::domain::foundation::{CollectionId, ComponentId, ConversationId, Destination};

/// Response codes a pillar may answer with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResponseCode {
    IdentificationPositive,
    IdentificationNegative,
    OperationAcceptedProgress,
    OperationProgress,
    OperationCompleted,
    Failure,
    FileNotFoundFailure,
    ExistingFileFailure,
    NewFileChecksumFailure,
    ExistingFileChecksumFailure,
    RequestNotSupported,
    RequestNotUnderstoodFailure,
    ReplicationFailure,
    RequestNotAuthorized,
    InvalidMessage,
}

/// Coarse classification of a response code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseOutcome {
    /// The contributor can do it, or has done it.
    Positive,
    /// The contributor declines, without indicating an error.
    Negative,
    /// The contributor is still working.
    Progress,
    /// The contributor tried and failed, or rejected the request.
    Failure,
}

impl ResponseCode {
    /// Classifies this code.
    pub fn outcome(&self) -> ResponseOutcome {
        use ResponseCode::*;
        match self {
            IdentificationPositive | OperationCompleted => ResponseOutcome::Positive,
            IdentificationNegative => ResponseOutcome::Negative,
            OperationAcceptedProgress | OperationProgress => ResponseOutcome::Progress,
            Failure
            | FileNotFoundFailure
            | ExistingFileFailure
            | NewFileChecksumFailure
            | ExistingFileChecksumFailure
            | RequestNotSupported
            | RequestNotUnderstoodFailure
            | ReplicationFailure
            | RequestNotAuthorized
            | InvalidMessage => ResponseOutcome::Failure,
        }
    }

    /// Returns true for positive codes.
    pub fn is_positive(&self) -> bool {
        self.outcome() == ResponseOutcome::Positive
    }
}

impl fmt::Display for ResponseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Response code plus optional human-readable text from the pillar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseInfo {
    pub code: ResponseCode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl ResponseInfo {
    pub fn new(code: ResponseCode) -> Self {
        Self { code, text: None }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Text to show users: the pillar's own text, or the code name.
    pub fn describe(&self) -> String {
        match &self.text {
            Some(text) => format!("{}: {}", self.code, text),
            None => self.code.to_string(),
        }
    }
}

/// Kind-specific part of a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageBody {
    /// Broadcast to the collection asking who can perform the operation.
    IdentifyRequest {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        file_id: Option<String>,
    },

    /// A pillar's answer to an identify request.
    IdentifyResponse {
        response: ResponseInfo,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        time_estimate_ms: Option<u64>,
        #[serde(default)]
        payload: JsonValue,
    },

    /// The actual operation, sent to one selected pillar.
    OperationRequest {
        recipient: ComponentId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        file_id: Option<String>,
        #[serde(default)]
        payload: JsonValue,
    },

    /// Intermediate "still working" answer.
    ProgressResponse {
        response: ResponseInfo,
        #[serde(default)]
        payload: JsonValue,
    },

    /// Terminal answer for one pillar.
    FinalResponse {
        response: ResponseInfo,
        #[serde(default)]
        payload: JsonValue,
    },
}

impl MessageBody {
    /// Short name for logging.
    pub fn kind_name(&self) -> &'static str {
        match self {
            MessageBody::IdentifyRequest { .. } => "IdentifyRequest",
            MessageBody::IdentifyResponse { .. } => "IdentifyResponse",
            MessageBody::OperationRequest { .. } => "OperationRequest",
            MessageBody::ProgressResponse { .. } => "ProgressResponse",
            MessageBody::FinalResponse { .. } => "FinalResponse",
        }
    }

    /// Returns the response info for response kinds.
    pub fn response(&self) -> Option<&ResponseInfo> {
        match self {
            MessageBody::IdentifyResponse { response, .. }
            | MessageBody::ProgressResponse { response, .. }
            | MessageBody::FinalResponse { response, .. } => Some(response),
            MessageBody::IdentifyRequest { .. } | MessageBody::OperationRequest { .. } => None,
        }
    }
}

/// Envelope carried by the message bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub correlation_id: ConversationId,
    pub collection_id: CollectionId,
    pub operation: OperationKind,
    pub from: ComponentId,
    pub to: Destination,
    pub reply_to: Destination,
    pub body: MessageBody,
}

impl Message {
    /// Builds a reply to this message, addressed to its reply-to destination
    /// and carrying the same correlation id.
    pub fn reply(&self, from: ComponentId, reply_to: Destination, body: MessageBody) -> Message {
        Message {
            correlation_id: self.correlation_id.clone(),
            collection_id: self.collection_id.clone(),
            operation: self.operation,
            from,
            to: self.reply_to.clone(),
            reply_to,
            body,
        }
    }

    /// Time estimate reported in an identify response.
    pub fn time_estimate(&self) -> Option<Duration> {
        match &self.body {
            MessageBody::IdentifyResponse {
                time_estimate_ms: Some(ms),
                ..
            } => Some(Duration::from_millis(*ms)),
            _ => None,
        }
    }

    /// Short name of the body kind, for logging.
    pub fn kind_name(&self) -> &'static str {
        self.body.kind_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn identify_request() -> Message {
        Message {
            correlation_id: ConversationId::from_string("conv-1"),
            collection_id: CollectionId::new("books").unwrap(),
            operation: OperationKind::GetFile,
            from: ComponentId::new("client").unwrap(),
            to: Destination::new("books.topic").unwrap(),
            reply_to: Destination::new("client.inbox").unwrap(),
            body: MessageBody::IdentifyRequest {
                file_id: Some("file-1".to_string()),
            },
        }
    }

    mod response_codes {
        use super::*;

        #[test]
        fn positive_codes() {
            assert_eq!(
                ResponseCode::IdentificationPositive.outcome(),
                ResponseOutcome::Positive
            );
            assert!(ResponseCode::OperationCompleted.is_positive());
        }

        #[test]
        fn negative_and_progress_codes() {
            assert_eq!(
                ResponseCode::IdentificationNegative.outcome(),
                ResponseOutcome::Negative
            );
            assert_eq!(
                ResponseCode::OperationAcceptedProgress.outcome(),
                ResponseOutcome::Progress
            );
        }

        #[test]
        fn failure_codes() {
            for code in [
                ResponseCode::Failure,
                ResponseCode::FileNotFoundFailure,
                ResponseCode::RequestNotAuthorized,
                ResponseCode::ExistingFileChecksumFailure,
            ] {
                assert_eq!(code.outcome(), ResponseOutcome::Failure, "{:?}", code);
            }
        }

        #[test]
        fn serializes_screaming_snake() {
            let json = serde_json::to_string(&ResponseCode::FileNotFoundFailure).unwrap();
            assert_eq!(json, "\"FILE_NOT_FOUND_FAILURE\"");
        }

        #[test]
        fn describe_prefers_pillar_text() {
            let info = ResponseInfo::new(ResponseCode::FileNotFoundFailure).with_text("no such file");
            assert_eq!(info.describe(), "FileNotFoundFailure: no such file");
            assert_eq!(
                ResponseInfo::new(ResponseCode::Failure).describe(),
                "Failure"
            );
        }
    }

    mod envelope {
        use super::*;

        #[test]
        fn reply_keeps_correlation_and_targets_reply_to() {
            let request = identify_request();
            let reply = request.reply(
                ComponentId::new("pillar-1").unwrap(),
                Destination::new("pillar-1.queue").unwrap(),
                MessageBody::IdentifyResponse {
                    response: ResponseInfo::new(ResponseCode::IdentificationPositive),
                    time_estimate_ms: Some(250),
                    payload: JsonValue::Null,
                },
            );

            assert_eq!(reply.correlation_id, request.correlation_id);
            assert_eq!(reply.to, request.reply_to);
            assert_eq!(reply.reply_to.as_str(), "pillar-1.queue");
            assert_eq!(reply.time_estimate(), Some(Duration::from_millis(250)));
        }

        #[test]
        fn requests_have_no_response_info() {
            assert!(identify_request().body.response().is_none());
            assert_eq!(identify_request().kind_name(), "IdentifyRequest");
        }

        #[test]
        fn body_is_tagged_by_type() {
            let body = MessageBody::FinalResponse {
                response: ResponseInfo::new(ResponseCode::OperationCompleted),
                payload: json!({ "checksum": "abc" }),
            };
            let value = serde_json::to_value(&body).unwrap();
            assert_eq!(value["type"], "final_response");
            assert_eq!(value["response"]["code"], "OPERATION_COMPLETED");

            let parsed: MessageBody = serde_json::from_value(value).unwrap();
            assert_eq!(parsed, body);
        }
    }
}

//! Error types for the domain layer.

use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use thiserror::Error;

/// Errors that occur during value object construction or state checks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Field '{field}' cannot be empty")]
    EmptyField { field: String },

    #[error("Field '{field}' has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

impl ValidationError {
    /// Creates an empty field validation error.
    pub fn empty_field(field: impl Into<String>) -> Self {
        ValidationError::EmptyField { field: field.into() }
    }

    /// Creates an invalid format validation error.
    pub fn invalid_format(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidationError::InvalidFormat {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Error codes organized by category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Validation errors
    ValidationFailed,

    // State errors
    InvalidStateTransition,
    ConversationAlreadyStarted,

    // Operation outcome errors
    NoContributorSelected,
    OperationFailed,
    ConversationTimeout,

    // Infrastructure errors
    MessageBusError,
    ObserverError,
    InternalError,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorCode::ValidationFailed => "VALIDATION_FAILED",
            ErrorCode::InvalidStateTransition => "INVALID_STATE_TRANSITION",
            ErrorCode::ConversationAlreadyStarted => "CONVERSATION_ALREADY_STARTED",
            ErrorCode::NoContributorSelected => "NO_CONTRIBUTOR_SELECTED",
            ErrorCode::OperationFailed => "OPERATION_FAILED",
            ErrorCode::ConversationTimeout => "CONVERSATION_TIMEOUT",
            ErrorCode::MessageBusError => "MESSAGE_BUS_ERROR",
            ErrorCode::ObserverError => "OBSERVER_ERROR",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        };
        write!(f, "{}", s)
    }
}

/// Standard domain error with code, message, and optional details.
#[derive(Debug, Clone)]
pub struct DomainError {
    pub code: ErrorCode,
    pub message: String,
    pub details: HashMap<String, String>,
}

impl DomainError {
    /// Creates a new domain error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: HashMap::new(),
        }
    }

    /// Creates a validation error for a specific field.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::ValidationFailed,
            message: message.into(),
            details: HashMap::new(),
        }
        .with_detail("field", field.into())
    }

    /// Adds a detail to the error.
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }
}

impl fmt::Display for DomainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl Error for DomainError {}

impl From<ValidationError> for DomainError {
    fn from(err: ValidationError) -> Self {
        let code = match &err {
            ValidationError::InvalidFormat { field, .. } if field == "state_transition" => {
                ErrorCode::InvalidStateTransition
            }
            _ => ErrorCode::ValidationFailed,
        };
        DomainError::new(code, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_empty_field_displays_correctly() {
        let err = ValidationError::empty_field("component_id");
        assert_eq!(format!("{}", err), "Field 'component_id' cannot be empty");
    }

    #[test]
    fn validation_error_invalid_format_displays_correctly() {
        let err = ValidationError::invalid_format("destination", "contains whitespace");
        assert_eq!(
            format!("{}", err),
            "Field 'destination' has invalid format: contains whitespace"
        );
    }

    #[test]
    fn domain_error_displays_code_and_message() {
        let err = DomainError::new(ErrorCode::OperationFailed, "pillar-1 failed");
        assert_eq!(format!("{}", err), "[OPERATION_FAILED] pillar-1 failed");
    }

    #[test]
    fn domain_error_with_detail_adds_detail() {
        let err = DomainError::new(ErrorCode::MessageBusError, "send failed")
            .with_detail("destination", "pillar-1.queue")
            .with_detail("conversation_id", "abc");

        assert_eq!(
            err.details.get("destination"),
            Some(&"pillar-1.queue".to_string())
        );
        assert_eq!(err.details.get("conversation_id"), Some(&"abc".to_string()));
    }

    #[test]
    fn state_transition_validation_maps_to_invalid_transition_code() {
        let err: DomainError =
            ValidationError::invalid_format("state_transition", "Finished -> Identifying").into();
        assert_eq!(err.code, ErrorCode::InvalidStateTransition);

        let err: DomainError = ValidationError::empty_field("collection_id").into();
        assert_eq!(err.code, ErrorCode::ValidationFailed);
    }

    #[test]
    fn error_code_display_formats_correctly() {
        assert_eq!(format!("{}", ErrorCode::ConversationTimeout), "CONVERSATION_TIMEOUT");
        assert_eq!(format!("{}", ErrorCode::NoContributorSelected), "NO_CONTRIBUTOR_SELECTED");
    }
}

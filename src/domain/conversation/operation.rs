//! Operation kinds and the caller's description of one operation.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use std::time::Duration;

use crate::domain::foundation::{CollectionId, ComponentId};

/// The kind of operation a conversation performs against the pillars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    GetFile,
    GetChecksums,
    GetFileIds,
    GetStatus,
    GetAuditTrails,
    PutFile,
    DeleteFile,
    ReplaceFile,
}

impl OperationKind {
    /// Stable name used in log lines and event info.
    pub fn name(&self) -> &'static str {
        match self {
            OperationKind::GetFile => "GetFile",
            OperationKind::GetChecksums => "GetChecksums",
            OperationKind::GetFileIds => "GetFileIDs",
            OperationKind::GetStatus => "GetStatus",
            OperationKind::GetAuditTrails => "GetAuditTrails",
            OperationKind::PutFile => "PutFile",
            OperationKind::DeleteFile => "DeleteFile",
            OperationKind::ReplaceFile => "ReplaceFile",
        }
    }

    /// Returns true if the operation changes pillar contents.
    pub fn is_modifying(&self) -> bool {
        matches!(
            self,
            OperationKind::PutFile | OperationKind::DeleteFile | OperationKind::ReplaceFile
        )
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// How per-contributor outcomes fold into the conversation's outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuccessPolicy {
    /// Every selected contributor must complete.
    #[default]
    AllSelected,

    /// One completed contributor is enough.
    AnySelected,
}

/// Everything a conversation needs to know about the operation it drives.
///
/// The payload is opaque to the conversation engine and is forwarded
/// unchanged on each per-contributor operation request.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationRequest {
    pub operation: OperationKind,
    pub collection_id: CollectionId,
    pub file_id: Option<String>,
    pub contributors: Vec<ComponentId>,
    pub payload: JsonValue,
    pub success_policy: SuccessPolicy,
    /// Overrides both estimate-derived and default operation timers.
    pub operation_timeout: Option<Duration>,
}

impl OperationRequest {
    /// Creates a request addressed to the given contributors.
    pub fn new(
        operation: OperationKind,
        collection_id: CollectionId,
        contributors: Vec<ComponentId>,
    ) -> Self {
        Self {
            operation,
            collection_id,
            file_id: None,
            contributors,
            payload: JsonValue::Null,
            success_policy: SuccessPolicy::default(),
            operation_timeout: None,
        }
    }

    /// Sets the file the operation concerns.
    pub fn with_file_id(mut self, file_id: impl Into<String>) -> Self {
        self.file_id = Some(file_id.into());
        self
    }

    /// Sets the opaque operation payload.
    pub fn with_payload(mut self, payload: JsonValue) -> Self {
        self.payload = payload;
        self
    }

    /// Sets the success policy.
    pub fn with_success_policy(mut self, policy: SuccessPolicy) -> Self {
        self.success_policy = policy;
        self
    }

    /// Sets a client-supplied operation timeout.
    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = Some(timeout);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn collection() -> CollectionId {
        CollectionId::new("books").unwrap()
    }

    #[test]
    fn operation_names_are_stable() {
        assert_eq!(OperationKind::GetFileIds.name(), "GetFileIDs");
        assert_eq!(OperationKind::PutFile.to_string(), "PutFile");
    }

    #[test]
    fn only_put_delete_replace_are_modifying() {
        assert!(OperationKind::PutFile.is_modifying());
        assert!(OperationKind::ReplaceFile.is_modifying());
        assert!(!OperationKind::GetChecksums.is_modifying());
    }

    #[test]
    fn operation_kind_serializes_to_snake_case() {
        let json = serde_json::to_string(&OperationKind::GetAuditTrails).unwrap();
        assert_eq!(json, "\"get_audit_trails\"");
    }

    #[test]
    fn default_success_policy_is_all_selected() {
        assert_eq!(SuccessPolicy::default(), SuccessPolicy::AllSelected);
    }

    #[test]
    fn builder_sets_optional_fields() {
        let request = OperationRequest::new(OperationKind::GetFile, collection(), vec![])
            .with_file_id("file-1")
            .with_payload(json!({ "url": "http://example.org/upload" }))
            .with_success_policy(SuccessPolicy::AnySelected)
            .with_operation_timeout(Duration::from_secs(5));

        assert_eq!(request.file_id.as_deref(), Some("file-1"));
        assert_eq!(request.payload["url"], "http://example.org/upload");
        assert_eq!(request.success_policy, SuccessPolicy::AnySelected);
        assert_eq!(request.operation_timeout, Some(Duration::from_secs(5)));
    }
}

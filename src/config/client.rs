//! Client configuration: addressing, contributors and timeouts

use serde::Deserialize;
use std::collections::HashSet;
use std::time::Duration;

use super::error::ValidationError;
use crate::application::MediatorConfig;
use crate::domain::conversation::ConversationSettings;
use crate::domain::foundation::{CollectionId, ComponentId, Destination};

/// Client configuration
///
/// Durations are given in milliseconds.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientSettings {
    /// Component id stamped on outbound requests
    #[serde(default = "default_client_id")]
    pub client_id: String,

    /// Collection every conversation operates on
    pub collection_id: String,

    /// Collection-wide topic identify requests are broadcast on
    pub collection_destination: String,

    /// The client's own inbox
    pub receiver_destination: String,

    /// Pillars of the collection (comma-separated in the environment)
    pub contributors: Vec<String>,

    #[serde(default = "default_identification_timeout")]
    pub identification_timeout_ms: u64,

    #[serde(default = "default_operation_timeout")]
    pub operation_timeout_ms: u64,

    #[serde(default = "default_conversation_timeout")]
    pub conversation_timeout_ms: u64,

    #[serde(default = "default_cleanup_interval")]
    pub mediator_cleanup_interval_ms: u64,
}

impl ClientSettings {
    pub fn client_id(&self) -> Result<ComponentId, ValidationError> {
        ComponentId::new(self.client_id.as_str())
            .map_err(|_| ValidationError::InvalidIdentifier("client_id"))
    }

    pub fn collection_id(&self) -> Result<CollectionId, ValidationError> {
        CollectionId::new(self.collection_id.as_str())
            .map_err(|_| ValidationError::InvalidIdentifier("collection_id"))
    }

    pub fn collection_destination(&self) -> Result<Destination, ValidationError> {
        Destination::new(self.collection_destination.as_str())
            .map_err(|_| ValidationError::InvalidIdentifier("collection_destination"))
    }

    pub fn receiver_destination(&self) -> Result<Destination, ValidationError> {
        Destination::new(self.receiver_destination.as_str())
            .map_err(|_| ValidationError::InvalidIdentifier("receiver_destination"))
    }

    /// Contributor ids, trimmed, in configured order
    pub fn contributors(&self) -> Result<Vec<ComponentId>, ValidationError> {
        self.contributors
            .iter()
            .map(|c| {
                ComponentId::new(c.trim()).map_err(|_| ValidationError::InvalidIdentifier("contributors"))
            })
            .collect()
    }

    pub fn identification_timeout(&self) -> Duration {
        Duration::from_millis(self.identification_timeout_ms)
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }

    pub fn conversation_timeout(&self) -> Duration {
        Duration::from_millis(self.conversation_timeout_ms)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_millis(self.mediator_cleanup_interval_ms)
    }

    /// Settings shared by every conversation this client starts
    pub fn conversation_settings(&self) -> Result<ConversationSettings, ValidationError> {
        Ok(ConversationSettings::new(
            self.client_id()?,
            self.collection_destination()?,
            self.receiver_destination()?,
        )
        .with_identification_timeout(self.identification_timeout())
        .with_operation_timeout(self.operation_timeout())
        .with_conversation_timeout(self.conversation_timeout()))
    }

    pub fn mediator_config(&self) -> MediatorConfig {
        MediatorConfig::default()
            .with_cleanup_interval(self.cleanup_interval())
            .with_conversation_timeout(self.conversation_timeout())
    }

    /// Validate client configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.collection_id.trim().is_empty() {
            return Err(ValidationError::MissingRequired("collection_id"));
        }
        if self.collection_destination.trim().is_empty() {
            return Err(ValidationError::MissingRequired("collection_destination"));
        }
        if self.receiver_destination.trim().is_empty() {
            return Err(ValidationError::MissingRequired("receiver_destination"));
        }
        self.client_id()?;

        let contributors = self.contributors()?;
        if contributors.is_empty() {
            return Err(ValidationError::NoContributors);
        }
        let mut seen = HashSet::new();
        for contributor in &contributors {
            if !seen.insert(contributor) {
                return Err(ValidationError::DuplicateContributor(contributor.to_string()));
            }
        }

        for (name, value) in [
            ("identification_timeout_ms", self.identification_timeout_ms),
            ("operation_timeout_ms", self.operation_timeout_ms),
            ("conversation_timeout_ms", self.conversation_timeout_ms),
            ("mediator_cleanup_interval_ms", self.mediator_cleanup_interval_ms),
        ] {
            if value == 0 {
                return Err(ValidationError::ZeroTimeout(name));
            }
        }
        if self.conversation_timeout_ms < self.identification_timeout_ms {
            return Err(ValidationError::ConversationTimeoutTooShort);
        }
        Ok(())
    }
}

fn default_client_id() -> String {
    "client".to_string()
}

fn default_identification_timeout() -> u64 {
    10_000
}

fn default_operation_timeout() -> u64 {
    60 * 60 * 1000
}

fn default_conversation_timeout() -> u64 {
    2 * 60 * 60 * 1000
}

fn default_cleanup_interval() -> u64 {
    1000
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> ClientSettings {
        ClientSettings {
            client_id: default_client_id(),
            collection_id: "books".to_string(),
            collection_destination: "books.topic".to_string(),
            receiver_destination: "client.inbox".to_string(),
            contributors: vec!["p1".to_string(), " p2 ".to_string()],
            identification_timeout_ms: default_identification_timeout(),
            operation_timeout_ms: default_operation_timeout(),
            conversation_timeout_ms: default_conversation_timeout(),
            mediator_cleanup_interval_ms: default_cleanup_interval(),
        }
    }

    #[test]
    fn test_valid_settings() {
        assert!(settings().validate().is_ok());
    }

    #[test]
    fn test_contributors_are_trimmed() {
        let ids: Vec<String> = settings()
            .contributors()
            .unwrap()
            .iter()
            .map(|c| c.to_string())
            .collect();
        assert_eq!(ids, vec!["p1", "p2"]);
    }

    #[test]
    fn test_no_contributors_rejected() {
        let config = ClientSettings {
            contributors: vec![],
            ..settings()
        };
        assert_eq!(config.validate(), Err(ValidationError::NoContributors));
    }

    #[test]
    fn test_blank_contributor_rejected() {
        let config = ClientSettings {
            contributors: vec!["p1".to_string(), "  ".to_string()],
            ..settings()
        };
        assert_eq!(
            config.validate(),
            Err(ValidationError::InvalidIdentifier("contributors"))
        );
    }

    #[test]
    fn test_duplicate_contributor_rejected() {
        let config = ClientSettings {
            contributors: vec!["p1".to_string(), "p1".to_string()],
            ..settings()
        };
        assert_eq!(
            config.validate(),
            Err(ValidationError::DuplicateContributor("p1".to_string()))
        );
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let config = ClientSettings {
            operation_timeout_ms: 0,
            ..settings()
        };
        assert_eq!(
            config.validate(),
            Err(ValidationError::ZeroTimeout("operation_timeout_ms"))
        );
    }

    #[test]
    fn test_conversation_timeout_must_cover_identification() {
        let config = ClientSettings {
            identification_timeout_ms: 5000,
            conversation_timeout_ms: 1000,
            ..settings()
        };
        assert_eq!(
            config.validate(),
            Err(ValidationError::ConversationTimeoutTooShort)
        );
    }

    #[test]
    fn test_missing_destination_rejected() {
        let config = ClientSettings {
            receiver_destination: " ".to_string(),
            ..settings()
        };
        assert_eq!(
            config.validate(),
            Err(ValidationError::MissingRequired("receiver_destination"))
        );
    }

    #[test]
    fn test_conversation_settings_carry_timeouts() {
        let config = ClientSettings {
            identification_timeout_ms: 250,
            ..settings()
        };
        let conversation = config.conversation_settings().unwrap();

        assert_eq!(conversation.identification_timeout, Duration::from_millis(250));
        assert_eq!(conversation.receiver_destination.as_str(), "client.inbox");
        assert_eq!(conversation.client_id.as_str(), "client");
    }

    #[test]
    fn test_mediator_config() {
        let config = ClientSettings {
            mediator_cleanup_interval_ms: 50,
            ..settings()
        };
        let mediator = config.mediator_config();

        assert_eq!(mediator.cleanup_interval, Duration::from_millis(50));
        assert_eq!(mediator.conversation_timeout, Duration::from_secs(2 * 60 * 60));
    }
}

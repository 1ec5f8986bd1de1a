//! Conversation phase state machine.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::StateMachine;

/// The phase a conversation is in.
///
/// - `Created`: built, not yet started
/// - `Identifying`: identify request broadcast, collecting answers
/// - `Performing`: operation requests sent to the selected contributors
/// - `Finished`: terminal; further messages are dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConversationPhase {
    #[default]
    Created,
    Identifying,
    Performing,
    Finished,
}

impl ConversationPhase {
    /// True while the conversation reacts to messages and timers.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Identifying | Self::Performing)
    }
}

impl fmt::Display for ConversationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl StateMachine for ConversationPhase {
    fn can_transition_to(&self, target: &Self) -> bool {
        use ConversationPhase::*;
        matches!(
            (self, target),
            (Created, Identifying)
                // Failed before it was started
                | (Created, Finished)
                | (Identifying, Performing)
                // Nobody selected, timed out, or forcibly failed
                | (Identifying, Finished)
                | (Performing, Finished)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use ConversationPhase::*;
        match self {
            Created => vec![Identifying, Finished],
            Identifying => vec![Performing, Finished],
            Performing => vec![Finished],
            Finished => vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [ConversationPhase; 4] = [
        ConversationPhase::Created,
        ConversationPhase::Identifying,
        ConversationPhase::Performing,
        ConversationPhase::Finished,
    ];

    #[test]
    fn default_phase_is_created() {
        assert_eq!(ConversationPhase::default(), ConversationPhase::Created);
    }

    #[test]
    fn finished_is_the_only_terminal_phase() {
        for phase in ALL {
            assert_eq!(phase.is_terminal(), phase == ConversationPhase::Finished);
        }
    }

    #[test]
    fn phases_never_go_backwards() {
        use ConversationPhase::*;
        assert!(Performing.transition_to(Identifying).is_err());
        assert!(Finished.transition_to(Performing).is_err());
        assert!(Created.transition_to(Performing).is_err());
    }

    #[test]
    fn every_non_terminal_phase_can_finish() {
        for phase in ALL.iter().filter(|p| !p.is_terminal()) {
            assert!(phase.can_transition_to(&ConversationPhase::Finished));
        }
    }

    #[test]
    fn only_identifying_and_performing_are_active() {
        assert!(!ConversationPhase::Created.is_active());
        assert!(ConversationPhase::Identifying.is_active());
        assert!(ConversationPhase::Performing.is_active());
        assert!(!ConversationPhase::Finished.is_active());
    }

    #[test]
    fn can_transition_to_is_consistent_with_valid_transitions() {
        for phase in ALL {
            for target in phase.valid_transitions() {
                assert!(phase.can_transition_to(&target));
            }
        }
    }

    #[test]
    fn serializes_to_snake_case() {
        let json = serde_json::to_string(&ConversationPhase::Identifying).unwrap();
        assert_eq!(json, "\"identifying\"");
    }
}

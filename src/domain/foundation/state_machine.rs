//! State machine trait for phase enums.
//!
//! Gives phase enums a single place to declare their legal transitions and a
//! validated `transition_to` that every phase change goes through.

use super::ValidationError;

/// Trait for enums that represent a state machine.
///
/// Implementors list valid transitions and get validated transition and
/// terminal checks for free.
///
/// # Example
///
/// ```ignore
/// let next = phase.transition_to(ConversationPhase::Performing)?;
/// if next.is_terminal() { /* ... */ }
/// ```
pub trait StateMachine: Sized + Copy + PartialEq + std::fmt::Debug {
    /// Returns true if transition from self to target is valid.
    fn can_transition_to(&self, target: &Self) -> bool;

    /// Returns all valid target states from current state.
    fn valid_transitions(&self) -> Vec<Self>;

    /// Performs transition with validation, returning error if invalid.
    fn transition_to(&self, target: Self) -> Result<Self, ValidationError> {
        if self.can_transition_to(&target) {
            Ok(target)
        } else {
            Err(ValidationError::invalid_format(
                "state_transition",
                format!("Cannot transition from {:?} to {:?}", self, target),
            ))
        }
    }

    /// Checks if current state is terminal (no valid outgoing transitions).
    fn is_terminal(&self) -> bool {
        self.valid_transitions().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Timer {
        Armed,
        Fired,
        Cancelled,
    }

    impl StateMachine for Timer {
        fn can_transition_to(&self, target: &Self) -> bool {
            use Timer::*;
            matches!((self, target), (Armed, Fired) | (Armed, Cancelled))
        }

        fn valid_transitions(&self) -> Vec<Self> {
            use Timer::*;
            match self {
                Armed => vec![Fired, Cancelled],
                Fired | Cancelled => vec![],
            }
        }
    }

    #[test]
    fn transition_to_succeeds_for_valid_transition() {
        assert_eq!(Timer::Armed.transition_to(Timer::Fired), Ok(Timer::Fired));
    }

    #[test]
    fn transition_to_fails_for_invalid_transition() {
        let err = Timer::Fired.transition_to(Timer::Cancelled).unwrap_err();
        assert!(err.to_string().contains("Cannot transition from Fired to Cancelled"));
    }

    #[test]
    fn fired_and_cancelled_are_terminal() {
        assert!(Timer::Fired.is_terminal());
        assert!(Timer::Cancelled.is_terminal());
        assert!(!Timer::Armed.is_terminal());
    }

    #[test]
    fn can_transition_to_is_consistent_with_valid_transitions() {
        for state in [Timer::Armed, Timer::Fired, Timer::Cancelled] {
            for target in state.valid_transitions() {
                assert!(state.can_transition_to(&target));
            }
        }
    }
}

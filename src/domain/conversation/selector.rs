//! Contributor selection policies for the identification phase.
//!
//! A selector is fed every identify response of the expected contributors
//! (positive or not) in arrival order. It decides when it has seen enough
//! and which contributors the operation request goes to.
//!
//! | Selector | Satisfied when | Selection |
//! |----------|----------------|-----------|
//! | `AllContributorsSelector` | every expected contributor answered | all positive |
//! | `FirstPositiveSelector` | first positive answer | that contributor |
//! | `FastestContributorSelector` | every expected contributor answered | lowest estimate |
//! | `SpecificContributorSelector` | the named contributor answered | it, if positive |
//!
//! Ties between equal estimates go to the earlier arrival.

use serde_json::Value as JsonValue;
use std::collections::HashSet;
use std::fmt;
use std::time::Duration;

use super::{Message, MessageBody, ResponseInfo};
use crate::domain::foundation::{ComponentId, Destination};

/// One contributor's identify response, as seen by a selector.
#[derive(Debug, Clone, PartialEq)]
pub struct ContributorRecord {
    pub contributor: ComponentId,
    /// The contributor's private destination (its reply-to).
    pub destination: Destination,
    pub time_estimate: Option<Duration>,
    pub response: ResponseInfo,
    pub payload: JsonValue,
}

impl ContributorRecord {
    /// Extracts a record from an identify response; `None` for other kinds.
    pub fn from_identify_response(message: &Message) -> Option<Self> {
        match &message.body {
            MessageBody::IdentifyResponse {
                response, payload, ..
            } => Some(Self {
                contributor: message.from.clone(),
                destination: message.reply_to.clone(),
                time_estimate: message.time_estimate(),
                response: response.clone(),
                payload: payload.clone(),
            }),
            _ => None,
        }
    }

    /// True if the contributor declared it can perform the operation.
    pub fn is_positive(&self) -> bool {
        self.response.code.is_positive()
    }
}

/// Policy deciding which contributors perform the operation.
pub trait ContributorSelector: Send + Sync + fmt::Debug {
    /// Feeds one identify response.
    fn consider(&mut self, record: ContributorRecord);

    /// True once enough responses have been seen to finish identification.
    fn is_satisfied(&self) -> bool;

    /// The chosen contributors, in arrival order. May be empty.
    fn selection(&self) -> Vec<ContributorRecord>;

    /// Selector name for logging.
    fn name(&self) -> &'static str;
}

/// Declarative choice of selector, resolved per conversation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SelectionPolicy {
    #[default]
    AllContributors,
    FirstPositive,
    Fastest,
    Specific(ComponentId),
}

impl SelectionPolicy {
    /// Builds a fresh selector for the given expected contributors.
    pub fn selector_for(&self, expected: &[ComponentId]) -> Box<dyn ContributorSelector> {
        match self {
            SelectionPolicy::AllContributors => {
                Box::new(AllContributorsSelector::new(expected.iter().cloned()))
            }
            SelectionPolicy::FirstPositive => Box::new(FirstPositiveSelector::new()),
            SelectionPolicy::Fastest => {
                Box::new(FastestContributorSelector::new(expected.iter().cloned()))
            }
            SelectionPolicy::Specific(target) => {
                Box::new(SpecificContributorSelector::new(target.clone()))
            }
        }
    }
}

/// Shared bookkeeping: who has been considered, and positives in arrival order.
#[derive(Debug, Default)]
struct Considered {
    expected: HashSet<ComponentId>,
    seen: HashSet<ComponentId>,
    positives: Vec<ContributorRecord>,
}

impl Considered {
    fn expecting(expected: impl IntoIterator<Item = ComponentId>) -> Self {
        Self {
            expected: expected.into_iter().collect(),
            ..Default::default()
        }
    }

    /// Returns false for duplicates, which are otherwise ignored.
    fn add(&mut self, record: ContributorRecord) -> bool {
        if !self.seen.insert(record.contributor.clone()) {
            return false;
        }
        if record.is_positive() {
            self.positives.push(record);
        }
        true
    }

    fn all_expected_seen(&self) -> bool {
        self.expected.iter().all(|id| self.seen.contains(id))
    }
}

/// Selects every positively answering contributor.
#[derive(Debug)]
pub struct AllContributorsSelector {
    considered: Considered,
}

impl AllContributorsSelector {
    pub fn new(expected: impl IntoIterator<Item = ComponentId>) -> Self {
        Self {
            considered: Considered::expecting(expected),
        }
    }
}

impl ContributorSelector for AllContributorsSelector {
    fn consider(&mut self, record: ContributorRecord) {
        self.considered.add(record);
    }

    fn is_satisfied(&self) -> bool {
        self.considered.all_expected_seen()
    }

    fn selection(&self) -> Vec<ContributorRecord> {
        self.considered.positives.clone()
    }

    fn name(&self) -> &'static str {
        "AllContributorsSelector"
    }
}

/// Selects the first contributor to answer positively.
#[derive(Debug, Default)]
pub struct FirstPositiveSelector {
    chosen: Option<ContributorRecord>,
}

impl FirstPositiveSelector {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ContributorSelector for FirstPositiveSelector {
    fn consider(&mut self, record: ContributorRecord) {
        if self.chosen.is_none() && record.is_positive() {
            self.chosen = Some(record);
        }
    }

    fn is_satisfied(&self) -> bool {
        self.chosen.is_some()
    }

    fn selection(&self) -> Vec<ContributorRecord> {
        self.chosen.iter().cloned().collect()
    }

    fn name(&self) -> &'static str {
        "FirstPositiveSelector"
    }
}

/// Selects the positive contributor with the lowest time estimate.
///
/// Contributors that report no estimate rank after every contributor that
/// does.
#[derive(Debug)]
pub struct FastestContributorSelector {
    considered: Considered,
}

impl FastestContributorSelector {
    pub fn new(expected: impl IntoIterator<Item = ComponentId>) -> Self {
        Self {
            considered: Considered::expecting(expected),
        }
    }
}

impl ContributorSelector for FastestContributorSelector {
    fn consider(&mut self, record: ContributorRecord) {
        self.considered.add(record);
    }

    fn is_satisfied(&self) -> bool {
        self.considered.all_expected_seen()
    }

    fn selection(&self) -> Vec<ContributorRecord> {
        let mut fastest: Option<&ContributorRecord> = None;
        for candidate in &self.considered.positives {
            let candidate_estimate = candidate.time_estimate.unwrap_or(Duration::MAX);
            let better = match fastest {
                None => true,
                // Strict comparison keeps the earlier arrival on ties.
                Some(best) => candidate_estimate < best.time_estimate.unwrap_or(Duration::MAX),
            };
            if better {
                fastest = Some(candidate);
            }
        }
        fastest.into_iter().cloned().collect()
    }

    fn name(&self) -> &'static str {
        "FastestContributorSelector"
    }
}

/// Selects one named contributor, if it answers positively.
#[derive(Debug)]
pub struct SpecificContributorSelector {
    target: ComponentId,
    answer: Option<ContributorRecord>,
}

impl SpecificContributorSelector {
    pub fn new(target: ComponentId) -> Self {
        Self {
            target,
            answer: None,
        }
    }
}

impl ContributorSelector for SpecificContributorSelector {
    fn consider(&mut self, record: ContributorRecord) {
        if self.answer.is_none() && record.contributor == self.target {
            self.answer = Some(record);
        }
    }

    fn is_satisfied(&self) -> bool {
        self.answer.is_some()
    }

    fn selection(&self) -> Vec<ContributorRecord> {
        self.answer
            .iter()
            .filter(|record| record.is_positive())
            .cloned()
            .collect()
    }

    fn name(&self) -> &'static str {
        "SpecificContributorSelector"
    }
}

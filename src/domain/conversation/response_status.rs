//! Per-phase bookkeeping of which contributors have answered.

use std::collections::BTreeSet;

use crate::domain::foundation::ComponentId;

/// Outcome a pending contributor is moved into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContributorOutcome {
    Success,
    Failure,
}

/// Tracks the expected contributors of one phase.
///
/// # Invariants
///
/// - A contributor id is in at most one of `pending`, `succeeded`, `failed`
/// - Ids only ever move out of `pending`, never back into it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseStatus {
    pending: BTreeSet<ComponentId>,
    succeeded: BTreeSet<ComponentId>,
    failed: BTreeSet<ComponentId>,
}

impl ResponseStatus {
    /// Creates an empty status (nothing expected, therefore complete).
    pub fn new() -> Self {
        Self::default()
    }

    /// Resets the status for a new phase expecting the given contributors.
    pub fn register(&mut self, expected: impl IntoIterator<Item = ComponentId>) {
        self.pending = expected.into_iter().collect();
        self.succeeded.clear();
        self.failed.clear();
    }

    /// Records a positive answer. Returns false if `id` was not pending.
    pub fn record_success(&mut self, id: &ComponentId) -> bool {
        self.record(id, ContributorOutcome::Success)
    }

    /// Records a negative or failed answer. Returns false if `id` was not pending.
    pub fn record_failure(&mut self, id: &ComponentId) -> bool {
        self.record(id, ContributorOutcome::Failure)
    }

    fn record(&mut self, id: &ComponentId, outcome: ContributorOutcome) -> bool {
        if !self.pending.remove(id) {
            tracing::debug!(
                contributor = %id,
                ?outcome,
                "Ignoring response from contributor that is not pending"
            );
            return false;
        }
        match outcome {
            ContributorOutcome::Success => self.succeeded.insert(id.clone()),
            ContributorOutcome::Failure => self.failed.insert(id.clone()),
        };
        true
    }

    /// Moves every pending contributor into `outcome` and returns them.
    pub fn force_remaining(&mut self, outcome: ContributorOutcome) -> Vec<ComponentId> {
        let remaining: Vec<ComponentId> = std::mem::take(&mut self.pending).into_iter().collect();
        let target = match outcome {
            ContributorOutcome::Success => &mut self.succeeded,
            ContributorOutcome::Failure => &mut self.failed,
        };
        target.extend(remaining.iter().cloned());
        remaining
    }

    /// True when no contributor is pending.
    pub fn is_complete(&self) -> bool {
        self.pending.is_empty()
    }

    /// True if `id` is expected in this phase, answered or not.
    pub fn is_expected(&self, id: &ComponentId) -> bool {
        self.pending.contains(id) || self.succeeded.contains(id) || self.failed.contains(id)
    }

    /// True if `id` is still awaited.
    pub fn is_pending(&self, id: &ComponentId) -> bool {
        self.pending.contains(id)
    }

    pub fn pending(&self) -> Vec<ComponentId> {
        self.pending.iter().cloned().collect()
    }

    pub fn succeeded(&self) -> Vec<ComponentId> {
        self.succeeded.iter().cloned().collect()
    }

    pub fn failed(&self) -> Vec<ComponentId> {
        self.failed.iter().cloned().collect()
    }
}

//! Stage identity and status primitives shared by every approval chain.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifies one stage within a chain. Workflow modules declare these as
/// constants; the string doubles as the persisted column discriminator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct StageId(pub &'static str);

impl StageId {
    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Lifecycle status of a single stage.
///
/// `Skipped` marks stages the chain routed around (identity collision, branch
/// not taken, parked rework pass); `NotRelevant` marks administrative
/// termination. The two are distinct on the wire and must round-trip.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Pending,
    PendingApproval,
    Approved,
    Denied,
    Skipped,
    NotRelevant,
}

impl StageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageStatus::Pending => "pending",
            StageStatus::PendingApproval => "pending_approval",
            StageStatus::Approved => "approved",
            StageStatus::Denied => "denied",
            StageStatus::Skipped => "skipped",
            StageStatus::NotRelevant => "not_relevant",
        }
    }

    pub fn parse(value: &str) -> Option<StageStatus> {
        match value {
            "pending" => Some(StageStatus::Pending),
            "pending_approval" => Some(StageStatus::PendingApproval),
            "approved" => Some(StageStatus::Approved),
            "denied" => Some(StageStatus::Denied),
            "skipped" => Some(StageStatus::Skipped),
            "not_relevant" => Some(StageStatus::NotRelevant),
            _ => None,
        }
    }

    /// A stage in this status will never change again.
    pub fn is_settled(&self) -> bool {
        !matches!(self, StageStatus::Pending | StageStatus::PendingApproval)
    }
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered stage list with a status per stage. Order is fixed at construction
/// and never changes; only statuses move.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StageSet {
    stages: Vec<(StageId, StageStatus)>,
}

impl StageSet {
    /// All stages start `Pending`; activation is a separate, explicit step.
    pub fn new(order: &[StageId]) -> Self {
        Self { stages: order.iter().map(|id| (*id, StageStatus::Pending)).collect() }
    }

    /// Rebuild from persisted pairs. Order must match the workflow's order.
    pub fn from_pairs(pairs: Vec<(StageId, StageStatus)>) -> Self {
        Self { stages: pairs }
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn status(&self, id: StageId) -> Option<StageStatus> {
        self.stages.iter().find(|(sid, _)| *sid == id).map(|(_, st)| *st)
    }

    /// Returns false when the stage is unknown to this set.
    pub fn set(&mut self, id: StageId, status: StageStatus) -> bool {
        match self.stages.iter_mut().find(|(sid, _)| *sid == id) {
            Some((_, slot)) => {
                *slot = status;
                true
            }
            None => false,
        }
    }

    pub fn position(&self, id: StageId) -> Option<usize> {
        self.stages.iter().position(|(sid, _)| *sid == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (StageId, StageStatus)> + '_ {
        self.stages.iter().copied()
    }

    /// Stages currently awaiting a decision. The engine enforces that this
    /// has at most one element; the set itself does not.
    pub fn awaiting(&self) -> Vec<StageId> {
        self.stages
            .iter()
            .filter(|(_, st)| *st == StageStatus::PendingApproval)
            .map(|(id, _)| *id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: StageId = StageId("alpha");
    const B: StageId = StageId("beta");

    #[test]
    fn statuses_round_trip_through_strings() {
        for status in [
            StageStatus::Pending,
            StageStatus::PendingApproval,
            StageStatus::Approved,
            StageStatus::Denied,
            StageStatus::Skipped,
            StageStatus::NotRelevant,
        ] {
            assert_eq!(StageStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(StageStatus::parse("rejected"), None);
    }

    #[test]
    fn skipped_and_not_relevant_stay_distinct() {
        assert_ne!(StageStatus::Skipped.as_str(), StageStatus::NotRelevant.as_str());
    }

    #[test]
    fn set_rejects_unknown_stage() {
        let mut set = StageSet::new(&[A, B]);
        assert!(set.set(A, StageStatus::Approved));
        assert!(!set.set(StageId("gamma"), StageStatus::Approved));
        assert_eq!(set.status(A), Some(StageStatus::Approved));
        assert_eq!(set.status(B), Some(StageStatus::Pending));
    }

    #[test]
    fn awaiting_lists_only_pending_approval() {
        let mut set = StageSet::new(&[A, B]);
        assert!(set.awaiting().is_empty());
        set.set(B, StageStatus::PendingApproval);
        assert_eq!(set.awaiting(), vec![B]);
    }
}

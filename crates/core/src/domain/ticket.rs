use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::chain::{ChainEntity, StageSet};

use super::worker::{DepartmentId, WorkerId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TicketId(pub i64);

impl fmt::Display for TicketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProblemId(pub i64);

/// Maintenance and IT tickets share one entity and one chain shape; the kind
/// picks the problem catalog and the audience labels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketKind {
    Technical,
    It,
}

impl TicketKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketKind::Technical => "technical",
            TicketKind::It => "it",
        }
    }

    pub fn parse(value: &str) -> Option<TicketKind> {
        match value {
            "technical" => Some(TicketKind::Technical),
            "it" => Some(TicketKind::It),
            _ => None,
        }
    }
}

/// Catalog entry a ticket is opened against; carries the repair SLA budget.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Problem {
    pub id: ProblemId,
    pub kind: TicketKind,
    pub name: String,
    pub sla_hours: u32,
}

/// A maintenance or IT ticket: repair → confirmation, with a parked rework
/// pass that a low satisfaction score can open exactly once.
#[derive(Clone, Debug, PartialEq)]
pub struct Ticket {
    pub id: TicketId,
    pub kind: TicketKind,
    pub problem: Problem,
    pub description: String,
    pub requester_id: WorkerId,
    pub repairman_id: WorkerId,
    /// Resolved at creation: restaurant manager, or the territorial manager
    /// when the department has none.
    pub appraiser_id: WorkerId,
    pub department_id: DepartmentId,
    pub opened_at: DateTime<Utc>,
    pub deadline: DateTime<Utc>,
    pub repaired_at: Option<DateTime<Utc>>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub reopened_at: Option<DateTime<Utc>>,
    pub rework_deadline: Option<DateTime<Utc>>,
    pub rework_repaired_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    pub score: Option<u8>,
    pub confirmation_comment: Option<String>,
    pub close_comment: Option<String>,
    pub denial_reason: Option<String>,
    pub stages: StageSet,
}

impl ChainEntity for Ticket {
    fn stages(&self) -> &StageSet {
        &self.stages
    }
    fn stages_mut(&mut self) -> &mut StageSet {
        &mut self.stages
    }
    fn closed_at(&self) -> Option<DateTime<Utc>> {
        self.closed_at
    }
    fn set_closed_at(&mut self, at: Option<DateTime<Utc>>) {
        self.closed_at = at;
    }
    fn set_denial_reason(&mut self, reason: Option<String>) {
        self.denial_reason = reason;
    }
}

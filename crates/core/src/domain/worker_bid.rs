use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::chain::{ChainEntity, StageSet};

use super::worker::{DepartmentId, PostId, WorkerId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkerBidId(pub i64);

impl fmt::Display for WorkerBidId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// The person a hiring bid proposes to employ.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Candidate {
    pub first_name: String,
    pub last_name: String,
    pub patronymic: Option<String>,
    pub birth_date: NaiveDate,
    pub phone_number: String,
}

impl Candidate {
    pub fn full_name(&self) -> String {
        match &self.patronymic {
            Some(p) => format!("{} {} {}", self.last_name, self.first_name, p),
            None => format!("{} {}", self.last_name, self.first_name),
        }
    }
}

/// A hiring request walking the two-stage security → accounting chain.
#[derive(Clone, Debug, PartialEq)]
pub struct WorkerBid {
    pub id: WorkerBidId,
    pub candidate: Candidate,
    pub post_id: PostId,
    pub department_id: DepartmentId,
    pub sender_id: WorkerId,
    pub security_comment: Option<String>,
    pub accounting_comment: Option<String>,
    pub denial_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub stages: StageSet,
}

impl ChainEntity for WorkerBid {
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

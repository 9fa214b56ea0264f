use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::chain::{ChainEntity, StageSet};

use super::expenditure::Expenditure;
use super::worker::{DepartmentId, WorkerId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PaymentBidId(pub i64);

impl fmt::Display for PaymentBidId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Card,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
        }
    }

    pub fn parse(value: &str) -> Option<PaymentMethod> {
        match value {
            "cash" => Some(PaymentMethod::Cash),
            "card" => Some(PaymentMethod::Card),
            _ => None,
        }
    }
}

/// A request to spend money, walking the nine-stage payment chain.
#[derive(Clone, Debug, PartialEq)]
pub struct PaymentBid {
    pub id: PaymentBidId,
    pub amount: Decimal,
    pub payment_method: PaymentMethod,
    pub purpose: String,
    pub requester_id: WorkerId,
    pub department_id: DepartmentId,
    /// Chosen by the accountant on the cash branch; teller-cash fan-out falls
    /// back to `department_id` while this is unset.
    pub paying_department_id: Option<DepartmentId>,
    pub expenditure: Expenditure,
    pub comment: Option<String>,
    pub paying_comment: Option<String>,
    pub denial_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub stages: StageSet,
}

impl ChainEntity for PaymentBid {
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

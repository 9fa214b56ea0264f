use serde::{Deserialize, Serialize};

use super::worker::WorkerId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExpenditureId(pub i64);

/// Expenditure item a payment bid draws from. Carries the three direct
/// approver references for the front of the payment chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Expenditure {
    pub id: ExpenditureId,
    pub name: String,
    /// Financial-responsibility center approver.
    pub fac: WorkerId,
    /// Cost center approver.
    pub cc: WorkerId,
    pub paralegal: WorkerId,
}

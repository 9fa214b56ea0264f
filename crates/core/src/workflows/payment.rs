//! Payment bid chain: nine stages, two payment-method branches, an amount
//! threshold on the owner stage, and identity-collapse skips across the three
//! direct-approver stages at the front.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::chain::{
    Activation, ChainEngine, ChainError, ChainPolicy, StageId, StageSet, StageStatus,
};
use crate::domain::{
    ApprovalScope, DepartmentId, Expenditure, PaymentBid, PaymentBidId, PaymentMethod, WorkerId,
};
use crate::resolve::NotifyTarget;

use super::WorkflowSettings;

pub const FINANCIAL_CENTER: StageId = StageId("financial_center");
pub const COST_CENTER: StageId = StageId("cost_center");
pub const PARALEGAL: StageId = StageId("paralegal");
pub const AUDIT: StageId = StageId("audit");
pub const OWNER: StageId = StageId("owner");
pub const ACCOUNTANT_CARD: StageId = StageId("accountant_card");
pub const ACCOUNTANT_CASH: StageId = StageId("accountant_cash");
pub const TELLER_CARD: StageId = StageId("teller_card");
pub const TELLER_CASH: StageId = StageId("teller_cash");

pub const STAGES: [StageId; 9] = [
    FINANCIAL_CENTER,
    COST_CENTER,
    PARALEGAL,
    AUDIT,
    OWNER,
    ACCOUNTANT_CARD,
    ACCOUNTANT_CASH,
    TELLER_CARD,
    TELLER_CASH,
];

/// The direct approver a stage names, when it names one. Only the three
/// front stages are direct; everything after is scope-pooled.
pub fn direct_approver(bid: &PaymentBid, stage: StageId) -> Option<WorkerId> {
    match stage {
        FINANCIAL_CENTER => Some(bid.expenditure.fac),
        COST_CENTER => Some(bid.expenditure.cc),
        PARALEGAL => Some(bid.expenditure.paralegal),
        _ => None,
    }
}

#[derive(Clone, Copy, Debug)]
pub struct PaymentPolicy {
    pub owner_skip_below: Decimal,
}

impl PaymentPolicy {
    pub fn from_settings(settings: &WorkflowSettings) -> Self {
        Self { owner_skip_below: settings.owner_skip_below_amount() }
    }
}

impl ChainPolicy for PaymentPolicy {
    type Entity = PaymentBid;

    fn order(&self) -> &[StageId] {
        &STAGES
    }

    /// A direct stage is skipped when its approver already decided the
    /// preceding stage, or is the requester. Scope-pooled stages never skip
    /// on identity.
    fn skip_on_activation(
        &self,
        bid: &PaymentBid,
        decided: Option<StageId>,
        candidate: StageId,
    ) -> bool {
        let Some(approver) = direct_approver(bid, candidate) else {
            return false;
        };
        if approver == bid.requester_id {
            return true;
        }
        decided
            .and_then(|stage| direct_approver(bid, stage))
            .is_some_and(|previous| previous == approver)
    }

    fn notify_target(&self, bid: &PaymentBid, stage: StageId) -> Option<NotifyTarget> {
        match stage {
            FINANCIAL_CENTER | COST_CENTER | PARALEGAL => {
                direct_approver(bid, stage).map(NotifyTarget::Worker)
            }
            AUDIT => Some(NotifyTarget::Scope(ApprovalScope::PaymentAudit)),
            OWNER => Some(NotifyTarget::Scope(ApprovalScope::PaymentOwner)),
            ACCOUNTANT_CARD => Some(NotifyTarget::Scope(ApprovalScope::PaymentAccountantCard)),
            ACCOUNTANT_CASH => Some(NotifyTarget::Scope(ApprovalScope::PaymentAccountantCash)),
            TELLER_CARD => Some(NotifyTarget::Scope(ApprovalScope::PaymentTellerCard)),
            TELLER_CASH => Some(NotifyTarget::DepartmentScope {
                scope: ApprovalScope::PaymentTellerCash,
                department: bid.paying_department_id.unwrap_or(bid.department_id),
            }),
            _ => None,
        }
    }
}

pub struct NewPaymentBid {
    pub amount: Decimal,
    pub payment_method: PaymentMethod,
    pub purpose: String,
    pub requester_id: WorkerId,
    pub department_id: DepartmentId,
    pub expenditure: Expenditure,
    pub comment: Option<String>,
}

/// Build a bid with branch and threshold skips applied, then activate the
/// first live stage. The id is assigned by the store on insert.
pub fn create_payment_bid(
    input: NewPaymentBid,
    policy: &PaymentPolicy,
    now: DateTime<Utc>,
) -> Result<(PaymentBid, Activation), ChainError> {
    let mut stages = StageSet::new(&STAGES);
    match input.payment_method {
        PaymentMethod::Card => {
            stages.set(ACCOUNTANT_CASH, StageStatus::Skipped);
            stages.set(TELLER_CASH, StageStatus::Skipped);
        }
        PaymentMethod::Cash => {
            // Paralegal only reviews card payments.
            stages.set(PARALEGAL, StageStatus::Skipped);
            stages.set(ACCOUNTANT_CARD, StageStatus::Skipped);
            stages.set(TELLER_CARD, StageStatus::Skipped);
        }
    }
    if input.amount < policy.owner_skip_below {
        stages.set(OWNER, StageStatus::Skipped);
    }

    let mut bid = PaymentBid {
        id: PaymentBidId(0),
        amount: input.amount,
        payment_method: input.payment_method,
        purpose: input.purpose,
        requester_id: input.requester_id,
        department_id: input.department_id,
        paying_department_id: None,
        expenditure: input.expenditure,
        comment: input.comment,
        paying_comment: None,
        denial_reason: None,
        created_at: now,
        closed_at: None,
        stages,
    };

    let engine = ChainEngine::new(*policy);
    let activation = engine.activate_first(&mut bid, now)?;
    Ok((bid, activation))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::Decision;
    use crate::domain::ExpenditureId;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 3, 9, 0, 0).unwrap()
    }

    fn expenditure(fac: i64, cc: i64, paralegal: i64) -> Expenditure {
        Expenditure {
            id: ExpenditureId(1),
            name: "kitchen equipment".into(),
            fac: WorkerId(fac),
            cc: WorkerId(cc),
            paralegal: WorkerId(paralegal),
        }
    }

    fn new_bid(amount: i64, method: PaymentMethod, requester: i64, exp: Expenditure) -> NewPaymentBid {
        NewPaymentBid {
            amount: Decimal::from(amount),
            payment_method: method,
            purpose: "new fryer".into(),
            requester_id: WorkerId(requester),
            department_id: DepartmentId(7),
            expenditure: exp,
            comment: None,
        }
    }

    fn policy() -> PaymentPolicy {
        PaymentPolicy::from_settings(&WorkflowSettings::default())
    }

    #[test]
    fn card_bid_skips_cash_branch_and_keeps_paralegal() {
        let (bid, activation) = create_payment_bid(
            new_bid(50_000, PaymentMethod::Card, 99, expenditure(1, 2, 3)),
            &policy(),
            now(),
        )
        .unwrap();
        assert_eq!(activation.activated, Some(FINANCIAL_CENTER));
        assert_eq!(bid.stages.status(PARALEGAL), Some(StageStatus::Pending));
        assert_eq!(bid.stages.status(ACCOUNTANT_CASH), Some(StageStatus::Skipped));
        assert_eq!(bid.stages.status(TELLER_CASH), Some(StageStatus::Skipped));
        assert_eq!(bid.stages.status(OWNER), Some(StageStatus::Pending));
    }

    #[test]
    fn cash_bid_skips_paralegal_and_card_branch() {
        let (bid, _) = create_payment_bid(
            new_bid(50_000, PaymentMethod::Cash, 99, expenditure(1, 2, 3)),
            &policy(),
            now(),
        )
        .unwrap();
        assert_eq!(bid.stages.status(PARALEGAL), Some(StageStatus::Skipped));
        assert_eq!(bid.stages.status(ACCOUNTANT_CARD), Some(StageStatus::Skipped));
        assert_eq!(bid.stages.status(TELLER_CARD), Some(StageStatus::Skipped));
        assert_eq!(bid.stages.status(ACCOUNTANT_CASH), Some(StageStatus::Pending));
    }

    #[test]
    fn owner_stage_stays_at_the_cutoff_amount() {
        let (bid, _) = create_payment_bid(
            new_bid(30_000, PaymentMethod::Card, 99, expenditure(1, 2, 3)),
            &policy(),
            now(),
        )
        .unwrap();
        assert_eq!(bid.stages.status(OWNER), Some(StageStatus::Pending));
    }

    #[test]
    fn owner_stage_skipped_below_the_cutoff() {
        let (bid, _) = create_payment_bid(
            new_bid(29_999, PaymentMethod::Card, 99, expenditure(1, 2, 3)),
            &policy(),
            now(),
        )
        .unwrap();
        assert_eq!(bid.stages.status(OWNER), Some(StageStatus::Skipped));
    }

    #[test]
    fn requester_approver_collision_skips_at_creation() {
        // Requester is also the fac approver: the chain opens at cost center.
        let (bid, activation) = create_payment_bid(
            new_bid(50_000, PaymentMethod::Card, 1, expenditure(1, 2, 3)),
            &policy(),
            now(),
        )
        .unwrap();
        assert_eq!(activation.skipped, vec![FINANCIAL_CENTER]);
        assert_eq!(activation.activated, Some(COST_CENTER));
        assert_eq!(bid.stages.status(FINANCIAL_CENTER), Some(StageStatus::Skipped));
    }

    #[test]
    fn adjacent_identity_collapse_in_a_single_advance() {
        // fac, cc and paralegal are all the same person: one approval settles
        // all three and activates audit.
        let engine = ChainEngine::new(policy());
        let (mut bid, _) = create_payment_bid(
            new_bid(50_000, PaymentMethod::Card, 99, expenditure(5, 5, 5)),
            &policy(),
            now(),
        )
        .unwrap();
        let outcome = engine.advance(&mut bid, &Decision::Approve, now()).unwrap();
        assert_eq!(outcome.decided, FINANCIAL_CENTER);
        assert_eq!(outcome.skipped, vec![COST_CENTER, PARALEGAL]);
        assert_eq!(outcome.activated, Some(AUDIT));
        assert_eq!(bid.stages.awaiting(), vec![AUDIT]);
    }

    #[test]
    fn card_chain_walks_to_completion() {
        let engine = ChainEngine::new(policy());
        let (mut bid, _) = create_payment_bid(
            new_bid(50_000, PaymentMethod::Card, 99, expenditure(1, 2, 3)),
            &policy(),
            now(),
        )
        .unwrap();
        let mut visited = Vec::new();
        loop {
            visited.push(engine.current(&bid).unwrap());
            let outcome = engine.advance(&mut bid, &Decision::Approve, now()).unwrap();
            if outcome.closed {
                break;
            }
        }
        assert_eq!(
            visited,
            vec![FINANCIAL_CENTER, COST_CENTER, PARALEGAL, AUDIT, OWNER, ACCOUNTANT_CARD, TELLER_CARD]
        );
        assert!(bid.closed_at.is_some());
    }

    #[test]
    fn teller_cash_routes_to_paying_department_with_fallback() {
        let (mut bid, _) = create_payment_bid(
            new_bid(50_000, PaymentMethod::Cash, 99, expenditure(1, 2, 3)),
            &policy(),
            now(),
        )
        .unwrap();
        let p = policy();
        assert_eq!(
            p.notify_target(&bid, TELLER_CASH),
            Some(NotifyTarget::DepartmentScope {
                scope: ApprovalScope::PaymentTellerCash,
                department: DepartmentId(7),
            })
        );
        bid.paying_department_id = Some(DepartmentId(12));
        assert_eq!(
            p.notify_target(&bid, TELLER_CASH),
            Some(NotifyTarget::DepartmentScope {
                scope: ApprovalScope::PaymentTellerCash,
                department: DepartmentId(12),
            })
        );
    }
}

//! Hiring bid chain: security service vets the candidate, accounting
//! registers them. Both stages are scope-pooled; no skip rules apply.

use chrono::{DateTime, Utc};

use crate::chain::{Activation, ChainEngine, ChainError, ChainPolicy, StageId, StageSet};
use crate::domain::{ApprovalScope, Candidate, DepartmentId, PostId, WorkerBid, WorkerBidId, WorkerId};
use crate::resolve::NotifyTarget;

pub const SECURITY: StageId = StageId("security");
pub const ACCOUNTING: StageId = StageId("accounting");

pub const STAGES: [StageId; 2] = [SECURITY, ACCOUNTING];

#[derive(Clone, Copy, Debug, Default)]
pub struct HiringPolicy;

impl ChainPolicy for HiringPolicy {
    type Entity = WorkerBid;

    fn order(&self) -> &[StageId] {
        &STAGES
    }

    fn notify_target(&self, _bid: &WorkerBid, stage: StageId) -> Option<NotifyTarget> {
        match stage {
            SECURITY => Some(NotifyTarget::Scope(ApprovalScope::HiringSecurity)),
            ACCOUNTING => Some(NotifyTarget::Scope(ApprovalScope::HiringAccounting)),
            _ => None,
        }
    }
}

pub struct NewWorkerBid {
    pub candidate: Candidate,
    pub post_id: PostId,
    pub department_id: DepartmentId,
    pub sender_id: WorkerId,
}

pub fn create_worker_bid(
    input: NewWorkerBid,
    now: DateTime<Utc>,
) -> Result<(WorkerBid, Activation), ChainError> {
    let mut bid = WorkerBid {
        id: WorkerBidId(0),
        candidate: input.candidate,
        post_id: input.post_id,
        department_id: input.department_id,
        sender_id: input.sender_id,
        security_comment: None,
        accounting_comment: None,
        denial_reason: None,
        created_at: now,
        closed_at: None,
        stages: StageSet::new(&STAGES),
    };
    let engine = ChainEngine::new(HiringPolicy);
    let activation = engine.activate_first(&mut bid, now)?;
    Ok((bid, activation))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{Decision, StageStatus};
    use chrono::{NaiveDate, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 3, 9, 0, 0).unwrap()
    }

    fn new_bid() -> NewWorkerBid {
        NewWorkerBid {
            candidate: Candidate {
                first_name: "Anna".into(),
                last_name: "Petrova".into(),
                patronymic: None,
                birth_date: NaiveDate::from_ymd_opt(1995, 3, 14).unwrap(),
                phone_number: "+70000000000".into(),
            },
            post_id: PostId(4),
            department_id: DepartmentId(7),
            sender_id: WorkerId(11),
        }
    }

    #[test]
    fn opens_at_security() {
        let (bid, activation) = create_worker_bid(new_bid(), now()).unwrap();
        assert_eq!(activation.activated, Some(SECURITY));
        assert_eq!(bid.stages.status(ACCOUNTING), Some(StageStatus::Pending));
    }

    #[test]
    fn security_denial_absorbs_the_chain() {
        let engine = ChainEngine::new(HiringPolicy);
        let (mut bid, _) = create_worker_bid(new_bid(), now()).unwrap();
        let outcome = engine
            .advance(&mut bid, &Decision::Deny { reason: "failed background check".into() }, now())
            .unwrap();
        assert!(outcome.closed);
        assert_eq!(bid.stages.status(SECURITY), Some(StageStatus::Denied));
        assert_eq!(bid.stages.status(ACCOUNTING), Some(StageStatus::Skipped));
        assert_eq!(bid.denial_reason.as_deref(), Some("failed background check"));
    }

    #[test]
    fn full_approval_closes_after_accounting() {
        let engine = ChainEngine::new(HiringPolicy);
        let (mut bid, _) = create_worker_bid(new_bid(), now()).unwrap();
        let first = engine.advance(&mut bid, &Decision::Approve, now()).unwrap();
        assert_eq!(first.activated, Some(ACCOUNTING));
        let second = engine.advance(&mut bid, &Decision::Approve, now()).unwrap();
        assert!(second.closed);
        assert!(bid.closed_at.is_some());
    }
}

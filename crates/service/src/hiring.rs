use chrono::Utc;
use tracing::info;

use greenlight_core::chain::{Activation, AdvanceOutcome, ChainEngine, ChainPolicy, Decision};
use greenlight_core::domain::{WorkerBid, WorkerBidId};
use greenlight_core::errors::{ApplicationError, DomainError};
use greenlight_core::resolve::NotifyTarget;
use greenlight_core::workflows::hiring::{
    create_worker_bid, HiringPolicy, NewWorkerBid, ACCOUNTING, SECURITY,
};
use greenlight_notify::{messages, DispatchReport};

use crate::{map_repo, new_correlation_id, ChainService};

pub struct WorkerBidCreated {
    pub bid: WorkerBid,
    pub activation: Activation,
    pub dispatch: Option<DispatchReport>,
}

pub struct HiringDecision {
    pub bid: WorkerBid,
    pub outcome: AdvanceOutcome,
    pub dispatch: Option<DispatchReport>,
}

impl ChainService {
    pub async fn create_worker_bid(
        &self,
        input: NewWorkerBid,
    ) -> Result<WorkerBidCreated, ApplicationError> {
        let correlation_id = new_correlation_id();
        let (mut bid, activation) =
            create_worker_bid(input, Utc::now()).map_err(DomainError::from)?;
        bid.id = self.worker_bids.create(&bid).await.map_err(map_repo)?;

        info!(
            event_name = "hiring.created",
            correlation_id,
            bid_id = bid.id.0,
            "worker bid created"
        );

        let policy = HiringPolicy;
        let dispatch = match activation.activated.and_then(|s| policy.notify_target(&bid, s)) {
            Some(target) => Some(
                self.dispatcher
                    .dispatch(&target, &messages::hiring_stage_assigned(&bid), &correlation_id)
                    .await,
            ),
            None => None,
        };
        Ok(WorkerBidCreated { bid, activation, dispatch })
    }

    /// Decide the active stage, recording the reviewer's comment against it.
    pub async fn decide_worker_bid(
        &self,
        id: WorkerBidId,
        decision: Decision,
        comment: Option<String>,
    ) -> Result<HiringDecision, ApplicationError> {
        let correlation_id = new_correlation_id();
        let mut bid = self
            .worker_bids
            .find_by_id(id)
            .await
            .map_err(map_repo)?
            .ok_or_else(|| ApplicationError::not_found("worker bid", id.0))?;

        let engine = ChainEngine::new(HiringPolicy);
        let guard = engine.current(&bid).map_err(DomainError::from)?;
        if comment.is_some() {
            if guard == SECURITY {
                bid.security_comment = comment;
            } else if guard == ACCOUNTING {
                bid.accounting_comment = comment;
            }
        }

        let outcome = engine.advance(&mut bid, &decision, Utc::now()).map_err(DomainError::from)?;
        self.worker_bids.update_guarded(&bid, guard).await.map_err(map_repo)?;

        info!(
            event_name = "hiring.decided",
            correlation_id,
            bid_id = bid.id.0,
            stage = guard.as_str(),
            decision = outcome.decision.as_str(),
            closed = outcome.closed,
            "hiring stage decided"
        );

        let dispatch = if let Some(stage) = outcome.activated {
            match HiringPolicy.notify_target(&bid, stage) {
                Some(target) => Some(
                    self.dispatcher
                        .dispatch(&target, &messages::hiring_stage_assigned(&bid), &correlation_id)
                        .await,
                ),
                None => None,
            }
        } else {
            let text = match outcome.decision {
                greenlight_core::chain::StageStatus::Denied => messages::hiring_denied(&bid),
                _ => messages::hiring_approved(&bid),
            };
            Some(
                self.dispatcher
                    .dispatch(&NotifyTarget::Worker(bid.sender_id), &text, &correlation_id)
                    .await,
            )
        };
        Ok(HiringDecision { bid, outcome, dispatch })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::NaiveDate;

    use greenlight_core::chain::StageStatus;
    use greenlight_core::domain::{
        ApprovalScope, Candidate, DepartmentId, PostId, Worker, WorkerId,
    };
    use greenlight_core::sla::WorkCalendar;
    use greenlight_core::workflows::WorkflowSettings;
    use greenlight_db::repositories::{
        InMemoryPaymentBidRepository, InMemoryTicketRepository, InMemoryWorkerBidRepository,
        InMemoryWorkerDirectory,
    };
    use greenlight_notify::RecordingNotifier;

    use super::*;

    fn worker(id: i64, telegram_id: i64) -> Worker {
        Worker {
            id: WorkerId(id),
            first_name: "Test".into(),
            last_name: format!("Worker{id}"),
            patronymic: None,
            phone_number: String::new(),
            telegram_id: Some(telegram_id),
            post_id: PostId(1),
            department_id: DepartmentId(1),
        }
    }

    struct Harness {
        service: ChainService,
        notifier: Arc<RecordingNotifier>,
    }

    async fn harness() -> Harness {
        let directory = Arc::new(InMemoryWorkerDirectory::new());
        directory.add(worker(8, 1008), vec![ApprovalScope::HiringSecurity]).await;
        directory.add(worker(9, 1009), vec![ApprovalScope::HiringAccounting]).await;
        directory.add(worker(11, 1011), vec![]).await; // sender
        let notifier = Arc::new(RecordingNotifier::new());
        let service = ChainService::new(
            Arc::new(InMemoryPaymentBidRepository::new()),
            Arc::new(InMemoryWorkerBidRepository::new()),
            Arc::new(InMemoryTicketRepository::new()),
            directory,
            notifier.clone(),
            WorkflowSettings::default(),
            WorkCalendar::default(),
        );
        Harness { service, notifier }
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
            post_id: PostId(10),
            department_id: DepartmentId(1),
            sender_id: WorkerId(11),
        }
    }

    #[tokio::test]
    async fn creation_notifies_security_pool() {
        let h = harness().await;
        let created = h.service.create_worker_bid(new_bid()).await.expect("create");
        assert_eq!(created.activation.activated, Some(SECURITY));
        let sent = h.notifier.sent().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, 1008);
    }

    #[tokio::test]
    async fn full_approval_notifies_the_sender() {
        let h = harness().await;
        let created = h.service.create_worker_bid(new_bid()).await.expect("create");

        let first = h
            .service
            .decide_worker_bid(created.bid.id, Decision::Approve, Some("clean record".into()))
            .await
            .expect("security approves");
        assert_eq!(first.outcome.activated, Some(ACCOUNTING));
        assert_eq!(first.bid.security_comment.as_deref(), Some("clean record"));

        let second = h
            .service
            .decide_worker_bid(created.bid.id, Decision::Approve, None)
            .await
            .expect("accounting approves");
        assert!(second.outcome.closed);
        assert_eq!(second.bid.stages.status(ACCOUNTING), Some(StageStatus::Approved));

        let sent = h.notifier.sent().await;
        let last = sent.last().expect("sender notice");
        assert_eq!(last.0, 1011);
        assert!(last.1.contains("approved"));
    }

    #[tokio::test]
    async fn security_denial_closes_and_informs_the_sender() {
        let h = harness().await;
        let created = h.service.create_worker_bid(new_bid()).await.expect("create");

        let decided = h
            .service
            .decide_worker_bid(
                created.bid.id,
                Decision::Deny { reason: "failed background check".into() },
                None,
            )
            .await
            .expect("deny");

        assert!(decided.outcome.closed);
        assert_eq!(decided.bid.stages.status(ACCOUNTING), Some(StageStatus::Skipped));
        let sent = h.notifier.sent().await;
        let last = sent.last().expect("sender notice");
        assert_eq!(last.0, 1011);
        assert!(last.1.contains("failed background check"));
    }
}

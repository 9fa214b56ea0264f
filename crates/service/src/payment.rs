use chrono::Utc;
use tracing::info;

use greenlight_core::chain::{Activation, AdvanceOutcome, ChainEngine, Decision, ChainPolicy};
use greenlight_core::domain::{DepartmentId, PaymentBid, PaymentBidId, WorkerId};
use greenlight_core::errors::{ApplicationError, DomainError};
use greenlight_core::resolve::NotifyTarget;
use greenlight_core::workflows::payment::{create_payment_bid, NewPaymentBid, PaymentPolicy};
use greenlight_db::repositories::CoordinationEntry;
use greenlight_notify::{messages, DispatchReport};

use crate::{map_repo, new_correlation_id, ChainService};

pub struct PaymentCreated {
    pub bid: PaymentBid,
    pub activation: Activation,
    pub dispatch: Option<DispatchReport>,
}

#[derive(Debug)]
pub struct PaymentDecision {
    pub bid: PaymentBid,
    pub outcome: AdvanceOutcome,
    pub dispatch: Option<DispatchReport>,
}

/// Accountant-cash stage details: where the money is paid out and any note.
#[derive(Clone, Debug, Default)]
pub struct PayoutDetails {
    pub paying_department: Option<DepartmentId>,
    pub paying_comment: Option<String>,
}

impl ChainService {
    pub async fn create_payment_bid(
        &self,
        input: NewPaymentBid,
    ) -> Result<PaymentCreated, ApplicationError> {
        let correlation_id = new_correlation_id();
        let policy = PaymentPolicy::from_settings(&self.settings);
        let (mut bid, activation) =
            create_payment_bid(input, &policy, Utc::now()).map_err(DomainError::from)?;

        bid.id = self.payment_bids.create(&bid).await.map_err(map_repo)?;
        info!(
            event_name = "payment.created",
            correlation_id,
            bid_id = bid.id.0,
            activated = activation.activated.map(|s| s.as_str()),
            closed = activation.closed,
            "payment bid created"
        );

        let dispatch = if let Some(stage) = activation.activated {
            self.notify_payment_stage(&policy, &bid, stage, &correlation_id).await
        } else {
            // every stage skipped at creation; tell the requester directly
            Some(
                self.dispatcher
                    .dispatch(
                        &NotifyTarget::Worker(bid.requester_id),
                        &messages::payment_bid_approved(&bid),
                        &correlation_id,
                    )
                    .await,
            )
        };
        Ok(PaymentCreated { bid, activation, dispatch })
    }

    /// Apply a coordinator's decision to the bid's active stage.
    pub async fn decide_payment_bid(
        &self,
        id: PaymentBidId,
        actor: WorkerId,
        decision: Decision,
        payout: Option<PayoutDetails>,
    ) -> Result<PaymentDecision, ApplicationError> {
        let correlation_id = new_correlation_id();
        let mut bid = self
            .payment_bids
            .find_by_id(id)
            .await
            .map_err(map_repo)?
            .ok_or_else(|| ApplicationError::not_found("payment bid", id.0))?;

        let policy = PaymentPolicy::from_settings(&self.settings);
        let engine = ChainEngine::new(policy);
        let guard = engine.current(&bid).map_err(DomainError::from)?;
        let now = Utc::now();

        if let Some(payout) = payout {
            if let Some(department) = payout.paying_department {
                bid.paying_department_id = Some(department);
            }
            if payout.paying_comment.is_some() {
                bid.paying_comment = payout.paying_comment;
            }
        }

        let outcome = engine.advance(&mut bid, &decision, now).map_err(DomainError::from)?;
        self.payment_bids.update_guarded(&bid, guard).await.map_err(map_repo)?;
        self.payment_bids
            .append_coordination(&CoordinationEntry {
                bid_id: bid.id,
                stage: guard,
                worker_id: actor,
                decision: outcome.decision,
                decided_at: now,
            })
            .await
            .map_err(map_repo)?;

        info!(
            event_name = "payment.decided",
            correlation_id,
            bid_id = bid.id.0,
            stage = guard.as_str(),
            decision = outcome.decision.as_str(),
            activated = outcome.activated.map(|s| s.as_str()),
            closed = outcome.closed,
            "payment stage decided"
        );

        let dispatch = if let Some(stage) = outcome.activated {
            self.notify_payment_stage(&policy, &bid, stage, &correlation_id).await
        } else {
            let text = match outcome.decision {
                greenlight_core::chain::StageStatus::Denied => messages::payment_bid_denied(&bid),
                _ => messages::payment_bid_approved(&bid),
            };
            Some(
                self.dispatcher
                    .dispatch(&NotifyTarget::Worker(bid.requester_id), &text, &correlation_id)
                    .await,
            )
        };
        Ok(PaymentDecision { bid, outcome, dispatch })
    }

    async fn notify_payment_stage(
        &self,
        policy: &PaymentPolicy,
        bid: &PaymentBid,
        stage: greenlight_core::chain::StageId,
        correlation_id: &str,
    ) -> Option<DispatchReport> {
        let target = policy.notify_target(bid, stage)?;
        Some(
            self.dispatcher
                .dispatch(&target, &messages::payment_stage_assigned(bid), correlation_id)
                .await,
        )
    }
}

//! Generic sequential approval chain.
//!
//! A chain is an ordered list of stages, each in one [`StageStatus`]. Exactly
//! one stage may be `PendingApproval` while the chain is open. The engine
//! walks the list: approving the active stage activates the next non-skipped
//! stage, denying it settles everything that remains. All transitions are
//! pure over the entity; persistence and notification belong to the caller.

mod stage;

pub use stage::{StageId, StageSet, StageStatus};

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::resolve::NotifyTarget;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChainError {
    #[error("no stage is awaiting approval")]
    NoActiveStage,
    #[error("{0} stages are awaiting approval at once")]
    MultipleActiveStages(usize),
    #[error("stage `{0}` is not part of this chain")]
    UnknownStage(StageId),
    #[error("stage `{found}` is active where `{expected}` was required")]
    WrongStage { expected: StageId, found: StageId },
    #[error("chain was already reopened once")]
    AlreadyReopened,
}

/// The decision a coordinator hands to the active stage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Decision {
    Approve,
    Deny { reason: String },
}

/// An entity that carries an approval chain. Implemented by every bid and
/// ticket type; gives the engine uniform access to stage state and the
/// closure bookkeeping it owns.
pub trait ChainEntity {
    fn stages(&self) -> &StageSet;
    fn stages_mut(&mut self) -> &mut StageSet;
    fn closed_at(&self) -> Option<DateTime<Utc>>;
    fn set_closed_at(&mut self, at: Option<DateTime<Utc>>);
    fn set_denial_reason(&mut self, reason: Option<String>);
}

/// Per-workflow chain configuration: stage order, skip rules, notification
/// routing. One implementation per workflow; the engine stays generic.
pub trait ChainPolicy {
    type Entity: ChainEntity;

    /// Full stage order. `StageSet`s for this workflow use exactly this list.
    fn order(&self) -> &[StageId];

    /// Whether `candidate` should be skipped at the moment it would become
    /// active. `decided` is the stage whose approval triggered the scan, or
    /// `None` during creation-time activation.
    fn skip_on_activation(
        &self,
        _entity: &Self::Entity,
        _decided: Option<StageId>,
        _candidate: StageId,
    ) -> bool {
        false
    }

    /// Who to notify when `stage` becomes active. `None` means the stage has
    /// no coordinator audience (never the case in the shipped workflows, but
    /// the engine does not assume it).
    fn notify_target(&self, entity: &Self::Entity, stage: StageId) -> Option<NotifyTarget>;
}

/// Result of creation-time activation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Activation {
    pub activated: Option<StageId>,
    pub skipped: Vec<StageId>,
    /// True when every stage was skipped and the chain closed immediately.
    pub closed: bool,
}

/// Result of deciding the active stage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AdvanceOutcome {
    pub decided: StageId,
    pub decision: StageStatus,
    pub skipped: Vec<StageId>,
    pub activated: Option<StageId>,
    pub closed: bool,
}

/// Result of reopening a chain onto its parked rework stages.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReopenOutcome {
    pub confirmed: StageId,
    pub activated: StageId,
}

pub struct ChainEngine<P> {
    policy: P,
}

impl<P: ChainPolicy> ChainEngine<P> {
    pub fn new(policy: P) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    /// The single active stage. Zero or multiple active stages means the
    /// stored state violates the chain invariant.
    pub fn current(&self, entity: &P::Entity) -> Result<StageId, ChainError> {
        let awaiting = entity.stages().awaiting();
        match awaiting.len() {
            0 => Err(ChainError::NoActiveStage),
            1 => Ok(awaiting[0]),
            n => Err(ChainError::MultipleActiveStages(n)),
        }
    }

    /// Creation-time activation: walk from the front, applying skip rules with
    /// no preceding decision, until a stage activates or the chain closes.
    pub fn activate_first(
        &self,
        entity: &mut P::Entity,
        now: DateTime<Utc>,
    ) -> Result<Activation, ChainError> {
        if let Some(active) = entity.stages().awaiting().first().copied() {
            return Ok(Activation { activated: Some(active), skipped: Vec::new(), closed: false });
        }
        let (activated, skipped) = self.cascade(entity, None, 0)?;
        let closed = activated.is_none();
        if closed {
            self.close(entity, now);
        }
        Ok(Activation { activated, skipped, closed })
    }

    /// Apply `decision` to the active stage and roll the chain forward.
    pub fn advance(
        &self,
        entity: &mut P::Entity,
        decision: &Decision,
        now: DateTime<Utc>,
    ) -> Result<AdvanceOutcome, ChainError> {
        let current = self.current(entity)?;
        let position = entity
            .stages()
            .position(current)
            .ok_or(ChainError::UnknownStage(current))?;

        match decision {
            Decision::Approve => {
                entity.stages_mut().set(current, StageStatus::Approved);
                let (activated, skipped) = self.cascade(entity, Some(current), position + 1)?;
                let closed = activated.is_none();
                if closed {
                    self.close(entity, now);
                }
                Ok(AdvanceOutcome {
                    decided: current,
                    decision: StageStatus::Approved,
                    skipped,
                    activated,
                    closed,
                })
            }
            Decision::Deny { reason } => {
                entity.stages_mut().set(current, StageStatus::Denied);
                let skipped = self.settle_remaining(entity, StageStatus::Skipped);
                entity.set_denial_reason(Some(reason.clone()));
                self.close(entity, now);
                Ok(AdvanceOutcome {
                    decided: current,
                    decision: StageStatus::Denied,
                    skipped,
                    activated: None,
                    closed: true,
                })
            }
        }
    }

    /// Reopen onto parked rework stages: the active confirmation stage is
    /// recorded as approved, the first rework stage activates, the rest wait.
    /// Rework stages must still be parked `Skipped`; anything else means the
    /// chain was reopened before.
    pub fn reopen(
        &self,
        entity: &mut P::Entity,
        rework: &[StageId],
    ) -> Result<ReopenOutcome, ChainError> {
        let current = self.current(entity)?;
        for stage in rework {
            match entity.stages().status(*stage) {
                Some(StageStatus::Skipped) => {}
                Some(_) => return Err(ChainError::AlreadyReopened),
                None => return Err(ChainError::UnknownStage(*stage)),
            }
        }
        let first = rework.first().copied().ok_or(ChainError::NoActiveStage)?;
        entity.stages_mut().set(current, StageStatus::Approved);
        entity.stages_mut().set(first, StageStatus::PendingApproval);
        for stage in &rework[1..] {
            entity.stages_mut().set(*stage, StageStatus::Pending);
        }
        Ok(ReopenOutcome { confirmed: current, activated: first })
    }

    /// Settle every open stage with `terminal` and close the chain. Used for
    /// administrative closure (`NotRelevant`) and unresolved-rework
    /// finalization (`Skipped`).
    pub fn terminate(
        &self,
        entity: &mut P::Entity,
        terminal: StageStatus,
        now: DateTime<Utc>,
    ) -> Vec<StageId> {
        let settled = self.settle_remaining_including_active(entity, terminal);
        self.close(entity, now);
        settled
    }

    /// Forward scan from `from`: skip or activate each `Pending` stage until
    /// one activates. Stages already settled (branch skips, parked rework) are
    /// passed over untouched.
    fn cascade(
        &self,
        entity: &mut P::Entity,
        decided: Option<StageId>,
        from: usize,
    ) -> Result<(Option<StageId>, Vec<StageId>), ChainError> {
        let order: Vec<StageId> = self.policy.order().to_vec();
        let mut skipped = Vec::new();
        for stage in order.into_iter().skip(from) {
            match entity.stages().status(stage) {
                Some(StageStatus::Pending) => {
                    if self.policy.skip_on_activation(entity, decided, stage) {
                        entity.stages_mut().set(stage, StageStatus::Skipped);
                        skipped.push(stage);
                    } else {
                        entity.stages_mut().set(stage, StageStatus::PendingApproval);
                        return Ok((Some(stage), skipped));
                    }
                }
                Some(_) => {}
                None => return Err(ChainError::UnknownStage(stage)),
            }
        }
        Ok((None, skipped))
    }

    fn settle_remaining(&self, entity: &mut P::Entity, terminal: StageStatus) -> Vec<StageId> {
        let open: Vec<StageId> = entity
            .stages()
            .iter()
            .filter(|(_, st)| *st == StageStatus::Pending)
            .map(|(id, _)| id)
            .collect();
        for stage in &open {
            entity.stages_mut().set(*stage, terminal);
        }
        open
    }

    fn settle_remaining_including_active(
        &self,
        entity: &mut P::Entity,
        terminal: StageStatus,
    ) -> Vec<StageId> {
        let open: Vec<StageId> = entity
            .stages()
            .iter()
            .filter(|(_, st)| matches!(st, StageStatus::Pending | StageStatus::PendingApproval))
            .map(|(id, _)| id)
            .collect();
        for stage in &open {
            entity.stages_mut().set(*stage, terminal);
        }
        open
    }

    fn close(&self, entity: &mut P::Entity, now: DateTime<Utc>) {
        if entity.closed_at().is_none() {
            entity.set_closed_at(Some(now));
        }
    }
}

//! Maintenance / IT ticket chain.
//!
//! Four stages: repair and confirmation, plus a rework pair parked `Skipped`
//! at creation. A confirmation score below the threshold reopens the chain
//! onto the rework pair exactly once; a second low score closes the ticket
//! unresolved.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::chain::{
    ChainEngine, ChainError, ChainPolicy, Decision, ReopenOutcome, StageId, StageSet, StageStatus,
};
use crate::domain::{DepartmentId, Problem, Ticket, TicketId, TicketKind, WorkerId};
use crate::resolve::NotifyTarget;
use crate::sla::WorkCalendar;

use super::WorkflowSettings;

pub const REPAIR: StageId = StageId("repair");
pub const CONFIRMATION: StageId = StageId("confirmation");
pub const REWORK_REPAIR: StageId = StageId("rework_repair");
pub const REWORK_CONFIRMATION: StageId = StageId("rework_confirmation");

pub const STAGES: [StageId; 4] = [REPAIR, CONFIRMATION, REWORK_REPAIR, REWORK_CONFIRMATION];
const REWORK: [StageId; 2] = [REWORK_REPAIR, REWORK_CONFIRMATION];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TicketError {
    #[error(transparent)]
    Chain(#[from] ChainError),
    #[error("satisfaction score {0} is outside 1..=5")]
    InvalidScore(u8),
}

#[derive(Clone, Copy, Debug, Default)]
pub struct TicketPolicy;

impl ChainPolicy for TicketPolicy {
    type Entity = Ticket;

    fn order(&self) -> &[StageId] {
        &STAGES
    }

    fn notify_target(&self, ticket: &Ticket, stage: StageId) -> Option<NotifyTarget> {
        match stage {
            REPAIR | REWORK_REPAIR => Some(NotifyTarget::Worker(ticket.repairman_id)),
            CONFIRMATION | REWORK_CONFIRMATION => Some(NotifyTarget::Worker(ticket.appraiser_id)),
            _ => None,
        }
    }
}

pub struct NewTicket {
    pub kind: TicketKind,
    pub problem: Problem,
    pub description: String,
    pub requester_id: WorkerId,
    pub repairman_id: WorkerId,
    pub appraiser_id: WorkerId,
    pub department_id: DepartmentId,
}

/// Open a ticket: repair active, confirmation waiting, rework pair parked.
/// The deadline runs the problem's SLA budget through the work calendar.
pub fn open_ticket(
    input: NewTicket,
    calendar: &WorkCalendar,
    now: DateTime<Utc>,
) -> Result<Ticket, TicketError> {
    let mut stages = StageSet::new(&STAGES);
    stages.set(REWORK_REPAIR, StageStatus::Skipped);
    stages.set(REWORK_CONFIRMATION, StageStatus::Skipped);

    let deadline = calendar.deadline_after(now, input.problem.sla_hours);
    let mut ticket = Ticket {
        id: TicketId(0),
        kind: input.kind,
        problem: input.problem,
        description: input.description,
        requester_id: input.requester_id,
        repairman_id: input.repairman_id,
        appraiser_id: input.appraiser_id,
        department_id: input.department_id,
        opened_at: now,
        deadline,
        repaired_at: None,
        confirmed_at: None,
        reopened_at: None,
        rework_deadline: None,
        rework_repaired_at: None,
        closed_at: None,
        score: None,
        confirmation_comment: None,
        close_comment: None,
        denial_reason: None,
        stages,
    };
    let engine = ChainEngine::new(TicketPolicy);
    engine.activate_first(&mut ticket, now)?;
    Ok(ticket)
}

/// The repairman reports the work done; the appraiser's confirmation stage
/// activates. Valid on either repair pass.
pub fn complete_repair(ticket: &mut Ticket, now: DateTime<Utc>) -> Result<StageId, TicketError> {
    let engine = ChainEngine::new(TicketPolicy);
    let current = engine.current(ticket)?;
    if current != REPAIR && current != REWORK_REPAIR {
        return Err(ChainError::WrongStage { expected: REPAIR, found: current }.into());
    }
    if current == REPAIR {
        ticket.repaired_at = Some(now);
    } else {
        ticket.rework_repaired_at = Some(now);
    }
    let outcome = engine.advance(ticket, &Decision::Approve, now)?;
    // The confirmation stage directly follows each repair stage.
    outcome.activated.ok_or_else(|| ChainError::NoActiveStage.into())
}

/// What a confirmation score did to the ticket.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfirmationOutcome {
    /// Score met the threshold; the chain closed approved.
    Closed,
    /// First low score; the rework pass opened with a fresh deadline.
    Reopened { outcome: ReopenOutcome, rework_deadline: DateTime<Utc> },
    /// Second low score; the ticket closed unresolved.
    ClosedUnresolved,
}

/// The appraiser scores the repair 1..=5.
pub fn confirm(
    ticket: &mut Ticket,
    score: u8,
    comment: Option<String>,
    settings: &WorkflowSettings,
    calendar: &WorkCalendar,
    now: DateTime<Utc>,
) -> Result<ConfirmationOutcome, TicketError> {
    if !(1..=5).contains(&score) {
        return Err(TicketError::InvalidScore(score));
    }
    let engine = ChainEngine::new(TicketPolicy);
    let current = engine.current(ticket)?;
    if current != CONFIRMATION && current != REWORK_CONFIRMATION {
        return Err(ChainError::WrongStage { expected: CONFIRMATION, found: current }.into());
    }

    ticket.score = Some(score);
    if current == CONFIRMATION {
        ticket.confirmation_comment = comment;
        ticket.confirmed_at = Some(now);
    } else {
        ticket.close_comment = comment;
    }

    if score >= settings.reopen_below_score {
        engine.advance(ticket, &Decision::Approve, now)?;
        return Ok(ConfirmationOutcome::Closed);
    }

    if current == CONFIRMATION {
        let outcome = engine.reopen(ticket, &REWORK)?;
        let rework_deadline = calendar.deadline_after(now, settings.rework_sla_hours);
        ticket.reopened_at = Some(now);
        ticket.rework_deadline = Some(rework_deadline);
        Ok(ConfirmationOutcome::Reopened { outcome, rework_deadline })
    } else {
        engine.terminate(ticket, StageStatus::Skipped, now);
        Ok(ConfirmationOutcome::ClosedUnresolved)
    }
}

/// Administrative closure, e.g. when the requester leaves or the problem
/// evaporates. Open stages settle `NotRelevant`.
pub fn cancel_ticket(ticket: &mut Ticket, now: DateTime<Utc>) -> Vec<StageId> {
    let engine = ChainEngine::new(TicketPolicy);
    engine.terminate(ticket, StageStatus::NotRelevant, now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ProblemId;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 3, 12, 0, 0).unwrap()
    }

    fn new_ticket() -> NewTicket {
        NewTicket {
            kind: TicketKind::Technical,
            problem: Problem {
                id: ProblemId(1),
                kind: TicketKind::Technical,
                name: "fryer heating element".into(),
                sla_hours: 8,
            },
            description: "left fryer stays cold".into(),
            requester_id: WorkerId(1),
            repairman_id: WorkerId(2),
            appraiser_id: WorkerId(3),
            department_id: DepartmentId(7),
        }
    }

    fn settings() -> WorkflowSettings {
        WorkflowSettings::default()
    }

    fn calendar() -> WorkCalendar {
        WorkCalendar::default()
    }

    fn opened() -> Ticket {
        open_ticket(new_ticket(), &calendar(), now()).unwrap()
    }

    #[test]
    fn opens_with_rework_pair_parked() {
        let ticket = opened();
        assert_eq!(ticket.stages.awaiting(), vec![REPAIR]);
        assert_eq!(ticket.stages.status(REWORK_REPAIR), Some(StageStatus::Skipped));
        assert_eq!(ticket.stages.status(REWORK_CONFIRMATION), Some(StageStatus::Skipped));
        assert_eq!(ticket.deadline, calendar().deadline_after(now(), 8));
    }

    #[test]
    fn good_score_closes_the_ticket() {
        let mut ticket = opened();
        complete_repair(&mut ticket, now()).unwrap();
        let outcome =
            confirm(&mut ticket, 5, None, &settings(), &calendar(), now()).unwrap();
        assert_eq!(outcome, ConfirmationOutcome::Closed);
        assert!(ticket.closed_at.is_some());
        assert_eq!(ticket.stages.status(CONFIRMATION), Some(StageStatus::Approved));
    }

    #[test]
    fn threshold_score_counts_as_good() {
        let mut ticket = opened();
        complete_repair(&mut ticket, now()).unwrap();
        let outcome =
            confirm(&mut ticket, 3, None, &settings(), &calendar(), now()).unwrap();
        assert_eq!(outcome, ConfirmationOutcome::Closed);
    }

    #[test]
    fn low_score_reopens_once_with_fresh_deadline() {
        let mut ticket = opened();
        complete_repair(&mut ticket, now()).unwrap();
        let outcome = confirm(
            &mut ticket,
            2,
            Some("still cold".into()),
            &settings(),
            &calendar(),
            now(),
        )
        .unwrap();
        match outcome {
            ConfirmationOutcome::Reopened { rework_deadline, .. } => {
                assert_eq!(rework_deadline, calendar().deadline_after(now(), 24));
            }
            other => panic!("expected reopen, got {other:?}"),
        }
        assert_eq!(ticket.stages.awaiting(), vec![REWORK_REPAIR]);
        assert_eq!(ticket.reopened_at, Some(now()));
        assert!(ticket.closed_at.is_none());
    }

    #[test]
    fn second_low_score_closes_unresolved() {
        let mut ticket = opened();
        complete_repair(&mut ticket, now()).unwrap();
        confirm(&mut ticket, 1, None, &settings(), &calendar(), now()).unwrap();
        complete_repair(&mut ticket, now()).unwrap();
        let outcome =
            confirm(&mut ticket, 1, Some("give up".into()), &settings(), &calendar(), now())
                .unwrap();
        assert_eq!(outcome, ConfirmationOutcome::ClosedUnresolved);
        assert!(ticket.closed_at.is_some());
        assert!(ticket.stages.awaiting().is_empty());
        assert_eq!(ticket.close_comment.as_deref(), Some("give up"));
    }

    #[test]
    fn rework_confirmation_good_score_closes_approved() {
        let mut ticket = opened();
        complete_repair(&mut ticket, now()).unwrap();
        confirm(&mut ticket, 1, None, &settings(), &calendar(), now()).unwrap();
        complete_repair(&mut ticket, now()).unwrap();
        let outcome =
            confirm(&mut ticket, 4, None, &settings(), &calendar(), now()).unwrap();
        assert_eq!(outcome, ConfirmationOutcome::Closed);
        assert_eq!(
            ticket.stages.status(REWORK_CONFIRMATION),
            Some(StageStatus::Approved)
        );
    }

    #[test]
    fn score_outside_range_rejected() {
        let mut ticket = opened();
        complete_repair(&mut ticket, now()).unwrap();
        assert_eq!(
            confirm(&mut ticket, 0, None, &settings(), &calendar(), now()),
            Err(TicketError::InvalidScore(0))
        );
        assert_eq!(
            confirm(&mut ticket, 6, None, &settings(), &calendar(), now()),
            Err(TicketError::InvalidScore(6))
        );
    }

    #[test]
    fn confirm_during_repair_is_a_stage_error() {
        let mut ticket = opened();
        let err = confirm(&mut ticket, 4, None, &settings(), &calendar(), now()).unwrap_err();
        assert_eq!(
            err,
            TicketError::Chain(ChainError::WrongStage { expected: CONFIRMATION, found: REPAIR })
        );
    }

    #[test]
    fn cancel_settles_open_stages_not_relevant() {
        let mut ticket = opened();
        let settled = cancel_ticket(&mut ticket, now());
        assert_eq!(settled, vec![REPAIR, CONFIRMATION]);
        assert_eq!(ticket.stages.status(REPAIR), Some(StageStatus::NotRelevant));
        assert!(ticket.closed_at.is_some());
    }
}

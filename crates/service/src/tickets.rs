use chrono::Utc;
use tracing::info;

use greenlight_core::chain::{ChainEngine, StageId};
use greenlight_core::domain::{DepartmentId, ProblemId, Ticket, TicketId, TicketKind, WorkerId};
use greenlight_core::errors::{ApplicationError, DomainError};
use greenlight_core::resolve::NotifyTarget;
use greenlight_core::workflows::maintenance::{
    self, complete_repair, confirm, open_ticket, ConfirmationOutcome, NewTicket, TicketPolicy,
};
use greenlight_notify::{messages, DispatchReport};

use crate::{map_repo, new_correlation_id, ChainService};

pub struct OpenTicket {
    pub kind: TicketKind,
    pub problem_id: ProblemId,
    pub description: String,
    pub requester_id: WorkerId,
    pub repairman_id: WorkerId,
    pub appraiser_id: WorkerId,
    pub department_id: DepartmentId,
}

#[derive(Debug)]
pub struct TicketOpened {
    pub ticket: Ticket,
    pub dispatch: Option<DispatchReport>,
}

#[derive(Debug)]
pub struct TicketConfirmed {
    pub ticket: Ticket,
    pub outcome: ConfirmationOutcome,
    pub dispatch: Option<DispatchReport>,
}

impl ChainService {
    pub async fn open_ticket(&self, input: OpenTicket) -> Result<TicketOpened, ApplicationError> {
        let correlation_id = new_correlation_id();
        let problem = self
            .tickets
            .find_problem(input.problem_id)
            .await
            .map_err(map_repo)?
            .ok_or_else(|| ApplicationError::not_found("problem", input.problem_id.0))?;

        let mut ticket = open_ticket(
            NewTicket {
                kind: input.kind,
                problem,
                description: input.description,
                requester_id: input.requester_id,
                repairman_id: input.repairman_id,
                appraiser_id: input.appraiser_id,
                department_id: input.department_id,
            },
            &self.calendar,
            Utc::now(),
        )
        .map_err(DomainError::from)?;
        ticket.id = self.tickets.create(&ticket).await.map_err(map_repo)?;

        info!(
            event_name = "ticket.opened",
            correlation_id,
            ticket_id = ticket.id.0,
            kind = ticket.kind.as_str(),
            deadline = %ticket.deadline,
            "ticket opened"
        );

        let dispatch = Some(
            self.dispatcher
                .dispatch(
                    &NotifyTarget::Worker(ticket.repairman_id),
                    &messages::ticket_repair_assigned(&ticket),
                    &correlation_id,
                )
                .await,
        );
        Ok(TicketOpened { ticket, dispatch })
    }

    /// The repairman reports the (re)work done; the appraiser is asked to
    /// score it.
    pub async fn complete_ticket_repair(
        &self,
        id: TicketId,
    ) -> Result<TicketOpened, ApplicationError> {
        let correlation_id = new_correlation_id();
        let mut ticket = self.load_ticket(id).await?;

        let guard = self.current_stage(&ticket)?;
        let activated =
            complete_repair(&mut ticket, Utc::now()).map_err(DomainError::from)?;
        self.tickets.update_guarded(&ticket, guard).await.map_err(map_repo)?;

        info!(
            event_name = "ticket.repaired",
            correlation_id,
            ticket_id = ticket.id.0,
            stage = guard.as_str(),
            activated = activated.as_str(),
            "repair reported"
        );

        let dispatch = Some(
            self.dispatcher
                .dispatch(
                    &NotifyTarget::Worker(ticket.appraiser_id),
                    &messages::ticket_awaiting_confirmation(&ticket),
                    &correlation_id,
                )
                .await,
        );
        Ok(TicketOpened { ticket, dispatch })
    }

    /// The appraiser scores the repair. Low scores reopen once; a second low
    /// score closes the ticket unresolved.
    pub async fn confirm_ticket(
        &self,
        id: TicketId,
        score: u8,
        comment: Option<String>,
    ) -> Result<TicketConfirmed, ApplicationError> {
        let correlation_id = new_correlation_id();
        let mut ticket = self.load_ticket(id).await?;

        let guard = self.current_stage(&ticket)?;
        let outcome = confirm(&mut ticket, score, comment, &self.settings, &self.calendar, Utc::now())
            .map_err(DomainError::from)?;
        self.tickets.update_guarded(&ticket, guard).await.map_err(map_repo)?;

        info!(
            event_name = "ticket.confirmed",
            correlation_id,
            ticket_id = ticket.id.0,
            stage = guard.as_str(),
            score,
            outcome = ?outcome,
            "confirmation recorded"
        );

        let dispatch = match &outcome {
            ConfirmationOutcome::Closed => Some(
                self.dispatcher
                    .dispatch(
                        &NotifyTarget::Worker(ticket.requester_id),
                        &messages::ticket_closed(&ticket),
                        &correlation_id,
                    )
                    .await,
            ),
            ConfirmationOutcome::Reopened { rework_deadline, .. } => Some(
                self.dispatcher
                    .dispatch(
                        &NotifyTarget::Worker(ticket.repairman_id),
                        &messages::ticket_reopened(&ticket, *rework_deadline),
                        &correlation_id,
                    )
                    .await,
            ),
            ConfirmationOutcome::ClosedUnresolved => Some(
                self.dispatcher
                    .dispatch(
                        &NotifyTarget::Worker(ticket.requester_id),
                        &messages::ticket_closed_unresolved(&ticket),
                        &correlation_id,
                    )
                    .await,
            ),
        };
        Ok(TicketConfirmed { ticket, outcome, dispatch })
    }

    /// Administrative closure; open stages settle `NotRelevant`.
    pub async fn cancel_ticket(&self, id: TicketId) -> Result<TicketOpened, ApplicationError> {
        let correlation_id = new_correlation_id();
        let mut ticket = self.load_ticket(id).await?;

        maintenance::cancel_ticket(&mut ticket, Utc::now());
        self.tickets.update(&ticket).await.map_err(map_repo)?;

        info!(
            event_name = "ticket.cancelled",
            correlation_id,
            ticket_id = ticket.id.0,
            "ticket cancelled"
        );

        let dispatch = Some(
            self.dispatcher
                .dispatch(
                    &NotifyTarget::Worker(ticket.requester_id),
                    &messages::ticket_cancelled(&ticket),
                    &correlation_id,
                )
                .await,
        );
        Ok(TicketOpened { ticket, dispatch })
    }

    async fn load_ticket(&self, id: TicketId) -> Result<Ticket, ApplicationError> {
        self.tickets
            .find_by_id(id)
            .await
            .map_err(map_repo)?
            .ok_or_else(|| ApplicationError::not_found("ticket", id.0))
    }

    fn current_stage(&self, ticket: &Ticket) -> Result<StageId, ApplicationError> {
        ChainEngine::new(TicketPolicy)
            .current(ticket)
            .map_err(|err| DomainError::from(err).into())
    }
}

use async_trait::async_trait;
use sqlx::Row;

use greenlight_core::chain::{StageId, StageSet};
use greenlight_core::domain::{
    DepartmentId, Problem, ProblemId, Ticket, TicketId, TicketKind, WorkerId,
};
use greenlight_core::workflows::maintenance;

use super::{
    parse_stage_status, parse_timestamp, parse_timestamp_opt, RepositoryError, TicketRepository,
};
use crate::DbPool;

pub struct SqlTicketRepository {
    pool: DbPool,
}

impl SqlTicketRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn stage_column(stage: StageId) -> Option<&'static str> {
    match stage.as_str() {
        "repair" => Some("repair_state"),
        "confirmation" => Some("confirmation_state"),
        "rework_repair" => Some("rework_repair_state"),
        "rework_confirmation" => Some("rework_confirmation_state"),
        _ => None,
    }
}

fn stage_value(ticket: &Ticket, stage: StageId) -> Result<&'static str, RepositoryError> {
    ticket
        .stages
        .status(stage)
        .map(|st| st.as_str())
        .ok_or_else(|| RepositoryError::Decode(format!("ticket is missing stage `{stage}`")))
}

const SELECT_TICKET: &str = "SELECT t.id, t.kind, t.problem_id, t.description,
            t.requester_id, t.repairman_id, t.appraiser_id, t.department_id,
            t.opened_at, t.deadline, t.repaired_at, t.confirmed_at, t.reopened_at,
            t.rework_deadline, t.rework_repaired_at, t.closed_at,
            t.score, t.confirmation_comment, t.close_comment, t.denial_reason,
            t.repair_state, t.confirmation_state, t.rework_repair_state,
            t.rework_confirmation_state,
            p.kind AS problem_kind, p.name AS problem_name, p.sla_hours
     FROM tickets t
     JOIN problems p ON p.id = t.problem_id";

fn parse_kind(raw: &str, column: &str) -> Result<TicketKind, RepositoryError> {
    TicketKind::parse(raw)
        .ok_or_else(|| RepositoryError::Decode(format!("{column}: unknown kind `{raw}`")))
}

fn row_to_ticket(row: &sqlx::sqlite::SqliteRow) -> Result<Ticket, RepositoryError> {
    let decode = |e: sqlx::Error| RepositoryError::Decode(e.to_string());

    let id: i64 = row.try_get("id").map_err(decode)?;
    let kind_str: String = row.try_get("kind").map_err(decode)?;
    let problem_id: i64 = row.try_get("problem_id").map_err(decode)?;
    let description: String = row.try_get("description").map_err(decode)?;
    let requester_id: i64 = row.try_get("requester_id").map_err(decode)?;
    let repairman_id: i64 = row.try_get("repairman_id").map_err(decode)?;
    let appraiser_id: i64 = row.try_get("appraiser_id").map_err(decode)?;
    let department_id: i64 = row.try_get("department_id").map_err(decode)?;
    let opened_at: String = row.try_get("opened_at").map_err(decode)?;
    let deadline: String = row.try_get("deadline").map_err(decode)?;
    let repaired_at: Option<String> = row.try_get("repaired_at").map_err(decode)?;
    let confirmed_at: Option<String> = row.try_get("confirmed_at").map_err(decode)?;
    let reopened_at: Option<String> = row.try_get("reopened_at").map_err(decode)?;
    let rework_deadline: Option<String> = row.try_get("rework_deadline").map_err(decode)?;
    let rework_repaired_at: Option<String> =
        row.try_get("rework_repaired_at").map_err(decode)?;
    let closed_at: Option<String> = row.try_get("closed_at").map_err(decode)?;
    let score: Option<i64> = row.try_get("score").map_err(decode)?;
    let confirmation_comment: Option<String> =
        row.try_get("confirmation_comment").map_err(decode)?;
    let close_comment: Option<String> = row.try_get("close_comment").map_err(decode)?;
    let denial_reason: Option<String> = row.try_get("denial_reason").map_err(decode)?;
    let problem_kind: String = row.try_get("problem_kind").map_err(decode)?;
    let problem_name: String = row.try_get("problem_name").map_err(decode)?;
    let sla_hours: i64 = row.try_get("sla_hours").map_err(decode)?;

    let mut pairs = Vec::with_capacity(maintenance::STAGES.len());
    for stage in maintenance::STAGES {
        let column = stage_column(stage)
            .ok_or_else(|| RepositoryError::Decode(format!("no column for stage `{stage}`")))?;
        let raw: String = row.try_get(column).map_err(decode)?;
        pairs.push((stage, parse_stage_status(&raw, column)?));
    }

    let score = match score {
        Some(value) => Some(
            u8::try_from(value)
                .map_err(|_| RepositoryError::Decode(format!("score: out of range `{value}`")))?,
        ),
        None => None,
    };

    Ok(Ticket {
        id: TicketId(id),
        kind: parse_kind(&kind_str, "kind")?,
        problem: Problem {
            id: ProblemId(problem_id),
            kind: parse_kind(&problem_kind, "problem_kind")?,
            name: problem_name,
            sla_hours: u32::try_from(sla_hours)
                .map_err(|_| RepositoryError::Decode(format!("sla_hours: `{sla_hours}`")))?,
        },
        description,
        requester_id: WorkerId(requester_id),
        repairman_id: WorkerId(repairman_id),
        appraiser_id: WorkerId(appraiser_id),
        department_id: DepartmentId(department_id),
        opened_at: parse_timestamp(&opened_at, "opened_at")?,
        deadline: parse_timestamp(&deadline, "deadline")?,
        repaired_at: parse_timestamp_opt(repaired_at, "repaired_at")?,
        confirmed_at: parse_timestamp_opt(confirmed_at, "confirmed_at")?,
        reopened_at: parse_timestamp_opt(reopened_at, "reopened_at")?,
        rework_deadline: parse_timestamp_opt(rework_deadline, "rework_deadline")?,
        rework_repaired_at: parse_timestamp_opt(rework_repaired_at, "rework_repaired_at")?,
        closed_at: parse_timestamp_opt(closed_at, "closed_at")?,
        score,
        confirmation_comment,
        close_comment,
        denial_reason,
        stages: StageSet::from_pairs(pairs),
    })
}

fn bind_ticket_fields<'q>(
    query: sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>>,
    ticket: &'q Ticket,
) -> Result<sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>>, RepositoryError>
{
    Ok(query
        .bind(ticket.repaired_at.map(|dt| dt.to_rfc3339()))
        .bind(ticket.confirmed_at.map(|dt| dt.to_rfc3339()))
        .bind(ticket.reopened_at.map(|dt| dt.to_rfc3339()))
        .bind(ticket.rework_deadline.map(|dt| dt.to_rfc3339()))
        .bind(ticket.rework_repaired_at.map(|dt| dt.to_rfc3339()))
        .bind(ticket.closed_at.map(|dt| dt.to_rfc3339()))
        .bind(ticket.score.map(i64::from))
        .bind(&ticket.confirmation_comment)
        .bind(&ticket.close_comment)
        .bind(&ticket.denial_reason)
        .bind(stage_value(ticket, maintenance::REPAIR)?)
        .bind(stage_value(ticket, maintenance::CONFIRMATION)?)
        .bind(stage_value(ticket, maintenance::REWORK_REPAIR)?)
        .bind(stage_value(ticket, maintenance::REWORK_CONFIRMATION)?))
}

const UPDATE_SET: &str = "repaired_at = ?, confirmed_at = ?, reopened_at = ?,
                 rework_deadline = ?, rework_repaired_at = ?, closed_at = ?,
                 score = ?, confirmation_comment = ?, close_comment = ?, denial_reason = ?,
                 repair_state = ?, confirmation_state = ?, rework_repair_state = ?,
                 rework_confirmation_state = ?";

#[async_trait]
impl TicketRepository for SqlTicketRepository {
    async fn create(&self, ticket: &Ticket) -> Result<TicketId, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO tickets (kind, problem_id, description, requester_id, repairman_id,
                 appraiser_id, department_id, opened_at, deadline,
                 repair_state, confirmation_state, rework_repair_state, rework_confirmation_state)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(ticket.kind.as_str())
        .bind(ticket.problem.id.0)
        .bind(&ticket.description)
        .bind(ticket.requester_id.0)
        .bind(ticket.repairman_id.0)
        .bind(ticket.appraiser_id.0)
        .bind(ticket.department_id.0)
        .bind(ticket.opened_at.to_rfc3339())
        .bind(ticket.deadline.to_rfc3339())
        .bind(stage_value(ticket, maintenance::REPAIR)?)
        .bind(stage_value(ticket, maintenance::CONFIRMATION)?)
        .bind(stage_value(ticket, maintenance::REWORK_REPAIR)?)
        .bind(stage_value(ticket, maintenance::REWORK_CONFIRMATION)?)
        .execute(&self.pool)
        .await?;

        Ok(TicketId(result.last_insert_rowid()))
    }

    async fn find_by_id(&self, id: TicketId) -> Result<Option<Ticket>, RepositoryError> {
        let row = sqlx::query(&format!("{SELECT_TICKET} WHERE t.id = ?"))
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_ticket(r)?)),
            None => Ok(None),
        }
    }

    async fn update_guarded(&self, ticket: &Ticket, guard: StageId) -> Result<(), RepositoryError> {
        let guard_column = stage_column(guard)
            .ok_or_else(|| RepositoryError::Decode(format!("no column for stage `{guard}`")))?;
        let sql = format!(
            "UPDATE tickets SET {UPDATE_SET}
             WHERE id = ? AND {guard_column} = 'pending_approval'"
        );
        let query = bind_ticket_fields(sqlx::query(&sql), ticket)?.bind(ticket.id.0);
        let result = query.execute(&self.pool).await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::StaleStage { stage: guard.as_str().to_owned() });
        }
        Ok(())
    }

    async fn update(&self, ticket: &Ticket) -> Result<(), RepositoryError> {
        let sql = format!("UPDATE tickets SET {UPDATE_SET} WHERE id = ?");
        let query = bind_ticket_fields(sqlx::query(&sql), ticket)?.bind(ticket.id.0);
        query.execute(&self.pool).await?;
        Ok(())
    }

    async fn find_problem(&self, id: ProblemId) -> Result<Option<Problem>, RepositoryError> {
        let row = sqlx::query("SELECT id, kind, name, sla_hours FROM problems WHERE id = ?")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let decode = |e: sqlx::Error| RepositoryError::Decode(e.to_string());
        let kind_str: String = row.try_get("kind").map_err(decode)?;
        let sla_hours: i64 = row.try_get("sla_hours").map_err(decode)?;
        Ok(Some(Problem {
            id: ProblemId(row.try_get::<i64, _>("id").map_err(decode)?),
            kind: parse_kind(&kind_str, "kind")?,
            name: row.try_get("name").map_err(decode)?,
            sla_hours: u32::try_from(sla_hours)
                .map_err(|_| RepositoryError::Decode(format!("sla_hours: `{sla_hours}`")))?,
        }))
    }
}

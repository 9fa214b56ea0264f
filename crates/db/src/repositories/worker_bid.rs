use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::Row;

use greenlight_core::chain::{StageId, StageSet};
use greenlight_core::domain::{Candidate, DepartmentId, PostId, WorkerBid, WorkerBidId, WorkerId};
use greenlight_core::workflows::hiring;

use super::{
    parse_stage_status, parse_timestamp, parse_timestamp_opt, RepositoryError, WorkerBidRepository,
};
use crate::DbPool;

pub struct SqlWorkerBidRepository {
    pool: DbPool,
}

impl SqlWorkerBidRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn stage_column(stage: StageId) -> Option<&'static str> {
    match stage.as_str() {
        "security" => Some("security_state"),
        "accounting" => Some("accounting_state"),
        _ => None,
    }
}

fn stage_value(bid: &WorkerBid, stage: StageId) -> Result<&'static str, RepositoryError> {
    bid.stages
        .status(stage)
        .map(|st| st.as_str())
        .ok_or_else(|| RepositoryError::Decode(format!("bid is missing stage `{stage}`")))
}

const SELECT_BID: &str = "SELECT id, first_name, last_name, patronymic, birth_date, phone_number,
            post_id, department_id, sender_id, security_comment, accounting_comment,
            denial_reason, created_at, closed_at, security_state, accounting_state
     FROM worker_bids";

fn row_to_bid(row: &sqlx::sqlite::SqliteRow) -> Result<WorkerBid, RepositoryError> {
    let decode = |e: sqlx::Error| RepositoryError::Decode(e.to_string());

    let id: i64 = row.try_get("id").map_err(decode)?;
    let first_name: String = row.try_get("first_name").map_err(decode)?;
    let last_name: String = row.try_get("last_name").map_err(decode)?;
    let patronymic: Option<String> = row.try_get("patronymic").map_err(decode)?;
    let birth_date_str: String = row.try_get("birth_date").map_err(decode)?;
    let birth_date = NaiveDate::parse_from_str(&birth_date_str, "%Y-%m-%d")
        .map_err(|e| RepositoryError::Decode(format!("birth_date: {e}")))?;
    let phone_number: String = row.try_get("phone_number").map_err(decode)?;
    let post_id: i64 = row.try_get("post_id").map_err(decode)?;
    let department_id: i64 = row.try_get("department_id").map_err(decode)?;
    let sender_id: i64 = row.try_get("sender_id").map_err(decode)?;
    let security_comment: Option<String> = row.try_get("security_comment").map_err(decode)?;
    let accounting_comment: Option<String> =
        row.try_get("accounting_comment").map_err(decode)?;
    let denial_reason: Option<String> = row.try_get("denial_reason").map_err(decode)?;
    let created_at_str: String = row.try_get("created_at").map_err(decode)?;
    let closed_at_str: Option<String> = row.try_get("closed_at").map_err(decode)?;
    let security_raw: String = row.try_get("security_state").map_err(decode)?;
    let accounting_raw: String = row.try_get("accounting_state").map_err(decode)?;

    Ok(WorkerBid {
        id: WorkerBidId(id),
        candidate: Candidate {
            first_name,
            last_name,
            patronymic,
            birth_date,
            phone_number,
        },
        post_id: PostId(post_id),
        department_id: DepartmentId(department_id),
        sender_id: WorkerId(sender_id),
        security_comment,
        accounting_comment,
        denial_reason,
        created_at: parse_timestamp(&created_at_str, "created_at")?,
        closed_at: parse_timestamp_opt(closed_at_str, "closed_at")?,
        stages: StageSet::from_pairs(vec![
            (hiring::SECURITY, parse_stage_status(&security_raw, "security_state")?),
            (hiring::ACCOUNTING, parse_stage_status(&accounting_raw, "accounting_state")?),
        ]),
    })
}

#[async_trait]
impl WorkerBidRepository for SqlWorkerBidRepository {
    async fn create(&self, bid: &WorkerBid) -> Result<WorkerBidId, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO worker_bids (first_name, last_name, patronymic, birth_date,
                 phone_number, post_id, department_id, sender_id, created_at,
                 security_state, accounting_state)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&bid.candidate.first_name)
        .bind(&bid.candidate.last_name)
        .bind(&bid.candidate.patronymic)
        .bind(bid.candidate.birth_date.format("%Y-%m-%d").to_string())
        .bind(&bid.candidate.phone_number)
        .bind(bid.post_id.0)
        .bind(bid.department_id.0)
        .bind(bid.sender_id.0)
        .bind(bid.created_at.to_rfc3339())
        .bind(stage_value(bid, hiring::SECURITY)?)
        .bind(stage_value(bid, hiring::ACCOUNTING)?)
        .execute(&self.pool)
        .await?;

        Ok(WorkerBidId(result.last_insert_rowid()))
    }

    async fn find_by_id(&self, id: WorkerBidId) -> Result<Option<WorkerBid>, RepositoryError> {
        let row = sqlx::query(&format!("{SELECT_BID} WHERE id = ?"))
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_bid(r)?)),
            None => Ok(None),
        }
    }

    async fn update_guarded(&self, bid: &WorkerBid, guard: StageId) -> Result<(), RepositoryError> {
        let guard_column = stage_column(guard)
            .ok_or_else(|| RepositoryError::Decode(format!("no column for stage `{guard}`")))?;
        let result = sqlx::query(&format!(
            "UPDATE worker_bids SET
                 security_comment = ?, accounting_comment = ?, denial_reason = ?, closed_at = ?,
                 security_state = ?, accounting_state = ?
             WHERE id = ? AND {guard_column} = 'pending_approval'"
        ))
        .bind(&bid.security_comment)
        .bind(&bid.accounting_comment)
        .bind(&bid.denial_reason)
        .bind(bid.closed_at.map(|dt| dt.to_rfc3339()))
        .bind(stage_value(bid, hiring::SECURITY)?)
        .bind(stage_value(bid, hiring::ACCOUNTING)?)
        .bind(bid.id.0)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::StaleStage { stage: guard.as_str().to_owned() });
        }
        Ok(())
    }
}

use std::str::FromStr;

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::Row;

use greenlight_core::chain::{StageId, StageSet, StageStatus};
use greenlight_core::domain::{
    DepartmentId, Expenditure, ExpenditureId, PaymentBid, PaymentBidId, PaymentMethod, WorkerId,
};
use greenlight_core::workflows::payment;

use super::{
    parse_stage_status, parse_timestamp, parse_timestamp_opt, CoordinationEntry,
    PaymentBidRepository, RepositoryError,
};
use crate::DbPool;

pub struct SqlPaymentBidRepository {
    pool: DbPool,
}

impl SqlPaymentBidRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Stage id → stage column. The guard predicate is interpolated from this
/// fixed table, never from caller input.
fn stage_column(stage: StageId) -> Option<&'static str> {
    match stage.as_str() {
        "financial_center" => Some("financial_center_state"),
        "cost_center" => Some("cost_center_state"),
        "paralegal" => Some("paralegal_state"),
        "audit" => Some("audit_state"),
        "owner" => Some("owner_state"),
        "accountant_card" => Some("accountant_card_state"),
        "accountant_cash" => Some("accountant_cash_state"),
        "teller_card" => Some("teller_card_state"),
        "teller_cash" => Some("teller_cash_state"),
        _ => None,
    }
}

fn stage_value(bid: &PaymentBid, stage: StageId) -> Result<&'static str, RepositoryError> {
    bid.stages
        .status(stage)
        .map(|st| st.as_str())
        .ok_or_else(|| RepositoryError::Decode(format!("bid is missing stage `{stage}`")))
}

const SELECT_BID: &str = "SELECT pb.id, pb.amount, pb.payment_method, pb.purpose,
            pb.requester_id, pb.department_id, pb.paying_department_id, pb.expenditure_id,
            pb.comment, pb.paying_comment, pb.denial_reason, pb.created_at, pb.closed_at,
            pb.financial_center_state, pb.cost_center_state, pb.paralegal_state,
            pb.audit_state, pb.owner_state, pb.accountant_card_state,
            pb.accountant_cash_state, pb.teller_card_state, pb.teller_cash_state,
            e.name AS expenditure_name, e.fac_id, e.cc_id, e.paralegal_id
     FROM payment_bids pb
     JOIN expenditures e ON e.id = pb.expenditure_id";

fn row_to_bid(row: &sqlx::sqlite::SqliteRow) -> Result<PaymentBid, RepositoryError> {
    let decode = |e: sqlx::Error| RepositoryError::Decode(e.to_string());

    let id: i64 = row.try_get("id").map_err(decode)?;
    let amount_str: String = row.try_get("amount").map_err(decode)?;
    let amount = Decimal::from_str(&amount_str)
        .map_err(|e| RepositoryError::Decode(format!("amount: {e}")))?;
    let method_str: String = row.try_get("payment_method").map_err(decode)?;
    let payment_method = PaymentMethod::parse(&method_str).ok_or_else(|| {
        RepositoryError::Decode(format!("payment_method: unknown value `{method_str}`"))
    })?;
    let purpose: String = row.try_get("purpose").map_err(decode)?;
    let requester_id: i64 = row.try_get("requester_id").map_err(decode)?;
    let department_id: i64 = row.try_get("department_id").map_err(decode)?;
    let paying_department_id: Option<i64> =
        row.try_get("paying_department_id").map_err(decode)?;
    let expenditure_id: i64 = row.try_get("expenditure_id").map_err(decode)?;
    let comment: Option<String> = row.try_get("comment").map_err(decode)?;
    let paying_comment: Option<String> = row.try_get("paying_comment").map_err(decode)?;
    let denial_reason: Option<String> = row.try_get("denial_reason").map_err(decode)?;
    let created_at_str: String = row.try_get("created_at").map_err(decode)?;
    let closed_at_str: Option<String> = row.try_get("closed_at").map_err(decode)?;
    let expenditure_name: String = row.try_get("expenditure_name").map_err(decode)?;
    let fac_id: i64 = row.try_get("fac_id").map_err(decode)?;
    let cc_id: i64 = row.try_get("cc_id").map_err(decode)?;
    let paralegal_id: i64 = row.try_get("paralegal_id").map_err(decode)?;

    let mut pairs = Vec::with_capacity(payment::STAGES.len());
    for stage in payment::STAGES {
        let column = stage_column(stage)
            .ok_or_else(|| RepositoryError::Decode(format!("no column for stage `{stage}`")))?;
        let raw: String = row.try_get(column).map_err(decode)?;
        pairs.push((stage, parse_stage_status(&raw, column)?));
    }

    Ok(PaymentBid {
        id: PaymentBidId(id),
        amount,
        payment_method,
        purpose,
        requester_id: WorkerId(requester_id),
        department_id: DepartmentId(department_id),
        paying_department_id: paying_department_id.map(DepartmentId),
        expenditure: Expenditure {
            id: ExpenditureId(expenditure_id),
            name: expenditure_name,
            fac: WorkerId(fac_id),
            cc: WorkerId(cc_id),
            paralegal: WorkerId(paralegal_id),
        },
        comment,
        paying_comment,
        denial_reason,
        created_at: parse_timestamp(&created_at_str, "created_at")?,
        closed_at: parse_timestamp_opt(closed_at_str, "closed_at")?,
        stages: StageSet::from_pairs(pairs),
    })
}

#[async_trait]
impl PaymentBidRepository for SqlPaymentBidRepository {
    async fn create(&self, bid: &PaymentBid) -> Result<PaymentBidId, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO payment_bids (amount, payment_method, purpose, requester_id,
                 department_id, paying_department_id, expenditure_id, comment, paying_comment,
                 denial_reason, created_at, closed_at,
                 financial_center_state, cost_center_state, paralegal_state, audit_state,
                 owner_state, accountant_card_state, accountant_cash_state,
                 teller_card_state, teller_cash_state)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(bid.amount.to_string())
        .bind(bid.payment_method.as_str())
        .bind(&bid.purpose)
        .bind(bid.requester_id.0)
        .bind(bid.department_id.0)
        .bind(bid.paying_department_id.map(|d| d.0))
        .bind(bid.expenditure.id.0)
        .bind(&bid.comment)
        .bind(&bid.paying_comment)
        .bind(&bid.denial_reason)
        .bind(bid.created_at.to_rfc3339())
        .bind(bid.closed_at.map(|dt| dt.to_rfc3339()))
        .bind(stage_value(bid, payment::FINANCIAL_CENTER)?)
        .bind(stage_value(bid, payment::COST_CENTER)?)
        .bind(stage_value(bid, payment::PARALEGAL)?)
        .bind(stage_value(bid, payment::AUDIT)?)
        .bind(stage_value(bid, payment::OWNER)?)
        .bind(stage_value(bid, payment::ACCOUNTANT_CARD)?)
        .bind(stage_value(bid, payment::ACCOUNTANT_CASH)?)
        .bind(stage_value(bid, payment::TELLER_CARD)?)
        .bind(stage_value(bid, payment::TELLER_CASH)?)
        .execute(&self.pool)
        .await?;

        Ok(PaymentBidId(result.last_insert_rowid()))
    }

    async fn find_by_id(&self, id: PaymentBidId) -> Result<Option<PaymentBid>, RepositoryError> {
        let row = sqlx::query(&format!("{SELECT_BID} WHERE pb.id = ?"))
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_bid(r)?)),
            None => Ok(None),
        }
    }

    async fn update_guarded(
        &self,
        bid: &PaymentBid,
        guard: StageId,
    ) -> Result<(), RepositoryError> {
        let guard_column = stage_column(guard)
            .ok_or_else(|| RepositoryError::Decode(format!("no column for stage `{guard}`")))?;
        let result = sqlx::query(&format!(
            "UPDATE payment_bids SET
                 paying_department_id = ?, paying_comment = ?, denial_reason = ?, closed_at = ?,
                 financial_center_state = ?, cost_center_state = ?, paralegal_state = ?,
                 audit_state = ?, owner_state = ?, accountant_card_state = ?,
                 accountant_cash_state = ?, teller_card_state = ?, teller_cash_state = ?
             WHERE id = ? AND {guard_column} = 'pending_approval'"
        ))
        .bind(bid.paying_department_id.map(|d| d.0))
        .bind(&bid.paying_comment)
        .bind(&bid.denial_reason)
        .bind(bid.closed_at.map(|dt| dt.to_rfc3339()))
        .bind(stage_value(bid, payment::FINANCIAL_CENTER)?)
        .bind(stage_value(bid, payment::COST_CENTER)?)
        .bind(stage_value(bid, payment::PARALEGAL)?)
        .bind(stage_value(bid, payment::AUDIT)?)
        .bind(stage_value(bid, payment::OWNER)?)
        .bind(stage_value(bid, payment::ACCOUNTANT_CARD)?)
        .bind(stage_value(bid, payment::ACCOUNTANT_CASH)?)
        .bind(stage_value(bid, payment::TELLER_CARD)?)
        .bind(stage_value(bid, payment::TELLER_CASH)?)
        .bind(bid.id.0)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::StaleStage { stage: guard.as_str().to_owned() });
        }
        Ok(())
    }

    async fn append_coordination(&self, entry: &CoordinationEntry) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO payment_bid_coordinations (bid_id, stage, worker_id, decision, decided_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(entry.bid_id.0)
        .bind(entry.stage.as_str())
        .bind(entry.worker_id.0)
        .bind(entry.decision.as_str())
        .bind(entry.decided_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_awaiting(&self, stage: StageId) -> Result<Vec<PaymentBid>, RepositoryError> {
        let column = stage_column(stage)
            .ok_or_else(|| RepositoryError::Decode(format!("no column for stage `{stage}`")))?;
        let rows = sqlx::query(&format!(
            "{SELECT_BID} WHERE pb.{column} = 'pending_approval' ORDER BY pb.id"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_bid).collect()
    }
}

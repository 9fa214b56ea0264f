//! Repository traits and their SQL and in-memory implementations.
//!
//! Stage transitions are persisted through guarded updates: the UPDATE
//! predicate re-checks that the decided stage is still `pending_approval`,
//! and zero affected rows surfaces as [`RepositoryError::StaleStage`]. That
//! is the whole concurrency story for concurrent coordinators.

mod memory;
mod payment_bid;
mod ticket;
mod worker;
mod worker_bid;

pub use memory::{
    InMemoryPaymentBidRepository, InMemoryTicketRepository, InMemoryWorkerBidRepository,
    InMemoryWorkerDirectory,
};
pub use payment_bid::SqlPaymentBidRepository;
pub use ticket::SqlTicketRepository;
pub use worker::SqlWorkerRepository;
pub use worker_bid::SqlWorkerBidRepository;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use greenlight_core::chain::{StageId, StageStatus};
use greenlight_core::domain::{
    PaymentBid, PaymentBidId, Problem, ProblemId, Ticket, TicketId, WorkerBid, WorkerBidId,
    WorkerId,
};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("stored row cannot be decoded: {0}")]
    Decode(String),
    #[error("stage `{stage}` is no longer awaiting approval")]
    StaleStage { stage: String },
}

/// One row of the payment coordination log, appended per decision.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CoordinationEntry {
    pub bid_id: PaymentBidId,
    pub stage: StageId,
    pub worker_id: WorkerId,
    pub decision: StageStatus,
    pub decided_at: DateTime<Utc>,
}

#[async_trait]
pub trait PaymentBidRepository: Send + Sync {
    /// Insert and return the assigned id.
    async fn create(&self, bid: &PaymentBid) -> Result<PaymentBidId, RepositoryError>;

    async fn find_by_id(&self, id: PaymentBidId) -> Result<Option<PaymentBid>, RepositoryError>;

    /// Persist a decided bid. `guard` is the stage that was just decided;
    /// the write only lands if that stage is still awaiting approval.
    async fn update_guarded(&self, bid: &PaymentBid, guard: StageId)
        -> Result<(), RepositoryError>;

    async fn append_coordination(&self, entry: &CoordinationEntry) -> Result<(), RepositoryError>;

    /// Open bids whose given stage is awaiting approval.
    async fn list_awaiting(&self, stage: StageId) -> Result<Vec<PaymentBid>, RepositoryError>;
}

#[async_trait]
pub trait WorkerBidRepository: Send + Sync {
    async fn create(&self, bid: &WorkerBid) -> Result<WorkerBidId, RepositoryError>;

    async fn find_by_id(&self, id: WorkerBidId) -> Result<Option<WorkerBid>, RepositoryError>;

    async fn update_guarded(&self, bid: &WorkerBid, guard: StageId)
        -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait TicketRepository: Send + Sync {
    async fn create(&self, ticket: &Ticket) -> Result<TicketId, RepositoryError>;

    async fn find_by_id(&self, id: TicketId) -> Result<Option<Ticket>, RepositoryError>;

    async fn update_guarded(&self, ticket: &Ticket, guard: StageId)
        -> Result<(), RepositoryError>;

    /// Unguarded write, for administrative closure.
    async fn update(&self, ticket: &Ticket) -> Result<(), RepositoryError>;

    async fn find_problem(&self, id: ProblemId) -> Result<Option<Problem>, RepositoryError>;
}

pub(crate) fn parse_timestamp(raw: &str, column: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|err| RepositoryError::Decode(format!("{column}: {err}")))
}

pub(crate) fn parse_timestamp_opt(
    raw: Option<String>,
    column: &str,
) -> Result<Option<DateTime<Utc>>, RepositoryError> {
    raw.map(|s| parse_timestamp(&s, column)).transpose()
}

pub(crate) fn parse_stage_status(
    raw: &str,
    column: &str,
) -> Result<StageStatus, RepositoryError> {
    StageStatus::parse(raw)
        .ok_or_else(|| RepositoryError::Decode(format!("{column}: unknown status `{raw}`")))
}

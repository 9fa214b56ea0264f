//! In-memory repository doubles for service and dispatcher tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use greenlight_core::chain::{StageId, StageStatus};
use greenlight_core::domain::{
    ApprovalScope, DepartmentId, PaymentBid, PaymentBidId, Problem, ProblemId, Ticket, TicketId,
    Worker, WorkerBid, WorkerBidId, WorkerId,
};
use greenlight_core::resolve::{DirectoryError, WorkerDirectory};

use super::{
    CoordinationEntry, PaymentBidRepository, RepositoryError, TicketRepository,
    WorkerBidRepository,
};

fn check_guard(
    status: Option<StageStatus>,
    guard: StageId,
) -> Result<(), RepositoryError> {
    match status {
        Some(StageStatus::PendingApproval) => Ok(()),
        _ => Err(RepositoryError::StaleStage { stage: guard.as_str().to_owned() }),
    }
}

#[derive(Default)]
pub struct InMemoryPaymentBidRepository {
    bids: RwLock<HashMap<i64, PaymentBid>>,
    coordinations: RwLock<Vec<CoordinationEntry>>,
    next_id: AtomicI64,
}

impl InMemoryPaymentBidRepository {
    pub fn new() -> Self {
        Self { next_id: AtomicI64::new(1), ..Default::default() }
    }

    pub async fn coordination_log(&self) -> Vec<CoordinationEntry> {
        self.coordinations.read().await.clone()
    }
}

#[async_trait]
impl PaymentBidRepository for InMemoryPaymentBidRepository {
    async fn create(&self, bid: &PaymentBid) -> Result<PaymentBidId, RepositoryError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let mut stored = bid.clone();
        stored.id = PaymentBidId(id);
        self.bids.write().await.insert(id, stored);
        Ok(PaymentBidId(id))
    }

    async fn find_by_id(&self, id: PaymentBidId) -> Result<Option<PaymentBid>, RepositoryError> {
        Ok(self.bids.read().await.get(&id.0).cloned())
    }

    async fn update_guarded(
        &self,
        bid: &PaymentBid,
        guard: StageId,
    ) -> Result<(), RepositoryError> {
        let mut bids = self.bids.write().await;
        let stored = bids
            .get(&bid.id.0)
            .ok_or_else(|| RepositoryError::StaleStage { stage: guard.as_str().to_owned() })?;
        check_guard(stored.stages.status(guard), guard)?;
        bids.insert(bid.id.0, bid.clone());
        Ok(())
    }

    async fn append_coordination(&self, entry: &CoordinationEntry) -> Result<(), RepositoryError> {
        self.coordinations.write().await.push(entry.clone());
        Ok(())
    }

    async fn list_awaiting(&self, stage: StageId) -> Result<Vec<PaymentBid>, RepositoryError> {
        let bids = self.bids.read().await;
        let mut open: Vec<PaymentBid> = bids
            .values()
            .filter(|bid| bid.stages.status(stage) == Some(StageStatus::PendingApproval))
            .cloned()
            .collect();
        open.sort_by_key(|bid| bid.id.0);
        Ok(open)
    }
}

#[derive(Default)]
pub struct InMemoryWorkerBidRepository {
    bids: RwLock<HashMap<i64, WorkerBid>>,
    next_id: AtomicI64,
}

impl InMemoryWorkerBidRepository {
    pub fn new() -> Self {
        Self { bids: RwLock::default(), next_id: AtomicI64::new(1) }
    }
}

#[async_trait]
impl WorkerBidRepository for InMemoryWorkerBidRepository {
    async fn create(&self, bid: &WorkerBid) -> Result<WorkerBidId, RepositoryError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let mut stored = bid.clone();
        stored.id = WorkerBidId(id);
        self.bids.write().await.insert(id, stored);
        Ok(WorkerBidId(id))
    }

    async fn find_by_id(&self, id: WorkerBidId) -> Result<Option<WorkerBid>, RepositoryError> {
        Ok(self.bids.read().await.get(&id.0).cloned())
    }

    async fn update_guarded(&self, bid: &WorkerBid, guard: StageId) -> Result<(), RepositoryError> {
        let mut bids = self.bids.write().await;
        let stored = bids
            .get(&bid.id.0)
            .ok_or_else(|| RepositoryError::StaleStage { stage: guard.as_str().to_owned() })?;
        check_guard(stored.stages.status(guard), guard)?;
        bids.insert(bid.id.0, bid.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryTicketRepository {
    tickets: RwLock<HashMap<i64, Ticket>>,
    problems: RwLock<HashMap<i64, Problem>>,
    next_id: AtomicI64,
}

impl InMemoryTicketRepository {
    pub fn new() -> Self {
        Self {
            tickets: RwLock::default(),
            problems: RwLock::default(),
            next_id: AtomicI64::new(1),
        }
    }

    pub async fn add_problem(&self, problem: Problem) {
        self.problems.write().await.insert(problem.id.0, problem);
    }
}

#[async_trait]
impl TicketRepository for InMemoryTicketRepository {
    async fn create(&self, ticket: &Ticket) -> Result<TicketId, RepositoryError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let mut stored = ticket.clone();
        stored.id = TicketId(id);
        self.tickets.write().await.insert(id, stored);
        Ok(TicketId(id))
    }

    async fn find_by_id(&self, id: TicketId) -> Result<Option<Ticket>, RepositoryError> {
        Ok(self.tickets.read().await.get(&id.0).cloned())
    }

    async fn update_guarded(&self, ticket: &Ticket, guard: StageId) -> Result<(), RepositoryError> {
        let mut tickets = self.tickets.write().await;
        let stored = tickets
            .get(&ticket.id.0)
            .ok_or_else(|| RepositoryError::StaleStage { stage: guard.as_str().to_owned() })?;
        check_guard(stored.stages.status(guard), guard)?;
        tickets.insert(ticket.id.0, ticket.clone());
        Ok(())
    }

    async fn update(&self, ticket: &Ticket) -> Result<(), RepositoryError> {
        self.tickets.write().await.insert(ticket.id.0, ticket.clone());
        Ok(())
    }

    async fn find_problem(&self, id: ProblemId) -> Result<Option<Problem>, RepositoryError> {
        Ok(self.problems.read().await.get(&id.0).cloned())
    }
}

/// Directory double: workers paired with their post's scopes.
#[derive(Default)]
pub struct InMemoryWorkerDirectory {
    workers: RwLock<Vec<(Worker, Vec<ApprovalScope>)>>,
}

impl InMemoryWorkerDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add(&self, worker: Worker, scopes: Vec<ApprovalScope>) {
        self.workers.write().await.push((worker, scopes));
    }
}

#[async_trait]
impl WorkerDirectory for InMemoryWorkerDirectory {
    async fn find_by_id(&self, id: WorkerId) -> Result<Option<Worker>, DirectoryError> {
        Ok(self
            .workers
            .read()
            .await
            .iter()
            .find(|(worker, _)| worker.id == id)
            .map(|(worker, _)| worker.clone()))
    }

    async fn find_by_scope(&self, scope: ApprovalScope) -> Result<Vec<Worker>, DirectoryError> {
        Ok(self
            .workers
            .read()
            .await
            .iter()
            .filter(|(_, scopes)| scopes.contains(&scope))
            .map(|(worker, _)| worker.clone())
            .collect())
    }

    async fn find_by_scope_in_department(
        &self,
        scope: ApprovalScope,
        department: DepartmentId,
    ) -> Result<Vec<Worker>, DirectoryError> {
        Ok(self
            .workers
            .read()
            .await
            .iter()
            .filter(|(worker, scopes)| {
                worker.department_id == department && scopes.contains(&scope)
            })
            .map(|(worker, _)| worker.clone())
            .collect())
    }
}

//! Coordinator resolution: who a newly-activated stage should reach.
//!
//! Stage routing comes in three shapes. Direct stages name a worker outright.
//! Scope-pooled stages reach everyone whose post carries the scope. The
//! teller-cash stage additionally narrows the pool to one department.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{ApprovalScope, DepartmentId, Worker, WorkerId};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NotifyTarget {
    Worker(WorkerId),
    Scope(ApprovalScope),
    DepartmentScope { scope: ApprovalScope, department: DepartmentId },
}

#[derive(Debug, Error)]
#[error("worker directory lookup failed: {0}")]
pub struct DirectoryError(pub String);

/// Read-only directory of workers and their post scopes. Implemented by the
/// persistence layer; in-memory doubles exist for tests.
#[async_trait]
pub trait WorkerDirectory: Send + Sync {
    async fn find_by_id(&self, id: WorkerId) -> Result<Option<Worker>, DirectoryError>;

    async fn find_by_scope(&self, scope: ApprovalScope) -> Result<Vec<Worker>, DirectoryError>;

    async fn find_by_scope_in_department(
        &self,
        scope: ApprovalScope,
        department: DepartmentId,
    ) -> Result<Vec<Worker>, DirectoryError>;
}

impl NotifyTarget {
    /// Resolve to concrete workers. An empty result is a data-integrity
    /// condition the caller reports; it is not an error here.
    pub async fn resolve(
        &self,
        directory: &dyn WorkerDirectory,
    ) -> Result<Vec<Worker>, DirectoryError> {
        match self {
            NotifyTarget::Worker(id) => {
                Ok(directory.find_by_id(*id).await?.into_iter().collect())
            }
            NotifyTarget::Scope(scope) => directory.find_by_scope(*scope).await,
            NotifyTarget::DepartmentScope { scope, department } => {
                directory.find_by_scope_in_department(*scope, *department).await
            }
        }
    }
}

//! Layered error taxonomy.
//!
//! `DomainError` carries chain and workflow rule violations. `ApplicationError`
//! adds the orchestration concerns (missing rows, stale stages, storage and
//! delivery trouble). `InterfaceError` is what an operator or caller sees:
//! a category, a safe message, and the correlation id to grep the logs with.

use thiserror::Error;

use crate::chain::ChainError;
use crate::workflows::maintenance::TicketError;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error(transparent)]
    Chain(#[from] ChainError),
    #[error(transparent)]
    Ticket(#[from] TicketError),
    #[error("domain invariant violated: {0}")]
    Invariant(String),
}

#[derive(Debug, Error)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },
    #[error("stage `{stage}` was already decided")]
    StageConflict { stage: String },
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("integration failure: {0}")]
    Integration(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

impl ApplicationError {
    pub fn not_found(entity: &'static str, id: i64) -> Self {
        Self::NotFound { entity, id }
    }

    pub fn into_interface(self, correlation_id: &str) -> InterfaceError {
        let correlation_id = correlation_id.to_owned();
        match self {
            ApplicationError::NotFound { entity, id } => InterfaceError::NotFound {
                message: format!("{entity} {id} was not found"),
                correlation_id,
            },
            ApplicationError::StageConflict { stage } => InterfaceError::Conflict {
                message: format!("stage `{stage}` was already decided; refresh and review"),
                correlation_id,
            },
            ApplicationError::Domain(DomainError::Chain(ChainError::NoActiveStage)) => {
                InterfaceError::Conflict {
                    message: "nothing is awaiting approval on this chain".to_owned(),
                    correlation_id,
                }
            }
            ApplicationError::Domain(DomainError::Chain(ChainError::AlreadyReopened))
            | ApplicationError::Domain(DomainError::Ticket(TicketError::Chain(
                ChainError::AlreadyReopened,
            ))) => InterfaceError::Conflict {
                message: "this chain was already reopened once".to_owned(),
                correlation_id,
            },
            ApplicationError::Domain(DomainError::Ticket(TicketError::InvalidScore(score))) => {
                InterfaceError::BadRequest {
                    message: format!("score {score} must be between 1 and 5"),
                    correlation_id,
                }
            }
            ApplicationError::Domain(DomainError::Ticket(TicketError::Chain(
                ChainError::WrongStage { .. },
            )))
            | ApplicationError::Domain(DomainError::Chain(ChainError::WrongStage { .. })) => {
                InterfaceError::Conflict {
                    message: "the chain is not at the stage this operation expects".to_owned(),
                    correlation_id,
                }
            }
            ApplicationError::Persistence(_) | ApplicationError::Integration(_) => {
                InterfaceError::ServiceUnavailable {
                    message: "a backing service is unavailable; try again shortly".to_owned(),
                    correlation_id,
                }
            }
            // Remaining domain variants are stored-state invariant breaks.
            ApplicationError::Domain(_) | ApplicationError::Configuration(_) => {
                InterfaceError::Internal {
                    message: "an internal error occurred".to_owned(),
                    correlation_id,
                }
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum InterfaceError {
    #[error("{message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("{message}")]
    NotFound { message: String, correlation_id: String },
    #[error("{message}")]
    Conflict { message: String, correlation_id: String },
    #[error("{message}")]
    ServiceUnavailable { message: String, correlation_id: String },
    #[error("{message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn correlation_id(&self) -> &str {
        match self {
            InterfaceError::BadRequest { correlation_id, .. }
            | InterfaceError::NotFound { correlation_id, .. }
            | InterfaceError::Conflict { correlation_id, .. }
            | InterfaceError::ServiceUnavailable { correlation_id, .. }
            | InterfaceError::Internal { correlation_id, .. } => correlation_id,
        }
    }

    /// Message safe to show outside the logs; internal detail never leaks.
    pub fn user_message(&self) -> String {
        format!("{self} (ref: {})", self.correlation_id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stale_stage_maps_to_conflict() {
        let err = ApplicationError::StageConflict { stage: "audit".into() };
        match err.into_interface("corr-1") {
            InterfaceError::Conflict { message, correlation_id } => {
                assert!(message.contains("audit"));
                assert_eq!(correlation_id, "corr-1");
            }
            other => panic!("expected conflict, got {other:?}"),
        }
    }

    #[test]
    fn invariant_breaks_stay_internal_and_opaque() {
        let err = ApplicationError::Domain(DomainError::Chain(ChainError::MultipleActiveStages(2)));
        match err.into_interface("corr-2") {
            InterfaceError::Internal { message, .. } => {
                assert!(!message.contains("stages"));
            }
            other => panic!("expected internal, got {other:?}"),
        }
    }

    #[test]
    fn invalid_score_is_a_bad_request() {
        let err = ApplicationError::Domain(DomainError::Ticket(TicketError::InvalidScore(9)));
        assert!(matches!(err.into_interface("c"), InterfaceError::BadRequest { .. }));
    }

    #[test]
    fn user_message_carries_the_reference() {
        let err = ApplicationError::not_found("payment bid", 42).into_interface("corr-3");
        assert!(err.user_message().contains("corr-3"));
    }
}

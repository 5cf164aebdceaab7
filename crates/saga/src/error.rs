//! Saga error types.

use common::TicketId;
use domain::Operation;
use progress_store::ProgressStoreError;
use thiserror::Error;

/// Errors that can occur while running a saga.
#[derive(Debug, Error)]
pub enum SagaError {
    /// An operation failed in a way no plan branch handles.
    #[error("operation '{operation}' failed: {reason}")]
    OperationFailed { operation: Operation, reason: String },

    /// A transient failure persisted through every retry attempt.
    #[error("operation '{operation}' failed after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        operation: Operation,
        attempts: u32,
        last_error: String,
    },

    /// The plan asked for a different operation than the timeline recorded.
    #[error("step {step} replayed as '{expected}' but was recorded as '{recorded}'")]
    NonDeterministic {
        step: u32,
        expected: Operation,
        recorded: Operation,
    },

    /// An operation produced output of the wrong shape.
    #[error("operation '{operation}' returned unexpected output")]
    UnexpectedOutput { operation: Operation },

    /// The saga was aborted through the control surface.
    #[error("saga for ticket {0} aborted")]
    Aborted(TicketId),

    /// No saga is known for the ticket.
    #[error("unknown ticket: {0}")]
    UnknownTicket(TicketId),

    /// Another engine task already owns the ticket.
    #[error("saga for ticket {0} is already running")]
    AlreadyRunning(TicketId),

    /// Progress store error.
    #[error("progress store error: {0}")]
    Store(#[from] ProgressStoreError),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SagaError {
    /// Returns true for failures that halt the saga with a compensation
    /// unwind and a recorded `FAILED` status.
    ///
    /// Everything else is an infrastructure or caller error and is returned
    /// without touching the saga.
    pub fn is_fatal_workflow_failure(&self) -> bool {
        matches!(
            self,
            SagaError::OperationFailed { .. }
                | SagaError::RetriesExhausted { .. }
                | SagaError::NonDeterministic { .. }
                | SagaError::UnexpectedOutput { .. }
                | SagaError::Aborted(_)
        )
    }
}

/// Convenience type alias for saga results.
pub type Result<T> = std::result::Result<T, SagaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatal_classification() {
        assert!(
            SagaError::OperationFailed {
                operation: Operation::ApplyUrgentFix,
                reason: "boom".into(),
            }
            .is_fatal_workflow_failure()
        );
        assert!(SagaError::Aborted(TicketId::new("TKT-1")).is_fatal_workflow_failure());

        assert!(!SagaError::UnknownTicket(TicketId::new("TKT-1")).is_fatal_workflow_failure());
        assert!(
            !SagaError::Store(ProgressStoreError::Archived(TicketId::new("TKT-1")))
                .is_fatal_workflow_failure()
        );
    }

    #[test]
    fn retries_exhausted_message() {
        let err = SagaError::RetriesExhausted {
            operation: Operation::AssignAgent,
            attempts: 3,
            last_error: "agent directory timeout".into(),
        };
        assert_eq!(
            err.to_string(),
            "operation 'assign_agent' failed after 3 attempts: agent directory timeout"
        );
    }
}

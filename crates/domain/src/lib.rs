//! Domain layer for the ticket saga engine.
//!
//! This crate provides:
//! - Ticket, Priority and TicketStatus
//! - The vocabulary of external operations and their outcomes
//! - The saga timeline and the compensation stack
//! - The event-sourced `SagaState` aggregate and its `StatusSnapshot`

pub mod aggregate;
pub mod compensation;
pub mod error;
pub mod operation;
pub mod saga_state;
pub mod snapshot;
pub mod status;
pub mod ticket;
pub mod timeline;

pub use aggregate::{Aggregate, DomainEvent};
pub use common::{AgentId, TicketId};
pub use compensation::{CompensationAction, CompensationEntry, CompensationStack};
pub use error::DomainError;
pub use operation::{
    EscalationOutcome, FailureKind, FixOutcome, InvestigationOutcome, Operation, OperationOutput,
    RecordedOutcome, ResolutionMethod, TaskQueue,
};
pub use saga_state::SagaState;
pub use snapshot::StatusSnapshot;
pub use status::TicketStatus;
pub use ticket::{Priority, Ticket};
pub use timeline::{TimelineEntry, TimelineEvent};

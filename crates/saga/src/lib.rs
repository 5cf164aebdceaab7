//! Ticket resolution saga engine.
//!
//! A ticket runs one of three priority plans as a saga: a sequence of
//! external operations, each retried and timed out uniformly, whose
//! reversible side effects are tracked on a compensation stack. Every
//! transition is checkpointed through a `ProgressStore`, so a saga that is
//! paused, aborted or interrupted by a crash continues (or unwinds) from
//! exactly where it stopped.
//!
//! - [`TicketSagaEngine`]: runs sagas, one task per ticket
//! - [`ControlSurface`]: pause, resume, abort and status
//! - [`OperationExecutor`]: replay, retry, timeout and classification
//! - [`plans`]: the low, medium and high priority plans

pub mod compensation;
pub mod config;
pub mod context;
pub mod control;
pub mod engine;
pub mod error;
pub mod executor;
pub mod plans;
pub mod services;

pub use config::{ExecutorConfig, RetryPolicy};
pub use context::SagaContext;
pub use control::{AbortSignal, ControlHandle, ControlSurface, Wakeup};
pub use engine::{SagaResult, TicketSagaEngine};
pub use error::{Result, SagaError};
pub use executor::{OperationExecutor, OperationOutcome, OperationRequest};
pub use plans::{PlanKind, PlanOutcome, PlanSteps, PriorityRouter, StepResult};
pub use services::{
    EngineeringService, EscalationService, InMemoryEngineeringService, InMemoryEscalationService,
    InMemorySupportService, Invocation, OperationError, OperationGates, OperationJournal,
    OperationResult, ServiceHooks, SupportService,
};

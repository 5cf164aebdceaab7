//! Saga timeline entries.

use chrono::{DateTime, Utc};
use common::AgentId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    CompensationAction, FailureKind, Operation, Priority, RecordedOutcome, ResolutionMethod,
    TicketStatus, aggregate::DomainEvent,
};

/// Something that happened during a saga.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum TimelineEvent {
    SagaStarted {
        run_id: Uuid,
        priority: Priority,
    },
    StepStarted {
        step: u32,
        operation: Operation,
    },
    AttemptFailed {
        step: u32,
        operation: Operation,
        attempt: u32,
        kind: FailureKind,
    },
    StepCompleted {
        step: u32,
        operation: Operation,
        outcome: RecordedOutcome,
    },
    /// A held reservation was consumed by a successful resolution.
    ReservationConsumed {
        agent_id: AgentId,
    },
    /// Compensations are being unwound; `result` is the terminal result
    /// recorded once the stack is empty.
    UnwindStarted {
        reason: String,
        result: String,
    },
    CompensationExecuted {
        action: CompensationAction,
    },
    CompensationFailed {
        action: CompensationAction,
        error: String,
    },
    SagaResolved {
        method: ResolutionMethod,
        result: String,
    },
    SagaFailed {
        result: String,
    },
}

impl TimelineEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            TimelineEvent::SagaStarted { .. } => "SagaStarted",
            TimelineEvent::StepStarted { .. } => "StepStarted",
            TimelineEvent::AttemptFailed { .. } => "AttemptFailed",
            TimelineEvent::StepCompleted { .. } => "StepCompleted",
            TimelineEvent::ReservationConsumed { .. } => "ReservationConsumed",
            TimelineEvent::UnwindStarted { .. } => "UnwindStarted",
            TimelineEvent::CompensationExecuted { .. } => "CompensationExecuted",
            TimelineEvent::CompensationFailed { .. } => "CompensationFailed",
            TimelineEvent::SagaResolved { .. } => "SagaResolved",
            TimelineEvent::SagaFailed { .. } => "SagaFailed",
        }
    }

    /// Returns the status this event forces, regardless of the active step.
    pub fn implied_status(&self) -> Option<TicketStatus> {
        match self {
            TimelineEvent::SagaStarted { .. } => Some(TicketStatus::New),
            TimelineEvent::UnwindStarted { .. } => Some(TicketStatus::Compensating),
            TimelineEvent::SagaResolved { method, .. } => Some(method.terminal_status()),
            TimelineEvent::SagaFailed { .. } => Some(TicketStatus::Failed),
            _ => None,
        }
    }

    /// Returns the step number for step-scoped events.
    pub fn step(&self) -> Option<u32> {
        match self {
            TimelineEvent::StepStarted { step, .. }
            | TimelineEvent::AttemptFailed { step, .. }
            | TimelineEvent::StepCompleted { step, .. } => Some(*step),
            _ => None,
        }
    }
}

/// One entry of the append-only saga timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub timestamp: DateTime<Utc>,
    pub event: TimelineEvent,
    pub detail: String,
    /// Status at the time of the entry.
    pub status: TicketStatus,
}

impl DomainEvent for TimelineEntry {
    fn event_type(&self) -> &'static str {
        self.event.event_type()
    }
}

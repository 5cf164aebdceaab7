//! The event-sourced state of one ticket saga.

use chrono::Utc;
use common::{AgentId, TicketId};
use progress_store::Version;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    CompensationAction, CompensationStack, FailureKind, Operation, OperationOutput, RecordedOutcome,
    ResolutionMethod, StatusSnapshot, Ticket, TicketStatus, TimelineEntry, TimelineEvent,
    aggregate::Aggregate,
};

/// State of a ticket saga.
///
/// Every field except `version` and `paused` is a fold of `timeline`, so
/// replaying the timeline from the first entry reproduces the state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SagaState {
    pub ticket: Ticket,
    pub run_id: Uuid,
    pub version: Version,
    pub status: TicketStatus,
    pub timeline: Vec<TimelineEntry>,
    pub reserved_agent: Option<AgentId>,
    pub escalation_count: u32,
    pub resolution_method: Option<ResolutionMethod>,
    pub paused: bool,
    pub compensations: CompensationStack,
    pub result: Option<String>,
}

impl SagaState {
    /// Creates the state of a new saga with a `SagaStarted` entry.
    pub fn start(ticket: Ticket) -> Self {
        let run_id = Uuid::new_v4();
        let priority = ticket.priority;
        let mut state = Self::empty(ticket);
        state.record(
            TimelineEvent::SagaStarted { run_id, priority },
            format!("Saga started for {priority} priority ticket"),
            TicketStatus::New,
        );
        state
    }

    /// Rebuilds a saga state by folding a recorded timeline.
    pub fn replay(ticket: Ticket, timeline: impl IntoIterator<Item = TimelineEntry>) -> Self {
        let mut state = Self::empty(ticket);
        state.apply_events(timeline);
        state
    }

    fn empty(mut ticket: Ticket) -> Self {
        ticket.status = TicketStatus::New;
        Self {
            ticket,
            run_id: Uuid::nil(),
            version: Version::initial(),
            status: TicketStatus::New,
            timeline: Vec::new(),
            reserved_agent: None,
            escalation_count: 0,
            resolution_method: None,
            paused: false,
            compensations: CompensationStack::new(),
            result: None,
        }
    }

    /// Timestamps an entry, appends it to the timeline and folds it.
    ///
    /// Timestamps are clamped to the previous entry so the timeline stays
    /// monotonic even if the wall clock steps back.
    pub fn record(
        &mut self,
        event: TimelineEvent,
        detail: impl Into<String>,
        status: TicketStatus,
    ) -> &TimelineEntry {
        let mut timestamp = Utc::now();
        if let Some(last) = self.timeline.last()
            && last.timestamp > timestamp
        {
            timestamp = last.timestamp;
        }
        let status = event.implied_status().unwrap_or(status);

        self.apply(TimelineEntry {
            timestamp,
            event,
            detail: detail.into(),
            status,
        });
        &self.timeline[self.timeline.len() - 1]
    }

    fn retire_reservation(&mut self, agent_id: &AgentId) {
        self.compensations.remove(&CompensationAction::ReleaseAgent {
            agent_id: agent_id.clone(),
        });
        if self.reserved_agent.as_ref() == Some(agent_id) {
            self.reserved_agent = None;
        }
    }

    /// Returns the recorded outcome of a completed step.
    pub fn completed_outcome(&self, step: u32) -> Option<(Operation, &RecordedOutcome)> {
        self.timeline.iter().find_map(|entry| match &entry.event {
            TimelineEvent::StepCompleted {
                step: s,
                operation,
                outcome,
            } if *s == step => Some((*operation, outcome)),
            _ => None,
        })
    }

    /// Returns the operation of a step that has been started.
    pub fn step_started(&self, step: u32) -> Option<Operation> {
        self.timeline.iter().find_map(|entry| match &entry.event {
            TimelineEvent::StepStarted { step: s, operation } if *s == step => Some(*operation),
            _ => None,
        })
    }

    /// Counts the failed attempts recorded for a step.
    pub fn failed_attempts(&self, step: u32) -> u32 {
        self.timeline
            .iter()
            .filter(|entry| matches!(entry.event, TimelineEvent::AttemptFailed { step: s, .. } if s == step))
            .count() as u32
    }

    /// Returns the operation of a step that was started but never completed.
    pub fn in_flight(&self) -> Option<Operation> {
        let (step, operation) = self.timeline.iter().rev().find_map(|entry| match entry.event {
            TimelineEvent::StepStarted { step, operation } => Some((step, operation)),
            _ => None,
        })?;
        self.completed_outcome(step).is_none().then_some(operation)
    }

    /// Returns true if a failed attempt of the step was classified fatal.
    pub fn failed_fatally(&self, step: u32) -> bool {
        self.timeline.iter().any(|entry| {
            matches!(
                entry.event,
                TimelineEvent::AttemptFailed { step: s, kind: FailureKind::Fatal, .. } if s == step
            )
        })
    }

    /// Returns the detail of the last failed attempt of a step.
    pub fn last_failure_detail(&self, step: u32) -> Option<&str> {
        self.timeline.iter().rev().find_map(|entry| match entry.event {
            TimelineEvent::AttemptFailed { step: s, .. } if s == step => Some(entry.detail.as_str()),
            _ => None,
        })
    }

    /// Returns true if an unwind has started and the saga has not finished.
    pub fn unwind_in_progress(&self) -> bool {
        self.pending_failure().is_some()
    }

    /// Returns the terminal result an in-progress unwind will record.
    pub fn pending_failure(&self) -> Option<&str> {
        if self.is_terminal() {
            return None;
        }
        self.timeline.iter().rev().find_map(|entry| match &entry.event {
            TimelineEvent::UnwindStarted { result, .. } => Some(result.as_str()),
            _ => None,
        })
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Human-readable label of every completed step, in order.
    pub fn steps_completed(&self) -> Vec<String> {
        self.timeline
            .iter()
            .filter_map(|entry| match &entry.event {
                TimelineEvent::StepCompleted {
                    operation, outcome, ..
                } => Some(format!("{}: {}", operation.label(), outcome.summary())),
                _ => None,
            })
            .collect()
    }

    /// Label of the active step.
    pub fn current_step(&self) -> String {
        match self.in_flight() {
            Some(operation) if !self.is_terminal() => {
                format!("{} ({})", self.status.as_str(), operation.as_str())
            }
            _ => self.status.as_str().to_string(),
        }
    }

    /// Takes a read-only copy of the observable state.
    pub fn snapshot(&self) -> StatusSnapshot {
        let steps_completed = self.steps_completed();
        StatusSnapshot {
            ticket_id: self.ticket.id.clone(),
            priority: self.ticket.priority,
            current_status: self.status,
            current_step: self.current_step(),
            step_count: steps_completed.len(),
            steps_completed,
            timeline: self.timeline.clone(),
            escalation_count: self.escalation_count,
            assigned_agent: self.reserved_agent.clone(),
            paused: self.paused,
            result: self.result.clone(),
        }
    }
}

impl Aggregate for SagaState {
    type Event = TimelineEntry;

    fn aggregate_type() -> &'static str {
        "TicketSaga"
    }

    fn id(&self) -> &TicketId {
        &self.ticket.id
    }

    fn version(&self) -> Version {
        self.version
    }

    fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    fn apply(&mut self, entry: TimelineEntry) {
        match &entry.event {
            TimelineEvent::SagaStarted { run_id, .. } => {
                self.run_id = *run_id;
            }
            TimelineEvent::StepStarted { .. } | TimelineEvent::AttemptFailed { .. } => {}
            TimelineEvent::StepCompleted { outcome, .. } => match outcome {
                RecordedOutcome::Completed(OperationOutput::AgentAssigned(agent_id)) => {
                    self.reserved_agent = Some(agent_id.clone());
                    self.compensations.push(
                        CompensationAction::ReleaseAgent {
                            agent_id: agent_id.clone(),
                        },
                        entry.timestamp,
                    );
                }
                RecordedOutcome::Completed(OperationOutput::AgentReleased(agent_id)) => {
                    self.retire_reservation(agent_id);
                }
                RecordedOutcome::Completed(OperationOutput::Escalation(_)) => {
                    self.escalation_count += 1;
                }
                _ => {}
            },
            TimelineEvent::ReservationConsumed { agent_id } => {
                self.retire_reservation(agent_id);
            }
            TimelineEvent::UnwindStarted { .. } => {}
            TimelineEvent::CompensationExecuted { action }
            | TimelineEvent::CompensationFailed { action, .. } => {
                if let Some(agent_id) = action.agent_id() {
                    self.retire_reservation(agent_id);
                } else {
                    self.compensations.remove(action);
                }
            }
            TimelineEvent::SagaResolved { method, result } => {
                self.resolution_method = Some(*method);
                self.result = Some(result.clone());
            }
            TimelineEvent::SagaFailed { result } => {
                self.result = Some(result.clone());
            }
        }

        self.status = entry.event.implied_status().unwrap_or(entry.status);
        self.ticket.status = self.status;
        self.timeline.push(entry);
    }
}

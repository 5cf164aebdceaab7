//! External operation contracts and scripted in-memory implementations.
//!
//! Operations are split by the task queue whose workers serve them:
//! support, escalation and engineering.

pub mod engineering;
pub mod escalation;
pub mod support;

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use common::{AgentId, TicketId};
use domain::{FailureKind, Operation};
use thiserror::Error;
use tokio::sync::watch;

pub use engineering::{EngineeringService, InMemoryEngineeringService};
pub use escalation::{EscalationService, InMemoryEscalationService};
pub use support::{InMemorySupportService, SupportService};

/// A classified operation failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct OperationError {
    pub kind: FailureKind,
    pub message: String,
}

impl OperationError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Transient failure; retried per policy.
    pub fn retryable(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Retryable, message)
    }

    /// Expected rejection that selects an alternate branch.
    pub fn non_retryable(message: impl Into<String>) -> Self {
        Self::new(FailureKind::NonRetryable, message)
    }

    /// A required resource (e.g. an agent) is unavailable.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(FailureKind::ResourceUnavailable, message)
    }

    /// Unexpected failure that halts the saga.
    pub fn fatal(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Fatal, message)
    }
}

/// Result type of every external operation.
pub type OperationResult<T> = Result<T, OperationError>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One recorded call into an external operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub operation: Operation,
    pub ticket_id: TicketId,
    pub agent_id: Option<AgentId>,
}

/// Ordered record of every operation invocation, shared across services.
#[derive(Debug, Clone, Default)]
pub struct OperationJournal {
    entries: Arc<Mutex<Vec<Invocation>>>,
}

impl OperationJournal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, operation: Operation, ticket_id: &TicketId, agent_id: Option<&AgentId>) {
        lock(&self.entries).push(Invocation {
            operation,
            ticket_id: ticket_id.clone(),
            agent_id: agent_id.cloned(),
        });
    }

    /// Returns every invocation in call order.
    pub fn invocations(&self) -> Vec<Invocation> {
        lock(&self.entries).clone()
    }

    /// Returns the operations invoked for a ticket, in call order.
    pub fn operations_for(&self, ticket_id: &TicketId) -> Vec<Operation> {
        lock(&self.entries)
            .iter()
            .filter(|i| &i.ticket_id == ticket_id)
            .map(|i| i.operation)
            .collect()
    }

    /// Counts invocations of an operation across all tickets.
    pub fn count(&self, operation: Operation) -> usize {
        lock(&self.entries)
            .iter()
            .filter(|i| i.operation == operation)
            .count()
    }

    /// Returns the agents released, in call order.
    pub fn released_agents(&self) -> Vec<AgentId> {
        lock(&self.entries)
            .iter()
            .filter(|i| i.operation == Operation::ReleaseAgent)
            .filter_map(|i| i.agent_id.clone())
            .collect()
    }

    pub fn clear(&self) {
        lock(&self.entries).clear();
    }
}

/// Gates that hold invocations of an operation until opened.
///
/// Lets tests freeze a saga while a specific operation is outstanding.
#[derive(Debug, Clone, Default)]
pub struct OperationGates {
    gates: Arc<Mutex<HashMap<Operation, watch::Sender<bool>>>>,
}

impl OperationGates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Closes the gate of an operation; later invocations wait at it.
    pub fn close(&self, operation: Operation) {
        lock(&self.gates).insert(operation, watch::channel(false).0);
    }

    /// Opens the gate of an operation, releasing every waiting invocation.
    pub fn open(&self, operation: Operation) {
        if let Some(gate) = lock(&self.gates).remove(&operation) {
            gate.send_replace(true);
        }
    }

    async fn pass(&self, operation: Operation) {
        let receiver = lock(&self.gates).get(&operation).map(|gate| gate.subscribe());
        if let Some(mut receiver) = receiver {
            // A dropped sender means the gate was opened
            let _ = receiver.wait_for(|open| *open).await;
        }
    }
}

/// Behaviour shared by the in-memory services: journal, gates and latency.
#[derive(Debug, Clone, Default)]
pub struct ServiceHooks {
    pub journal: OperationJournal,
    pub gates: OperationGates,
    pub latency: Duration,
}

impl ServiceHooks {
    pub fn new(journal: OperationJournal, gates: OperationGates) -> Self {
        Self {
            journal,
            gates,
            latency: Duration::ZERO,
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    async fn enter(&self, operation: Operation, ticket_id: &TicketId, agent_id: Option<&AgentId>) {
        self.journal.record(operation, ticket_id, agent_id);
        self.gates.pass(operation).await;
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

/// Queue of scripted results for one operation.
///
/// When the queue is empty the service falls back to its default success.
#[derive(Debug)]
pub struct Script<T> {
    queue: Mutex<VecDeque<OperationResult<T>>>,
}

impl<T> Default for Script<T> {
    fn default() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
        }
    }
}

impl<T> Script<T> {
    pub fn push(&self, result: OperationResult<T>) {
        lock(&self.queue).push_back(result);
    }

    pub fn next_or(&self, default: impl FnOnce() -> T) -> OperationResult<T> {
        lock(&self.queue).pop_front().unwrap_or_else(|| Ok(default()))
    }
}

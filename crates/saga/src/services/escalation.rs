//! Escalation queue: agent assignment, investigation and engineering escalation.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use common::AgentId;
use domain::{EscalationOutcome, InvestigationOutcome, Operation, Priority, Ticket};

use super::{OperationResult, Script, ServiceHooks};

/// Operations served by the escalation task queue.
#[async_trait]
pub trait EscalationService: Send + Sync {
    /// Reserves an agent (a senior one for high priority tickets).
    ///
    /// Fails `ResourceUnavailable` with "no agent available".
    async fn assign_agent(&self, ticket: &Ticket) -> OperationResult<AgentId>;

    async fn investigate(
        &self,
        ticket: &Ticket,
        agent_id: &AgentId,
    ) -> OperationResult<InvestigationOutcome>;

    async fn escalate_to_engineering(&self, ticket: &Ticket) -> OperationResult<EscalationOutcome>;
}

#[derive(Debug, Default)]
struct EscalationScripts {
    assign_agent: Script<AgentId>,
    investigate: Script<InvestigationOutcome>,
    escalate: Script<EscalationOutcome>,
    next_agent: AtomicU32,
}

/// Scripted in-memory escalation service for testing.
///
/// Assigns agents `agent-1`, `agent-2`, ... (`senior-N` for high priority),
/// investigations complete and escalations are accepted unless scripted.
#[derive(Debug, Clone, Default)]
pub struct InMemoryEscalationService {
    scripts: Arc<EscalationScripts>,
    hooks: ServiceHooks,
}

impl InMemoryEscalationService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hooks(hooks: ServiceHooks) -> Self {
        Self {
            scripts: Arc::default(),
            hooks,
        }
    }

    pub fn script_assign_agent(&self, result: OperationResult<AgentId>) {
        self.scripts.assign_agent.push(result);
    }

    pub fn script_investigate(&self, result: OperationResult<InvestigationOutcome>) {
        self.scripts.investigate.push(result);
    }

    pub fn script_escalate(&self, result: OperationResult<EscalationOutcome>) {
        self.scripts.escalate.push(result);
    }
}

#[async_trait]
impl EscalationService for InMemoryEscalationService {
    async fn assign_agent(&self, ticket: &Ticket) -> OperationResult<AgentId> {
        self.hooks
            .enter(Operation::AssignAgent, &ticket.id, None)
            .await;
        self.scripts.assign_agent.next_or(|| {
            let n = self.scripts.next_agent.fetch_add(1, Ordering::SeqCst) + 1;
            match ticket.priority {
                Priority::High => AgentId::new(format!("senior-{n}")),
                _ => AgentId::new(format!("agent-{n}")),
            }
        })
    }

    async fn investigate(
        &self,
        ticket: &Ticket,
        agent_id: &AgentId,
    ) -> OperationResult<InvestigationOutcome> {
        self.hooks
            .enter(Operation::Investigate, &ticket.id, Some(agent_id))
            .await;
        self.scripts
            .investigate
            .next_or(|| InvestigationOutcome::Complete)
    }

    async fn escalate_to_engineering(&self, ticket: &Ticket) -> OperationResult<EscalationOutcome> {
        self.hooks
            .enter(Operation::EscalateToEngineering, &ticket.id, None)
            .await;
        self.scripts
            .escalate
            .next_or(|| EscalationOutcome::Accepted)
    }
}

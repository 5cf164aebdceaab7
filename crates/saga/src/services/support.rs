//! Support queue: customer-facing and agent-facing operations.

use std::sync::Arc;

use async_trait::async_trait;
use common::AgentId;
use domain::{Operation, Ticket};

use super::{OperationResult, Script, ServiceHooks};

/// Operations served by the support task queue.
#[async_trait]
pub trait SupportService: Send + Sync {
    /// Sends an acknowledgment to the customer. Not expected to fail.
    async fn send_auto_response(&self, ticket: &Ticket) -> OperationResult<String>;

    /// Searches the knowledge base for a solution.
    ///
    /// Fails `NonRetryable` with "no solution found".
    async fn search_knowledge_base(&self, ticket: &Ticket) -> OperationResult<String>;

    /// Has the assigned agent work the ticket.
    async fn agent_resolve(&self, ticket: &Ticket, agent_id: &AgentId) -> OperationResult<String>;

    async fn notify_customer(&self, ticket: &Ticket, message: &str) -> OperationResult<String>;

    async fn notify_management(&self, ticket: &Ticket, message: &str) -> OperationResult<String>;

    /// Releases an agent reservation. Best-effort.
    async fn release_agent(&self, agent_id: &AgentId, ticket: &Ticket) -> OperationResult<String>;
}

#[derive(Debug, Default)]
struct SupportScripts {
    auto_response: Script<String>,
    knowledge_base: Script<String>,
    agent_resolve: Script<String>,
    notify_customer: Script<String>,
    notify_management: Script<String>,
    release_agent: Script<String>,
}

/// Scripted in-memory support service for testing.
///
/// Every operation succeeds unless a result was scripted for it.
#[derive(Debug, Clone, Default)]
pub struct InMemorySupportService {
    scripts: Arc<SupportScripts>,
    hooks: ServiceHooks,
}

impl InMemorySupportService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hooks(hooks: ServiceHooks) -> Self {
        Self {
            scripts: Arc::default(),
            hooks,
        }
    }

    pub fn script_auto_response(&self, result: OperationResult<String>) {
        self.scripts.auto_response.push(result);
    }

    pub fn script_knowledge_base(&self, result: OperationResult<String>) {
        self.scripts.knowledge_base.push(result);
    }

    pub fn script_agent_resolve(&self, result: OperationResult<String>) {
        self.scripts.agent_resolve.push(result);
    }

    pub fn script_notify_customer(&self, result: OperationResult<String>) {
        self.scripts.notify_customer.push(result);
    }

    pub fn script_notify_management(&self, result: OperationResult<String>) {
        self.scripts.notify_management.push(result);
    }

    pub fn script_release_agent(&self, result: OperationResult<String>) {
        self.scripts.release_agent.push(result);
    }
}

#[async_trait]
impl SupportService for InMemorySupportService {
    async fn send_auto_response(&self, ticket: &Ticket) -> OperationResult<String> {
        self.hooks
            .enter(Operation::SendAutoResponse, &ticket.id, None)
            .await;
        self.scripts
            .auto_response
            .next_or(|| format!("Auto-response sent to {}", ticket.customer_name))
    }

    async fn search_knowledge_base(&self, ticket: &Ticket) -> OperationResult<String> {
        self.hooks
            .enter(Operation::SearchKnowledgeBase, &ticket.id, None)
            .await;
        self.scripts
            .knowledge_base
            .next_or(|| format!("Knowledge base article for: {}", ticket.issue))
    }

    async fn agent_resolve(&self, ticket: &Ticket, agent_id: &AgentId) -> OperationResult<String> {
        self.hooks
            .enter(Operation::AgentResolve, &ticket.id, Some(agent_id))
            .await;
        self.scripts
            .agent_resolve
            .next_or(|| format!("{agent_id} resolved the issue"))
    }

    async fn notify_customer(&self, ticket: &Ticket, message: &str) -> OperationResult<String> {
        self.hooks
            .enter(Operation::NotifyCustomer, &ticket.id, None)
            .await;
        self.scripts
            .notify_customer
            .next_or(|| format!("Customer {} notified: {message}", ticket.customer_name))
    }

    async fn notify_management(&self, ticket: &Ticket, message: &str) -> OperationResult<String> {
        self.hooks
            .enter(Operation::NotifyManagement, &ticket.id, None)
            .await;
        self.scripts
            .notify_management
            .next_or(|| format!("Management notified about {}: {message}", ticket.id))
    }

    async fn release_agent(&self, agent_id: &AgentId, ticket: &Ticket) -> OperationResult<String> {
        self.hooks
            .enter(Operation::ReleaseAgent, &ticket.id, Some(agent_id))
            .await;
        self.scripts
            .release_agent
            .next_or(|| format!("{agent_id} released from {}", ticket.id))
    }
}

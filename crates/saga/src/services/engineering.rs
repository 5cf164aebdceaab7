//! Engineering queue: urgent fixes and resolution validation.

use std::sync::Arc;

use async_trait::async_trait;
use domain::{FixOutcome, Operation, Ticket};

use super::{OperationResult, Script, ServiceHooks};

/// Operations served by the engineering task queue.
#[async_trait]
pub trait EngineeringService: Send + Sync {
    async fn apply_urgent_fix(&self, ticket: &Ticket) -> OperationResult<FixOutcome>;

    /// Confirms with the customer that the issue is resolved.
    ///
    /// Fails `NonRetryable` with "customer reports unresolved".
    async fn validate_resolution(&self, ticket: &Ticket) -> OperationResult<String>;
}

#[derive(Debug, Default)]
struct EngineeringScripts {
    apply_fix: Script<FixOutcome>,
    validate: Script<String>,
}

/// Scripted in-memory engineering service for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryEngineeringService {
    scripts: Arc<EngineeringScripts>,
    hooks: ServiceHooks,
}

impl InMemoryEngineeringService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hooks(hooks: ServiceHooks) -> Self {
        Self {
            scripts: Arc::default(),
            hooks,
        }
    }

    pub fn script_apply_fix(&self, result: OperationResult<FixOutcome>) {
        self.scripts.apply_fix.push(result);
    }

    pub fn script_validate(&self, result: OperationResult<String>) {
        self.scripts.validate.push(result);
    }
}

#[async_trait]
impl EngineeringService for InMemoryEngineeringService {
    async fn apply_urgent_fix(&self, ticket: &Ticket) -> OperationResult<FixOutcome> {
        self.hooks
            .enter(Operation::ApplyUrgentFix, &ticket.id, None)
            .await;
        self.scripts.apply_fix.next_or(|| FixOutcome::Succeeded)
    }

    async fn validate_resolution(&self, ticket: &Ticket) -> OperationResult<String> {
        self.hooks
            .enter(Operation::ValidateResolution, &ticket.id, None)
            .await;
        self.scripts
            .validate
            .next_or(|| format!("Customer confirmed {} is resolved", ticket.id))
    }
}

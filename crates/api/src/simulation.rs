//! Simulated external services for the HTTP host.
//!
//! Every call draws a fresh value from a hash of the ticket id, the
//! operation and the service's call counter, so a repeated operation (a
//! retry, a second agent assignment) can see a different outcome while a
//! fresh service replays the same sequence of draws.

use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use common::{AgentId, TicketId};
use domain::{EscalationOutcome, FixOutcome, InvestigationOutcome, Operation, Priority, Ticket};
use saga::{
    EngineeringService, EscalationService, OperationError, OperationResult, SupportService,
};

/// Failure rates and latency of the simulated services.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationProfile {
    pub no_solution_rate: f64,
    pub no_agent_rate: f64,
    pub needs_escalation_rate: f64,
    pub fix_failure_rate: f64,
    pub validation_rejection_rate: f64,
    pub escalation_rejection_rate: f64,
    pub agent_resolve_failure_rate: f64,
    /// Retryable failures of agent assignment and the urgent fix.
    pub transient_failure_rate: f64,
    pub latency: Duration,
}

impl Default for SimulationProfile {
    fn default() -> Self {
        Self {
            no_solution_rate: 0.30,
            no_agent_rate: 0.15,
            needs_escalation_rate: 0.20,
            fix_failure_rate: 0.10,
            validation_rejection_rate: 0.10,
            escalation_rejection_rate: 0.25,
            agent_resolve_failure_rate: 0.10,
            transient_failure_rate: 0.10,
            latency: Duration::from_millis(500),
        }
    }
}

impl SimulationProfile {
    /// Every operation succeeds on its happy path.
    pub fn reliable() -> Self {
        Self {
            no_solution_rate: 0.0,
            no_agent_rate: 0.0,
            needs_escalation_rate: 0.0,
            fix_failure_rate: 0.0,
            validation_rejection_rate: 0.0,
            escalation_rejection_rate: 0.0,
            agent_resolve_failure_rate: 0.0,
            transient_failure_rate: 0.0,
            latency: Duration::ZERO,
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    async fn delay(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

/// Source of simulated outcomes for one service.
#[derive(Debug, Clone, Default)]
struct Dice {
    calls: Arc<AtomicU64>,
}

impl Dice {
    fn draw(&self, ticket_id: &TicketId, operation: Operation) -> u64 {
        let call = self.calls.fetch_add(1, Ordering::Relaxed);
        let mut hasher = DefaultHasher::new();
        ticket_id.as_str().hash(&mut hasher);
        operation.as_str().hash(&mut hasher);
        call.hash(&mut hasher);
        hasher.finish()
    }

    /// Uniform value in `[0, 1)`.
    fn roll(&self, ticket_id: &TicketId, operation: Operation) -> f64 {
        (self.draw(ticket_id, operation) % 10_000) as f64 / 10_000.0
    }

    fn hits(&self, ticket_id: &TicketId, operation: Operation, rate: f64) -> bool {
        self.roll(ticket_id, operation) < rate
    }
}

#[derive(Debug, Clone, Default)]
pub struct SimulatedSupportService {
    profile: SimulationProfile,
    dice: Dice,
}

impl SimulatedSupportService {
    pub fn new(profile: SimulationProfile) -> Self {
        Self {
            profile,
            dice: Dice::default(),
        }
    }
}

#[async_trait]
impl SupportService for SimulatedSupportService {
    async fn send_auto_response(&self, ticket: &Ticket) -> OperationResult<String> {
        self.profile.delay().await;
        Ok(format!("Auto-response sent to {}", ticket.customer_name))
    }

    async fn search_knowledge_base(&self, ticket: &Ticket) -> OperationResult<String> {
        self.profile.delay().await;
        if self.dice.hits(
            &ticket.id,
            Operation::SearchKnowledgeBase,
            self.profile.no_solution_rate,
        ) {
            return Err(OperationError::non_retryable("no solution found"));
        }
        Ok(format!("Knowledge base article for: {}", ticket.issue))
    }

    async fn agent_resolve(&self, ticket: &Ticket, agent_id: &AgentId) -> OperationResult<String> {
        self.profile.delay().await;
        if self.dice.hits(
            &ticket.id,
            Operation::AgentResolve,
            self.profile.agent_resolve_failure_rate,
        ) {
            return Err(OperationError::non_retryable(format!(
                "{agent_id} could not reproduce the issue"
            )));
        }
        Ok(format!("Ticket resolved by {agent_id}"))
    }

    async fn notify_customer(&self, ticket: &Ticket, message: &str) -> OperationResult<String> {
        self.profile.delay().await;
        tracing::debug!(ticket_id = %ticket.id, message, "customer notified");
        Ok(format!("Customer {} notified", ticket.customer_name))
    }

    async fn notify_management(&self, ticket: &Ticket, message: &str) -> OperationResult<String> {
        self.profile.delay().await;
        tracing::debug!(ticket_id = %ticket.id, message, "management notified");
        Ok(format!("Management notified about {}", ticket.id))
    }

    async fn release_agent(&self, agent_id: &AgentId, ticket: &Ticket) -> OperationResult<String> {
        self.profile.delay().await;
        Ok(format!("{agent_id} released from {}", ticket.id))
    }
}

#[derive(Debug, Clone, Default)]
pub struct SimulatedEscalationService {
    profile: SimulationProfile,
    dice: Dice,
}

impl SimulatedEscalationService {
    pub fn new(profile: SimulationProfile) -> Self {
        Self {
            profile,
            dice: Dice::default(),
        }
    }
}

#[async_trait]
impl EscalationService for SimulatedEscalationService {
    async fn assign_agent(&self, ticket: &Ticket) -> OperationResult<AgentId> {
        self.profile.delay().await;
        let id = &ticket.id;
        if self
            .dice
            .hits(id, Operation::AssignAgent, self.profile.transient_failure_rate)
        {
            return Err(OperationError::retryable("agent directory timed out"));
        }
        if self
            .dice
            .hits(id, Operation::AssignAgent, self.profile.no_agent_rate)
        {
            return Err(OperationError::unavailable("no agent available"));
        }
        let number = 100 + self.dice.draw(id, Operation::AssignAgent) % 900;
        Ok(match ticket.priority {
            Priority::High => AgentId::new(format!("Senior-{number}")),
            _ => AgentId::new(format!("Agent-{number}")),
        })
    }

    async fn investigate(
        &self,
        ticket: &Ticket,
        _agent_id: &AgentId,
    ) -> OperationResult<InvestigationOutcome> {
        self.profile.delay().await;
        if self.dice.hits(
            &ticket.id,
            Operation::Investigate,
            self.profile.needs_escalation_rate,
        ) {
            return Ok(InvestigationOutcome::NeedsEscalation);
        }
        Ok(InvestigationOutcome::Complete)
    }

    async fn escalate_to_engineering(&self, ticket: &Ticket) -> OperationResult<EscalationOutcome> {
        self.profile.delay().await;
        if self.dice.hits(
            &ticket.id,
            Operation::EscalateToEngineering,
            self.profile.escalation_rejection_rate,
        ) {
            return Ok(EscalationOutcome::Rejected);
        }
        Ok(EscalationOutcome::Accepted)
    }
}

#[derive(Debug, Clone, Default)]
pub struct SimulatedEngineeringService {
    profile: SimulationProfile,
    dice: Dice,
}

impl SimulatedEngineeringService {
    pub fn new(profile: SimulationProfile) -> Self {
        Self {
            profile,
            dice: Dice::default(),
        }
    }
}

#[async_trait]
impl EngineeringService for SimulatedEngineeringService {
    async fn apply_urgent_fix(&self, ticket: &Ticket) -> OperationResult<FixOutcome> {
        self.profile.delay().await;
        let id = &ticket.id;
        if self
            .dice
            .hits(id, Operation::ApplyUrgentFix, self.profile.transient_failure_rate)
        {
            return Err(OperationError::retryable("deployment pipeline busy"));
        }
        if self
            .dice
            .hits(id, Operation::ApplyUrgentFix, self.profile.fix_failure_rate)
        {
            return Ok(FixOutcome::Failed);
        }
        Ok(FixOutcome::Succeeded)
    }

    async fn validate_resolution(&self, ticket: &Ticket) -> OperationResult<String> {
        self.profile.delay().await;
        if self.dice.hits(
            &ticket.id,
            Operation::ValidateResolution,
            self.profile.validation_rejection_rate,
        ) {
            return Err(OperationError::non_retryable("customer reports unresolved"));
        }
        Ok(format!("Customer confirmed {} is resolved", ticket.id))
    }
}

//! Priority plans and the typed step facade they run against.
//!
//! A plan is straight-line async code over [`PlanSteps`]. Each facade call
//! is one saga step: it goes through the [`OperationExecutor`], so it is
//! checkpointed, retried and replayed on resume. Every branch of every plan
//! ends in an explicit [`PlanOutcome`].

pub mod high;
pub mod low;
pub mod medium;

use common::{AgentId, TicketId};
use domain::{
    CompensationAction, EscalationOutcome, FixOutcome, InvestigationOutcome, Operation,
    OperationOutput, Priority, ResolutionMethod, TicketStatus, TimelineEvent,
};
use progress_store::ProgressStore;
use serde::{Deserialize, Serialize};

use crate::context::SagaContext;
use crate::error::{Result, SagaError};
use crate::executor::{OperationExecutor, OperationOutcome, OperationRequest};
use crate::services::{EngineeringService, EscalationService, SupportService};

/// Which plan a ticket runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanKind {
    Low,
    Medium,
    High,
}

impl PlanKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanKind::Low => "low",
            PlanKind::Medium => "medium",
            PlanKind::High => "high",
        }
    }

    /// Drives the plan to its terminal outcome.
    pub async fn run<S, Su, Es, En>(
        self,
        steps: &mut PlanSteps<'_, S, Su, Es, En>,
    ) -> Result<PlanOutcome>
    where
        S: ProgressStore,
        Su: SupportService,
        Es: EscalationService,
        En: EngineeringService,
    {
        match self {
            PlanKind::Low => low::run(steps).await,
            PlanKind::Medium => medium::run(steps).await,
            PlanKind::High => high::run(steps).await,
        }
    }
}

/// Selects the plan for a ticket priority.
pub struct PriorityRouter;

impl PriorityRouter {
    pub fn route(priority: Priority) -> PlanKind {
        match priority {
            Priority::Low => PlanKind::Low,
            Priority::Medium => PlanKind::Medium,
            Priority::High => PlanKind::High,
        }
    }
}

/// How a plan ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanOutcome {
    Resolved {
        method: ResolutionMethod,
        result: String,
    },
    Failed {
        result: String,
    },
}

impl PlanOutcome {
    pub fn resolved(method: ResolutionMethod, result: impl Into<String>) -> Self {
        PlanOutcome::Resolved {
            method,
            result: result.into(),
        }
    }

    pub fn failed(result: impl Into<String>) -> Self {
        PlanOutcome::Failed {
            result: result.into(),
        }
    }
}

/// Result of a step whose rejection selects an alternate branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepResult<T> {
    Done(T),
    Rejected(String),
    Unavailable(String),
}

/// Typed facade over the executor for one running saga.
pub struct PlanSteps<'a, S: ProgressStore, Su, Es, En> {
    ctx: &'a mut SagaContext<S>,
    executor: &'a OperationExecutor<Su, Es, En>,
}

impl<'a, S, Su, Es, En> PlanSteps<'a, S, Su, Es, En>
where
    S: ProgressStore,
    Su: SupportService,
    Es: EscalationService,
    En: EngineeringService,
{
    pub fn new(ctx: &'a mut SagaContext<S>, executor: &'a OperationExecutor<Su, Es, En>) -> Self {
        Self { ctx, executor }
    }

    pub fn ticket_id(&self) -> TicketId {
        self.ctx.ticket_id().clone()
    }

    async fn call(
        &mut self,
        status: TicketStatus,
        request: OperationRequest,
    ) -> Result<OperationOutcome> {
        self.executor.invoke(&mut *self.ctx, status, request).await
    }

    /// A step every branch needs; a rejection is a workflow failure.
    async fn required(
        &mut self,
        status: TicketStatus,
        request: OperationRequest,
    ) -> Result<OperationOutput> {
        let operation = request.operation();
        match self.call(status, request).await? {
            OperationOutcome::Completed(output) => Ok(output),
            OperationOutcome::Rejected(reason) | OperationOutcome::Unavailable(reason) => {
                Err(SagaError::OperationFailed { operation, reason })
            }
        }
    }

    pub async fn send_auto_response(&mut self) -> Result<String> {
        match self
            .required(TicketStatus::AutoResponding, OperationRequest::SendAutoResponse)
            .await?
        {
            OperationOutput::Acknowledged(text) => Ok(text),
            _ => Err(unexpected(Operation::SendAutoResponse)),
        }
    }

    pub async fn search_knowledge_base(&mut self) -> Result<StepResult<String>> {
        match self
            .call(TicketStatus::SearchingKb, OperationRequest::SearchKnowledgeBase)
            .await?
        {
            OperationOutcome::Completed(OperationOutput::Solution(solution)) => {
                Ok(StepResult::Done(solution))
            }
            OperationOutcome::Completed(_) => Err(unexpected(Operation::SearchKnowledgeBase)),
            OperationOutcome::Rejected(reason) => Ok(StepResult::Rejected(reason)),
            OperationOutcome::Unavailable(reason) => Ok(StepResult::Unavailable(reason)),
        }
    }

    pub async fn notify_customer(&mut self, status: TicketStatus, message: &str) -> Result<String> {
        let request = OperationRequest::NotifyCustomer {
            message: message.to_string(),
        };
        match self.required(status, request).await? {
            OperationOutput::Acknowledged(text) => Ok(text),
            _ => Err(unexpected(Operation::NotifyCustomer)),
        }
    }

    pub async fn notify_management(
        &mut self,
        status: TicketStatus,
        message: &str,
    ) -> Result<String> {
        let request = OperationRequest::NotifyManagement {
            message: message.to_string(),
        };
        match self.required(status, request).await? {
            OperationOutput::Acknowledged(text) => Ok(text),
            _ => Err(unexpected(Operation::NotifyManagement)),
        }
    }

    pub async fn validate_resolution(&mut self) -> Result<StepResult<String>> {
        match self
            .call(TicketStatus::Validating, OperationRequest::ValidateResolution)
            .await?
        {
            OperationOutcome::Completed(OperationOutput::Acknowledged(text)) => {
                Ok(StepResult::Done(text))
            }
            OperationOutcome::Completed(_) => Err(unexpected(Operation::ValidateResolution)),
            OperationOutcome::Rejected(reason) => Ok(StepResult::Rejected(reason)),
            OperationOutcome::Unavailable(reason) => Ok(StepResult::Unavailable(reason)),
        }
    }

    /// Reserves an agent; the reservation is pushed onto the compensation stack.
    pub async fn assign_agent(&mut self, status: TicketStatus) -> Result<StepResult<AgentId>> {
        match self.call(status, OperationRequest::AssignAgent).await? {
            OperationOutcome::Completed(OperationOutput::AgentAssigned(agent_id)) => {
                Ok(StepResult::Done(agent_id))
            }
            OperationOutcome::Completed(_) => Err(unexpected(Operation::AssignAgent)),
            OperationOutcome::Rejected(reason) => Ok(StepResult::Rejected(reason)),
            OperationOutcome::Unavailable(reason) => Ok(StepResult::Unavailable(reason)),
        }
    }

    /// An unavailable investigator is reported as `AgentUnavailable`.
    pub async fn investigate(&mut self, agent_id: &AgentId) -> Result<InvestigationOutcome> {
        let request = OperationRequest::Investigate {
            agent_id: agent_id.clone(),
        };
        match self.call(TicketStatus::Investigating, request).await? {
            OperationOutcome::Completed(OperationOutput::Investigation(outcome)) => Ok(outcome),
            OperationOutcome::Completed(_) => Err(unexpected(Operation::Investigate)),
            OperationOutcome::Unavailable(_) => Ok(InvestigationOutcome::AgentUnavailable),
            OperationOutcome::Rejected(reason) => Err(SagaError::OperationFailed {
                operation: Operation::Investigate,
                reason,
            }),
        }
    }

    pub async fn agent_resolve(&mut self, agent_id: &AgentId) -> Result<StepResult<String>> {
        let request = OperationRequest::AgentResolve {
            agent_id: agent_id.clone(),
        };
        match self.call(TicketStatus::AgentResolving, request).await? {
            OperationOutcome::Completed(OperationOutput::Acknowledged(text)) => {
                Ok(StepResult::Done(text))
            }
            OperationOutcome::Completed(_) => Err(unexpected(Operation::AgentResolve)),
            OperationOutcome::Rejected(reason) => Ok(StepResult::Rejected(reason)),
            OperationOutcome::Unavailable(reason) => Ok(StepResult::Unavailable(reason)),
        }
    }

    /// A refused escalation is reported as `Rejected`.
    pub async fn escalate(&mut self) -> Result<EscalationOutcome> {
        match self
            .call(TicketStatus::Escalating, OperationRequest::EscalateToEngineering)
            .await?
        {
            OperationOutcome::Completed(OperationOutput::Escalation(outcome)) => Ok(outcome),
            OperationOutcome::Completed(_) => Err(unexpected(Operation::EscalateToEngineering)),
            OperationOutcome::Rejected(_) | OperationOutcome::Unavailable(_) => {
                Ok(EscalationOutcome::Rejected)
            }
        }
    }

    /// A refused fix is reported as `Failed`.
    pub async fn apply_fix(&mut self) -> Result<FixOutcome> {
        match self
            .call(TicketStatus::ApplyingFix, OperationRequest::ApplyUrgentFix)
            .await?
        {
            OperationOutcome::Completed(OperationOutput::Fix(outcome)) => Ok(outcome),
            OperationOutcome::Completed(_) => Err(unexpected(Operation::ApplyUrgentFix)),
            OperationOutcome::Rejected(_) | OperationOutcome::Unavailable(_) => {
                Ok(FixOutcome::Failed)
            }
        }
    }

    /// Releases a reserved agent.
    ///
    /// Best effort: if the release is refused or runs out of retries the
    /// reservation is retired with `CompensationFailed` and the plan goes on.
    pub async fn release_agent(&mut self, agent_id: &AgentId) -> Result<()> {
        let request = OperationRequest::ReleaseAgent {
            agent_id: agent_id.clone(),
        };
        let error = match self.call(TicketStatus::ReleasingAgent, request).await {
            Ok(OperationOutcome::Completed(OperationOutput::AgentReleased(_))) => return Ok(()),
            Ok(OperationOutcome::Completed(_)) => return Err(unexpected(Operation::ReleaseAgent)),
            Ok(OperationOutcome::Rejected(reason) | OperationOutcome::Unavailable(reason)) => {
                reason
            }
            Err(err @ SagaError::RetriesExhausted { .. }) => err.to_string(),
            Err(err) => return Err(err),
        };

        let action = CompensationAction::ReleaseAgent {
            agent_id: agent_id.clone(),
        };
        if !self.ctx.state().compensations.contains(&action) {
            return Ok(());
        }

        tracing::warn!(ticket_id = %self.ctx.ticket_id(), agent_id = %agent_id, error = %error, "agent release failed, continuing");
        self.ctx
            .record(
                TimelineEvent::CompensationFailed {
                    action,
                    error: error.clone(),
                },
                format!("Release of {agent_id} failed: {error}"),
                TicketStatus::ReleasingAgent,
            )
            .await
    }

    /// Hands a ticket to manual handling: notify management, then fail.
    pub async fn backlog(&mut self, message: &str, result: String) -> Result<PlanOutcome> {
        self.notify_management(TicketStatus::NotifyManagement, message)
            .await?;
        Ok(PlanOutcome::failed(result))
    }
}

fn unexpected(operation: Operation) -> SagaError {
    SagaError::UnexpectedOutput { operation }
}

//! Operation executor: replay, timeout, retry and failure classification.

use std::time::Instant;

use common::AgentId;
use domain::{
    CompensationAction, FailureKind, Operation, OperationOutput, RecordedOutcome, Ticket,
    TicketStatus, TimelineEvent,
};
use progress_store::ProgressStore;

use crate::config::ExecutorConfig;
use crate::context::SagaContext;
use crate::error::{Result, SagaError};
use crate::services::{
    EngineeringService, EscalationService, OperationError, OperationResult, SupportService,
};

/// An operation together with its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationRequest {
    SendAutoResponse,
    SearchKnowledgeBase,
    AssignAgent,
    Investigate { agent_id: AgentId },
    AgentResolve { agent_id: AgentId },
    EscalateToEngineering,
    ApplyUrgentFix,
    NotifyCustomer { message: String },
    NotifyManagement { message: String },
    ValidateResolution,
    ReleaseAgent { agent_id: AgentId },
}

impl OperationRequest {
    pub fn operation(&self) -> Operation {
        match self {
            OperationRequest::SendAutoResponse => Operation::SendAutoResponse,
            OperationRequest::SearchKnowledgeBase => Operation::SearchKnowledgeBase,
            OperationRequest::AssignAgent => Operation::AssignAgent,
            OperationRequest::Investigate { .. } => Operation::Investigate,
            OperationRequest::AgentResolve { .. } => Operation::AgentResolve,
            OperationRequest::EscalateToEngineering => Operation::EscalateToEngineering,
            OperationRequest::ApplyUrgentFix => Operation::ApplyUrgentFix,
            OperationRequest::NotifyCustomer { .. } => Operation::NotifyCustomer,
            OperationRequest::NotifyManagement { .. } => Operation::NotifyManagement,
            OperationRequest::ValidateResolution => Operation::ValidateResolution,
            OperationRequest::ReleaseAgent { .. } => Operation::ReleaseAgent,
        }
    }
}

/// What an invocation settled on, as seen by plan logic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationOutcome {
    Completed(OperationOutput),
    /// Non-retryable rejection: an alternate branch, not a bug.
    Rejected(String),
    /// Resource unavailable: a branch condition, never retried.
    Unavailable(String),
}

impl From<RecordedOutcome> for OperationOutcome {
    fn from(outcome: RecordedOutcome) -> Self {
        match outcome {
            RecordedOutcome::Completed(output) => OperationOutcome::Completed(output),
            RecordedOutcome::Rejected(reason) => OperationOutcome::Rejected(reason),
            RecordedOutcome::Unavailable(reason) => OperationOutcome::Unavailable(reason),
        }
    }
}

impl From<OperationOutcome> for RecordedOutcome {
    fn from(outcome: OperationOutcome) -> Self {
        match outcome {
            OperationOutcome::Completed(output) => RecordedOutcome::Completed(output),
            OperationOutcome::Rejected(reason) => RecordedOutcome::Rejected(reason),
            OperationOutcome::Unavailable(reason) => RecordedOutcome::Unavailable(reason),
        }
    }
}

/// Invokes external operations with a uniform timeout and retry policy.
pub struct OperationExecutor<Su, Es, En> {
    support: Su,
    escalation: Es,
    engineering: En,
    config: ExecutorConfig,
}

impl<Su, Es, En> OperationExecutor<Su, Es, En>
where
    Su: SupportService,
    Es: EscalationService,
    En: EngineeringService,
{
    pub fn new(support: Su, escalation: Es, engineering: En, config: ExecutorConfig) -> Self {
        Self {
            support,
            escalation,
            engineering,
            config,
        }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    async fn dispatch(
        &self,
        ticket: &Ticket,
        request: &OperationRequest,
    ) -> OperationResult<OperationOutput> {
        use OperationOutput as Out;

        match request {
            OperationRequest::SendAutoResponse => self
                .support
                .send_auto_response(ticket)
                .await
                .map(Out::Acknowledged),
            OperationRequest::SearchKnowledgeBase => self
                .support
                .search_knowledge_base(ticket)
                .await
                .map(Out::Solution),
            OperationRequest::AssignAgent => self
                .escalation
                .assign_agent(ticket)
                .await
                .map(Out::AgentAssigned),
            OperationRequest::Investigate { agent_id } => self
                .escalation
                .investigate(ticket, agent_id)
                .await
                .map(Out::Investigation),
            OperationRequest::AgentResolve { agent_id } => self
                .support
                .agent_resolve(ticket, agent_id)
                .await
                .map(Out::Acknowledged),
            OperationRequest::EscalateToEngineering => self
                .escalation
                .escalate_to_engineering(ticket)
                .await
                .map(Out::Escalation),
            OperationRequest::ApplyUrgentFix => self
                .engineering
                .apply_urgent_fix(ticket)
                .await
                .map(Out::Fix),
            OperationRequest::NotifyCustomer { message } => self
                .support
                .notify_customer(ticket, message)
                .await
                .map(Out::Acknowledged),
            OperationRequest::NotifyManagement { message } => self
                .support
                .notify_management(ticket, message)
                .await
                .map(Out::Acknowledged),
            OperationRequest::ValidateResolution => self
                .engineering
                .validate_resolution(ticket)
                .await
                .map(Out::Acknowledged),
            OperationRequest::ReleaseAgent { agent_id } => self
                .support
                .release_agent(agent_id, ticket)
                .await
                .map(|_| Out::AgentReleased(agent_id.clone())),
        }
    }

    /// One attempt bounded by the start-to-close timeout.
    async fn attempt(
        &self,
        ticket: &Ticket,
        request: &OperationRequest,
    ) -> OperationResult<OperationOutput> {
        let timeout = self.config.start_to_close_timeout;
        match tokio::time::timeout(timeout, self.dispatch(ticket, request)).await {
            Ok(result) => result,
            Err(_) => Err(OperationError::retryable(format!(
                "timed out after {}ms",
                timeout.as_millis()
            ))),
        }
    }

    /// Runs the next step of a saga.
    ///
    /// A step already completed in the timeline is replayed from its recorded
    /// outcome without invoking anything. Otherwise the step is started (after
    /// the pause/abort check) and attempted until it settles or exhausts the
    /// retry budget; attempts recorded before a restart count against it.
    pub async fn invoke<S: ProgressStore>(
        &self,
        ctx: &mut SagaContext<S>,
        status: TicketStatus,
        request: OperationRequest,
    ) -> Result<OperationOutcome> {
        let step = ctx.next_step();
        let operation = request.operation();

        if let Some((recorded, outcome)) = ctx.state().completed_outcome(step) {
            if recorded != operation {
                return Err(SagaError::NonDeterministic {
                    step,
                    expected: operation,
                    recorded,
                });
            }
            tracing::debug!(ticket_id = %ctx.ticket_id(), step, operation = %operation, "step replayed");
            return Ok(outcome.clone().into());
        }

        match ctx.state().step_started(step) {
            Some(recorded) if recorded != operation => {
                return Err(SagaError::NonDeterministic {
                    step,
                    expected: operation,
                    recorded,
                });
            }
            Some(_) => {
                tracing::info!(ticket_id = %ctx.ticket_id(), step, operation = %operation, "resuming in-flight step");
            }
            None => {
                ctx.suspension_point().await?;
                ctx.record(
                    TimelineEvent::StepStarted { step, operation },
                    format!("Starting {operation}"),
                    status,
                )
                .await?;
            }
        }

        if ctx.state().failed_fatally(step) {
            return Err(SagaError::OperationFailed {
                operation,
                reason: ctx
                    .state()
                    .last_failure_detail(step)
                    .unwrap_or_default()
                    .to_string(),
            });
        }

        let max_attempts = self.config.retry.max_attempts;
        let mut attempt = ctx.state().failed_attempts(step);
        if attempt >= max_attempts {
            return Err(SagaError::RetriesExhausted {
                operation,
                attempts: attempt,
                last_error: ctx
                    .state()
                    .last_failure_detail(step)
                    .unwrap_or_default()
                    .to_string(),
            });
        }

        let ticket = ctx.ticket().clone();
        loop {
            attempt += 1;
            metrics::counter!("saga_operation_attempts_total", "operation" => operation.as_str())
                .increment(1);
            tracing::debug!(ticket_id = %ticket.id, step, operation = %operation, attempt, "attempt started");

            let started = Instant::now();
            let result = tokio::select! {
                biased;
                _ = ctx.abort_signal().triggered() => {
                    return Err(SagaError::Aborted(ticket.id.clone()));
                }
                result = self.attempt(&ticket, &request) => result,
            };
            metrics::histogram!("saga_operation_duration_seconds", "operation" => operation.as_str())
                .record(started.elapsed().as_secs_f64());

            let error = match result {
                Ok(output) => {
                    let detail = output.summary();
                    ctx.record(
                        TimelineEvent::StepCompleted {
                            step,
                            operation,
                            outcome: RecordedOutcome::Completed(output.clone()),
                        },
                        detail,
                        status,
                    )
                    .await?;
                    return Ok(OperationOutcome::Completed(output));
                }
                Err(error) => error,
            };

            match error.kind {
                FailureKind::NonRetryable => {
                    tracing::info!(ticket_id = %ticket.id, step, operation = %operation, reason = %error.message, "operation rejected");
                    let outcome = OperationOutcome::Rejected(error.message);
                    self.settle(ctx, step, operation, status, outcome.clone()).await?;
                    return Ok(outcome);
                }
                FailureKind::ResourceUnavailable => {
                    tracing::info!(ticket_id = %ticket.id, step, operation = %operation, reason = %error.message, "resource unavailable");
                    let outcome = OperationOutcome::Unavailable(error.message);
                    self.settle(ctx, step, operation, status, outcome.clone()).await?;
                    return Ok(outcome);
                }
                FailureKind::Fatal => {
                    ctx.record(
                        TimelineEvent::AttemptFailed {
                            step,
                            operation,
                            attempt,
                            kind: FailureKind::Fatal,
                        },
                        error.message.clone(),
                        status,
                    )
                    .await?;
                    return Err(SagaError::OperationFailed {
                        operation,
                        reason: error.message,
                    });
                }
                FailureKind::Retryable => {
                    ctx.record(
                        TimelineEvent::AttemptFailed {
                            step,
                            operation,
                            attempt,
                            kind: FailureKind::Retryable,
                        },
                        error.message.clone(),
                        status,
                    )
                    .await?;

                    if attempt >= max_attempts {
                        tracing::warn!(ticket_id = %ticket.id, step, operation = %operation, attempts = attempt, error = %error.message, "retries exhausted");
                        return Err(SagaError::RetriesExhausted {
                            operation,
                            attempts: attempt,
                            last_error: error.message,
                        });
                    }

                    let delay = self.config.retry.delay_for_attempt(attempt);
                    metrics::counter!("saga_operation_retries_total", "operation" => operation.as_str())
                        .increment(1);
                    tracing::warn!(ticket_id = %ticket.id, step, operation = %operation, attempt, delay_ms = delay.as_millis() as u64, error = %error.message, "attempt failed, retrying");

                    tokio::select! {
                        biased;
                        _ = ctx.abort_signal().triggered() => {
                            return Err(SagaError::Aborted(ticket.id.clone()));
                        }
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }
    }

    async fn settle<S: ProgressStore>(
        &self,
        ctx: &mut SagaContext<S>,
        step: u32,
        operation: Operation,
        status: TicketStatus,
        outcome: OperationOutcome,
    ) -> Result<()> {
        let outcome = RecordedOutcome::from(outcome);
        let detail = outcome.summary();
        ctx.record(
            TimelineEvent::StepCompleted {
                step,
                operation,
                outcome,
            },
            detail,
            status,
        )
        .await
    }

    /// Runs a compensating action under the same timeout and retry policy.
    ///
    /// Nothing is recorded; the caller records the result. A non-retryable or
    /// unavailable failure ends the attempts early.
    pub async fn compensate(
        &self,
        ticket: &Ticket,
        action: &CompensationAction,
    ) -> std::result::Result<(), OperationError> {
        let request = match action {
            CompensationAction::ReleaseAgent { agent_id } => OperationRequest::ReleaseAgent {
                agent_id: agent_id.clone(),
            },
        };

        let max_attempts = self.config.retry.max_attempts;
        let mut attempt = 0;
        loop {
            attempt += 1;
            metrics::counter!("saga_operation_attempts_total", "operation" => request.operation().as_str())
                .increment(1);

            let error = match self.attempt(ticket, &request).await {
                Ok(_) => return Ok(()),
                Err(error) => error,
            };
            if error.kind != FailureKind::Retryable || attempt >= max_attempts {
                return Err(error);
            }

            let delay = self.config.retry.delay_for_attempt(attempt);
            tracing::warn!(ticket_id = %ticket.id, action = %action, attempt, error = %error.message, "compensation attempt failed, retrying");
            tokio::time::sleep(delay).await;
        }
    }
}

//! The ticket saga engine.

use std::sync::Arc;
use std::time::Instant;

use common::TicketId;
use domain::{
    Aggregate, ResolutionMethod, SagaState, StatusSnapshot, Ticket, TicketStatus, TimelineEvent,
};
use progress_store::{CheckpointQuery, ProgressStore, ProgressStoreError, ProgressStoreExt};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::compensation;
use crate::config::ExecutorConfig;
use crate::context::SagaContext;
use crate::control::{ControlHandle, ControlSurface};
use crate::error::{Result, SagaError};
use crate::executor::OperationExecutor;
use crate::plans::{PlanOutcome, PlanSteps, PriorityRouter};
use crate::services::{EngineeringService, EscalationService, SupportService};

/// Final result of a saga run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SagaResult {
    pub ticket_id: TicketId,
    pub status: TicketStatus,
    pub resolution_method: Option<ResolutionMethod>,
    /// Terminal string naming the ticket and how it ended.
    pub message: String,
}

impl SagaResult {
    fn from_state(state: &SagaState) -> Self {
        Self {
            ticket_id: state.ticket.id.clone(),
            status: state.status,
            resolution_method: state.resolution_method,
            message: state.result.clone().unwrap_or_default(),
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(
            self.status,
            TicketStatus::Resolved | TicketStatus::ResolvedWithEscalation
        )
    }
}

enum Prepared {
    Archived(SagaResult),
    Ready(SagaState),
}

struct EngineInner<S, Su, Es, En> {
    store: S,
    executor: OperationExecutor<Su, Es, En>,
    control: ControlSurface,
}

/// Runs ticket sagas to completion, one task per ticket.
///
/// Every state change is checkpointed before the next step begins, so a
/// saga interrupted at any point resumes from its last checkpoint without
/// repeating a completed operation.
pub struct TicketSagaEngine<S, Su, Es, En> {
    inner: Arc<EngineInner<S, Su, Es, En>>,
}

impl<S, Su, Es, En> Clone for TicketSagaEngine<S, Su, Es, En> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S, Su, Es, En> TicketSagaEngine<S, Su, Es, En>
where
    S: ProgressStore + Clone + 'static,
    Su: SupportService + 'static,
    Es: EscalationService + 'static,
    En: EngineeringService + 'static,
{
    /// Creates an engine with the default retry and timeout policy.
    pub fn new(store: S, support: Su, escalation: Es, engineering: En) -> Self {
        Self::with_config(store, support, escalation, engineering, ExecutorConfig::DEFAULT)
    }

    pub fn with_config(
        store: S,
        support: Su,
        escalation: Es,
        engineering: En,
        config: ExecutorConfig,
    ) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                store,
                executor: OperationExecutor::new(support, escalation, engineering, config),
                control: ControlSurface::new(),
            }),
        }
    }

    /// The live control surface of this engine.
    pub fn control(&self) -> &ControlSurface {
        &self.inner.control
    }

    pub fn store(&self) -> &S {
        &self.inner.store
    }

    /// Runs a ticket's saga to its terminal status.
    ///
    /// A ticket with a terminal checkpoint returns its archived result
    /// without running anything. A non-terminal checkpoint is resumed and a
    /// new ticket starts at `NEW`.
    #[tracing::instrument(skip(self, ticket), fields(ticket_id = %ticket.id, priority = %ticket.priority))]
    pub async fn execute(&self, ticket: Ticket) -> Result<SagaResult> {
        let state = match self.prepare(ticket).await? {
            Prepared::Archived(result) => return Ok(result),
            Prepared::Ready(state) => state,
        };
        let handle = self.inner.control.register(state.snapshot())?;
        self.run(state, handle).await
    }

    /// Resumes the saga of a ticket known to the store.
    pub async fn resume(&self, ticket_id: &TicketId) -> Result<SagaResult> {
        let state = self.load_state(ticket_id).await?;
        self.execute(state.ticket).await
    }

    /// Starts a ticket's saga on its own task.
    ///
    /// The control is registered before the task starts, so pause and status
    /// work as soon as this returns. An archived ticket is refused.
    pub async fn spawn(&self, ticket: Ticket) -> Result<JoinHandle<Result<SagaResult>>> {
        let ticket_id = ticket.id.clone();
        let state = match self.prepare(ticket).await? {
            Prepared::Archived(_) => {
                return Err(SagaError::Store(ProgressStoreError::Archived(ticket_id)));
            }
            Prepared::Ready(state) => state,
        };
        let handle = self.inner.control.register(state.snapshot())?;

        let engine = self.clone();
        let span = tracing::info_span!("saga", ticket_id = %ticket_id);
        Ok(tokio::spawn(
            async move { engine.run(state, handle).await }.instrument(span),
        ))
    }

    /// Spawns every saga the store holds as incomplete.
    ///
    /// Sagas already running in this engine are skipped.
    pub async fn recover_incomplete(&self) -> Result<Vec<JoinHandle<Result<SagaResult>>>> {
        let incomplete = self.inner.store.incomplete().await?;
        tracing::info!(count = incomplete.len(), "recovering incomplete sagas");

        let mut handles = Vec::with_capacity(incomplete.len());
        for ticket_id in incomplete {
            let state = self.load_state(&ticket_id).await?;
            match self.spawn(state.ticket).await {
                Ok(handle) => handles.push(handle),
                Err(SagaError::AlreadyRunning(_))
                | Err(SagaError::Store(ProgressStoreError::Archived(_))) => {
                    tracing::debug!(ticket_id = %ticket_id, "saga not recoverable, skipping");
                }
                Err(e) => return Err(e),
            }
        }
        metrics::counter!("saga_recovered_total").increment(handles.len() as u64);
        Ok(handles)
    }

    /// Returns the status of a ticket, live if it is registered.
    pub async fn load_snapshot(&self, ticket_id: &TicketId) -> Result<StatusSnapshot> {
        if let Ok(snapshot) = self.inner.control.status(ticket_id) {
            return Ok(snapshot);
        }
        Ok(self.load_state(ticket_id).await?.snapshot())
    }

    /// Lists persisted sagas, oldest checkpoint first.
    pub async fn list(&self, query: CheckpointQuery) -> Result<Vec<StatusSnapshot>> {
        let checkpoints = self.inner.store.list(query).await?;
        checkpoints
            .into_iter()
            .map(|checkpoint| Ok(checkpoint.into_state::<SagaState>()?.snapshot()))
            .collect()
    }

    async fn load_state(&self, ticket_id: &TicketId) -> Result<SagaState> {
        let checkpoint = self
            .inner
            .store
            .load(ticket_id)
            .await?
            .ok_or_else(|| SagaError::UnknownTicket(ticket_id.clone()))?;
        let version = checkpoint.version;
        let mut state: SagaState = checkpoint.into_state()?;
        state.set_version(version);
        Ok(state)
    }

    async fn prepare(&self, ticket: Ticket) -> Result<Prepared> {
        match self.inner.store.load(&ticket.id).await? {
            None => Ok(Prepared::Ready(SagaState::start(ticket))),
            Some(checkpoint) => {
                let version = checkpoint.version;
                let mut state: SagaState = checkpoint.into_state()?;
                state.set_version(version);

                if state.is_terminal() {
                    tracing::info!(ticket_id = %state.ticket.id, status = %state.status, "saga archived, returning recorded result");
                    return Ok(Prepared::Archived(SagaResult::from_state(&state)));
                }
                Ok(Prepared::Ready(state))
            }
        }
    }

    async fn run(&self, state: SagaState, handle: ControlHandle) -> Result<SagaResult> {
        metrics::counter!("saga_executions_total").increment(1);
        let started = Instant::now();

        let ticket_id = state.ticket.id.clone();
        let plan = PriorityRouter::route(state.ticket.priority);
        let fresh = !state.version().is_stored();
        let executor = &self.inner.executor;

        let mut ctx = SagaContext::new(state, self.inner.store.clone(), handle);
        if fresh {
            ctx.checkpoint().await?;
            tracing::info!(ticket_id = %ticket_id, plan = plan.as_str(), "saga started");
        } else {
            ctx.publish();
            tracing::info!(ticket_id = %ticket_id, plan = plan.as_str(), status = %ctx.status(), "saga resumed");
        }

        let pending = ctx.state().pending_failure().map(str::to_owned);
        let outcome = match pending {
            Some(result) => {
                // Interrupted mid-unwind: finish it, never re-run the plan
                compensation::unwind(&mut ctx, executor, "resuming interrupted unwind", &result)
                    .await?;
                PlanOutcome::failed(result)
            }
            None => {
                let mut steps = PlanSteps::new(&mut ctx, executor);
                match plan.run(&mut steps).await {
                    Ok(outcome) => outcome,
                    Err(err) if err.is_fatal_workflow_failure() => {
                        let result = format!("Failed: {ticket_id} - {err}");
                        tracing::error!(ticket_id = %ticket_id, error = %err, "saga failed, compensating");
                        compensation::unwind(&mut ctx, executor, &err.to_string(), &result)
                            .await?;
                        PlanOutcome::failed(result)
                    }
                    Err(err) => return Err(err),
                }
            }
        };

        match outcome {
            PlanOutcome::Resolved { method, result } => {
                if let Some(agent_id) = ctx.state().reserved_agent.clone() {
                    let status = ctx.status();
                    ctx.record(
                        TimelineEvent::ReservationConsumed {
                            agent_id: agent_id.clone(),
                        },
                        format!("Agent {agent_id} reservation consumed by resolution"),
                        status,
                    )
                    .await?;
                }
                ctx.record(
                    TimelineEvent::SagaResolved {
                        method,
                        result: result.clone(),
                    },
                    result.clone(),
                    method.terminal_status(),
                )
                .await?;

                metrics::counter!("saga_resolved_total", "method" => method.as_str()).increment(1);
                tracing::info!(ticket_id = %ticket_id, method = method.as_str(), result = %result, "saga resolved");
            }
            PlanOutcome::Failed { result } => {
                if !ctx.state().compensations.is_empty() {
                    compensation::unwind(
                        &mut ctx,
                        executor,
                        "plan failed with pending compensations",
                        &result,
                    )
                    .await?;
                }
                ctx.record(
                    TimelineEvent::SagaFailed {
                        result: result.clone(),
                    },
                    result.clone(),
                    TicketStatus::Failed,
                )
                .await?;

                metrics::counter!("saga_failed_total").increment(1);
                tracing::warn!(ticket_id = %ticket_id, result = %result, "saga failed, manual follow-up required");
            }
        }

        metrics::histogram!("saga_duration_seconds").record(started.elapsed().as_secs_f64());
        Ok(SagaResult::from_state(ctx.state()))
    }
}

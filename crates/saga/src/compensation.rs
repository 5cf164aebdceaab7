//! Compensation unwinding.

use domain::{TicketStatus, TimelineEvent};
use progress_store::ProgressStore;

use crate::context::SagaContext;
use crate::error::Result;
use crate::executor::OperationExecutor;
use crate::services::{EngineeringService, EscalationService, SupportService};

/// Runs every pending compensation, most recent first.
///
/// `result` is the terminal string the saga will fail with; it is recorded
/// alongside `UnwindStarted` so a restart mid-unwind can finish the job
/// without re-running the plan. Each compensation is checkpointed as it
/// retires. A failed compensation is logged and recorded but never stops
/// the unwind. Returns the number of entries retired.
pub async fn unwind<S, Su, Es, En>(
    ctx: &mut SagaContext<S>,
    executor: &OperationExecutor<Su, Es, En>,
    reason: &str,
    result: &str,
) -> Result<usize>
where
    S: ProgressStore,
    Su: SupportService,
    Es: EscalationService,
    En: EngineeringService,
{
    if !ctx.state().unwind_in_progress() {
        ctx.record(
            TimelineEvent::UnwindStarted {
                reason: reason.to_string(),
                result: result.to_string(),
            },
            format!("Compensating: {reason}"),
            TicketStatus::Compensating,
        )
        .await?;
    }

    let mut retired = 0;
    while let Some(entry) = ctx.state().compensations.peek().cloned() {
        let action = entry.action;
        let ticket = ctx.ticket().clone();

        match executor.compensate(&ticket, &action).await {
            Ok(()) => {
                tracing::info!(ticket_id = %ticket.id, action = %action, "compensation executed");
                metrics::counter!("saga_compensations_total", "outcome" => "executed").increment(1);
                ctx.record(
                    TimelineEvent::CompensationExecuted {
                        action: action.clone(),
                    },
                    format!("Compensated: {action}"),
                    TicketStatus::Compensating,
                )
                .await?;
            }
            Err(error) => {
                tracing::warn!(ticket_id = %ticket.id, action = %action, error = %error, "compensation failed");
                metrics::counter!("saga_compensations_total", "outcome" => "failed").increment(1);
                ctx.record(
                    TimelineEvent::CompensationFailed {
                        action: action.clone(),
                        error: error.to_string(),
                    },
                    format!("Compensation {action} failed: {error}"),
                    TicketStatus::Compensating,
                )
                .await?;
            }
        }
        retired += 1;
    }

    Ok(retired)
}

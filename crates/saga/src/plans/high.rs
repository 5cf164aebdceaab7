//! High priority: senior agent, immediate escalation and an urgent fix.

use domain::{FixOutcome, ResolutionMethod, TicketStatus};
use progress_store::ProgressStore;

use super::{PlanOutcome, PlanSteps, StepResult};
use crate::error::Result;
use crate::services::{EngineeringService, EscalationService, SupportService};

pub(crate) async fn run<S, Su, Es, En>(
    steps: &mut PlanSteps<'_, S, Su, Es, En>,
) -> Result<PlanOutcome>
where
    S: ProgressStore,
    Su: SupportService,
    Es: EscalationService,
    En: EngineeringService,
{
    let id = steps.ticket_id();

    let senior = match steps.assign_agent(TicketStatus::AssignSenior).await? {
        StepResult::Done(agent) => agent,
        StepResult::Rejected(_) | StepResult::Unavailable(_) => {
            return steps
                .backlog(
                    "No senior agent available for high priority ticket",
                    format!("No senior agent available, ticket queued for manual handling: {id}"),
                )
                .await;
        }
    };

    // The fix is attempted whatever engineering answers
    let escalation = steps.escalate().await?;
    tracing::info!(ticket_id = %id, senior = %senior, escalation = ?escalation, "escalated to engineering");

    match steps.apply_fix().await? {
        FixOutcome::Succeeded => {
            steps
                .notify_customer(TicketStatus::NotifyAll, "Your urgent issue has been fixed.")
                .await?;
            steps
                .notify_management(
                    TicketStatus::NotifyAll,
                    &format!("Urgent fix applied for ticket {id}"),
                )
                .await?;
            Ok(PlanOutcome::resolved(
                ResolutionMethod::UrgentFix,
                format!("Resolved urgently: {id}"),
            ))
        }
        FixOutcome::Failed => {
            steps.release_agent(&senior).await?;
            steps
                .notify_management(
                    TicketStatus::NotifyManagement,
                    &format!("Urgent fix failed for ticket {id}"),
                )
                .await?;
            Ok(PlanOutcome::failed(format!(
                "Failed to resolve urgent issue: {id}"
            )))
        }
    }
}

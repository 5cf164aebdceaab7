//! Medium priority: agent investigation, engineering escalation when needed.

use domain::{EscalationOutcome, InvestigationOutcome, ResolutionMethod, TicketStatus};
use progress_store::ProgressStore;

use super::{PlanOutcome, PlanSteps, StepResult};
use crate::error::Result;
use crate::services::{EngineeringService, EscalationService, SupportService};

const NO_AGENT: &str = "No agent available for medium priority ticket";

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
    let backlog = format!("No agent available, ticket queued for manual handling: {id}");

    let agent = match steps.assign_agent(TicketStatus::AssigningAgent).await? {
        StepResult::Done(agent) => agent,
        StepResult::Rejected(_) | StepResult::Unavailable(_) => {
            return steps.backlog(NO_AGENT, backlog).await;
        }
    };

    match steps.investigate(&agent).await? {
        InvestigationOutcome::Complete => {
            steps
                .notify_customer(TicketStatus::Notifying, "Your issue has been resolved.")
                .await?;
            return Ok(PlanOutcome::resolved(
                ResolutionMethod::Agent,
                format!("Resolved normally: {id}"),
            ));
        }
        outcome @ (InvestigationOutcome::NeedsEscalation
        | InvestigationOutcome::AgentUnavailable) => {
            tracing::info!(ticket_id = %id, outcome = ?outcome, "escalating to engineering");
        }
    }

    steps.release_agent(&agent).await?;

    match steps.escalate().await? {
        EscalationOutcome::Accepted => {
            steps
                .notify_customer(
                    TicketStatus::Notifying,
                    "Your issue was resolved by our engineering team.",
                )
                .await?;
            Ok(PlanOutcome::resolved(
                ResolutionMethod::Escalation,
                format!("Resolved with escalation: {id}"),
            ))
        }
        EscalationOutcome::Rejected => {
            tracing::info!(ticket_id = %id, "escalation rejected, reassigning");

            let agent = match steps.assign_agent(TicketStatus::AssigningAgent).await? {
                StepResult::Done(agent) => agent,
                StepResult::Rejected(_) | StepResult::Unavailable(_) => {
                    return steps.backlog(NO_AGENT, backlog).await;
                }
            };

            match steps.agent_resolve(&agent).await? {
                StepResult::Done(_) => {
                    steps
                        .notify_customer(TicketStatus::Notifying, "Your issue has been resolved.")
                        .await?;
                    Ok(PlanOutcome::resolved(
                        ResolutionMethod::Agent,
                        format!("Resolved by reassigned agent: {id}"),
                    ))
                }
                StepResult::Rejected(_) | StepResult::Unavailable(_) => {
                    steps.release_agent(&agent).await?;
                    steps
                        .notify_management(
                            TicketStatus::NotifyManagement,
                            &format!("Reassigned agent {agent} could not resolve ticket after rejected escalation"),
                        )
                        .await?;
                    Ok(PlanOutcome::failed(format!(
                        "Agent unable to resolve, management notified: {id}"
                    )))
                }
            }
        }
    }
}

//! Low priority: automated resolution first, human agent as fallback.

use domain::{ResolutionMethod, TicketStatus};
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

    steps.send_auto_response().await?;

    match steps.search_knowledge_base().await? {
        StepResult::Done(solution) => {
            steps
                .notify_customer(
                    TicketStatus::Notifying,
                    &format!("We found a solution for your issue: {solution}"),
                )
                .await?;

            match steps.validate_resolution().await? {
                StepResult::Done(_) => {
                    return Ok(PlanOutcome::resolved(
                        ResolutionMethod::Automated,
                        format!("Resolved automatically: {id}"),
                    ));
                }
                StepResult::Rejected(reason) | StepResult::Unavailable(reason) => {
                    tracing::info!(ticket_id = %id, reason = %reason, "automated solution rejected, assigning agent");
                    steps
                        .notify_customer(
                            TicketStatus::Notifying,
                            "We're sorry the suggested solution did not help. An agent will take over your ticket.",
                        )
                        .await?;
                }
            }
        }
        StepResult::Rejected(reason) | StepResult::Unavailable(reason) => {
            tracing::info!(ticket_id = %id, reason = %reason, "no knowledge base solution, assigning agent");
        }
    }

    let agent = match steps.assign_agent(TicketStatus::AssigningAgent).await? {
        StepResult::Done(agent) => agent,
        StepResult::Rejected(_) | StepResult::Unavailable(_) => {
            return steps
                .backlog(
                    "No agent available for low priority ticket",
                    format!("No agent available, ticket queued for manual handling: {id}"),
                )
                .await;
        }
    };

    match steps.agent_resolve(&agent).await? {
        StepResult::Done(resolution) => {
            steps
                .notify_customer(
                    TicketStatus::Notifying,
                    &format!("Your ticket was resolved by {agent}: {resolution}"),
                )
                .await?;
            Ok(PlanOutcome::resolved(
                ResolutionMethod::Agent,
                format!("Resolved by agent: {id}"),
            ))
        }
        StepResult::Rejected(_) | StepResult::Unavailable(_) => {
            steps.release_agent(&agent).await?;
            steps
                .notify_management(
                    TicketStatus::NotifyManagement,
                    &format!("Agent {agent} could not resolve ticket"),
                )
                .await?;
            Ok(PlanOutcome::failed(format!(
                "Agent unable to resolve, management notified: {id}"
            )))
        }
    }
}

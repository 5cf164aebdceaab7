//! Vocabulary of external operations and their outcomes.

use common::AgentId;
use serde::{Deserialize, Serialize};

use crate::TicketStatus;

/// Class of worker capacity that serves an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskQueue {
    Support,
    Escalation,
    Engineering,
}

impl TaskQueue {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskQueue::Support => "support",
            TaskQueue::Escalation => "escalation",
            TaskQueue::Engineering => "engineering",
        }
    }
}

/// An external, possibly side-effecting operation invoked by a saga step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    SendAutoResponse,
    SearchKnowledgeBase,
    AssignAgent,
    Investigate,
    AgentResolve,
    EscalateToEngineering,
    ApplyUrgentFix,
    NotifyCustomer,
    NotifyManagement,
    ValidateResolution,
    ReleaseAgent,
}

impl Operation {
    /// Returns the operation name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::SendAutoResponse => "send_auto_response",
            Operation::SearchKnowledgeBase => "search_knowledge_base",
            Operation::AssignAgent => "assign_agent",
            Operation::Investigate => "investigate",
            Operation::AgentResolve => "agent_resolve",
            Operation::EscalateToEngineering => "escalate_to_engineering",
            Operation::ApplyUrgentFix => "apply_urgent_fix",
            Operation::NotifyCustomer => "notify_customer",
            Operation::NotifyManagement => "notify_management",
            Operation::ValidateResolution => "validate_resolution",
            Operation::ReleaseAgent => "release_agent",
        }
    }

    /// Returns a human-readable label used in status listings.
    pub fn label(&self) -> &'static str {
        match self {
            Operation::SendAutoResponse => "Auto-response sent",
            Operation::SearchKnowledgeBase => "Knowledge base searched",
            Operation::AssignAgent => "Agent assignment",
            Operation::Investigate => "Investigation",
            Operation::AgentResolve => "Agent resolution",
            Operation::EscalateToEngineering => "Engineering escalation",
            Operation::ApplyUrgentFix => "Urgent fix",
            Operation::NotifyCustomer => "Customer notified",
            Operation::NotifyManagement => "Management notified",
            Operation::ValidateResolution => "Resolution validated",
            Operation::ReleaseAgent => "Agent released",
        }
    }

    /// Returns the task queue whose workers serve this operation.
    pub fn queue(&self) -> TaskQueue {
        match self {
            Operation::SendAutoResponse
            | Operation::SearchKnowledgeBase
            | Operation::AgentResolve
            | Operation::NotifyCustomer
            | Operation::NotifyManagement
            | Operation::ReleaseAgent => TaskQueue::Support,
            Operation::AssignAgent | Operation::Investigate | Operation::EscalateToEngineering => {
                TaskQueue::Escalation
            }
            Operation::ApplyUrgentFix | Operation::ValidateResolution => TaskQueue::Engineering,
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvestigationOutcome {
    Complete,
    NeedsEscalation,
    AgentUnavailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationOutcome {
    Accepted,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixOutcome {
    Succeeded,
    Failed,
}

/// The typed success payload of an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum OperationOutput {
    Acknowledged(String),
    Solution(String),
    AgentAssigned(AgentId),
    Investigation(InvestigationOutcome),
    Escalation(EscalationOutcome),
    Fix(FixOutcome),
    AgentReleased(AgentId),
}

impl OperationOutput {
    /// Short description for timeline details.
    pub fn summary(&self) -> String {
        match self {
            OperationOutput::Acknowledged(text) | OperationOutput::Solution(text) => text.clone(),
            OperationOutput::AgentAssigned(agent) => format!("agent {agent} assigned"),
            OperationOutput::Investigation(outcome) => format!("investigation {outcome:?}"),
            OperationOutput::Escalation(outcome) => format!("escalation {outcome:?}"),
            OperationOutput::Fix(outcome) => format!("fix {outcome:?}"),
            OperationOutput::AgentReleased(agent) => format!("agent {agent} released"),
        }
    }
}

/// What a completed step settled on.
///
/// Stored in the timeline so a resumed saga can replay the step without
/// invoking the operation again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum RecordedOutcome {
    Completed(OperationOutput),
    /// Expected alternate-branch signal (e.g. no knowledge base solution).
    Rejected(String),
    /// A required resource is unavailable (e.g. no agent).
    Unavailable(String),
}

impl RecordedOutcome {
    pub fn summary(&self) -> String {
        match self {
            RecordedOutcome::Completed(output) => output.summary(),
            RecordedOutcome::Rejected(reason) => format!("rejected: {reason}"),
            RecordedOutcome::Unavailable(reason) => format!("unavailable: {reason}"),
        }
    }
}

/// How a ticket was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionMethod {
    Automated,
    Agent,
    Escalation,
    UrgentFix,
}

impl ResolutionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionMethod::Automated => "automated",
            ResolutionMethod::Agent => "agent",
            ResolutionMethod::Escalation => "escalation",
            ResolutionMethod::UrgentFix => "urgent_fix",
        }
    }

    /// Returns the terminal status a saga resolved this way ends in.
    pub fn terminal_status(&self) -> TicketStatus {
        match self {
            ResolutionMethod::Escalation => TicketStatus::ResolvedWithEscalation,
            _ => TicketStatus::Resolved,
        }
    }
}

/// Classification of a failed operation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Transient failure or timeout; retried per policy.
    Retryable,
    /// Expected rejection that selects an alternate branch.
    NonRetryable,
    /// A required resource is unavailable; a branch condition, never retried.
    ResourceUnavailable,
    /// Unexpected failure; halts the saga and unwinds compensations.
    Fatal,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Retryable => "retryable",
            FailureKind::NonRetryable => "non_retryable",
            FailureKind::ResourceUnavailable => "resource_unavailable",
            FailureKind::Fatal => "fatal",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operations_map_to_task_queues() {
        assert_eq!(Operation::SendAutoResponse.queue(), TaskQueue::Support);
        assert_eq!(Operation::ReleaseAgent.queue(), TaskQueue::Support);
        assert_eq!(Operation::AssignAgent.queue(), TaskQueue::Escalation);
        assert_eq!(Operation::EscalateToEngineering.queue(), TaskQueue::Escalation);
        assert_eq!(Operation::ApplyUrgentFix.queue(), TaskQueue::Engineering);
        assert_eq!(Operation::ValidateResolution.queue(), TaskQueue::Engineering);
    }

    #[test]
    fn operation_name_matches_serialized_form() {
        let json = serde_json::to_string(&Operation::EscalateToEngineering).unwrap();
        assert_eq!(json, "\"escalate_to_engineering\"");
        assert_eq!(Operation::EscalateToEngineering.to_string(), "escalate_to_engineering");
    }

    #[test]
    fn escalation_resolves_with_escalation() {
        assert_eq!(
            ResolutionMethod::Escalation.terminal_status(),
            TicketStatus::ResolvedWithEscalation
        );
        assert_eq!(
            ResolutionMethod::UrgentFix.terminal_status(),
            TicketStatus::Resolved
        );
    }

    #[test]
    fn recorded_outcome_serialization() {
        let outcome = RecordedOutcome::Completed(OperationOutput::AgentAssigned(AgentId::new(
            "agent-7",
        )));
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["type"], "Completed");
        assert_eq!(json["data"]["type"], "AgentAssigned");
        assert_eq!(json["data"]["data"], "agent-7");

        let parsed: RecordedOutcome = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, outcome);
    }

    #[test]
    fn outcome_summaries() {
        assert_eq!(
            RecordedOutcome::Rejected("no solution found".into()).summary(),
            "rejected: no solution found"
        );
        assert_eq!(
            OperationOutput::AgentAssigned(AgentId::new("agent-3")).summary(),
            "agent agent-3 assigned"
        );
    }
}

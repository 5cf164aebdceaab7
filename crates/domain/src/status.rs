//! Ticket status labels.

use serde::{Deserialize, Serialize};

/// The status of a ticket saga, reflecting the active step.
///
/// Terminal statuses:
/// ```text
/// RESOLVED | RESOLVED_WITH_ESCALATION | FAILED
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketStatus {
    #[default]
    New,
    AutoResponding,
    SearchingKb,
    Notifying,
    Validating,
    AssigningAgent,
    AssignSenior,
    AgentResolving,
    Investigating,
    ReleasingAgent,
    Escalating,
    ApplyingFix,
    NotifyAll,
    NotifyManagement,
    Compensating,
    Resolved,
    ResolvedWithEscalation,
    Failed,
}

impl TicketStatus {
    /// Returns true if this is a terminal status (the saga is archived).
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TicketStatus::Resolved | TicketStatus::ResolvedWithEscalation | TicketStatus::Failed
        )
    }

    /// Returns the status label.
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::New => "NEW",
            TicketStatus::AutoResponding => "AUTO_RESPONDING",
            TicketStatus::SearchingKb => "SEARCHING_KB",
            TicketStatus::Notifying => "NOTIFYING",
            TicketStatus::Validating => "VALIDATING",
            TicketStatus::AssigningAgent => "ASSIGNING_AGENT",
            TicketStatus::AssignSenior => "ASSIGN_SENIOR",
            TicketStatus::AgentResolving => "AGENT_RESOLVING",
            TicketStatus::Investigating => "INVESTIGATING",
            TicketStatus::ReleasingAgent => "RELEASING_AGENT",
            TicketStatus::Escalating => "ESCALATING",
            TicketStatus::ApplyingFix => "APPLYING_FIX",
            TicketStatus::NotifyAll => "NOTIFY_ALL",
            TicketStatus::NotifyManagement => "NOTIFY_MANAGEMENT",
            TicketStatus::Compensating => "COMPENSATING",
            TicketStatus::Resolved => "RESOLVED",
            TicketStatus::ResolvedWithEscalation => "RESOLVED_WITH_ESCALATION",
            TicketStatus::Failed => "FAILED",
        }
    }
}

impl std::fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_statuses() {
        assert!(TicketStatus::Resolved.is_terminal());
        assert!(TicketStatus::ResolvedWithEscalation.is_terminal());
        assert!(TicketStatus::Failed.is_terminal());

        assert!(!TicketStatus::New.is_terminal());
        assert!(!TicketStatus::Compensating.is_terminal());
        assert!(!TicketStatus::NotifyManagement.is_terminal());
    }

    #[test]
    fn label_matches_serialized_form() {
        for status in [
            TicketStatus::SearchingKb,
            TicketStatus::AssignSenior,
            TicketStatus::ResolvedWithEscalation,
            TicketStatus::NotifyAll,
        ] {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
        }
    }

    #[test]
    fn default_is_new() {
        assert_eq!(TicketStatus::default(), TicketStatus::New);
        assert_eq!(TicketStatus::default().to_string(), "NEW");
    }
}

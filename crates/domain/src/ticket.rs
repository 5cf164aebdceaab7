//! Support tickets and their priority.

use std::str::FromStr;

use common::TicketId;
use serde::{Deserialize, Serialize};

use crate::{DomainError, TicketStatus};

/// Ticket priority. Fixed at saga start; selects the execution plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    /// Returns the priority name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

impl FromStr for Priority {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            _ => Err(DomainError::InvalidPriority(s.to_string())),
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A customer-support ticket.
///
/// The identity fields never change once created. `status` is updated only
/// by the saga that owns the ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: TicketId,
    pub customer_name: String,
    pub issue: String,
    pub priority: Priority,
    #[serde(default)]
    pub status: TicketStatus,
}

impl Ticket {
    /// Creates a new ticket in status `NEW`.
    pub fn new(
        id: impl Into<TicketId>,
        customer_name: impl Into<String>,
        issue: impl Into<String>,
        priority: Priority,
    ) -> Self {
        Self {
            id: id.into(),
            customer_name: customer_name.into(),
            issue: issue.into(),
            priority,
            status: TicketStatus::New,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_priority() {
        assert_eq!("low".parse::<Priority>().unwrap(), Priority::Low);
        assert_eq!("Medium".parse::<Priority>().unwrap(), Priority::Medium);
        assert_eq!("HIGH".parse::<Priority>().unwrap(), Priority::High);
    }

    #[test]
    fn parse_invalid_priority() {
        let err = "urgent".parse::<Priority>().unwrap_err();
        assert_eq!(err, DomainError::InvalidPriority("urgent".to_string()));
        assert_eq!(err.to_string(), "Invalid priority: urgent");
    }

    #[test]
    fn priority_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Priority::High).unwrap(), "\"high\"");
        let parsed: Priority = serde_json::from_str("\"medium\"").unwrap();
        assert_eq!(parsed, Priority::Medium);
    }

    #[test]
    fn new_ticket_starts_at_new() {
        let ticket = Ticket::new("TKT-001", "Alice", "Cannot log in", Priority::Low);
        assert_eq!(ticket.id, TicketId::new("TKT-001"));
        assert_eq!(ticket.status, TicketStatus::New);
    }
}

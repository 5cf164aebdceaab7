//! Compensation stack: LIFO ledger of undo actions.

use chrono::{DateTime, Utc};
use common::AgentId;
use serde::{Deserialize, Serialize};

/// A compensating action together with its arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", content = "args", rename_all = "snake_case")]
pub enum CompensationAction {
    /// Releases an agent reservation.
    ReleaseAgent { agent_id: AgentId },
}

impl CompensationAction {
    /// Returns the action identifier.
    pub fn name(&self) -> &'static str {
        match self {
            CompensationAction::ReleaseAgent { .. } => "release_agent",
        }
    }

    /// Returns the agent this action concerns, if any.
    pub fn agent_id(&self) -> Option<&AgentId> {
        match self {
            CompensationAction::ReleaseAgent { agent_id } => Some(agent_id),
        }
    }
}

impl std::fmt::Display for CompensationAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompensationAction::ReleaseAgent { agent_id } => {
                write!(f, "release_agent({agent_id})")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompensationEntry {
    pub action: CompensationAction,
    pub pushed_at: DateTime<Utc>,
}

/// Ordered ledger of undo actions, unwound newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompensationStack {
    entries: Vec<CompensationEntry>,
}

impl CompensationStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes an action right after the side effect it reverses succeeded.
    pub fn push(&mut self, action: CompensationAction, at: DateTime<Utc>) {
        self.entries.push(CompensationEntry {
            action,
            pushed_at: at,
        });
    }

    /// Pops the most recently pushed entry.
    pub fn pop(&mut self) -> Option<CompensationEntry> {
        self.entries.pop()
    }

    /// Removes the most recent entry matching `action`.
    ///
    /// Returns None if no such entry exists, so a second removal is a no-op.
    pub fn remove(&mut self, action: &CompensationAction) -> Option<CompensationEntry> {
        let index = self.entries.iter().rposition(|e| &e.action == action)?;
        Some(self.entries.remove(index))
    }

    pub fn contains(&self, action: &CompensationAction) -> bool {
        self.entries.iter().any(|e| &e.action == action)
    }

    pub fn peek(&self) -> Option<&CompensationEntry> {
        self.entries.last()
    }

    /// Iterates entries from bottom (oldest) to top (newest).
    pub fn iter(&self) -> impl Iterator<Item = &CompensationEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

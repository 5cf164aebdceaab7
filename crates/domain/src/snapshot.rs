//! Read-only status snapshot of a saga.

use common::{AgentId, TicketId};
use serde::{Deserialize, Serialize};

use crate::{Priority, TicketStatus, TimelineEntry};

/// A point-in-time copy of a saga's observable state.
///
/// Published by the engine after every transition and handed out by the
/// control surface without touching the running saga.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub ticket_id: TicketId,
    pub priority: Priority,
    pub current_status: TicketStatus,
    pub current_step: String,
    pub steps_completed: Vec<String>,
    pub step_count: usize,
    pub timeline: Vec<TimelineEntry>,
    pub escalation_count: u32,
    pub assigned_agent: Option<AgentId>,
    pub paused: bool,
    pub result: Option<String>,
}

impl StatusSnapshot {
    pub fn is_terminal(&self) -> bool {
        self.current_status.is_terminal()
    }
}

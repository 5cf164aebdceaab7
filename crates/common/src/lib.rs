//! Shared identifier types used across the ticket saga workspace.

pub mod types;

pub use types::{AgentId, TicketId};

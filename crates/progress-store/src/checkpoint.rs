use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{TicketId, Version};

/// The persisted state of one ticket saga at a specific version.
///
/// A checkpoint always carries the *full* saga state, so loading the latest
/// checkpoint is enough to resume. `status` and `terminal` are duplicated out
/// of the state so stores can filter without deserializing it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    /// The ticket this checkpoint belongs to.
    pub ticket_id: TicketId,

    /// The saga run that produced this checkpoint.
    pub run_id: Uuid,

    /// Version of the record after this write.
    pub version: Version,

    /// Status label at the time of the checkpoint (e.g. `"ESCALATING"`).
    pub status: String,

    /// Whether the saga reached a terminal status.
    pub terminal: bool,

    /// When the checkpoint was taken.
    pub timestamp: DateTime<Utc>,

    /// The serialized saga state.
    pub state: serde_json::Value,
}

impl Checkpoint {
    /// Creates a new checkpoint from already-serialized state.
    pub fn new(
        ticket_id: TicketId,
        run_id: Uuid,
        version: Version,
        status: impl Into<String>,
        terminal: bool,
        state: serde_json::Value,
    ) -> Self {
        Self {
            ticket_id,
            run_id,
            version,
            status: status.into(),
            terminal,
            timestamp: Utc::now(),
            state,
        }
    }

    /// Creates a checkpoint from a serializable state.
    pub fn from_state<T: Serialize>(
        ticket_id: TicketId,
        run_id: Uuid,
        version: Version,
        status: impl Into<String>,
        terminal: bool,
        state: &T,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self::new(
            ticket_id,
            run_id,
            version,
            status,
            terminal,
            serde_json::to_value(state)?,
        ))
    }

    /// Deserializes the checkpointed state into a concrete type.
    pub fn into_state<T: for<'de> Deserialize<'de>>(self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.state)
    }

    /// Gets a reference to the state as JSON.
    pub fn state_ref(&self) -> &serde_json::Value {
        &self.state
    }
}

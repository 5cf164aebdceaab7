use thiserror::Error;

use crate::{TicketId, Version};

/// Errors that can occur when interacting with the progress store.
#[derive(Debug, Error)]
pub enum ProgressStoreError {
    /// Another writer checkpointed this ticket in between.
    /// The expected version did not match the stored version.
    #[error(
        "Concurrency conflict for ticket {ticket_id}: expected version {expected}, found {actual}"
    )]
    ConcurrencyConflict {
        ticket_id: TicketId,
        expected: Version,
        actual: Version,
    },

    /// The ticket's saga reached a terminal status and its record is read-only.
    #[error("Ticket {0} is archived; terminal checkpoints are read-only")]
    Archived(TicketId),

    /// The checkpoint is malformed for the requested write.
    #[error("Invalid checkpoint: {0}")]
    InvalidCheckpoint(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for progress store operations.
pub type Result<T> = std::result::Result<T, ProgressStoreError>;

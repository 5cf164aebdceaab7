use std::sync::Arc;

use async_trait::async_trait;

use crate::{Checkpoint, CheckpointQuery, ProgressStoreError, Result, TicketId, Version};

/// Options for writing a checkpoint.
#[derive(Debug, Clone, Default)]
pub struct CheckpointOptions {
    /// Expected stored version for optimistic concurrency control.
    /// If None, no version check is performed (use with caution).
    pub expected_version: Option<Version>,
}

impl CheckpointOptions {
    /// Creates options with no version check.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates options expecting the stored record to be at a specific version.
    pub fn expect_version(version: Version) -> Self {
        Self {
            expected_version: Some(version),
        }
    }

    /// Creates options expecting no record for the ticket yet.
    pub fn expect_new() -> Self {
        Self {
            expected_version: Some(Version::initial()),
        }
    }
}

/// Durable record of every ticket saga's current state.
///
/// Only the engine instance that owns a ticket writes its record; the
/// version check turns a second writer into a `ConcurrencyConflict`.
/// All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait ProgressStore: Send + Sync {
    /// Persists the full saga state atomically, replacing the previous record.
    ///
    /// Fails with `ConcurrencyConflict` if `options.expected_version` is set
    /// and does not match, and with `Archived` if the stored record is terminal.
    ///
    /// Returns the version of the record after the write.
    async fn checkpoint(&self, checkpoint: Checkpoint, options: CheckpointOptions)
    -> Result<Version>;

    /// Loads the latest checkpoint of a ticket.
    ///
    /// Returns None if the ticket has never been checkpointed.
    async fn load(&self, ticket_id: &TicketId) -> Result<Option<Checkpoint>>;

    /// Lists checkpoints matching a query, oldest first.
    async fn list(&self, query: CheckpointQuery) -> Result<Vec<Checkpoint>>;
}

/// Lets a boxed store chosen at runtime stand in for a concrete one.
#[async_trait]
impl<T: ProgressStore + ?Sized> ProgressStore for Arc<T> {
    async fn checkpoint(
        &self,
        checkpoint: Checkpoint,
        options: CheckpointOptions,
    ) -> Result<Version> {
        (**self).checkpoint(checkpoint, options).await
    }

    async fn load(&self, ticket_id: &TicketId) -> Result<Option<Checkpoint>> {
        (**self).load(ticket_id).await
    }

    async fn list(&self, query: CheckpointQuery) -> Result<Vec<Checkpoint>> {
        (**self).list(query).await
    }
}

/// Shared handle to a progress store picked at startup.
pub type SharedProgressStore = Arc<dyn ProgressStore>;

/// Extension trait providing convenience methods for progress stores.
#[async_trait]
pub trait ProgressStoreExt: ProgressStore {
    /// Checks if a ticket has any checkpoint.
    async fn exists(&self, ticket_id: &TicketId) -> Result<bool> {
        Ok(self.load(ticket_id).await?.is_some())
    }

    /// Returns the ids of every saga that has not reached a terminal status.
    async fn incomplete(&self) -> Result<Vec<TicketId>> {
        Ok(self
            .list(CheckpointQuery::incomplete())
            .await?
            .into_iter()
            .map(|checkpoint| checkpoint.ticket_id)
            .collect())
    }
}

// Blanket implementation for all ProgressStore implementations
impl<T: ProgressStore + ?Sized> ProgressStoreExt for T {}

/// Validates a checkpoint before writing it.
///
/// A versioned write must advance the record by exactly one.
pub fn validate_checkpoint(checkpoint: &Checkpoint, options: &CheckpointOptions) -> Result<()> {
    if !checkpoint.version.is_stored() {
        return Err(ProgressStoreError::InvalidCheckpoint(format!(
            "checkpoint version must be positive, got {}",
            checkpoint.version
        )));
    }

    if let Some(expected) = options.expected_version
        && checkpoint.version != expected.next()
    {
        return Err(ProgressStoreError::InvalidCheckpoint(format!(
            "checkpoint versions must be sequential. Expected {}, got {}",
            expected.next(),
            checkpoint.version
        )));
    }

    Ok(())
}

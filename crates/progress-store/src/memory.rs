use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    Checkpoint, CheckpointQuery, ProgressStoreError, Result, TicketId, Version,
    store::{CheckpointOptions, ProgressStore, validate_checkpoint},
};

/// In-memory progress store implementation for testing.
///
/// Clones share the same records, so a test can hand one clone to an engine,
/// drop the engine to simulate a crash, and build a new engine on another clone.
#[derive(Clone, Default)]
pub struct InMemoryProgressStore {
    records: Arc<RwLock<HashMap<TicketId, Checkpoint>>>,
    writes: Arc<AtomicUsize>,
}

impl InMemoryProgressStore {
    /// Creates a new empty in-memory progress store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of successful checkpoint writes.
    pub fn checkpoint_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Returns the number of tickets with a stored checkpoint.
    pub async fn ticket_count(&self) -> usize {
        self.records.read().await.len()
    }

    /// Overwrites a ticket's record without any checks.
    ///
    /// Lets tests rewind a ticket to an earlier checkpoint to simulate a crash
    /// that happened right after that write.
    pub async fn restore(&self, checkpoint: Checkpoint) {
        self.records
            .write()
            .await
            .insert(checkpoint.ticket_id.clone(), checkpoint);
    }

    /// Clears all records.
    pub async fn clear(&self) {
        self.records.write().await.clear();
        self.writes.store(0, Ordering::SeqCst);
    }
}

#[async_trait]
impl ProgressStore for InMemoryProgressStore {
    async fn checkpoint(
        &self,
        checkpoint: Checkpoint,
        options: CheckpointOptions,
    ) -> Result<Version> {
        validate_checkpoint(&checkpoint, &options)?;

        let ticket_id = checkpoint.ticket_id.clone();
        let mut records = self.records.write().await;

        let current = records.get(&ticket_id);
        if current.is_some_and(|c| c.terminal) {
            return Err(ProgressStoreError::Archived(ticket_id));
        }

        let current_version = current.map(|c| c.version).unwrap_or(Version::initial());
        if let Some(expected) = options.expected_version
            && current_version != expected
        {
            return Err(ProgressStoreError::ConcurrencyConflict {
                ticket_id,
                expected,
                actual: current_version,
            });
        }

        let version = checkpoint.version;
        records.insert(ticket_id, checkpoint);
        self.writes.fetch_add(1, Ordering::SeqCst);

        Ok(version)
    }

    async fn load(&self, ticket_id: &TicketId) -> Result<Option<Checkpoint>> {
        let records = self.records.read().await;
        Ok(records.get(ticket_id).cloned())
    }

    async fn list(&self, query: CheckpointQuery) -> Result<Vec<Checkpoint>> {
        let records = self.records.read().await;
        let mut checkpoints: Vec<_> = records
            .values()
            .filter(|c| {
                if let Some(terminal) = query.terminal
                    && c.terminal != terminal
                {
                    return false;
                }
                if let Some(ref statuses) = query.statuses
                    && !statuses.contains(&c.status)
                {
                    return false;
                }
                true
            })
            .cloned()
            .collect();

        // Sort by timestamp then ticket id for a stable order
        checkpoints.sort_by(|a, b| {
            a.timestamp
                .cmp(&b.timestamp)
                .then_with(|| a.ticket_id.cmp(&b.ticket_id))
        });

        let offset = query.offset.unwrap_or(0);
        let limit = query.limit.unwrap_or(usize::MAX);

        Ok(checkpoints.into_iter().skip(offset).take(limit).collect())
    }
}

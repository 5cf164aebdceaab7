//! Per-saga execution context: state, checkpointing and control.

use common::TicketId;
use domain::{Aggregate, SagaState, Ticket, TicketStatus, TimelineEvent};
use progress_store::{Checkpoint, CheckpointOptions, ProgressStore};

use crate::control::{AbortSignal, ControlHandle, Wakeup};
use crate::error::{Result, SagaError};

/// Everything one running saga owns.
///
/// All state changes go through [`SagaContext::record`], which appends a
/// timeline entry, checkpoints the full state and publishes a snapshot
/// before returning. Step numbers are handed out in plan order so a resumed
/// saga can match each call against what the timeline already holds.
pub struct SagaContext<S: ProgressStore> {
    state: SagaState,
    store: S,
    control: ControlHandle,
    next_step: u32,
}

impl<S: ProgressStore> SagaContext<S> {
    pub fn new(state: SagaState, store: S, control: ControlHandle) -> Self {
        Self {
            state,
            store,
            control,
            next_step: 0,
        }
    }

    pub fn state(&self) -> &SagaState {
        &self.state
    }

    pub fn into_state(self) -> SagaState {
        self.state
    }

    pub fn ticket(&self) -> &Ticket {
        &self.state.ticket
    }

    pub fn ticket_id(&self) -> &TicketId {
        &self.state.ticket.id
    }

    pub fn status(&self) -> TicketStatus {
        self.state.status
    }

    /// Hands out the next step number.
    pub fn next_step(&mut self) -> u32 {
        self.next_step += 1;
        self.next_step
    }

    pub fn abort_signal(&self) -> AbortSignal {
        self.control.abort_signal()
    }

    /// Appends a timeline entry and checkpoints the result.
    pub async fn record(
        &mut self,
        event: TimelineEvent,
        detail: impl Into<String>,
        status: TicketStatus,
    ) -> Result<()> {
        self.state.record(event, detail, status);
        self.checkpoint().await
    }

    /// Persists the full state as the next version of the ticket's record.
    pub async fn checkpoint(&mut self) -> Result<()> {
        let expected = self.state.version();
        let next = expected.next();

        self.state.set_version(next);
        let written = match Checkpoint::from_state(
            self.state.ticket.id.clone(),
            self.state.run_id,
            next,
            self.state.status.as_str(),
            self.state.is_terminal(),
            &self.state,
        ) {
            Ok(checkpoint) => {
                self.store
                    .checkpoint(checkpoint, CheckpointOptions::expect_version(expected))
                    .await
                    .map_err(SagaError::from)
            }
            Err(e) => Err(SagaError::from(e)),
        };

        if let Err(e) = written {
            self.state.set_version(expected);
            return Err(e);
        }

        self.publish();
        Ok(())
    }

    /// Publishes the current snapshot to observers.
    pub fn publish(&self) {
        self.control.publish(self.state.snapshot());
    }

    /// Pause and abort check run before every live step.
    ///
    /// A paused saga persists `paused = true`, parks until resumed, then
    /// persists `paused = false` and carries on from the same boundary.
    pub async fn suspension_point(&mut self) -> Result<()> {
        if self.control.is_aborted() {
            return Err(SagaError::Aborted(self.ticket_id().clone()));
        }
        if !self.control.is_paused() {
            return Ok(());
        }

        if !self.state.paused {
            self.state.paused = true;
            self.checkpoint().await?;
        }
        tracing::info!(ticket_id = %self.ticket_id(), status = %self.state.status, "saga paused");
        metrics::counter!("saga_pauses_total").increment(1);

        let wakeup = self.control.wait_for_resume().await;

        self.state.paused = false;
        self.checkpoint().await?;

        match wakeup {
            Wakeup::Resumed => {
                tracing::info!(ticket_id = %self.ticket_id(), "saga resumed");
                Ok(())
            }
            Wakeup::Aborted => Err(SagaError::Aborted(self.ticket_id().clone())),
        }
    }
}

//! Live control surface: pause, resume, abort and status of running sagas.
//!
//! Every registered saga owns three `watch` channels: the pause flag, the
//! abort flag and its latest published `StatusSnapshot`. Observers only ever
//! touch the channels, so a status query never waits on the engine.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use common::TicketId;
use domain::StatusSnapshot;
use tokio::sync::watch;

use crate::error::{Result, SagaError};

#[derive(Debug)]
struct SagaControl {
    pause: watch::Sender<bool>,
    abort: watch::Sender<bool>,
    snapshot: watch::Sender<StatusSnapshot>,
}

type Registry = Arc<RwLock<HashMap<TicketId, Arc<SagaControl>>>>;

/// Registry of control channels keyed by ticket.
///
/// An entry lives exactly as long as the engine's `ControlHandle`; the
/// status of a finished saga is read from the progress store.
#[derive(Debug, Clone, Default)]
pub struct ControlSurface {
    sagas: Registry,
}

impl ControlSurface {
    pub fn new() -> Self {
        Self::default()
    }

    fn get(&self, ticket_id: &TicketId) -> Result<Arc<SagaControl>> {
        self.sagas
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(ticket_id)
            .cloned()
            .ok_or_else(|| SagaError::UnknownTicket(ticket_id.clone()))
    }

    /// Registers a saga about to run and returns the engine's handle.
    ///
    /// Fails with `AlreadyRunning` if another handle for the ticket is alive.
    /// The pause flag starts from `snapshot.paused`, so a saga paused before
    /// a restart stays paused.
    pub fn register(&self, snapshot: StatusSnapshot) -> Result<ControlHandle> {
        let ticket_id = snapshot.ticket_id.clone();
        let mut sagas = self.sagas.write().unwrap_or_else(PoisonError::into_inner);

        if sagas.contains_key(&ticket_id) {
            return Err(SagaError::AlreadyRunning(ticket_id));
        }

        let control = Arc::new(SagaControl {
            pause: watch::channel(snapshot.paused).0,
            abort: watch::channel(false).0,
            snapshot: watch::channel(snapshot).0,
        });
        sagas.insert(ticket_id.clone(), Arc::clone(&control));

        Ok(ControlHandle {
            ticket_id,
            pause: control.pause.subscribe(),
            abort: control.abort.subscribe(),
            control,
            registry: Arc::clone(&self.sagas),
        })
    }

    /// Requests a pause; the saga parks at its next step boundary.
    pub fn pause(&self, ticket_id: &TicketId) -> Result<()> {
        let control = self.get(ticket_id)?;
        if control.snapshot.borrow().is_terminal() {
            return Ok(());
        }
        control.pause.send_replace(true);
        control.snapshot.send_modify(|s| s.paused = true);
        tracing::info!(ticket_id = %ticket_id, "pause requested");
        Ok(())
    }

    /// Clears the pause flag, waking a parked saga.
    pub fn resume(&self, ticket_id: &TicketId) -> Result<()> {
        let control = self.get(ticket_id)?;
        control.pause.send_replace(false);
        control.snapshot.send_modify(|s| s.paused = false);
        tracing::info!(ticket_id = %ticket_id, "resume requested");
        Ok(())
    }

    /// Requests cancellation; the saga unwinds its compensations and fails.
    pub fn abort(&self, ticket_id: &TicketId) -> Result<()> {
        let control = self.get(ticket_id)?;
        if control.snapshot.borrow().is_terminal() {
            return Ok(());
        }
        control.abort.send_replace(true);
        tracing::warn!(ticket_id = %ticket_id, "abort requested");
        Ok(())
    }

    /// Returns a copy of the last published snapshot.
    pub fn status(&self, ticket_id: &TicketId) -> Result<StatusSnapshot> {
        let control = self.get(ticket_id)?;
        let snapshot = control.snapshot.borrow().clone();
        Ok(snapshot)
    }

    /// Returns the snapshots of every running saga.
    pub fn list(&self) -> Vec<StatusSnapshot> {
        self.sagas
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .map(|control| control.snapshot.borrow().clone())
            .collect()
    }

    /// Returns true if an engine task currently owns the ticket.
    pub fn is_running(&self, ticket_id: &TicketId) -> bool {
        self.sagas
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(ticket_id)
    }
}

/// What a parked saga was woken by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wakeup {
    Resumed,
    Aborted,
}

/// Engine side of a saga's control channels.
///
/// Dropping the handle unregisters the saga.
#[derive(Debug)]
pub struct ControlHandle {
    ticket_id: TicketId,
    control: Arc<SagaControl>,
    pause: watch::Receiver<bool>,
    abort: watch::Receiver<bool>,
    registry: Registry,
}

impl ControlHandle {
    pub fn ticket_id(&self) -> &TicketId {
        &self.ticket_id
    }

    pub fn is_paused(&self) -> bool {
        *self.pause.borrow()
    }

    pub fn is_aborted(&self) -> bool {
        *self.abort.borrow()
    }

    /// Parks until the pause flag is cleared or an abort is requested.
    pub async fn wait_for_resume(&mut self) -> Wakeup {
        loop {
            if self.is_aborted() {
                return Wakeup::Aborted;
            }
            if !self.is_paused() {
                return Wakeup::Resumed;
            }
            // Both senders live as long as this handle, so neither can close
            tokio::select! {
                _ = self.pause.changed() => {}
                _ = self.abort.changed() => {}
            }
        }
    }

    /// Returns a future-producing signal that fires once abort is requested.
    pub fn abort_signal(&self) -> AbortSignal {
        AbortSignal {
            receiver: self.abort.clone(),
        }
    }

    /// Publishes a snapshot for observers, mirroring the live pause flag.
    pub fn publish(&self, mut snapshot: StatusSnapshot) {
        snapshot.paused = self.is_paused() && !snapshot.is_terminal();
        self.control.snapshot.send_replace(snapshot);
    }
}

impl Drop for ControlHandle {
    fn drop(&mut self) {
        let mut sagas = self.registry.write().unwrap_or_else(PoisonError::into_inner);
        // Leave a newer registration for the same ticket in place
        if sagas
            .get(&self.ticket_id)
            .is_some_and(|current| Arc::ptr_eq(current, &self.control))
        {
            sagas.remove(&self.ticket_id);
        }
    }
}

/// Resolves when an abort is requested for the saga.
#[derive(Debug, Clone)]
pub struct AbortSignal {
    receiver: watch::Receiver<bool>,
}

impl AbortSignal {
    pub async fn triggered(mut self) {
        if self.receiver.wait_for(|aborted| *aborted).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

//! Ticket intake and saga control endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use common::TicketId;
use domain::{AgentId, Priority, StatusSnapshot, Ticket, TicketStatus, TimelineEntry};
use progress_store::{CheckpointQuery, SharedProgressStore};
use saga::{SagaError, TicketSagaEngine};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::simulation::{
    SimulatedEngineeringService, SimulatedEscalationService, SimulatedSupportService,
};

/// The engine type the host runs.
pub type Engine = TicketSagaEngine<
    SharedProgressStore,
    SimulatedSupportService,
    SimulatedEscalationService,
    SimulatedEngineeringService,
>;

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub engine: Engine,
}

// -- Request types --

#[derive(Deserialize)]
pub struct CreateTicketRequest {
    pub ticket_id: Option<String>,
    pub customer_name: String,
    pub issue: String,
    pub priority: String,
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub terminal: Option<bool>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

// -- Response types --

#[derive(Serialize)]
pub struct TicketAcceptedResponse {
    pub ticket_id: TicketId,
    pub status: TicketStatus,
}

#[derive(Serialize)]
pub struct TicketSummaryResponse {
    pub ticket_id: TicketId,
    pub priority: Priority,
    pub status: TicketStatus,
    pub current_step: String,
    pub step_count: usize,
    pub assigned_agent: Option<AgentId>,
    pub paused: bool,
    pub result: Option<String>,
}

impl From<StatusSnapshot> for TicketSummaryResponse {
    fn from(snapshot: StatusSnapshot) -> Self {
        Self {
            ticket_id: snapshot.ticket_id,
            priority: snapshot.priority,
            status: snapshot.current_status,
            current_step: snapshot.current_step,
            step_count: snapshot.step_count,
            assigned_agent: snapshot.assigned_agent,
            paused: snapshot.paused,
            result: snapshot.result,
        }
    }
}

// -- Handlers --

/// POST /tickets: start the saga of a new ticket.
#[tracing::instrument(skip(state, req))]
pub async fn create(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateTicketRequest>,
) -> Result<(StatusCode, Json<TicketAcceptedResponse>), ApiError> {
    let priority: Priority = req.priority.parse()?;
    if req.customer_name.trim().is_empty() {
        return Err(ApiError::BadRequest("customer_name is required".to_string()));
    }
    if req.issue.trim().is_empty() {
        return Err(ApiError::BadRequest("issue is required".to_string()));
    }

    let ticket_id = match req.ticket_id {
        Some(id) if id.trim().is_empty() => {
            return Err(ApiError::BadRequest("ticket_id must not be empty".to_string()));
        }
        Some(id) => TicketId::new(id),
        None => TicketId::generate(),
    };
    let ticket = Ticket::new(ticket_id.clone(), req.customer_name, req.issue, priority);

    let handle = state.engine.spawn(ticket).await?;
    let status = state.engine.load_snapshot(&ticket_id).await?.current_status;

    let task_ticket = ticket_id.clone();
    tokio::spawn(async move {
        match handle.await {
            Ok(Ok(result)) => {
                tracing::info!(ticket_id = %task_ticket, status = %result.status, message = %result.message, "saga finished");
            }
            Ok(Err(e)) => tracing::error!(ticket_id = %task_ticket, error = %e, "saga errored"),
            Err(e) => tracing::error!(ticket_id = %task_ticket, error = %e, "saga task panicked"),
        }
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(TicketAcceptedResponse { ticket_id, status }),
    ))
}

/// GET /tickets: list persisted sagas.
#[tracing::instrument(skip(state))]
pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<TicketSummaryResponse>>, ApiError> {
    let mut query = CheckpointQuery::new().limit(params.limit.unwrap_or(100));
    if let Some(terminal) = params.terminal {
        query = query.terminal(terminal);
    }
    if let Some(offset) = params.offset {
        query = query.offset(offset);
    }

    let snapshots = state.engine.list(query).await?;
    Ok(Json(snapshots.into_iter().map(Into::into).collect()))
}

/// GET /tickets/{id}: current status snapshot.
#[tracing::instrument(skip(state))]
pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<StatusSnapshot>, ApiError> {
    let snapshot = state.engine.load_snapshot(&TicketId::new(id)).await?;
    Ok(Json(snapshot))
}

/// GET /tickets/{id}/timeline
#[tracing::instrument(skip(state))]
pub async fn timeline(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<TimelineEntry>>, ApiError> {
    let snapshot = state.engine.load_snapshot(&TicketId::new(id)).await?;
    Ok(Json(snapshot.timeline))
}

/// POST /tickets/{id}/pause
#[tracing::instrument(skip(state))]
pub async fn pause(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<StatusSnapshot>, ApiError> {
    control(&state, TicketId::new(id), |engine, id| engine.control().pause(id)).await
}

/// POST /tickets/{id}/resume
#[tracing::instrument(skip(state))]
pub async fn resume(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<StatusSnapshot>, ApiError> {
    control(&state, TicketId::new(id), |engine, id| engine.control().resume(id)).await
}

/// POST /tickets/{id}/abort
#[tracing::instrument(skip(state))]
pub async fn abort(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<StatusSnapshot>, ApiError> {
    control(&state, TicketId::new(id), |engine, id| engine.control().abort(id)).await
}

/// Applies a control action; a ticket known only to the store is not running.
async fn control(
    state: &AppState,
    ticket_id: TicketId,
    action: impl FnOnce(&Engine, &TicketId) -> saga::Result<()>,
) -> Result<Json<StatusSnapshot>, ApiError> {
    match action(&state.engine, &ticket_id) {
        Ok(()) => Ok(Json(state.engine.load_snapshot(&ticket_id).await?)),
        Err(SagaError::UnknownTicket(_)) => {
            let snapshot = state.engine.load_snapshot(&ticket_id).await?;
            Err(ApiError::Conflict(format!(
                "saga for ticket {ticket_id} is not running (status {})",
                snapshot.current_status
            )))
        }
        Err(e) => Err(e.into()),
    }
}

//! HTTP host for the ticket saga engine.
//!
//! Exposes ticket intake and the live control surface (pause, resume,
//! abort, status) over REST, with structured logging (tracing) and
//! Prometheus metrics. External operations are simulated.

pub mod config;
pub mod error;
pub mod routes;
pub mod simulation;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use metrics_exporter_prometheus::PrometheusHandle;
use progress_store::SharedProgressStore;
use saga::{ExecutorConfig, TicketSagaEngine};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;
use routes::tickets::AppState;
use simulation::{
    SimulatedEngineeringService, SimulatedEscalationService, SimulatedSupportService,
    SimulationProfile,
};

/// Creates the Axum application router with all routes and shared state.
pub fn create_app(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/tickets", post(routes::tickets::create))
        .route("/tickets", get(routes::tickets::list))
        .route("/tickets/{id}", get(routes::tickets::get))
        .route("/tickets/{id}/timeline", get(routes::tickets::timeline))
        .route("/tickets/{id}/pause", post(routes::tickets::pause))
        .route("/tickets/{id}/resume", post(routes::tickets::resume))
        .route("/tickets/{id}/abort", post(routes::tickets::abort))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates application state over a store with the given simulation profile.
pub fn create_state(
    store: SharedProgressStore,
    profile: SimulationProfile,
    executor: ExecutorConfig,
) -> Arc<AppState> {
    let engine = TicketSagaEngine::with_config(
        store,
        SimulatedSupportService::new(profile),
        SimulatedEscalationService::new(profile),
        SimulatedEngineeringService::new(profile),
        executor,
    );
    Arc::new(AppState { engine })
}

/// Creates the default application state from configuration.
pub fn create_default_state(store: SharedProgressStore, config: &Config) -> Arc<AppState> {
    let profile = SimulationProfile::default().with_latency(config.simulated_latency);
    create_state(store, profile, config.executor_config())
}

//! REST API Server for the Finance Assistant Orchestrator
//!
//! Exposes query processing and agent status over HTTP

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use crate::agents::AgentStatus;
use crate::error::OrchestrationError;
use crate::models::{QueryRequest, ResponseEnvelope};
use crate::orchestrator::Orchestrator;
use crate::Result;

/// =============================
/// Response Models
/// =============================

#[derive(Debug, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub name: String,
    pub version: String,
    pub status: String,
    pub endpoints: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub ready: bool,
    pub timestamp: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AgentsResponse {
    pub ready: bool,
    pub agents: Vec<AgentStatus>,
}

/// =============================
/// API State
/// =============================

#[derive(Clone)]
pub struct ApiState {
    pub orchestrator: Arc<Orchestrator>,
}

/// =============================
/// Service Info Endpoint
/// =============================

async fn service_info() -> Json<ServiceInfo> {
    Json(ServiceInfo {
        name: "Finance Assistant API".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        status: "running".to_string(),
        endpoints: vec![
            "GET /health".to_string(),
            "POST /api/v1/query".to_string(),
            "GET /api/v1/agents".to_string(),
        ],
    })
}

/// =============================
/// Health Endpoint
/// =============================

async fn health(State(state): State<ApiState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        ready: state.orchestrator.is_ready(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// =============================
/// Query Endpoint
/// =============================

fn status_for(envelope: &ResponseEnvelope) -> StatusCode {
    if envelope.is_error() && envelope.content.is_none() {
        StatusCode::INTERNAL_SERVER_ERROR
    } else {
        StatusCode::OK
    }
}

async fn process_query(
    State(state): State<ApiState>,
    Json(req): Json<QueryRequest>,
) -> (StatusCode, Json<ResponseEnvelope>) {
    info!(
        input_type = ?req.input_type,
        response_type = ?req.response_type,
        "Received query request"
    );

    if !state.orchestrator.is_ready() {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ResponseEnvelope::failure(OrchestrationError::NotInitialized)),
        );
    }

    let envelope = state.orchestrator.process_query(req).await;
    (status_for(&envelope), Json(envelope))
}

/// =============================
/// Agents Endpoint
/// =============================

async fn list_agents(State(state): State<ApiState>) -> Json<AgentsResponse> {
    Json(AgentsResponse {
        ready: state.orchestrator.is_ready(),
        agents: state.orchestrator.agent_statuses(),
    })
}

/// =============================
/// Router
/// =============================

pub fn create_router(orchestrator: Arc<Orchestrator>) -> Router {
    let state = ApiState { orchestrator };

    Router::new()
        .route("/", get(service_info))
        .route("/health", get(health))
        .route("/api/v1/query", post(process_query))
        .route("/api/v1/agents", get(list_agents))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// =============================
/// Server Startup
/// =============================

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        // No signal handler available; serve until the process is killed
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

/// Serve until Ctrl-C; in-flight requests are allowed to finish
pub async fn start_server(orchestrator: Arc<Orchestrator>, port: u16) -> Result<()> {
    let router = create_router(orchestrator);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("API Server listening on http://0.0.0.0:{}", port);
    info!("Local: http://127.0.0.1:{}", port);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

//! Gateway HTTP server: chat sessions as JSON resources.

use crate::chat::{ChatSession, Outcome};
use crate::config::{self, Config};
use crate::gateway::protocol::{
    CreateSessionParams, RegenerateParams, ResetParams, ScopeParams, SendParams, SessionView,
    TurnResponse,
};
use crate::llm::{GenerateCopyClient, Generator};
use crate::scope::ClientScope;
use crate::session::SessionStore;
use crate::templates::{self, TemplateConfig, TemplateId};
use anyhow::{Context, Result};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;

/// Shared state for the gateway (config and sessions).
#[derive(Clone)]
pub struct GatewayState {
    pub config: Arc<Config>,
    pub sessions: Arc<SessionStore>,
}

impl GatewayState {
    pub fn new(config: Config, generator: Arc<dyn Generator>) -> Self {
        let sessions = SessionStore::with_max_tokens(generator, config.backend.max_tokens);
        Self {
            config: Arc::new(config),
            sessions: Arc::new(sessions),
        }
    }

    /// Template named in a request, or the configured default when absent.
    fn template_or_default(&self, name: Option<&str>) -> TemplateId {
        name.map(TemplateId::resolve)
            .unwrap_or(self.config.chat.default_template)
    }
}

/// Errors returned to HTTP callers as `{ "error": ... }`.
#[derive(Debug)]
pub enum ApiError {
    SessionNotFound,
    /// The detached turn task panicked or was aborted.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::SessionNotFound => (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": "session not found" })),
            )
                .into_response(),
            ApiError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": msg })),
            )
                .into_response(),
        }
    }
}

/// Build the router. Exposed separately from [`run_gateway`] so tests can serve it on any listener.
pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route("/", get(health_http))
        .route("/templates", get(list_templates))
        .route("/sessions", post(create_session))
        .route("/sessions/:id", get(get_session).delete(delete_session))
        .route("/sessions/:id/send", post(send_message))
        .route("/sessions/:id/regenerate", post(regenerate_message))
        .route("/sessions/:id/reset", post(reset_session))
        .route("/sessions/:id/client", put(set_client))
        .with_state(state)
}

/// Run the gateway server; binds to config.gateway.bind:config.gateway.port.
/// Generation goes to the configured backend. Blocks until shutdown (e.g. Ctrl+C).
pub async fn run_gateway(config: Config) -> Result<()> {
    let generator = GenerateCopyClient::from_config(&config).context("creating backend client")?;
    let bind = config.gateway.bind.trim().to_string();
    if !config::is_loopback_bind(&bind) {
        log::warn!(
            "gateway bound to non-loopback address {}; sessions API has no authentication",
            bind
        );
    }
    let bind_addr = format!("{}:{}", bind, config.gateway.port);
    let state = GatewayState::new(config, Arc::new(generator));
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding to {}", bind_addr))?;
    log::info!("gateway listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("gateway server exited")?;
    log::info!("gateway stopped");
    Ok(())
}

/// Future that completes when the process should shut down (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                log::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    log::info!("shutdown signal received, draining connections");
}

async fn session_or_404(state: &GatewayState, id: &str) -> Result<Arc<ChatSession>, ApiError> {
    state
        .sessions
        .get(id)
        .await
        .ok_or(ApiError::SessionNotFound)
}

async fn view(id: String, session: &ChatSession) -> SessionView {
    SessionView {
        id,
        snapshot: session.snapshot().await,
    }
}

/// GET / returns a simple health JSON (for probes).
async fn health_http(State(state): State<GatewayState>) -> Json<serde_json::Value> {
    Json(json!({
        "runtime": "running",
        "sessions": state.sessions.len().await,
        "port": state.config.gateway.port,
    }))
}

/// GET /templates
async fn list_templates() -> Json<&'static [TemplateConfig]> {
    Json(templates::all())
}

/// POST /sessions — body optional.
async fn create_session(
    State(state): State<GatewayState>,
    body: Option<Json<CreateSessionParams>>,
) -> Result<(StatusCode, Json<SessionView>), ApiError> {
    let params = body.map(|Json(p)| p).unwrap_or_default();
    let template = state.template_or_default(params.template_id.as_deref());
    let id = state.sessions.create(template).await;
    let session = session_or_404(&state, &id).await?;
    Ok((StatusCode::CREATED, Json(view(id, &session).await)))
}

/// GET /sessions/:id
async fn get_session(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Result<Json<SessionView>, ApiError> {
    let session = session_or_404(&state, &id).await?;
    Ok(Json(view(id, &session).await))
}

/// DELETE /sessions/:id
async fn delete_session(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if state.sessions.remove(&id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::SessionNotFound)
    }
}

/// Run a turn on its own task. Axum drops the handler future when the caller
/// disconnects; a started turn must still finish and append its reply.
async fn run_detached<F>(turn: F) -> Result<Outcome, ApiError>
where
    F: std::future::Future<Output = Outcome> + Send + 'static,
{
    tokio::spawn(turn).await.map_err(|e| {
        log::error!("gateway: turn task failed: {}", e);
        ApiError::Internal("turn task failed".to_string())
    })
}

/// POST /sessions/:id/send — waits for the backend before answering.
async fn send_message(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
    Json(params): Json<SendParams>,
) -> Result<Json<TurnResponse>, ApiError> {
    let session = session_or_404(&state, &id).await?;
    let turn = Arc::clone(&session);
    let outcome = run_detached(async move { turn.send(&params.input).await }).await?;
    Ok(Json(TurnResponse {
        outcome,
        session: view(id, &session).await,
    }))
}

/// POST /sessions/:id/regenerate
async fn regenerate_message(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
    Json(params): Json<RegenerateParams>,
) -> Result<Json<TurnResponse>, ApiError> {
    let session = session_or_404(&state, &id).await?;
    let turn = Arc::clone(&session);
    let index = params.index;
    let outcome = run_detached(async move { turn.regenerate(index).await }).await?;
    Ok(Json(TurnResponse {
        outcome,
        session: view(id, &session).await,
    }))
}

/// POST /sessions/:id/reset — keeps the current template unless one is given.
async fn reset_session(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
    body: Option<Json<ResetParams>>,
) -> Result<Json<SessionView>, ApiError> {
    let session = session_or_404(&state, &id).await?;
    let params = body.map(|Json(p)| p).unwrap_or_default();
    let template = match params.template_id.as_deref() {
        Some(name) => TemplateId::resolve(name),
        None => session.template().await,
    };
    session.reset_conversation(template).await;
    Ok(Json(view(id, &session).await))
}

/// PUT /sessions/:id/client
async fn set_client(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
    Json(params): Json<ScopeParams>,
) -> Result<Json<SessionView>, ApiError> {
    let session = session_or_404(&state, &id).await?;
    let scope = params
        .id
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .map(|client_id| ClientScope {
            id: client_id,
            name: params.name,
        });
    session.set_client_scope(scope).await;
    Ok(Json(view(id, &session).await))
}

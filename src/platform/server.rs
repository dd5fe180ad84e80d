//! HTTP endpoint for skill requests

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;

use super::envelope::{SkillRequest, SkillResponse};
use super::ApplicationGate;
use crate::core::error::Result;
use crate::dispatch::Dispatcher;

/// Shared by every request
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub gate: Arc<ApplicationGate>,
}

impl AppState {
    pub fn new(dispatcher: Dispatcher, gate: ApplicationGate) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
            gate: Arc::new(gate),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

type ErrorResponse = (StatusCode, Json<ErrorBody>);

fn error(status: StatusCode, message: impl Into<String>) -> ErrorResponse {
    (
        status,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", post(handle_skill_request))
        .route("/healthz", get(healthz))
        .with_state(state)
}

/// Bind `addr` and serve until the process is stopped
pub async fn serve(state: AppState, addr: SocketAddr) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening for skill requests on http://{}", addr);
    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn healthz() -> &'static str {
    "ok"
}

async fn handle_skill_request(
    State(state): State<AppState>,
    Json(request): Json<SkillRequest>,
) -> std::result::Result<Json<SkillResponse>, ErrorResponse> {
    state
        .gate
        .verify(request.application_id())
        .map_err(|e| error(StatusCode::BAD_REQUEST, e.to_string()))?;

    let info = request.info();
    let mut session = request.session_state();
    if request.is_new_session() {
        state.dispatcher.on_session_started(&info);
    }

    let Some(event) = request.event() else {
        tracing::debug!("Ignoring unsupported request {}", info.request_id);
        return Ok(Json(SkillResponse::empty(session)));
    };

    match state.dispatcher.dispatch(&info, &event, &mut session).await {
        Ok(Some(reply)) => Ok(Json(SkillResponse::speech(reply, session))),
        Ok(None) => Ok(Json(SkillResponse::empty(session))),
        Err(e) => {
            tracing::error!("Request {} failed: {}", info.request_id, e);
            Err(error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}

//! HTTP adapter over the bracket registry. Holds no storage of its own:
//! clients fetch `/state` after each mutation and persist it themselves.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::bracket::Bracket;
use crate::error::BracketError;
use crate::registry::{BracketRegistry, RegistryError};
use crate::snapshot::{self, BracketSnapshot};
use crate::types::{BracketId, BracketOptions, BracketType, Entrant, MatchId};

#[derive(Clone)]
pub struct ServerState {
    pub registry: Arc<BracketRegistry>,
    /// Applied when a create request carries no options.
    pub default_options: BracketOptions,
}

impl ServerState {
    pub fn new(default_options: BracketOptions) -> Self {
        ServerState {
            registry: Arc::new(BracketRegistry::new()),
            default_options,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBracketRequest {
    pub entrants: Vec<Entrant>,
    #[serde(rename = "type")]
    pub bracket_type: BracketType,
    #[serde(default)]
    pub options: Option<BracketOptions>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreRequest {
    pub score_a: u32,
    pub score_b: u32,
}

#[derive(Debug)]
pub enum ApiError {
    Registry(RegistryError),
    BadRequest(String),
}

impl From<RegistryError> for ApiError {
    fn from(e: RegistryError) -> Self {
        ApiError::Registry(e)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Registry(RegistryError::BracketNotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Registry(RegistryError::Bracket(e)) => match e {
                BracketError::MatchNotFound(_) => StatusCode::NOT_FOUND,
                BracketError::InvalidResult(_) => StatusCode::UNPROCESSABLE_ENTITY,
                BracketError::InsufficientEntrants { .. }
                | BracketError::DuplicateEntrant(_)
                | BracketError::InvalidBracketShape(_)
                | BracketError::SnapshotMismatch(_) => StatusCode::BAD_REQUEST,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = match &self {
            ApiError::Registry(e) => e.to_string(),
            ApiError::BadRequest(msg) => msg.clone(),
        };
        (self.status(), Json(json!({ "error": message }))).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

pub fn router(state: ServerState) -> Router {
    Router::new()
        .route("/brackets", post(create_bracket).get(list_brackets))
        .route(
            "/brackets/:id",
            get(get_bracket).put(restore_bracket).delete(archive_bracket),
        )
        .route("/brackets/:id/state", get(get_bracket_state))
        .route(
            "/brackets/:id/matches/:match_id/result",
            post(record_result).delete(clear_result),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(addr: &str, state: ServerState) -> std::io::Result<()> {
    let app = router(state);
    let listener = match TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("bracket server failed to bind {addr}: {e}");
            return Err(e);
        }
    };
    info!("bracket server listening at http://{addr}/");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

async fn create_bracket(
    State(state): State<ServerState>,
    Json(request): Json<CreateBracketRequest>,
) -> ApiResult<(StatusCode, Json<BracketSnapshot>)> {
    let options = request.options.unwrap_or(state.default_options);
    let bracket = state
        .registry
        .create(request.entrants, request.bracket_type, options)?;
    Ok((StatusCode::CREATED, Json(snapshot::snapshot(&bracket))))
}

async fn list_brackets(State(state): State<ServerState>) -> Json<Vec<BracketId>> {
    Json(state.registry.ids())
}

async fn get_bracket(
    State(state): State<ServerState>,
    Path(id): Path<BracketId>,
) -> ApiResult<Json<BracketSnapshot>> {
    Ok(Json(state.registry.snapshot(id)?))
}

async fn get_bracket_state(
    State(state): State<ServerState>,
    Path(id): Path<BracketId>,
) -> ApiResult<Json<Bracket>> {
    Ok(Json(state.registry.bracket(id)?))
}

async fn restore_bracket(
    State(state): State<ServerState>,
    Path(id): Path<BracketId>,
    Json(stored): Json<Bracket>,
) -> ApiResult<Json<BracketSnapshot>> {
    if stored.id() != id {
        return Err(ApiError::BadRequest(format!(
            "path id {id} does not match bracket id {}",
            stored.id()
        )));
    }
    let bracket = state.registry.restore(stored)?;
    Ok(Json(snapshot::snapshot(&bracket)))
}

async fn archive_bracket(
    State(state): State<ServerState>,
    Path(id): Path<BracketId>,
) -> ApiResult<Json<Bracket>> {
    Ok(Json(state.registry.archive(id)?))
}

async fn record_result(
    State(state): State<ServerState>,
    Path((id, match_id)): Path<(BracketId, MatchId)>,
    Json(score): Json<ScoreRequest>,
) -> ApiResult<Json<BracketSnapshot>> {
    let bracket = state
        .registry
        .record_result(id, match_id, score.score_a, score.score_b)?;
    Ok(Json(snapshot::snapshot(&bracket)))
}

async fn clear_result(
    State(state): State<ServerState>,
    Path((id, match_id)): Path<(BracketId, MatchId)>,
) -> ApiResult<Json<BracketSnapshot>> {
    let bracket = state.registry.clear_result(id, match_id)?;
    Ok(Json(snapshot::snapshot(&bracket)))
}

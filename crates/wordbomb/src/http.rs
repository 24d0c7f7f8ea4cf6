//! Read-only HTTP API over the lobby store.
//!
//! - `GET /api/lobby/getLobby?id=<id>` → `{"lobby": Lobby}` or 404 `{"lobby": null}`
//! - `GET /api/lobbies` → `[LobbyListEntry]`
//! - `GET /healthz` → `ok`

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use wordbomb_lobby::{LobbyError, LobbyStore, WordOracle};
use wordbomb_protocol::{Lobby, LobbyId, LobbyListEntry};

use crate::server::ServerState;

pub(crate) fn router<S: LobbyStore, W: WordOracle>(state: Arc<ServerState<S, W>>) -> Router {
    Router::new()
        .route("/healthz", get(health))
        .route("/api/lobbies", get(list_lobbies::<S, W>))
        .route("/api/lobby/getLobby", get(get_lobby::<S, W>))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct LobbyQuery {
    id: LobbyId,
}

#[derive(Debug, Serialize)]
struct LobbyResponse {
    lobby: Option<Lobby>,
}

/// A lobby error rendered as an HTTP response.
#[derive(Debug)]
struct ApiError(LobbyError);

impl From<LobbyError> for ApiError {
    fn from(e: LobbyError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            tracing::error!(%status, error = %self.0, "request failed");
        }
        (status, Json(serde_json::json!({"error": self.0.to_string()}))).into_response()
    }
}

async fn health() -> &'static str {
    "ok"
}

async fn get_lobby<S: LobbyStore, W: WordOracle>(
    State(state): State<Arc<ServerState<S, W>>>,
    Query(query): Query<LobbyQuery>,
) -> Result<(StatusCode, Json<LobbyResponse>), ApiError> {
    match state.lobbies.snapshot(&query.id).await {
        Ok(lobby) => Ok((StatusCode::OK, Json(LobbyResponse { lobby: Some(lobby) }))),
        Err(LobbyError::NotFound(id)) => {
            tracing::debug!(lobby_id = %id, "lobby not found");
            Ok((StatusCode::NOT_FOUND, Json(LobbyResponse { lobby: None })))
        }
        Err(e) => Err(e.into()),
    }
}

async fn list_lobbies<S: LobbyStore, W: WordOracle>(
    State(state): State<Arc<ServerState<S, W>>>,
) -> Result<Json<Vec<LobbyListEntry>>, ApiError> {
    Ok(Json(state.lobbies.list().await?))
}

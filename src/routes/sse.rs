use std::convert::Infallible;

use axum::{
    Router,
    extract::{Path, State},
    response::sse::Sse,
    routing::get,
};
use futures::Stream;
use tracing::info;
use uuid::Uuid;

use crate::{
    error::AppError,
    services::sse_service::{self, StreamKind},
    state::SharedState,
};

#[utoipa::path(
    get,
    path = "/sse/lobby",
    tag = "sse",
    responses((status = 200, description = "Lobby SSE stream", content_type = "text/event-stream", body = String))
)]
/// Stream lobby-wide events (matches created, decided, abandoned).
pub async fn lobby_stream(
    State(state): State<SharedState>,
) -> Sse<impl Stream<Item = Result<axum::response::sse::Event, Infallible>>> {
    let receiver = sse_service::subscribe_lobby(&state);
    info!("New lobby SSE connection");
    sse_service::broadcast_handshake(&state, state.lobby_sse(), "lobby").await;
    sse_service::to_sse_stream(receiver, StreamKind::Lobby)
}

#[utoipa::path(
    get,
    path = "/sse/matches/{id}",
    tag = "sse",
    params(("id" = Uuid, Path, description = "Match identifier")),
    responses(
        (status = 200, description = "Match SSE stream", content_type = "text/event-stream", body = String),
        (status = 404, description = "Unknown match")
    )
)]
/// Stream the realtime event feed of one match.
pub async fn match_stream(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Sse<impl Stream<Item = Result<axum::response::sse::Event, Infallible>>>, AppError> {
    let receiver = sse_service::subscribe_match(&state, id)?;
    info!(match_id = %id, "New match SSE connection");
    if let Some(room) = state.room(id) {
        sse_service::broadcast_handshake(&state, &room.events, &id.to_string()).await;
    }
    Ok(sse_service::to_sse_stream(receiver, StreamKind::Match(id)))
}

/// Configure the SSE endpoints.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new()
        .route("/sse/lobby", get(lobby_stream))
        .route("/sse/matches/{id}", get(match_stream))
}

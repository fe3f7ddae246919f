use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::matches::{
        AddDartRequest, CreateMatchRequest, JoinMatchRequest, MatchListItem, MatchSummary,
        PendingVisit, SeatAssignment, SubmitVisitRequest, UndoDartQuery, VisitReport,
    },
    error::AppError,
    services::match_service,
    state::SharedState,
};

/// Routes handling match lifecycle and visit entry.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/matches", post(create_match).get(list_matches))
        .route("/matches/join", post(join_match))
        .route("/matches/{id}", get(get_match))
        .route("/matches/{id}/darts", post(add_dart).delete(undo_dart))
        .route("/matches/{id}/visits", post(commit_visit))
        .route("/matches/{id}/abandon", post(abandon_match))
}

/// Create a local or online match and seat the caller as home.
#[utoipa::path(
    post,
    path = "/matches",
    tag = "matches",
    request_body = CreateMatchRequest,
    responses(
        (status = 200, description = "Match created", body = SeatAssignment),
        (status = 400, description = "Invalid configuration or player names")
    )
)]
pub async fn create_match(
    State(state): State<SharedState>,
    Json(payload): Json<CreateMatchRequest>,
) -> Result<Json<SeatAssignment>, AppError> {
    payload.validate()?;
    let seat = match_service::create_match(&state, payload).await?;
    Ok(Json(seat))
}

/// List every known match for the lobby view.
#[utoipa::path(
    get,
    path = "/matches",
    tag = "matches",
    responses((status = 200, description = "Known matches", body = [MatchListItem]))
)]
pub async fn list_matches(
    State(state): State<SharedState>,
) -> Result<Json<Vec<MatchListItem>>, AppError> {
    let entries = match_service::list_matches(&state).await?;
    Ok(Json(entries))
}

/// Join an online match by its code, seating the caller as away.
#[utoipa::path(
    post,
    path = "/matches/join",
    tag = "matches",
    request_body = JoinMatchRequest,
    responses(
        (status = 200, description = "Seat claimed", body = SeatAssignment),
        (status = 404, description = "Unknown room code"),
        (status = 409, description = "Match full or already over")
    )
)]
pub async fn join_match(
    State(state): State<SharedState>,
    Json(payload): Json<JoinMatchRequest>,
) -> Result<Json<SeatAssignment>, AppError> {
    payload.validate()?;
    let seat = match_service::join_match(&state, payload).await?;
    Ok(Json(seat))
}

/// Fetch the full snapshot of one match.
#[utoipa::path(
    get,
    path = "/matches/{id}",
    tag = "matches",
    params(("id" = Uuid, Path, description = "Match identifier")),
    responses(
        (status = 200, description = "Match snapshot", body = MatchSummary),
        (status = 404, description = "Unknown match")
    )
)]
pub async fn get_match(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MatchSummary>, AppError> {
    let summary = match_service::get_match(&state, id).await?;
    Ok(Json(summary))
}

/// Queue one dart into the active player's pending visit.
#[utoipa::path(
    post,
    path = "/matches/{id}/darts",
    tag = "matches",
    params(("id" = Uuid, Path, description = "Match identifier")),
    request_body = AddDartRequest,
    responses(
        (status = 200, description = "Updated pending visit", body = PendingVisit),
        (status = 400, description = "Invalid dart"),
        (status = 409, description = "Not this side's turn or match over")
    )
)]
pub async fn add_dart(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AddDartRequest>,
) -> Result<Json<PendingVisit>, AppError> {
    let pending = match_service::add_dart(&state, id, payload).await?;
    Ok(Json(pending))
}

/// Withdraw the most recently queued dart.
#[utoipa::path(
    delete,
    path = "/matches/{id}/darts",
    tag = "matches",
    params(("id" = Uuid, Path, description = "Match identifier"), UndoDartQuery),
    responses(
        (status = 200, description = "Updated pending visit", body = PendingVisit),
        (status = 409, description = "No dart queued, wrong turn, or match over")
    )
)]
pub async fn undo_dart(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Query(query): Query<UndoDartQuery>,
) -> Result<Json<PendingVisit>, AppError> {
    let pending = match_service::undo_dart(&state, id, query.side).await?;
    Ok(Json(pending))
}

/// Commit a visit from the queue, an explicit dart list, or a total.
#[utoipa::path(
    post,
    path = "/matches/{id}/visits",
    tag = "matches",
    params(("id" = Uuid, Path, description = "Match identifier")),
    request_body = SubmitVisitRequest,
    responses(
        (status = 200, description = "Committed visit", body = VisitReport),
        (status = 400, description = "Invalid visit input"),
        (status = 409, description = "Wrong turn, stale write, or match over")
    )
)]
pub async fn commit_visit(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SubmitVisitRequest>,
) -> Result<Json<VisitReport>, AppError> {
    payload.validate()?;
    let report = match_service::commit_visit(&state, id, payload).await?;
    Ok(Json(report))
}

/// Abandon a live match.
#[utoipa::path(
    post,
    path = "/matches/{id}/abandon",
    tag = "matches",
    params(("id" = Uuid, Path, description = "Match identifier")),
    responses(
        (status = 200, description = "Match abandoned", body = MatchSummary),
        (status = 409, description = "Match already over")
    )
)]
pub async fn abandon_match(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MatchSummary>, AppError> {
    let summary = match_service::abandon_match(&state, id).await?;
    Ok(Json(summary))
}

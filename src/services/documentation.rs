use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for X01 Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::sse::lobby_stream,
        crate::routes::sse::match_stream,
        crate::routes::matches::create_match,
        crate::routes::matches::list_matches,
        crate::routes::matches::join_match,
        crate::routes::matches::get_match,
        crate::routes::matches::add_dart,
        crate::routes::matches::undo_dart,
        crate::routes::matches::commit_visit,
        crate::routes::matches::abandon_match,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::matches::CreateMatchRequest,
            crate::dto::matches::JoinMatchRequest,
            crate::dto::matches::AddDartRequest,
            crate::dto::matches::SubmitVisitRequest,
            crate::dto::matches::SeatAssignment,
            crate::dto::matches::MatchSummary,
            crate::dto::matches::MatchListItem,
            crate::dto::matches::VisitReport,
            crate::dto::matches::PendingVisit,
            crate::dto::sse::Handshake,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "sse", description = "Server-sent events streams"),
        (name = "matches", description = "Match lifecycle and visit entry"),
    )
)]
pub struct ApiDoc;

use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::dto::matches::{MatchListItem, MatchSummary, OutcomeDto, PendingVisit, SideDto};

#[derive(Clone, Debug)]
/// Dispatched payload carried across SSE channels.
pub struct ServerEvent {
    pub event: Option<String>,
    pub data: String,
}

impl ServerEvent {
    /// Build an event from a pre-serialized payload.
    pub fn new<E>(event: E, data: String) -> Self
    where
        E: Into<Option<String>>,
    {
        Self {
            event: event.into(),
            data,
        }
    }

    /// Convenience wrapper that serialises `payload` into the SSE data field.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Initial metadata sent to an SSE client when it connects.
pub struct Handshake {
    /// Identifier of the SSE stream (`lobby` or a match id).
    pub stream: String,
    /// Human-readable message confirming the subscription.
    pub message: String,
    /// Whether the backend is running without a reachable match store.
    pub degraded: bool,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast on the lobby stream when a match is created or removed.
pub struct LobbyChangedEvent {
    /// Listing entry for the match that changed.
    pub entry: MatchListItem,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
/// Broadcast on a match stream whenever its snapshot is replaced.
pub struct MatchUpdatedEvent(pub MatchSummary);

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast on a match stream after each committed visit.
pub struct VisitCommittedEvent {
    /// Side that threw.
    pub side: SideDto,
    /// Total the visit attempted.
    pub attempted: u16,
    /// What the visit did.
    pub outcome: OutcomeDto,
    /// Snapshot after the commit.
    pub summary: MatchSummary,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast on a match stream while darts are queued or withdrawn.
pub struct PendingChangedEvent {
    /// Side currently at the oche.
    pub side: SideDto,
    /// The queued darts.
    pub pending: PendingVisit,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast on a match stream when the away seat is claimed.
pub struct OpponentJoinedEvent {
    /// Match id.
    pub match_id: Uuid,
    /// Display name of the joining player.
    pub display_name: String,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast on both streams when a match is abandoned.
pub struct MatchAbandonedEvent {
    /// Match id.
    pub match_id: Uuid,
}

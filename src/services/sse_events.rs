use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use crate::{
    dto::{
        matches::{MatchListItem, MatchSummary, OutcomeDto, PendingVisit, SideDto},
        sse::{
            LobbyChangedEvent, MatchAbandonedEvent, MatchUpdatedEvent, OpponentJoinedEvent,
            PendingChangedEvent, ServerEvent, VisitCommittedEvent,
        },
    },
    state::{MatchRoom, SharedState, SseHub},
};

const EVENT_LOBBY_CHANGED: &str = "lobby.changed";
const EVENT_MATCH_UPDATED: &str = "match.updated";
const EVENT_VISIT_COMMITTED: &str = "visit.committed";
const EVENT_PENDING_CHANGED: &str = "visit.pending";
const EVENT_OPPONENT_JOINED: &str = "match.joined";
const EVENT_MATCH_ABANDONED: &str = "match.abandoned";

/// Broadcast a lobby listing change (match created, decided, or removed).
pub fn broadcast_lobby_changed(state: &SharedState, entry: MatchListItem) {
    let payload = LobbyChangedEvent { entry };
    send_event(state.lobby_sse(), EVENT_LOBBY_CHANGED, &payload);
}

/// Broadcast a full replacement snapshot on a match stream.
pub fn broadcast_match_updated(room: &MatchRoom, summary: MatchSummary) {
    let payload = MatchUpdatedEvent(summary);
    send_event(&room.events, EVENT_MATCH_UPDATED, &payload);
}

/// Broadcast a committed visit with its outcome tag and fresh snapshot.
pub fn broadcast_visit_committed(
    room: &MatchRoom,
    side: SideDto,
    attempted: u16,
    outcome: OutcomeDto,
    summary: MatchSummary,
) {
    let payload = VisitCommittedEvent {
        side,
        attempted,
        outcome,
        summary,
    };
    send_event(&room.events, EVENT_VISIT_COMMITTED, &payload);
}

/// Broadcast the current pending-dart queue after an add or undo.
pub fn broadcast_pending_changed(room: &MatchRoom, side: SideDto, pending: PendingVisit) {
    let payload = PendingChangedEvent { side, pending };
    send_event(&room.events, EVENT_PENDING_CHANGED, &payload);
}

/// Broadcast that the away seat of an online match has been claimed.
pub fn broadcast_opponent_joined(room: &MatchRoom, display_name: &str) {
    let payload = OpponentJoinedEvent {
        match_id: room.id,
        display_name: display_name.to_string(),
    };
    send_event(&room.events, EVENT_OPPONENT_JOINED, &payload);
}

/// Broadcast a match abandonment to its own stream and the lobby.
pub fn broadcast_match_abandoned(state: &SharedState, room: &MatchRoom, match_id: Uuid) {
    let payload = MatchAbandonedEvent { match_id };
    send_event(&room.events, EVENT_MATCH_ABANDONED, &payload);
    send_event(state.lobby_sse(), EVENT_MATCH_ABANDONED, &payload);
}

fn send_event(hub: &SseHub, event: &str, payload: &impl Serialize) {
    match ServerEvent::json(Some(event.to_string()), payload) {
        Ok(event) => hub.broadcast(event),
        Err(err) => warn!(event, error = %err, "failed to serialize SSE payload"),
    }
}

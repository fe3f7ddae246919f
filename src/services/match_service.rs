use std::sync::Arc;

use rand::Rng;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    dao::models::{MatchEntity, MatchListItemEntity},
    dto::matches::{
        AddDartRequest, CreateMatchRequest, JoinMatchRequest, MatchListItem, MatchSummary,
        OutcomeDto, PendingVisit, SeatAssignment, SideDto, SubmitVisitRequest, VisitReport,
    },
    error::ServiceError,
    scoring::{
        engine::{self, VisitInput, VisitOutcome},
        visit::Dart,
    },
    services::sse_events,
    state::{
        MatchRoom, SharedState,
        match_state::{MatchSession, MatchState, Side},
        progression::{self, ProgressKind},
    },
    sync::{self, NoSync, StoreSync, SyncStrategy},
};

/// Join codes avoid glyphs that read ambiguously when spoken or copied.
const ROOM_CODE_ALPHABET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";
/// Attempts before giving up on finding a free join code.
const ROOM_CODE_ATTEMPTS: usize = 32;

/// Create a match and register its room.
///
/// Local matches are complete immediately; online matches get a join code,
/// a store record, and a background task adopting remote replacements.
pub async fn create_match(
    state: &SharedState,
    request: CreateMatchRequest,
) -> Result<SeatAssignment, ServiceError> {
    if !state.config().is_valid_start_score(request.start_score) {
        return Err(ServiceError::InvalidInput(format!(
            "start score {} is not an accepted value",
            request.start_score
        )));
    }

    let config = request.to_config();
    let (home_name, away_name) = if request.online {
        // The away seat stays blank until an opponent joins by code.
        (request.players[0].clone(), String::new())
    } else {
        (request.players[0].clone(), request.players[1].clone())
    };

    let room_code = if request.online {
        Some(generate_room_code(state)?)
    } else {
        None
    };

    let session = MatchSession::new(
        MatchState::new(config, home_name, away_name),
        room_code,
    );

    let sync: Box<dyn SyncStrategy> = if request.online {
        state
            .store()
            .create(MatchEntity::from(session.clone()))
            .await?;
        Box::new(StoreSync::new(state.store(), session.id))
    } else {
        Box::new(NoSync)
    };

    let room = MatchRoom::new(
        session.clone(),
        sync,
        request.online,
        state.config().sse_capacity(),
    );
    state.insert_room(Arc::clone(&room)).await;

    if request.online {
        spawn_adoption_task(Arc::clone(state), Arc::clone(&room));
    }

    info!(
        match_id = %session.id,
        online = request.online,
        start_score = request.start_score,
        "match created"
    );
    sse_events::broadcast_lobby_changed(state, list_entry(&session));

    Ok(SeatAssignment {
        role: SideDto::Home,
        summary: session.into(),
    })
}

/// Claim the away seat of an online match by join code.
pub async fn join_match(
    state: &SharedState,
    request: JoinMatchRequest,
) -> Result<SeatAssignment, ServiceError> {
    let room = state
        .room_by_code(&request.room_code)
        .ok_or_else(|| ServiceError::NotFound(format!("room code `{}`", request.room_code)))?;

    let session = {
        let mut session = room.session.write().await;
        if !session.state.phase.is_live() {
            return Err(ServiceError::MatchOver);
        }
        if !session.state.player(Side::Away).display_name.is_empty() {
            return Err(ServiceError::InvalidState(
                "both seats of this match are already taken".into(),
            ));
        }

        session.state[Side::Away].display_name = request.display_name.clone();
        let expected = session.mark_updated();
        room.sync.publish(session.clone(), expected).await?;
        session.clone()
    };

    // The code has done its job; no third party can join a full match.
    state.release_code(&request.room_code);

    sse_events::broadcast_opponent_joined(&room, &request.display_name);
    sse_events::broadcast_match_updated(&room, session.clone().into());
    info!(match_id = %room.id, "opponent joined");

    Ok(SeatAssignment {
        role: SideDto::Away,
        summary: session.into(),
    })
}

/// Full snapshot of one match.
///
/// For online rooms the store record is re-fetched first, so this doubles
/// as the reconnection path: a client that lost its feed gets the freshest
/// authoritative state before it re-subscribes.
pub async fn get_match(state: &SharedState, match_id: Uuid) -> Result<MatchSummary, ServiceError> {
    let room = require_room(state, match_id)?;

    if let Some(authoritative) = room.sync.fetch_authoritative().await? {
        room.adopt(authoritative).await;
    }

    let session = room.session.read().await.clone();
    Ok(session.into())
}

/// Lobby listing: every store-backed match plus the purely local rooms.
pub async fn list_matches(state: &SharedState) -> Result<Vec<MatchListItem>, ServiceError> {
    let mut entries: Vec<MatchListItem> = state
        .store()
        .list()
        .await?
        .into_iter()
        .map(Into::into)
        .collect();

    for room in state.local_rooms() {
        let session = room.session.read().await.clone();
        entries.push(list_entry(&session));
    }

    Ok(entries)
}

/// Queue one dart into the active player's pending visit.
pub async fn add_dart(
    state: &SharedState,
    match_id: Uuid,
    request: AddDartRequest,
) -> Result<PendingVisit, ServiceError> {
    let room = require_room(state, match_id)?;

    let active = {
        let session = room.session.read().await;
        if !session.state.phase.is_live() {
            return Err(ServiceError::MatchOver);
        }
        enforce_turn(&room, &session.state, request.side)?;
        session.state.active
    };

    let dart = Dart::try_from(request.dart)
        .map_err(|err| ServiceError::InvalidInput(err.to_string()))?;

    let mut pending = room.pending.lock().await;
    pending.add_dart(dart)?;
    let snapshot = PendingVisit::from(&*pending);
    drop(pending);

    sse_events::broadcast_pending_changed(&room, active.into(), snapshot.clone());

    Ok(snapshot)
}

/// Withdraw the most recently queued dart.
pub async fn undo_dart(
    state: &SharedState,
    match_id: Uuid,
    side: Option<SideDto>,
) -> Result<PendingVisit, ServiceError> {
    let room = require_room(state, match_id)?;

    let active = {
        let session = room.session.read().await;
        if !session.state.phase.is_live() {
            return Err(ServiceError::MatchOver);
        }
        enforce_turn(&room, &session.state, side)?;
        session.state.active
    };

    let mut pending = room.pending.lock().await;
    if pending.undo_last().is_none() {
        return Err(ServiceError::InvalidState(
            "no dart queued for the current visit".into(),
        ));
    }
    let snapshot = PendingVisit::from(&*pending);
    drop(pending);

    sse_events::broadcast_pending_changed(&room, active.into(), snapshot.clone());

    Ok(snapshot)
}

/// Commit a visit: from the pending queue, an explicit dart list, or an
/// aggregate total.
pub async fn commit_visit(
    state: &SharedState,
    match_id: Uuid,
    request: SubmitVisitRequest,
) -> Result<VisitReport, ServiceError> {
    let room = require_room(state, match_id)?;

    let input = match (request.darts, request.total) {
        (Some(darts), _) => {
            let darts = darts
                .into_iter()
                .map(Dart::try_from)
                .collect::<Result<Vec<_>, _>>()
                .map_err(|err| ServiceError::InvalidInput(err.to_string()))?;
            VisitInput::Darts(darts)
        }
        (None, Some(total)) => VisitInput::Total {
            total,
            darts: request.dart_count.unwrap_or(3),
        },
        (None, None) => {
            let pending = room.pending.lock().await;
            if pending.is_empty() {
                return Err(ServiceError::InvalidInput(
                    "no darts queued for this visit".into(),
                ));
            }
            VisitInput::Darts(pending.darts().to_vec())
        }
    };

    // Role gating runs against the freshest authoritative state so both
    // sides cannot believe they hold the throw.
    if room.sync.enforces_roles() {
        if let Some(authoritative) = room.sync.fetch_authoritative().await? {
            room.adopt(authoritative).await;
        }
    }

    let (result, session) = {
        let mut session = room.session.write().await;
        enforce_turn(&room, &session.state, request.side)?;

        let result = engine::commit_visit(&mut session.state, input)?;
        let expected = session.mark_updated();

        if let Err(err) = room.sync.publish(session.clone(), expected).await {
            // A concurrent write landed first; re-adopt before reporting so
            // the caller retries against reality.
            drop(session);
            if let Ok(Some(authoritative)) = room.sync.fetch_authoritative().await {
                room.adopt(authoritative).await;
            }
            return Err(err.into());
        }

        (result, session.clone())
    };

    // A committed visit starts a fresh one.
    room.pending.lock().await.reset();

    let outcome = match result.outcome {
        VisitOutcome::Scored { .. } => OutcomeDto::Scored,
        VisitOutcome::Bust => OutcomeDto::Bust,
        VisitOutcome::LegWon { progress } => match progress {
            ProgressKind::LegWon => OutcomeDto::LegWon,
            ProgressKind::SetWon => OutcomeDto::SetWon,
            ProgressKind::MatchWon => OutcomeDto::MatchWon,
        },
    };

    let summary: MatchSummary = session.clone().into();
    sse_events::broadcast_visit_committed(
        &room,
        result.side.into(),
        result.attempted,
        outcome,
        summary.clone(),
    );
    sse_events::broadcast_match_updated(&room, summary.clone());

    if !session.state.phase.is_live() {
        if let Some(code) = &session.room_code {
            state.release_code(code);
        }
        sse_events::broadcast_lobby_changed(state, list_entry(&session));
        info!(match_id = %room.id, "match decided");
    }

    Ok(VisitReport {
        outcome,
        side: result.side.into(),
        attempted: result.attempted,
        summary,
    })
}

/// Abandon a live match. Terminal and distinct from a won match.
pub async fn abandon_match(
    state: &SharedState,
    match_id: Uuid,
) -> Result<MatchSummary, ServiceError> {
    let room = require_room(state, match_id)?;

    let session = {
        let mut session = room.session.write().await;
        progression::abandon(&mut session.state).map_err(|_| ServiceError::MatchOver)?;
        let expected = session.mark_updated();
        room.sync.publish(session.clone(), expected).await?;
        session.clone()
    };

    if let Some(code) = &session.room_code {
        state.release_code(code);
    }

    room.pending.lock().await.reset();
    sse_events::broadcast_match_abandoned(state, &room, room.id);
    sse_events::broadcast_match_updated(&room, session.clone().into());
    sse_events::broadcast_lobby_changed(state, list_entry(&session));
    info!(match_id = %room.id, "match abandoned");

    Ok(session.into())
}

fn require_room(state: &SharedState, match_id: Uuid) -> Result<Arc<MatchRoom>, ServiceError> {
    state
        .room(match_id)
        .ok_or_else(|| ServiceError::NotFound(format!("match `{match_id}`")))
}

/// Apply the role gate when the room's strategy demands it.
fn enforce_turn(
    room: &MatchRoom,
    state: &MatchState,
    side: Option<SideDto>,
) -> Result<(), ServiceError> {
    if !room.sync.enforces_roles() {
        return Ok(());
    }
    let side = side.ok_or_else(|| {
        ServiceError::InvalidInput("a side is required for online matches".into())
    })?;
    sync::ensure_turn(state, side.into())?;
    Ok(())
}

fn list_entry(session: &MatchSession) -> MatchListItem {
    MatchListItemEntity::from(MatchEntity::from(session.clone())).into()
}

fn generate_room_code(state: &SharedState) -> Result<String, ServiceError> {
    let length = state.config().room_code_length();
    let mut rng = rand::rng();
    for _ in 0..ROOM_CODE_ATTEMPTS {
        let code: String = (0..length)
            .map(|_| ROOM_CODE_ALPHABET[rng.random_range(0..ROOM_CODE_ALPHABET.len())] as char)
            .collect();
        if !state.code_in_use(&code) {
            return Ok(code);
        }
    }
    Err(ServiceError::InvalidState(
        "could not allocate a free room code".into(),
    ))
}

/// Keep an online room in step with its store record: adopt every feed
/// replacement verbatim and fan it out to this session's SSE clients.
fn spawn_adoption_task(state: SharedState, room: Arc<MatchRoom>) {
    tokio::spawn(async move {
        let mut receiver = match state.store().subscribe(room.id).await {
            Ok(receiver) => receiver,
            Err(err) => {
                warn!(match_id = %room.id, error = %err, "could not subscribe to match feed");
                return;
            }
        };

        loop {
            match receiver.recv().await {
                Ok(entity) => {
                    let authoritative = MatchSession::from(entity);
                    if room.adopt(authoritative).await {
                        let summary = room.session.read().await.clone().into();
                        sse_events::broadcast_match_updated(&room, summary);
                    }
                }
                Err(RecvError::Closed) => break,
                Err(RecvError::Lagged(_)) => {
                    // Missed intermediates do not matter; the record is
                    // whole-state, so one fresh fetch catches up.
                    if let Ok(Some(authoritative)) = room.sync.fetch_authoritative().await {
                        room.adopt(authoritative).await;
                    }
                }
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::AppConfig,
        dao::match_store::memory::MemoryMatchStore,
        dto::matches::{DartDto, MultiplierDto, RaceFormatDto, RaceTargetDto},
        state::AppState,
    };

    fn test_state() -> SharedState {
        AppState::new(AppConfig::default(), Arc::new(MemoryMatchStore::new()))
    }

    fn request(players: Vec<&str>, online: bool) -> CreateMatchRequest {
        CreateMatchRequest {
            players: players.into_iter().map(String::from).collect(),
            online,
            start_score: 501,
            double_in: false,
            double_out: true,
            legs: RaceTargetDto {
                format: RaceFormatDto::FirstTo,
                count: 1,
            },
            sets: None,
        }
    }

    fn treble_20() -> DartDto {
        DartDto {
            segment: 20,
            multiplier: MultiplierDto::Treble,
        }
    }

    #[tokio::test]
    async fn local_match_seats_home_and_shows_up_in_the_lobby() {
        let state = test_state();
        let seat = create_match(&state, request(vec!["Anna", "Bert"], false))
            .await
            .unwrap();

        assert_eq!(seat.role, SideDto::Home);
        assert!(seat.summary.room_code.is_none());
        assert_eq!(seat.summary.players[0].display_name, "Anna");
        assert_eq!(seat.summary.players[1].display_name, "Bert");

        let listing = list_matches(&state).await.unwrap();
        assert_eq!(listing.len(), 1);
        assert_eq!(listing[0].id, seat.summary.id);
    }

    #[tokio::test]
    async fn unacceptable_start_scores_are_refused() {
        let state = test_state();
        let mut bad = request(vec!["Anna", "Bert"], false);
        bad.start_score = 1;
        match create_match(&state, bad).await {
            Err(ServiceError::InvalidInput(_)) => {}
            other => panic!("expected invalid input, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn online_match_hands_out_a_join_code_once() {
        let state = test_state();
        let seat = create_match(&state, request(vec!["Host"], true))
            .await
            .unwrap();
        let code = seat.summary.room_code.clone().unwrap();
        assert_eq!(code.len(), state.config().room_code_length());

        let joined = join_match(
            &state,
            JoinMatchRequest {
                room_code: code.clone(),
                display_name: "Guest".into(),
            },
        )
        .await
        .unwrap();
        assert_eq!(joined.role, SideDto::Away);
        assert_eq!(joined.summary.players[1].display_name, "Guest");

        // The code is released after a successful join.
        match join_match(
            &state,
            JoinMatchRequest {
                room_code: code,
                display_name: "Third".into(),
            },
        )
        .await
        {
            Err(ServiceError::NotFound(_)) => {}
            other => panic!("expected not found, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn pending_darts_queue_and_commit_as_one_visit() {
        let state = test_state();
        let seat = create_match(&state, request(vec!["Anna", "Bert"], false))
            .await
            .unwrap();
        let id = seat.summary.id;

        for expected_total in [60, 120, 180] {
            let pending = add_dart(
                &state,
                id,
                AddDartRequest {
                    side: None,
                    dart: treble_20(),
                },
            )
            .await
            .unwrap();
            assert_eq!(pending.total, expected_total);
        }

        let report = commit_visit(&state, id, SubmitVisitRequest::default())
            .await
            .unwrap();
        assert_eq!(report.outcome, OutcomeDto::Scored);
        assert_eq!(report.attempted, 180);
        assert_eq!(report.summary.players[0].remaining_score, 321);

        // The queue starts over for the next visit.
        match commit_visit(&state, id, SubmitVisitRequest::default()).await {
            Err(ServiceError::InvalidInput(_)) => {}
            other => panic!("expected invalid input, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn undo_withdraws_the_last_queued_dart() {
        let state = test_state();
        let seat = create_match(&state, request(vec!["Anna", "Bert"], false))
            .await
            .unwrap();
        let id = seat.summary.id;

        match undo_dart(&state, id, None).await {
            Err(ServiceError::InvalidState(_)) => {}
            other => panic!("expected invalid state, got {other:?}"),
        }

        add_dart(
            &state,
            id,
            AddDartRequest {
                side: None,
                dart: treble_20(),
            },
        )
        .await
        .unwrap();
        let pending = undo_dart(&state, id, None).await.unwrap();
        assert!(pending.darts.is_empty());
        assert_eq!(pending.total, 0);
    }

    #[tokio::test]
    async fn undo_is_gated_like_dart_entry() {
        let state = test_state();
        let seat = create_match(&state, request(vec!["Host"], true))
            .await
            .unwrap();
        let id = seat.summary.id;
        join_match(
            &state,
            JoinMatchRequest {
                room_code: seat.summary.room_code.clone().unwrap(),
                display_name: "Guest".into(),
            },
        )
        .await
        .unwrap();

        match undo_dart(&state, id, None).await {
            Err(ServiceError::InvalidInput(_)) => {}
            other => panic!("expected invalid input, got {other:?}"),
        }
        match undo_dart(&state, id, Some(SideDto::Away)).await {
            Err(ServiceError::NotYourTurn(_)) => {}
            other => panic!("expected turn violation, got {other:?}"),
        }

        // A finished room refuses queue edits outright.
        let local = create_match(&state, request(vec!["Anna", "Bert"], false))
            .await
            .unwrap();
        abandon_match(&state, local.summary.id).await.unwrap();
        match undo_dart(&state, local.summary.id, None).await {
            Err(ServiceError::MatchOver) => {}
            other => panic!("expected match over, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn online_commits_are_gated_on_the_active_role() {
        let state = test_state();
        let seat = create_match(&state, request(vec!["Host"], true))
            .await
            .unwrap();
        let id = seat.summary.id;
        let code = seat.summary.room_code.clone().unwrap();
        join_match(
            &state,
            JoinMatchRequest {
                room_code: code,
                display_name: "Guest".into(),
            },
        )
        .await
        .unwrap();

        let aggregate = |side| SubmitVisitRequest {
            side,
            total: Some(60),
            ..Default::default()
        };

        match commit_visit(&state, id, aggregate(None)).await {
            Err(ServiceError::InvalidInput(_)) => {}
            other => panic!("expected invalid input, got {other:?}"),
        }
        match commit_visit(&state, id, aggregate(Some(SideDto::Away))).await {
            Err(ServiceError::NotYourTurn(_)) => {}
            other => panic!("expected turn violation, got {other:?}"),
        }

        let report = commit_visit(&state, id, aggregate(Some(SideDto::Home)))
            .await
            .unwrap();
        assert_eq!(report.summary.active, SideDto::Away);

        // The store record carries the committed visit.
        let summary = get_match(&state, id).await.unwrap();
        assert_eq!(summary.players[0].remaining_score, 441);
    }

    #[tokio::test]
    async fn abandoned_matches_refuse_further_play() {
        let state = test_state();
        let seat = create_match(&state, request(vec!["Anna", "Bert"], false))
            .await
            .unwrap();
        let id = seat.summary.id;

        let summary = abandon_match(&state, id).await.unwrap();
        assert!(matches!(
            summary.phase,
            crate::dto::matches::PhaseDto::Abandoned
        ));

        match commit_visit(
            &state,
            id,
            SubmitVisitRequest {
                total: Some(60),
                ..Default::default()
            },
        )
        .await
        {
            Err(ServiceError::MatchOver) => {}
            other => panic!("expected match over, got {other:?}"),
        }
        match abandon_match(&state, id).await {
            Err(ServiceError::MatchOver) => {}
            other => panic!("expected match over, got {other:?}"),
        }
    }
}

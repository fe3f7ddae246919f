use std::{convert::Infallible, time::Duration};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use uuid::Uuid;

use crate::{
    dto::sse::{Handshake, ServerEvent},
    error::ServiceError,
    state::{SharedState, SseHub},
};

/// Subscribe to the lobby-wide SSE stream.
pub fn subscribe_lobby(state: &SharedState) -> broadcast::Receiver<ServerEvent> {
    state.lobby_sse().subscribe()
}

/// Subscribe to the event stream of one match room.
pub fn subscribe_match(
    state: &SharedState,
    match_id: Uuid,
) -> Result<broadcast::Receiver<ServerEvent>, ServiceError> {
    let room = state
        .room(match_id)
        .ok_or_else(|| ServiceError::NotFound(format!("match `{match_id}`")))?;
    Ok(room.events.subscribe())
}

/// Identifies the target SSE stream for teardown logging.
#[derive(Clone)]
pub enum StreamKind {
    Lobby,
    Match(Uuid),
}

/// Convert a broadcast receiver into an SSE response, forwarding events
/// until the client disconnects.
pub fn to_sse_stream(
    mut receiver: broadcast::Receiver<ServerEvent>,
    kind: StreamKind,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    // small bounded channel between forwarder and response
    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(8);

    // forwarder task: reads from broadcast and pushes into mpsc
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = tx.closed() => break,
                recv_result = receiver.recv() => {
                    match recv_result {
                        Ok(payload) => {
                            let mut event = Event::default().data(payload.data);
                            if let Some(name) = payload.event {
                                event = event.event(name);
                            }

                            if tx.send(Ok(event)).await.is_err() {
                                break;
                            }
                        }
                        Err(RecvError::Closed) => break,
                        Err(RecvError::Lagged(_)) => {
                            // Skip lagged messages but keep the stream alive.
                            continue;
                        }
                    }
                }
            }
        }

        match kind {
            StreamKind::Lobby => tracing::info!("Lobby SSE stream disconnected"),
            StreamKind::Match(id) => {
                tracing::info!(match_id = %id, "Match SSE stream disconnected")
            }
        }
    });

    // response stream reads from mpsc; when client disconnects axum drops this stream
    let stream = ReceiverStream::new(rx);
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// Announce a new subscription on the hub it joined, flagging degraded
/// mode when the match store is unreachable.
pub async fn broadcast_handshake(state: &SharedState, hub: &SseHub, stream: &str) {
    let degraded = state.store().health_check().await.is_err();
    let payload = Handshake {
        stream: stream.to_string(),
        message: format!("subscribed to {stream}"),
        degraded,
    };
    if let Ok(event) = ServerEvent::json(Some("handshake".to_string()), &payload) {
        hub.broadcast(event);
    }
}

//! Shared application state: match rooms, store handle, and SSE hubs.

pub mod match_state;
pub mod progression;
mod sse;

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::dao::match_store::MatchStore;
use crate::scoring::visit::VisitAccumulator;
use crate::state::match_state::MatchSession;
use crate::sync::SyncStrategy;

pub use self::sse::SseHub;

/// Shared handle to the central application state.
pub type SharedState = Arc<AppState>;

/// One hosted match: the live session, the active player's pending darts,
/// the per-match event hub, and the sync strategy tying it (or not) to the
/// shared store record.
pub struct MatchRoom {
    /// Match id, mirrored from the session for lock-free access.
    pub id: Uuid,
    /// Whether this room is an online (store-synchronized) match.
    pub online: bool,
    /// The live session. For online rooms this is a local copy of the
    /// authoritative store record.
    pub session: RwLock<MatchSession>,
    /// Darts queued for the current visit but not yet committed.
    pub pending: Mutex<VisitAccumulator>,
    /// Per-match SSE hub.
    pub events: SseHub,
    /// Synchronization strategy for this room.
    pub sync: Box<dyn SyncStrategy>,
}

impl MatchRoom {
    /// Wrap a fresh session into a room.
    pub fn new(
        session: MatchSession,
        sync: Box<dyn SyncStrategy>,
        online: bool,
        sse_capacity: usize,
    ) -> Arc<Self> {
        Arc::new(Self {
            id: session.id,
            online,
            session: RwLock::new(session),
            pending: Mutex::new(VisitAccumulator::new()),
            events: SseHub::new(sse_capacity),
            sync,
        })
    }

    /// Adopt an authoritative session verbatim, never replaying logic.
    ///
    /// This is the only path by which a non-authoring session's state
    /// changes; stale versions are ignored so a late feed delivery cannot
    /// roll the room backwards.
    pub async fn adopt(&self, authoritative: MatchSession) -> bool {
        let mut guard = self.session.write().await;
        if authoritative.version < guard.version {
            return false;
        }
        *guard = authoritative;
        true
    }
}

/// Central application state storing the match rooms and the store handle.
pub struct AppState {
    config: AppConfig,
    store: Arc<dyn MatchStore>,
    rooms: DashMap<Uuid, Arc<MatchRoom>>,
    codes: DashMap<String, Uuid>,
    lobby: SseHub,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    pub fn new(config: AppConfig, store: Arc<dyn MatchStore>) -> SharedState {
        let lobby = SseHub::new(config.sse_capacity());
        Arc::new(Self {
            config,
            store,
            rooms: DashMap::new(),
            codes: DashMap::new(),
            lobby,
        })
    }

    /// Runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Handle to the match store.
    pub fn store(&self) -> Arc<dyn MatchStore> {
        Arc::clone(&self.store)
    }

    /// Hub for lobby-wide events (matches created, finished, abandoned).
    pub fn lobby_sse(&self) -> &SseHub {
        &self.lobby
    }

    /// Register a room, indexing its join code when it has one.
    pub async fn insert_room(&self, room: Arc<MatchRoom>) {
        if let Some(code) = room.session.read().await.room_code.clone() {
            self.codes.insert(code, room.id);
        }
        self.rooms.insert(room.id, room);
    }

    /// Look up a room by match id.
    pub fn room(&self, id: Uuid) -> Option<Arc<MatchRoom>> {
        self.rooms.get(&id).map(|entry| Arc::clone(entry.value()))
    }

    /// Look up a room by its join code.
    pub fn room_by_code(&self, code: &str) -> Option<Arc<MatchRoom>> {
        let id = *self.codes.get(code)?;
        self.room(id)
    }

    /// Rooms that live only in this process (no store record).
    pub fn local_rooms(&self) -> Vec<Arc<MatchRoom>> {
        self.rooms
            .iter()
            .filter(|entry| !entry.value().online)
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }

    /// Whether a join code is currently taken.
    pub fn code_in_use(&self, code: &str) -> bool {
        self.codes.contains_key(code)
    }

    /// Drop a join code mapping once a room no longer accepts joins.
    pub fn release_code(&self, code: &str) {
        self.codes.remove(code);
    }
}

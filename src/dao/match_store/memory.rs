use dashmap::DashMap;
use futures::future::BoxFuture;
use std::sync::Arc;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::dao::match_store::MatchStore;
use crate::dao::models::{MatchEntity, MatchListItemEntity};
use crate::dao::storage::{StorageError, StorageResult};

/// Broadcast capacity for each per-match change feed. Subscribers that lag
/// behind this many replacements recover via a full fetch.
const FEED_CAPACITY: usize = 32;

/// In-process match store backed by a [`DashMap`], with a tokio broadcast
/// channel per match as the change feed.
///
/// Stands in for the hosted backend the production deployment would point
/// at: same contract (whole-record conditional writes, push on replace),
/// no persistence across restarts.
#[derive(Default)]
pub struct MemoryMatchStore {
    matches: Arc<DashMap<Uuid, MatchEntity>>,
    feeds: Arc<DashMap<Uuid, broadcast::Sender<MatchEntity>>>,
}

impl MemoryMatchStore {
    /// Fresh, empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn feed(&self, id: Uuid) -> broadcast::Sender<MatchEntity> {
        self.feeds
            .entry(id)
            .or_insert_with(|| broadcast::channel(FEED_CAPACITY).0)
            .clone()
    }
}

impl MatchStore for MemoryMatchStore {
    fn create(&self, entity: MatchEntity) -> BoxFuture<'static, StorageResult<()>> {
        let matches = Arc::clone(&self.matches);
        Box::pin(async move {
            use dashmap::mapref::entry::Entry;
            match matches.entry(entity.id) {
                Entry::Occupied(_) => Err(StorageError::AlreadyExists(entity.id)),
                Entry::Vacant(slot) => {
                    slot.insert(entity);
                    Ok(())
                }
            }
        })
    }

    fn fetch(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<MatchEntity>>> {
        let matches = Arc::clone(&self.matches);
        Box::pin(async move { Ok(matches.get(&id).map(|entry| entry.clone())) })
    }

    fn commit_and_publish(
        &self,
        entity: MatchEntity,
        expected_version: u64,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let matches = Arc::clone(&self.matches);
        let feed = self.feed(entity.id);
        Box::pin(async move {
            let id = entity.id;
            {
                let mut slot = matches.get_mut(&id).ok_or(StorageError::NotFound(id))?;
                if slot.version != expected_version {
                    return Err(StorageError::Conflict {
                        expected: expected_version,
                        actual: slot.version,
                    });
                }
                *slot = entity.clone();
            }
            // No subscriber is fine; the author already holds the state.
            let _ = feed.send(entity);
            Ok(())
        })
    }

    fn subscribe(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<broadcast::Receiver<MatchEntity>>> {
        let receiver = self.feed(id).subscribe();
        Box::pin(async move { Ok(receiver) })
    }

    fn list(&self) -> BoxFuture<'static, StorageResult<Vec<MatchListItemEntity>>> {
        let matches = Arc::clone(&self.matches);
        Box::pin(async move {
            Ok(matches
                .iter()
                .map(|entry| entry.value().clone().into())
                .collect())
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async move { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::match_state::{
        FinishMode, MatchConfig, MatchSession, MatchState, RaceFormat, RaceTarget, StartMode,
    };

    fn entity() -> MatchEntity {
        let config = MatchConfig {
            start_score: 501,
            start_mode: StartMode::StraightIn,
            finish_mode: FinishMode::DoubleOut,
            legs_target: RaceTarget {
                format: RaceFormat::BestOf,
                count: 3,
            },
            sets_target: None,
        };
        let state = MatchState::new(config, "Anna".into(), "Bert".into());
        MatchSession::new(state, Some("KJH3QZ".into())).into()
    }

    #[tokio::test]
    async fn create_then_fetch_round_trips() {
        let store = MemoryMatchStore::new();
        let entity = entity();
        let id = entity.id;

        store.create(entity.clone()).await.unwrap();
        let fetched = store.fetch(id).await.unwrap().unwrap();
        assert_eq!(fetched, entity);

        assert!(matches!(
            store.create(entity).await,
            Err(StorageError::AlreadyExists(_))
        ));
    }

    #[tokio::test]
    async fn fetch_unknown_match_yields_none() {
        let store = MemoryMatchStore::new();
        assert!(store.fetch(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn conditional_write_detects_stale_versions() {
        let store = MemoryMatchStore::new();
        let mut entity = entity();
        store.create(entity.clone()).await.unwrap();

        entity.version = 1;
        store.commit_and_publish(entity.clone(), 0).await.unwrap();

        // A second writer still holding version 0 must be rejected.
        let mut stale = entity.clone();
        stale.version = 1;
        match store.commit_and_publish(stale, 0).await {
            Err(StorageError::Conflict { expected: 0, actual: 1 }) => {}
            other => panic!("expected version conflict, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn commit_on_missing_record_fails() {
        let store = MemoryMatchStore::new();
        assert!(matches!(
            store.commit_and_publish(entity(), 0).await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn subscribers_receive_each_published_replacement() {
        let store = MemoryMatchStore::new();
        let mut entity = entity();
        let id = entity.id;
        store.create(entity.clone()).await.unwrap();

        let mut feed = store.subscribe(id).await.unwrap();

        entity.version = 1;
        store.commit_and_publish(entity.clone(), 0).await.unwrap();

        let pushed = feed.recv().await.unwrap();
        assert_eq!(pushed.version, 1);
        assert_eq!(pushed.id, id);
    }
}

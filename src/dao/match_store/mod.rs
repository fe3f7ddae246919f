pub mod memory;

use futures::future::BoxFuture;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::dao::models::{MatchEntity, MatchListItemEntity};
use crate::dao::storage::StorageResult;

/// Abstraction over the shared record each online match lives in.
///
/// The store is the single authority for a match: writers replace the whole
/// record conditionally on its version, and every replacement is pushed to
/// subscribers so remote sessions can adopt it verbatim.
pub trait MatchStore: Send + Sync {
    /// Create the initial shared record. Fails if the id is taken.
    fn create(&self, entity: MatchEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Full-state read of one match.
    fn fetch(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<MatchEntity>>>;
    /// Atomically replace the record and notify subscribers.
    ///
    /// The write only lands when the stored version equals
    /// `expected_version`; otherwise it fails with a conflict and the
    /// caller must re-fetch before retrying.
    fn commit_and_publish(
        &self,
        entity: MatchEntity,
        expected_version: u64,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// Subscribe to record replacements for one match. Dropping the
    /// receiver unsubscribes.
    fn subscribe(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<broadcast::Receiver<MatchEntity>>>;
    /// Summary listing of every stored match.
    fn list(&self) -> BoxFuture<'static, StorageResult<Vec<MatchListItemEntity>>>;
    /// Cheap liveness probe used by the health endpoint.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
}

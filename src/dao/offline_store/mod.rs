pub mod redb;

use futures::future::BoxFuture;
use uuid::Uuid;

use crate::dao::models::{GameEntity, GameStateEntity, PendingActionEntity};
use crate::dao::storage::StorageResult;

/// Abstraction over the device-local persistence layer: the durable pending
/// action queue, the cached game/state tables, and sync metadata.
///
/// Queue guarantees are at-least-once: a row is only removed on confirmed
/// success or explicit discard, so a delivery whose acknowledgment is lost
/// may be replayed.
pub trait OfflineStore: Send + Sync {
    /// Append a mutating intent to the durable queue.
    fn enqueue(&self, action: PendingActionEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// All queued actions, oldest first.
    fn list_pending(&self) -> BoxFuture<'static, StorageResult<Vec<PendingActionEntity>>>;
    /// Number of queued actions.
    fn pending_count(&self) -> BoxFuture<'static, StorageResult<u64>>;
    /// Remove a delivered action. Removing an already-absent row is a no-op.
    fn mark_succeeded(&self, id: Uuid) -> BoxFuture<'static, StorageResult<()>>;
    /// Record a failed attempt: bump `retry_count`, stamp `last_error` and
    /// `last_attempt_at`. Returns the updated row.
    fn mark_failed(
        &self,
        id: Uuid,
        error: String,
    ) -> BoxFuture<'static, StorageResult<PendingActionEntity>>;
    /// Drop an action permanently without delivering it.
    fn discard(&self, id: Uuid) -> BoxFuture<'static, StorageResult<()>>;
    /// Empty the queue.
    fn purge_all(&self) -> BoxFuture<'static, StorageResult<()>>;
    /// Rewrite queued references to a temporary at-bat id after the server
    /// assigned the real one. Returns how many rows changed.
    fn rewrite_at_bat_refs(
        &self,
        temp: Uuid,
        server: Uuid,
    ) -> BoxFuture<'static, StorageResult<u64>>;
    /// Upsert the cached game snapshot.
    fn save_cached_game(&self, game: GameEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Fetch a cached game snapshot by id.
    fn load_cached_game(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<GameEntity>>>;
    /// Upsert the cached live-state snapshot for a game.
    fn save_game_state(&self, state: GameStateEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Fetch the cached live-state snapshot for a game.
    fn load_game_state(
        &self,
        game_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<GameStateEntity>>>;
    /// Upsert a sync metadata value.
    fn set_metadata(&self, key: &str, value: String) -> BoxFuture<'static, StorageResult<()>>;
    /// Fetch a sync metadata value.
    fn get_metadata(&self, key: &str) -> BoxFuture<'static, StorageResult<Option<String>>>;
}

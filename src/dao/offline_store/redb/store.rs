use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::future::BoxFuture;
use redb::{Database, ReadableTable, TableDefinition};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::dao::models::{GameEntity, GameStateEntity, PendingActionEntity};
use crate::dao::offline_store::OfflineStore;
use crate::dao::storage::{StorageError, StorageResult};

use super::error::{RedbDaoError, RedbResult};

/// Key: 40-byte composite (created_at nanos big-endian ++ process-local
/// sequence ++ uuid bytes), so byte ordering equals enqueue ordering even on
/// clocks too coarse to separate back-to-back enqueues. Value: JSON-encoded
/// row.
const PENDING_ACTIONS: TableDefinition<&[u8], &[u8]> = TableDefinition::new("pending_actions");
/// Key: game uuid bytes. Value: JSON-encoded game snapshot.
const CACHED_GAMES: TableDefinition<&[u8], &[u8]> = TableDefinition::new("cached_games");
/// Key: game uuid bytes. Value: JSON-encoded live-state snapshot.
const CACHED_GAME_STATES: TableDefinition<&[u8], &[u8]> =
    TableDefinition::new("cached_game_states");
/// Plain string key/value pairs (last sync timestamp, failure counter).
const SYNC_METADATA: TableDefinition<&str, &str> = TableDefinition::new("sync_metadata");

static ENQUEUE_SEQ: AtomicU64 = AtomicU64::new(0);

fn action_key(created_at: OffsetDateTime, sequence: u64, id: Uuid) -> [u8; 40] {
    let mut key = [0u8; 40];
    let nanos = created_at.unix_timestamp_nanos().max(0) as u128;
    key[..16].copy_from_slice(&nanos.to_be_bytes());
    key[16..24].copy_from_slice(&sequence.to_be_bytes());
    key[24..].copy_from_slice(id.as_bytes());
    key
}

/// Durable on-device store backed by a single redb file.
#[derive(Clone)]
pub struct RedbOfflineStore {
    db: Arc<Database>,
}

impl RedbOfflineStore {
    /// Open or create the database at `path`, ensuring all tables exist
    /// before any reads.
    pub fn open(path: &Path) -> RedbResult<Self> {
        let db = Database::create(path).map_err(|source| RedbDaoError::Open {
            path: path.to_path_buf(),
            source,
        })?;

        let wt = db.begin_write()?;
        wt.open_table(PENDING_ACTIONS)?;
        wt.open_table(CACHED_GAMES)?;
        wt.open_table(CACHED_GAME_STATES)?;
        wt.open_table(SYNC_METADATA)?;
        wt.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    fn load_actions(&self) -> StorageResult<Vec<([u8; 40], PendingActionEntity)>> {
        let rt = self.db.begin_read().map_err(RedbDaoError::from)?;
        let table = rt.open_table(PENDING_ACTIONS).map_err(RedbDaoError::from)?;

        let mut rows = Vec::new();
        for entry in table.iter().map_err(RedbDaoError::from)? {
            let (k, v) = entry.map_err(RedbDaoError::from)?;
            let mut key = [0u8; 40];
            key.copy_from_slice(k.value());
            let action: PendingActionEntity = serde_json::from_slice(v.value())
                .map_err(|source| StorageError::codec("decoding pending action", source))?;
            rows.push((key, action));
        }
        Ok(rows)
    }

    fn find_action(&self, id: Uuid) -> StorageResult<Option<([u8; 40], PendingActionEntity)>> {
        let suffix = id.into_bytes();
        Ok(self
            .load_actions()?
            .into_iter()
            .find(|(key, _)| key[24..] == suffix))
    }

    fn put_action(&self, key: &[u8; 40], action: &PendingActionEntity) -> StorageResult<()> {
        let value = serde_json::to_vec(action)
            .map_err(|source| StorageError::codec("encoding pending action", source))?;
        let wt = self.db.begin_write().map_err(RedbDaoError::from)?;
        {
            let mut table = wt.open_table(PENDING_ACTIONS).map_err(RedbDaoError::from)?;
            table
                .insert(key.as_slice(), value.as_slice())
                .map_err(RedbDaoError::from)?;
        }
        wt.commit().map_err(RedbDaoError::from)?;
        Ok(())
    }

    fn remove_action(&self, id: Uuid) -> StorageResult<bool> {
        let Some((key, _)) = self.find_action(id)? else {
            return Ok(false);
        };
        let wt = self.db.begin_write().map_err(RedbDaoError::from)?;
        {
            let mut table = wt.open_table(PENDING_ACTIONS).map_err(RedbDaoError::from)?;
            table.remove(key.as_slice()).map_err(RedbDaoError::from)?;
        }
        wt.commit().map_err(RedbDaoError::from)?;
        Ok(true)
    }

    fn put_json<T: serde::Serialize>(
        &self,
        table_def: TableDefinition<'static, &'static [u8], &'static [u8]>,
        key: Uuid,
        value: &T,
        what: &str,
    ) -> StorageResult<()> {
        let encoded = serde_json::to_vec(value)
            .map_err(|source| StorageError::codec(format!("encoding {what}"), source))?;
        let wt = self.db.begin_write().map_err(RedbDaoError::from)?;
        {
            let mut table = wt.open_table(table_def).map_err(RedbDaoError::from)?;
            table
                .insert(key.as_bytes().as_slice(), encoded.as_slice())
                .map_err(RedbDaoError::from)?;
        }
        wt.commit().map_err(RedbDaoError::from)?;
        Ok(())
    }

    fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        table_def: TableDefinition<'static, &'static [u8], &'static [u8]>,
        key: Uuid,
        what: &str,
    ) -> StorageResult<Option<T>> {
        let rt = self.db.begin_read().map_err(RedbDaoError::from)?;
        let table = rt.open_table(table_def).map_err(RedbDaoError::from)?;
        let Some(guard) = table
            .get(key.as_bytes().as_slice())
            .map_err(RedbDaoError::from)?
        else {
            return Ok(None);
        };
        let decoded = serde_json::from_slice(guard.value())
            .map_err(|source| StorageError::codec(format!("decoding {what}"), source))?;
        Ok(Some(decoded))
    }
}

impl OfflineStore for RedbOfflineStore {
    fn enqueue(&self, action: PendingActionEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let sequence = ENQUEUE_SEQ.fetch_add(1, Ordering::Relaxed);
            let key = action_key(action.created_at, sequence, action.id);
            store.put_action(&key, &action)
        })
    }

    fn list_pending(&self) -> BoxFuture<'static, StorageResult<Vec<PendingActionEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            // load_actions iterates in key order, which is enqueue order.
            Ok(store
                .load_actions()?
                .into_iter()
                .map(|(_, action)| action)
                .collect())
        })
    }

    fn pending_count(&self) -> BoxFuture<'static, StorageResult<u64>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.load_actions()?.len() as u64) })
    }

    fn mark_succeeded(&self, id: Uuid) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store.remove_action(id)?;
            Ok(())
        })
    }

    fn mark_failed(
        &self,
        id: Uuid,
        error: String,
    ) -> BoxFuture<'static, StorageResult<PendingActionEntity>> {
        let store = self.clone();
        Box::pin(async move {
            let Some((key, mut action)) = store.find_action(id)? else {
                return Err(StorageError::MissingAction { id });
            };
            action.retry_count += 1;
            action.last_error = Some(error);
            action.last_attempt_at = Some(OffsetDateTime::now_utc());
            store.put_action(&key, &action)?;
            Ok(action)
        })
    }

    fn discard(&self, id: Uuid) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store.remove_action(id)?;
            Ok(())
        })
    }

    fn purge_all(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let wt = store.db.begin_write().map_err(RedbDaoError::from)?;
            wt.delete_table(PENDING_ACTIONS).map_err(RedbDaoError::from)?;
            wt.open_table(PENDING_ACTIONS).map_err(RedbDaoError::from)?;
            wt.commit().map_err(RedbDaoError::from)?;
            Ok(())
        })
    }

    fn rewrite_at_bat_refs(
        &self,
        temp: Uuid,
        server: Uuid,
    ) -> BoxFuture<'static, StorageResult<u64>> {
        let store = self.clone();
        Box::pin(async move {
            let mut rewritten = 0;
            for (key, mut action) in store.load_actions()? {
                if action.action.rewrite_at_bat_id(temp, server) {
                    store.put_action(&key, &action)?;
                    rewritten += 1;
                }
            }
            Ok(rewritten)
        })
    }

    fn save_cached_game(&self, game: GameEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.put_json(CACHED_GAMES, game.id, &game, "cached game") })
    }

    fn load_cached_game(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<GameEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.get_json(CACHED_GAMES, id, "cached game") })
    }

    fn save_game_state(&self, state: GameStateEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store.put_json(CACHED_GAME_STATES, state.game_id, &state, "cached game state")
        })
    }

    fn load_game_state(
        &self,
        game_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<GameStateEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.get_json(CACHED_GAME_STATES, game_id, "cached game state") })
    }

    fn set_metadata(&self, key: &str, value: String) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        let key = key.to_string();
        Box::pin(async move {
            let wt = store.db.begin_write().map_err(RedbDaoError::from)?;
            {
                let mut table = wt.open_table(SYNC_METADATA).map_err(RedbDaoError::from)?;
                table
                    .insert(key.as_str(), value.as_str())
                    .map_err(RedbDaoError::from)?;
            }
            wt.commit().map_err(RedbDaoError::from)?;
            Ok(())
        })
    }

    fn get_metadata(&self, key: &str) -> BoxFuture<'static, StorageResult<Option<String>>> {
        let store = self.clone();
        let key = key.to_string();
        Box::pin(async move {
            let rt = store.db.begin_read().map_err(RedbDaoError::from)?;
            let table = rt.open_table(SYNC_METADATA).map_err(RedbDaoError::from)?;
            let value = table
                .get(key.as_str())
                .map_err(RedbDaoError::from)?
                .map(|guard| guard.value().to_string());
            Ok(value)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::models::{InningEntity, InningHalf, PitchOutcome};
    use crate::remote::models::{ActionPayload, LogPitchRequest, RecordPlayRequest};
    use crate::dao::models::AtBatResultKind;
    use tempfile::TempDir;

    fn open_tmp() -> (TempDir, RedbOfflineStore) {
        let dir = TempDir::new().unwrap();
        let store = RedbOfflineStore::open(&dir.path().join("offline.redb")).unwrap();
        (dir, store)
    }

    fn pitch_action(at_bat_id: Uuid) -> PendingActionEntity {
        PendingActionEntity::new(ActionPayload::LogPitch(LogPitchRequest {
            pitch_id: Uuid::new_v4(),
            at_bat_id,
            game_id: Uuid::new_v4(),
            pitcher_id: Uuid::new_v4(),
            outcome: PitchOutcome::Ball,
            location: None,
            target_location: None,
            velocity: Some(88.5),
            sequence: 1,
        }))
    }

    fn sample_game(id: Uuid) -> GameEntity {
        GameEntity {
            id,
            opponent: Some("Ravens".into()),
            created_at: OffsetDateTime::now_utc(),
            updated_at: OffsetDateTime::now_utc(),
            lineup: Vec::new(),
            batting_pointer: 1,
            inning: InningEntity {
                id: Uuid::new_v4(),
                game_id: id,
                number: 1,
                half: InningHalf::Top,
            },
            outs: 0,
            runs: 0,
            pitchers: Vec::new(),
            open_at_bat: None,
        }
    }

    #[tokio::test]
    async fn enqueue_preserves_creation_order() {
        let (_dir, store) = open_tmp();
        let mut first = pitch_action(Uuid::new_v4());
        let second = pitch_action(Uuid::new_v4());
        first.created_at = second.created_at - time::Duration::seconds(1);

        // Enqueue out of order; listing must come back in created_at order.
        store.enqueue(second.clone()).await.unwrap();
        store.enqueue(first.clone()).await.unwrap();

        let pending = store.list_pending().await.unwrap();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].id, first.id);
        assert_eq!(pending[1].id, second.id);
    }

    #[tokio::test]
    async fn mark_succeeded_removes_exactly_that_row() {
        let (_dir, store) = open_tmp();
        let keep = pitch_action(Uuid::new_v4());
        let done = pitch_action(Uuid::new_v4());
        store.enqueue(keep.clone()).await.unwrap();
        store.enqueue(done.clone()).await.unwrap();

        store.mark_succeeded(done.id).await.unwrap();

        let pending = store.list_pending().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, keep.id);
        assert_eq!(store.pending_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn mark_succeeded_on_missing_row_is_a_noop() {
        let (_dir, store) = open_tmp();
        store.mark_succeeded(Uuid::new_v4()).await.unwrap();
        assert_eq!(store.pending_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn mark_failed_bumps_retry_count_and_records_error() {
        let (_dir, store) = open_tmp();
        let action = pitch_action(Uuid::new_v4());
        store.enqueue(action.clone()).await.unwrap();

        let updated = store
            .mark_failed(action.id, "connection reset".into())
            .await
            .unwrap();
        assert_eq!(updated.retry_count, 1);
        assert_eq!(updated.last_error.as_deref(), Some("connection reset"));
        assert!(updated.last_attempt_at.is_some());

        let updated = store.mark_failed(action.id, "timeout".into()).await.unwrap();
        assert_eq!(updated.retry_count, 2);
        assert_eq!(updated.last_error.as_deref(), Some("timeout"));

        // Failures keep the row queued.
        assert_eq!(store.pending_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn mark_failed_on_missing_row_errors() {
        let (_dir, store) = open_tmp();
        let id = Uuid::new_v4();
        let err = store.mark_failed(id, "whatever".into()).await.unwrap_err();
        match err {
            StorageError::MissingAction { id: missing } => assert_eq!(missing, id),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn discard_and_purge_empty_the_queue() {
        let (_dir, store) = open_tmp();
        let first = pitch_action(Uuid::new_v4());
        store.enqueue(first.clone()).await.unwrap();
        store.enqueue(pitch_action(Uuid::new_v4())).await.unwrap();
        store.enqueue(pitch_action(Uuid::new_v4())).await.unwrap();

        store.discard(first.id).await.unwrap();
        assert_eq!(store.pending_count().await.unwrap(), 2);

        store.purge_all().await.unwrap();
        assert_eq!(store.pending_count().await.unwrap(), 0);
        assert!(store.list_pending().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn rewrite_at_bat_refs_touches_only_matching_rows() {
        let (_dir, store) = open_tmp();
        let temp = Uuid::new_v4();
        let server = Uuid::new_v4();
        let unrelated = Uuid::new_v4();

        store.enqueue(pitch_action(temp)).await.unwrap();
        store.enqueue(pitch_action(unrelated)).await.unwrap();
        store
            .enqueue(PendingActionEntity::new(ActionPayload::RecordPlay(
                RecordPlayRequest {
                    play_id: Uuid::new_v4(),
                    game_id: Uuid::new_v4(),
                    at_bat_id: temp,
                    result: AtBatResultKind::Groundout,
                    outs_recorded: 1,
                },
            )))
            .await
            .unwrap();

        let rewritten = store.rewrite_at_bat_refs(temp, server).await.unwrap();
        assert_eq!(rewritten, 2);

        for action in store.list_pending().await.unwrap() {
            match action.action {
                ActionPayload::LogPitch(request) if request.at_bat_id == unrelated => {}
                ActionPayload::LogPitch(request) => assert_eq!(request.at_bat_id, server),
                ActionPayload::RecordPlay(request) => assert_eq!(request.at_bat_id, server),
                other => panic!("unexpected payload: {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn cached_game_round_trips() {
        let (_dir, store) = open_tmp();
        let id = Uuid::new_v4();
        let game = sample_game(id);

        assert!(store.load_cached_game(id).await.unwrap().is_none());
        store.save_cached_game(game.clone()).await.unwrap();
        let loaded = store.load_cached_game(id).await.unwrap().unwrap();
        assert_eq!(loaded, game);
    }

    #[tokio::test]
    async fn metadata_overwrites_in_place() {
        let (_dir, store) = open_tmp();
        assert!(store.get_metadata("last_sync_at").await.unwrap().is_none());

        store
            .set_metadata("last_sync_at", "2026-08-05T17:00:00Z".into())
            .await
            .unwrap();
        store
            .set_metadata("last_sync_at", "2026-08-05T17:05:00Z".into())
            .await
            .unwrap();

        assert_eq!(
            store.get_metadata("last_sync_at").await.unwrap().as_deref(),
            Some("2026-08-05T17:05:00Z")
        );
    }

    #[tokio::test]
    async fn queue_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("offline.redb");
        let action = pitch_action(Uuid::new_v4());

        {
            let store = RedbOfflineStore::open(&path).unwrap();
            store.enqueue(action.clone()).await.unwrap();
        }

        let store = RedbOfflineStore::open(&path).unwrap();
        let pending = store.list_pending().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0], action);
    }
}

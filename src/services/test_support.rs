//! Shared fixtures for service-layer tests: a scriptable remote API and a
//! state builder backed by a throwaway store.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use futures::future::BoxFuture;
use reqwest::StatusCode;
use tempfile::TempDir;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::dao::models::PitchOutcome;
use crate::dao::offline_store::redb::RedbOfflineStore;
use crate::remote::ScoreApi;
use crate::remote::error::{ApiError, ApiResult};
use crate::remote::models::{
    ActionPayload, AdvanceInningRequest, ChangePitcherRequest, CreateAtBatRequest,
    CreatedResponse, EndGameRequest, InningResponse, LogPitchRequest, RecordPlayRequest,
    StartGameRequest, UpdateAtBatRequest, UpdateScoreRequest,
};
use crate::state::{AppState, SharedState};

type CallHook = Box<dyn Fn() + Send + Sync>;

/// Remote API double with programmable outcomes and a recorded call log.
pub(crate) struct ScriptedApi {
    calls: Mutex<Vec<String>>,
    fail_remaining: Mutex<HashMap<&'static str, u32>>,
    reject: Mutex<HashSet<&'static str>>,
    conflict: Mutex<HashSet<&'static str>>,
    at_bat_server_id: Mutex<Option<Uuid>>,
    pitch_at_bats: Mutex<Vec<Uuid>>,
    on_call: Mutex<Option<CallHook>>,
}

impl ScriptedApi {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            fail_remaining: Mutex::new(HashMap::new()),
            reject: Mutex::new(HashSet::new()),
            conflict: Mutex::new(HashSet::new()),
            at_bat_server_id: Mutex::new(None),
            pitch_at_bats: Mutex::new(Vec::new()),
            on_call: Mutex::new(None),
        })
    }

    /// Fail the next `count` calls of `op` with a retryable status.
    pub(crate) fn fail_times(&self, op: &'static str, count: u32) {
        self.fail_remaining.lock().unwrap().insert(op, count);
    }

    /// Fail every call of `op` with a retryable status.
    pub(crate) fn always_fail(&self, op: &'static str) {
        self.fail_times(op, u32::MAX);
    }

    /// Reject every call of `op` with a validation status.
    pub(crate) fn reject(&self, op: &'static str) {
        self.reject.lock().unwrap().insert(op);
    }

    /// Answer every call of `op` with a conflict status.
    pub(crate) fn conflict_on(&self, op: &'static str) {
        self.conflict.lock().unwrap().insert(op);
    }

    /// Server id returned by `create_at_bat` instead of echoing the request.
    pub(crate) fn assign_at_bat_id(&self, id: Uuid) {
        *self.at_bat_server_id.lock().unwrap() = Some(id);
    }

    /// Hook invoked at the start of every call, e.g. to flip connectivity.
    pub(crate) fn set_on_call(&self, hook: CallHook) {
        *self.on_call.lock().unwrap() = Some(hook);
    }

    /// Recorded call descriptors, in invocation order.
    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// At-bat ids seen by `log_pitch`, in invocation order.
    pub(crate) fn pitch_at_bats(&self) -> Vec<Uuid> {
        self.pitch_at_bats.lock().unwrap().clone()
    }

    fn outcome(&self, op: &'static str, detail: Option<String>) -> ApiResult<()> {
        if let Some(hook) = self.on_call.lock().unwrap().as_ref() {
            hook();
        }

        let descriptor = match detail {
            Some(detail) => format!("{op}#{detail}"),
            None => op.to_string(),
        };
        self.calls.lock().unwrap().push(descriptor);

        if self.conflict.lock().unwrap().contains(op) {
            return Err(ApiError::RequestStatus {
                path: op.to_lowercase(),
                status: StatusCode::CONFLICT,
            });
        }
        if self.reject.lock().unwrap().contains(op) {
            return Err(ApiError::RequestStatus {
                path: op.to_lowercase(),
                status: StatusCode::UNPROCESSABLE_ENTITY,
            });
        }

        let mut failures = self.fail_remaining.lock().unwrap();
        if let Some(remaining) = failures.get_mut(op)
            && *remaining > 0
        {
            if *remaining != u32::MAX {
                *remaining -= 1;
            }
            return Err(ApiError::RequestStatus {
                path: op.to_lowercase(),
                status: StatusCode::SERVICE_UNAVAILABLE,
            });
        }

        Ok(())
    }
}

impl ScoreApi for ScriptedApi {
    fn start_game(&self, _request: StartGameRequest) -> BoxFuture<'static, ApiResult<()>> {
        let result = self.outcome("START_GAME", None);
        Box::pin(async move { result })
    }

    fn end_game(&self, _request: EndGameRequest) -> BoxFuture<'static, ApiResult<()>> {
        let result = self.outcome("END_GAME", None);
        Box::pin(async move { result })
    }

    fn create_at_bat(
        &self,
        request: CreateAtBatRequest,
    ) -> BoxFuture<'static, ApiResult<CreatedResponse>> {
        let result = self.outcome("CREATE_AT_BAT", None).map(|()| {
            let id = self
                .at_bat_server_id
                .lock()
                .unwrap()
                .unwrap_or(request.at_bat_id);
            CreatedResponse { id }
        });
        Box::pin(async move { result })
    }

    fn update_at_bat(&self, _request: UpdateAtBatRequest) -> BoxFuture<'static, ApiResult<()>> {
        let result = self.outcome("UPDATE_AT_BAT", None);
        Box::pin(async move { result })
    }

    fn log_pitch(
        &self,
        request: LogPitchRequest,
    ) -> BoxFuture<'static, ApiResult<CreatedResponse>> {
        let result = self
            .outcome("LOG_PITCH", Some(request.sequence.to_string()))
            .map(|()| {
                self.pitch_at_bats.lock().unwrap().push(request.at_bat_id);
                CreatedResponse {
                    id: request.pitch_id,
                }
            });
        Box::pin(async move { result })
    }

    fn record_play(&self, request: RecordPlayRequest) -> BoxFuture<'static, ApiResult<()>> {
        let result = self.outcome("RECORD_PLAY", Some(format!("{:?}", request.result)));
        Box::pin(async move { result })
    }

    fn advance_inning(&self, request: AdvanceInningRequest) -> BoxFuture<'static, ApiResult<()>> {
        let result = self.outcome(
            "ADVANCE_INNING",
            Some(format!("{}+{}", request.completed_number, request.runs_scored)),
        );
        Box::pin(async move { result })
    }

    fn get_current_inning(&self, _game_id: Uuid) -> BoxFuture<'static, ApiResult<InningResponse>> {
        let result = self.outcome("GET_CURRENT_INNING", None).map(|()| InningResponse {
            id: Uuid::new_v4(),
            number: 1,
            half: crate::dao::models::InningHalf::Top,
        });
        Box::pin(async move { result })
    }

    fn change_pitcher(&self, request: ChangePitcherRequest) -> BoxFuture<'static, ApiResult<()>> {
        let result = self.outcome("CHANGE_PITCHER", Some(request.player_id.to_string()));
        Box::pin(async move { result })
    }

    fn update_score(&self, _request: UpdateScoreRequest) -> BoxFuture<'static, ApiResult<()>> {
        let result = self.outcome("UPDATE_SCORE", None);
        Box::pin(async move { result })
    }

    fn ping(&self) -> BoxFuture<'static, ApiResult<()>> {
        let result = self.outcome("PING", None);
        Box::pin(async move { result })
    }
}

/// Application state over the store at `path`, starting offline.
pub(crate) fn state_at(path: &std::path::Path, api: Arc<ScriptedApi>) -> SharedState {
    let store = RedbOfflineStore::open(path).unwrap();
    AppState::new(AppConfig::default(), Arc::new(store), api)
}

/// Fresh application state over a throwaway store, starting offline.
pub(crate) fn scripted_state(api: Arc<ScriptedApi>) -> (TempDir, SharedState) {
    let dir = TempDir::new().unwrap();
    let state = state_at(&dir.path().join("offline.redb"), api);
    (dir, state)
}

/// A queued pitch payload with the given at-bat reference and sequence.
pub(crate) fn pitch_payload(at_bat_id: Uuid, sequence: u32) -> ActionPayload {
    ActionPayload::LogPitch(LogPitchRequest {
        pitch_id: Uuid::new_v4(),
        at_bat_id,
        game_id: Uuid::new_v4(),
        pitcher_id: Uuid::new_v4(),
        outcome: PitchOutcome::Ball,
        location: None,
        target_location: None,
        velocity: None,
        sequence,
    })
}

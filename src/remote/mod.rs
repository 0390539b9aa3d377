//! Client surface for the remote system-of-record.
//!
//! The engine treats the scoring backend as an external collaborator: every
//! mutating intent maps to exactly one operation here, either called directly
//! (optimistic path) or replayed later by the sync orchestrator.

pub mod error;
pub mod http;
pub mod models;

use futures::future::BoxFuture;
use uuid::Uuid;

use self::error::ApiResult;
use self::models::{
    AdvanceInningRequest, ChangePitcherRequest, CreateAtBatRequest, CreatedResponse,
    EndGameRequest, InningResponse, LogPitchRequest, RecordPlayRequest, StartGameRequest,
    UpdateAtBatRequest, UpdateScoreRequest,
};

/// Abstraction over the remote scoring API.
///
/// All calls are request/response; idempotency rests on the client-generated
/// ids carried in each payload.
pub trait ScoreApi: Send + Sync {
    /// Register a started game.
    fn start_game(&self, request: StartGameRequest) -> BoxFuture<'static, ApiResult<()>>;
    /// Close a game.
    fn end_game(&self, request: EndGameRequest) -> BoxFuture<'static, ApiResult<()>>;
    /// Open an at-bat; returns the server-assigned id.
    fn create_at_bat(
        &self,
        request: CreateAtBatRequest,
    ) -> BoxFuture<'static, ApiResult<CreatedResponse>>;
    /// Update count/result fields on an at-bat.
    fn update_at_bat(&self, request: UpdateAtBatRequest) -> BoxFuture<'static, ApiResult<()>>;
    /// Append a pitch; returns the server-assigned id.
    fn log_pitch(&self, request: LogPitchRequest)
    -> BoxFuture<'static, ApiResult<CreatedResponse>>;
    /// Record the play that ended an at-bat.
    fn record_play(&self, request: RecordPlayRequest) -> BoxFuture<'static, ApiResult<()>>;
    /// Advance the inning marker, carrying the half-inning score.
    fn advance_inning(&self, request: AdvanceInningRequest) -> BoxFuture<'static, ApiResult<()>>;
    /// Current inning as known by the server.
    fn get_current_inning(&self, game_id: Uuid) -> BoxFuture<'static, ApiResult<InningResponse>>;
    /// Substitute the active pitcher.
    fn change_pitcher(&self, request: ChangePitcherRequest) -> BoxFuture<'static, ApiResult<()>>;
    /// Overwrite the tracked team's run total.
    fn update_score(&self, request: UpdateScoreRequest) -> BoxFuture<'static, ApiResult<()>>;
    /// Cheap reachability probe used by the network monitor.
    fn ping(&self) -> BoxFuture<'static, ApiResult<()>>;
}

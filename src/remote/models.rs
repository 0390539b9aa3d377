//! Wire payloads exchanged with the remote scoring API.
//!
//! Queued actions store these request structures verbatim, so a replayed
//! delivery sends exactly the bytes the original attempt would have sent.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::dao::models::{
    AtBatResultKind, InningHalf, LineupSlotEntity, PitchLocation, PitchOutcome,
};

/// Queue `kind` discriminant, mapped 1:1 to a remote operation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionKind {
    /// Append a pitch to an at-bat.
    LogPitch,
    /// Open a new at-bat.
    CreateAtBat,
    /// Update count/result fields on an at-bat.
    UpdateAtBat,
    /// Record the play that ended an at-bat.
    RecordPlay,
    /// Start a game.
    StartGame,
    /// End a game.
    EndGame,
    /// Advance the inning marker.
    AdvanceInning,
}

impl ActionKind {
    /// Wire name of the action kind, used for diagnostics.
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::LogPitch => "LOG_PITCH",
            ActionKind::CreateAtBat => "CREATE_AT_BAT",
            ActionKind::UpdateAtBat => "UPDATE_AT_BAT",
            ActionKind::RecordPlay => "RECORD_PLAY",
            ActionKind::StartGame => "START_GAME",
            ActionKind::EndGame => "END_GAME",
            ActionKind::AdvanceInning => "ADVANCE_INNING",
        }
    }
}

/// Tagged command carrying the exact arguments its remote operation expects.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", content = "payload")]
pub enum ActionPayload {
    /// Append a pitch to an at-bat.
    #[serde(rename = "LOG_PITCH")]
    LogPitch(LogPitchRequest),
    /// Open a new at-bat.
    #[serde(rename = "CREATE_AT_BAT")]
    CreateAtBat(CreateAtBatRequest),
    /// Update count/result fields on an at-bat.
    #[serde(rename = "UPDATE_AT_BAT")]
    UpdateAtBat(UpdateAtBatRequest),
    /// Record the play that ended an at-bat.
    #[serde(rename = "RECORD_PLAY")]
    RecordPlay(RecordPlayRequest),
    /// Start a game.
    #[serde(rename = "START_GAME")]
    StartGame(StartGameRequest),
    /// End a game.
    #[serde(rename = "END_GAME")]
    EndGame(EndGameRequest),
    /// Advance the inning marker.
    #[serde(rename = "ADVANCE_INNING")]
    AdvanceInning(AdvanceInningRequest),
}

impl ActionPayload {
    /// Discriminant of the wrapped command.
    pub fn kind(&self) -> ActionKind {
        match self {
            ActionPayload::LogPitch(_) => ActionKind::LogPitch,
            ActionPayload::CreateAtBat(_) => ActionKind::CreateAtBat,
            ActionPayload::UpdateAtBat(_) => ActionKind::UpdateAtBat,
            ActionPayload::RecordPlay(_) => ActionKind::RecordPlay,
            ActionPayload::StartGame(_) => ActionKind::StartGame,
            ActionPayload::EndGame(_) => ActionKind::EndGame,
            ActionPayload::AdvanceInning(_) => ActionKind::AdvanceInning,
        }
    }

    /// Rewrite references to a temporary at-bat id after the server assigned
    /// the real one. Returns whether the payload changed.
    ///
    /// `CREATE_AT_BAT` keeps its own id: the id in that payload is the
    /// idempotency key of the creation itself, not a reference.
    pub fn rewrite_at_bat_id(&mut self, temp: Uuid, server: Uuid) -> bool {
        let slot = match self {
            ActionPayload::LogPitch(request) => &mut request.at_bat_id,
            ActionPayload::UpdateAtBat(request) => &mut request.at_bat_id,
            ActionPayload::RecordPlay(request) => &mut request.at_bat_id,
            _ => return false,
        };

        if *slot == temp {
            *slot = server;
            true
        } else {
            false
        }
    }
}

/// Arguments for the start-game operation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StartGameRequest {
    /// Client-generated game id; doubles as the idempotency key.
    pub game_id: Uuid,
    /// Opposing team name, if recorded.
    pub opponent: Option<String>,
    /// When the game started.
    pub started_at: OffsetDateTime,
    /// Batting order, one slot per position 1..=9.
    pub lineup: Vec<LineupSlotEntity>,
    /// Pitcher starting the game.
    pub starting_pitcher_id: Uuid,
}

/// Arguments for the end-game operation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EndGameRequest {
    /// Game to close.
    pub game_id: Uuid,
    /// When the game ended.
    pub ended_at: OffsetDateTime,
}

/// Arguments for the create-at-bat operation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreateAtBatRequest {
    /// Client-generated at-bat id; doubles as the idempotency key.
    pub at_bat_id: Uuid,
    /// Game the at-bat belongs to.
    pub game_id: Uuid,
    /// Inning in which the at-bat takes place.
    pub inning_id: Uuid,
    /// Batter at the plate.
    pub batter_id: Uuid,
    /// Pitcher on the mound.
    pub pitcher_id: Uuid,
    /// Batting order position of the batter (1..=9).
    pub batting_order: u8,
    /// Outs already recorded when the at-bat opened.
    pub outs_before: u8,
}

/// Arguments for the update-at-bat operation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UpdateAtBatRequest {
    /// At-bat to update.
    pub at_bat_id: Uuid,
    /// Game the at-bat belongs to.
    pub game_id: Uuid,
    /// Balls in the final count.
    pub balls: u8,
    /// Displayed strikes in the final count.
    pub strikes: u8,
    /// Outs recorded when the at-bat resolved.
    pub outs_after: Option<u8>,
    /// Terminal result, if the at-bat resolved.
    pub result: Option<AtBatResultKind>,
}

/// Arguments for the log-pitch operation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogPitchRequest {
    /// Client-generated pitch id; doubles as the idempotency key.
    pub pitch_id: Uuid,
    /// At-bat the pitch belongs to.
    pub at_bat_id: Uuid,
    /// Game the pitch belongs to.
    pub game_id: Uuid,
    /// Pitcher who threw the pitch.
    pub pitcher_id: Uuid,
    /// What happened on the pitch.
    pub outcome: PitchOutcome,
    /// Where the pitch crossed the plate, if charted.
    pub location: Option<PitchLocation>,
    /// Where the catcher set the target, if charted.
    pub target_location: Option<PitchLocation>,
    /// Pitch velocity in mph, if measured.
    pub velocity: Option<f32>,
    /// Monotonic position within the at-bat, starting at 1.
    pub sequence: u32,
}

/// Arguments for the record-play operation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecordPlayRequest {
    /// Client-generated play id; doubles as the idempotency key.
    pub play_id: Uuid,
    /// Game the play belongs to.
    pub game_id: Uuid,
    /// At-bat the play ended.
    pub at_bat_id: Uuid,
    /// What the play was.
    pub result: AtBatResultKind,
    /// Outs the play contributed.
    pub outs_recorded: u8,
}

/// Arguments for the advance-inning operation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AdvanceInningRequest {
    /// Game whose inning marker advances.
    pub game_id: Uuid,
    /// Number of the half-inning just completed.
    pub completed_number: u8,
    /// Half the tracked team bats in.
    pub half: InningHalf,
    /// Runs scored in the completed half-inning.
    pub runs_scored: u8,
    /// Number of the next inning for the tracked team.
    pub next_number: u8,
}

/// Arguments for the change-pitcher operation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChangePitcherRequest {
    /// Game the substitution belongs to.
    pub game_id: Uuid,
    /// Incoming pitcher.
    pub player_id: Uuid,
    /// Display name for the incoming pitcher.
    pub name: String,
    /// Inning number in which the pitcher enters.
    pub inning_entered: u8,
}

/// Arguments for the update-score operation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UpdateScoreRequest {
    /// Game whose score changes.
    pub game_id: Uuid,
    /// Total runs for the tracked team.
    pub runs: u32,
}

/// Identifier assigned by the server for a created resource.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreatedResponse {
    /// Server-assigned identifier.
    pub id: Uuid,
}

/// Current inning as known by the remote system.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InningResponse {
    /// Server-side inning identifier.
    pub id: Uuid,
    /// Inning number, starting at 1.
    pub number: u8,
    /// Which half is in progress.
    pub half: InningHalf,
}

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::remote::models::ActionPayload;

/// One team's turn at batting within an inning.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InningHalf {
    /// The visiting team bats.
    Top,
    /// The home team bats.
    Bottom,
}

/// Outcome of a single pitch as entered by the scorekeeper.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PitchOutcome {
    /// Pitch taken outside the zone.
    Ball,
    /// Pitch taken inside the zone.
    CalledStrike,
    /// Swing and miss.
    SwingingStrike,
    /// Foul ball.
    Foul,
    /// Ball put in play; the at-bat resolves via a play result.
    InPlay,
    /// Batter hit by the pitch.
    HitByPitch,
}

/// Terminal result assigned to an at-bat.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AtBatResultKind {
    /// One-base hit.
    Single,
    /// Two-base hit.
    Double,
    /// Three-base hit.
    Triple,
    /// Four-base hit.
    HomeRun,
    /// Four balls; batter awarded first base.
    Walk,
    /// Batter awarded first base after being hit.
    HitByPitch,
    /// Batter reached on a fielding error.
    ReachedOnError,
    /// Third strike recorded.
    Strikeout,
    /// Ground ball out.
    Groundout,
    /// Fly ball out.
    Flyout,
    /// Line drive out.
    Lineout,
    /// Pop fly out.
    Popout,
    /// Two outs recorded on one play.
    DoublePlay,
    /// Three outs recorded on one play.
    TriplePlay,
    /// Runner retired while the batter reaches.
    FieldersChoice,
    /// Force out on a leading runner.
    ForceOut,
    /// Runner tagged out.
    TagOut,
    /// Runner caught stealing during the at-bat.
    CaughtStealing,
    /// Fly out that scores a runner.
    SacrificeFly,
    /// Bunt out that advances a runner.
    SacrificeBunt,
}

/// Normalized plate coordinates for a pitch location.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PitchLocation {
    /// Horizontal position, catcher's view, 0.0 = left edge.
    pub x: f32,
    /// Vertical position, 0.0 = bottom of the zone.
    pub y: f32,
}

/// Lineup slot persisted with the game, keyed by batting order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LineupSlotEntity {
    /// Stable identifier of the player filling the slot.
    pub player_id: Uuid,
    /// Display name for the player.
    pub name: String,
    /// Batting order position (1..=9).
    pub order: u8,
}

/// One pitcher's stretch on the mound.
///
/// Exactly one tenure per game has `exited_inning == None` at any time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PitcherTenureEntity {
    /// Stable identifier of the pitcher.
    pub player_id: Uuid,
    /// Display name for the pitcher.
    pub name: String,
    /// Inning number in which the pitcher entered.
    pub entered_inning: u8,
    /// Inning number in which the pitcher exited, unset while active.
    pub exited_inning: Option<u8>,
}

/// Inning marker persisted with the game.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InningEntity {
    /// Stable identifier for the inning.
    pub id: Uuid,
    /// Game this inning belongs to.
    pub game_id: Uuid,
    /// Inning number, starting at 1.
    pub number: u8,
    /// Which half of the inning the tracked team bats in.
    pub half: InningHalf,
}

/// One batter's plate appearance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AtBatEntity {
    /// Identifier (server id, or temporary local id until confirmed).
    pub id: Uuid,
    /// Game this at-bat belongs to.
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
    /// Outs recorded when the at-bat resolved, unset while open.
    pub outs_after: Option<u8>,
    /// Balls in the current count.
    pub balls: u8,
    /// Displayed strikes in the current count.
    pub strikes: u8,
    /// Terminal result, unset while the at-bat is open.
    pub result: Option<AtBatResultKind>,
}

/// Immutable pitch record, ordered by `sequence` within its at-bat.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PitchEventEntity {
    /// Identifier (server id, or temporary local id until confirmed).
    pub id: Uuid,
    /// At-bat this pitch belongs to.
    pub at_bat_id: Uuid,
    /// Game this pitch belongs to.
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
    /// When the pitch was recorded locally.
    pub created_at: OffsetDateTime,
}

/// Aggregate game entity persisted by the storage layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GameEntity {
    /// Primary key of the game.
    pub id: Uuid,
    /// Opposing team name, if recorded.
    pub opponent: Option<String>,
    /// Creation timestamp for auditing/debugging.
    pub created_at: OffsetDateTime,
    /// Last time the game entity was updated.
    pub updated_at: OffsetDateTime,
    /// Batting order, one slot per position 1..=9.
    pub lineup: Vec<LineupSlotEntity>,
    /// Batting order position due up next (1..=9).
    pub batting_pointer: u8,
    /// Inning currently in progress.
    pub inning: InningEntity,
    /// Outs recorded in the current half-inning (0..=2 while in progress).
    pub outs: u8,
    /// Runs scored by the tracked team.
    pub runs: u32,
    /// Pitching history; the entry without an exit inning is active.
    pub pitchers: Vec<PitcherTenureEntity>,
    /// The at-bat currently open, if any.
    pub open_at_bat: Option<AtBatEntity>,
}

/// Cached snapshot of the derived live state, rebuilt on load.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GameStateEntity {
    /// Game the snapshot belongs to.
    pub game_id: Uuid,
    /// Active pitcher at snapshot time.
    pub current_pitcher_id: Option<Uuid>,
    /// Batter due up or at the plate at snapshot time.
    pub current_batter_id: Option<Uuid>,
    /// Batting order position due up (1..=9).
    pub batting_pointer: u8,
    /// Outs recorded in the current half-inning.
    pub outs: u8,
    /// Pitch buffer for the open at-bat, so the count survives a restart.
    pub pitch_events: Vec<PitchEventEntity>,
    /// Last time the snapshot was written.
    pub updated_at: OffsetDateTime,
}

/// Durable row for a mutating intent awaiting remote delivery.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PendingActionEntity {
    /// Locally generated unique identifier.
    pub id: Uuid,
    /// The queued command, tagged by action kind.
    pub action: ActionPayload,
    /// Enqueue timestamp; the queue drains in this order.
    pub created_at: OffsetDateTime,
    /// Delivery attempts so far; monotonically non-decreasing.
    pub retry_count: u32,
    /// Message from the most recent failed attempt.
    pub last_error: Option<String>,
    /// Timestamp of the most recent attempt.
    pub last_attempt_at: Option<OffsetDateTime>,
}

impl PendingActionEntity {
    /// Wrap a command into a fresh queue row.
    pub fn new(action: ActionPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            action,
            created_at: OffsetDateTime::now_utc(),
            retry_count: 0,
            last_error: None,
            last_attempt_at: None,
        }
    }
}

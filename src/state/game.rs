use indexmap::IndexMap;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::dao::models::{
    AtBatEntity, AtBatResultKind, GameEntity, GameStateEntity, InningEntity, InningHalf,
    LineupSlotEntity, PitchEventEntity, PitchLocation, PitchOutcome, PitcherTenureEntity,
};

/// Number of batting order positions; the pointer wraps from 9 back to 1.
pub const LINEUP_SIZE: u8 = 9;

/// One slot in the batting order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineupSlot {
    /// Stable identifier of the player filling the slot.
    pub player_id: Uuid,
    /// Display name for the player.
    pub name: String,
    /// Batting order position (1..=9).
    pub order: u8,
}

/// One pitcher's stretch on the mound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PitcherTenure {
    /// Stable identifier of the pitcher.
    pub player_id: Uuid,
    /// Display name for the pitcher.
    pub name: String,
    /// Inning number in which the pitcher entered.
    pub entered_inning: u8,
    /// Inning number in which the pitcher exited, unset while active.
    pub exited_inning: Option<u8>,
}

impl PitcherTenure {
    /// Whether this tenure is still on the mound.
    pub fn is_active(&self) -> bool {
        self.exited_inning.is_none()
    }
}

/// Inning marker for the tracked team's offense.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inning {
    /// Stable identifier for the inning.
    pub id: Uuid,
    /// Game this inning belongs to.
    pub game_id: Uuid,
    /// Inning number, starting at 1.
    pub number: u8,
    /// Which half the tracked team bats in.
    pub half: InningHalf,
}

impl Inning {
    /// First inning of a game for a team batting in the given half.
    pub fn first(game_id: Uuid, half: InningHalf) -> Self {
        Self {
            id: Uuid::new_v4(),
            game_id,
            number: 1,
            half,
        }
    }

    /// Next inning for the same offense.
    ///
    /// The marker moves two half-steps: the opposing half is skipped because
    /// only one team's offense is tracked per session, so the half stays
    /// fixed while the number advances.
    pub fn advance_two_halves(&self) -> Self {
        Self {
            id: Uuid::new_v4(),
            game_id: self.game_id,
            number: self.number + 1,
            half: self.half,
        }
    }
}

/// One batter's plate appearance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtBat {
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

impl AtBat {
    /// Open a fresh at-bat with a zero count and a temporary local id.
    pub fn open(inning: &Inning, batter: &LineupSlot, pitcher_id: Uuid, outs_before: u8) -> Self {
        Self {
            id: Uuid::new_v4(),
            game_id: inning.game_id,
            inning_id: inning.id,
            batter_id: batter.player_id,
            pitcher_id,
            batting_order: batter.order,
            outs_before,
            outs_after: None,
            balls: 0,
            strikes: 0,
            result: None,
        }
    }
}

/// Immutable pitch record, ordered by `sequence` within its at-bat.
#[derive(Debug, Clone, PartialEq)]
pub struct PitchEvent {
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

/// Derived snapshot of what the scoreboard shows right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveGameState {
    /// Active pitcher, if a game is in progress.
    pub current_pitcher_id: Option<Uuid>,
    /// Batter due up or at the plate.
    pub current_batter_id: Option<Uuid>,
    /// Batting order position due up (1..=9).
    pub batting_pointer: u8,
    /// Outs recorded in the current half-inning.
    pub outs: u8,
}

/// Aggregated state for an in-progress game session.
#[derive(Debug, Clone, PartialEq)]
pub struct GameSession {
    /// Primary key of the game.
    pub id: Uuid,
    /// Opposing team name, if recorded.
    pub opponent: Option<String>,
    /// Creation timestamp for auditing/debugging.
    pub created_at: OffsetDateTime,
    /// Last time the session was updated.
    pub updated_at: OffsetDateTime,
    /// Batting order keyed by position (1..=9), iteration order preserved.
    pub lineup: IndexMap<u8, LineupSlot>,
    /// Batting order position due up next (1..=9).
    pub batting_pointer: u8,
    /// Inning currently in progress.
    pub inning: Inning,
    /// Outs recorded in the current half-inning (0..=2 while in progress).
    pub outs: u8,
    /// Runs scored by the tracked team.
    pub runs: u32,
    /// Pitching history; the entry without an exit inning is active.
    pub pitchers: Vec<PitcherTenure>,
    /// The at-bat currently open, if any.
    pub open_at_bat: Option<AtBat>,
}

impl GameSession {
    /// Build a new in-memory session with the provided lineup and starter.
    pub fn new(
        opponent: Option<String>,
        half: InningHalf,
        lineup: Vec<LineupSlot>,
        starting_pitcher: PitcherTenure,
    ) -> Self {
        let timestamp = OffsetDateTime::now_utc();
        let id = Uuid::new_v4();

        let lineup = lineup
            .into_iter()
            .map(|slot| (slot.order, slot))
            .collect::<IndexMap<_, _>>();

        Self {
            id,
            opponent,
            created_at: timestamp,
            updated_at: timestamp,
            lineup,
            batting_pointer: 1,
            inning: Inning::first(id, half),
            outs: 0,
            runs: 0,
            pitchers: vec![starting_pitcher],
            open_at_bat: None,
        }
    }

    /// The tenure currently on the mound.
    pub fn active_pitcher(&self) -> Option<&PitcherTenure> {
        self.pitchers.iter().find(|tenure| tenure.is_active())
    }

    /// The lineup slot the pointer currently designates.
    pub fn current_batter(&self) -> Option<&LineupSlot> {
        self.lineup.get(&self.batting_pointer)
    }

    /// Move the pointer to the next slot, wrapping from 9 back to 1.
    pub fn advance_batting_pointer(&mut self) {
        self.batting_pointer = if self.batting_pointer >= LINEUP_SIZE {
            1
        } else {
            self.batting_pointer + 1
        };
    }

    /// Snapshot the derived live state.
    pub fn live_state(&self) -> LiveGameState {
        LiveGameState {
            current_pitcher_id: self.active_pitcher().map(|tenure| tenure.player_id),
            current_batter_id: self
                .open_at_bat
                .as_ref()
                .map(|at_bat| at_bat.batter_id)
                .or_else(|| self.current_batter().map(|slot| slot.player_id)),
            batting_pointer: self.batting_pointer,
            outs: self.outs,
        }
    }

    /// Stamp the session as updated now.
    pub fn touch(&mut self) {
        self.updated_at = OffsetDateTime::now_utc();
    }

    /// Build the cached live-state row, bundling the open at-bat's pitch
    /// buffer so the count survives a restart.
    pub fn state_entity(&self, pitch_events: Vec<PitchEventEntity>) -> GameStateEntity {
        let live = self.live_state();
        GameStateEntity {
            game_id: self.id,
            current_pitcher_id: live.current_pitcher_id,
            current_batter_id: live.current_batter_id,
            batting_pointer: live.batting_pointer,
            outs: live.outs,
            pitch_events,
            updated_at: OffsetDateTime::now_utc(),
        }
    }
}

impl From<LineupSlotEntity> for LineupSlot {
    fn from(value: LineupSlotEntity) -> Self {
        Self {
            player_id: value.player_id,
            name: value.name,
            order: value.order,
        }
    }
}

impl From<LineupSlot> for LineupSlotEntity {
    fn from(value: LineupSlot) -> Self {
        Self {
            player_id: value.player_id,
            name: value.name,
            order: value.order,
        }
    }
}

impl From<PitcherTenureEntity> for PitcherTenure {
    fn from(value: PitcherTenureEntity) -> Self {
        Self {
            player_id: value.player_id,
            name: value.name,
            entered_inning: value.entered_inning,
            exited_inning: value.exited_inning,
        }
    }
}

impl From<PitcherTenure> for PitcherTenureEntity {
    fn from(value: PitcherTenure) -> Self {
        Self {
            player_id: value.player_id,
            name: value.name,
            entered_inning: value.entered_inning,
            exited_inning: value.exited_inning,
        }
    }
}

impl From<InningEntity> for Inning {
    fn from(value: InningEntity) -> Self {
        Self {
            id: value.id,
            game_id: value.game_id,
            number: value.number,
            half: value.half,
        }
    }
}

impl From<Inning> for InningEntity {
    fn from(value: Inning) -> Self {
        Self {
            id: value.id,
            game_id: value.game_id,
            number: value.number,
            half: value.half,
        }
    }
}

impl From<AtBatEntity> for AtBat {
    fn from(value: AtBatEntity) -> Self {
        Self {
            id: value.id,
            game_id: value.game_id,
            inning_id: value.inning_id,
            batter_id: value.batter_id,
            pitcher_id: value.pitcher_id,
            batting_order: value.batting_order,
            outs_before: value.outs_before,
            outs_after: value.outs_after,
            balls: value.balls,
            strikes: value.strikes,
            result: value.result,
        }
    }
}

impl From<AtBat> for AtBatEntity {
    fn from(value: AtBat) -> Self {
        Self {
            id: value.id,
            game_id: value.game_id,
            inning_id: value.inning_id,
            batter_id: value.batter_id,
            pitcher_id: value.pitcher_id,
            batting_order: value.batting_order,
            outs_before: value.outs_before,
            outs_after: value.outs_after,
            balls: value.balls,
            strikes: value.strikes,
            result: value.result,
        }
    }
}

impl From<PitchEventEntity> for PitchEvent {
    fn from(value: PitchEventEntity) -> Self {
        Self {
            id: value.id,
            at_bat_id: value.at_bat_id,
            game_id: value.game_id,
            pitcher_id: value.pitcher_id,
            outcome: value.outcome,
            location: value.location,
            target_location: value.target_location,
            velocity: value.velocity,
            sequence: value.sequence,
            created_at: value.created_at,
        }
    }
}

impl From<PitchEvent> for PitchEventEntity {
    fn from(value: PitchEvent) -> Self {
        Self {
            id: value.id,
            at_bat_id: value.at_bat_id,
            game_id: value.game_id,
            pitcher_id: value.pitcher_id,
            outcome: value.outcome,
            location: value.location,
            target_location: value.target_location,
            velocity: value.velocity,
            sequence: value.sequence,
            created_at: value.created_at,
        }
    }
}

impl From<GameEntity> for GameSession {
    fn from(value: GameEntity) -> Self {
        Self {
            id: value.id,
            opponent: value.opponent,
            created_at: value.created_at,
            updated_at: value.updated_at,
            lineup: value
                .lineup
                .into_iter()
                .map(|slot| (slot.order, slot.into()))
                .collect(),
            batting_pointer: value.batting_pointer,
            inning: value.inning.into(),
            outs: value.outs,
            runs: value.runs,
            pitchers: value.pitchers.into_iter().map(Into::into).collect(),
            open_at_bat: value.open_at_bat.map(Into::into),
        }
    }
}

impl From<GameSession> for GameEntity {
    fn from(value: GameSession) -> Self {
        Self {
            id: value.id,
            opponent: value.opponent,
            created_at: value.created_at,
            updated_at: value.updated_at,
            lineup: value
                .lineup
                .into_iter()
                .map(|(_, slot)| slot.into())
                .collect(),
            batting_pointer: value.batting_pointer,
            inning: value.inning.into(),
            outs: value.outs,
            runs: value.runs,
            pitchers: value.pitchers.into_iter().map(Into::into).collect(),
            open_at_bat: value.open_at_bat.map(Into::into),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(order: u8) -> LineupSlot {
        LineupSlot {
            player_id: Uuid::new_v4(),
            name: format!("Player {order}"),
            order,
        }
    }

    fn session() -> GameSession {
        let lineup = (1..=LINEUP_SIZE).map(slot).collect();
        let starter = PitcherTenure {
            player_id: Uuid::new_v4(),
            name: "Starter".into(),
            entered_inning: 1,
            exited_inning: None,
        };
        GameSession::new(Some("Ravens".into()), InningHalf::Top, lineup, starter)
    }

    #[test]
    fn batting_pointer_wraps_from_nine_to_one() {
        let mut game = session();
        game.batting_pointer = 9;
        game.advance_batting_pointer();
        assert_eq!(game.batting_pointer, 1);

        game.advance_batting_pointer();
        assert_eq!(game.batting_pointer, 2);
    }

    #[test]
    fn inning_advance_skips_the_opposing_half() {
        let game = session();
        let next = game.inning.advance_two_halves();
        assert_eq!(next.number, game.inning.number + 1);
        assert_eq!(next.half, game.inning.half);
        assert_ne!(next.id, game.inning.id);
    }

    #[test]
    fn active_pitcher_is_the_tenure_without_an_exit() {
        let mut game = session();
        let starter_id = game.pitchers[0].player_id;
        assert_eq!(game.active_pitcher().unwrap().player_id, starter_id);

        game.pitchers[0].exited_inning = Some(4);
        let reliever = PitcherTenure {
            player_id: Uuid::new_v4(),
            name: "Reliever".into(),
            entered_inning: 4,
            exited_inning: None,
        };
        game.pitchers.push(reliever.clone());
        assert_eq!(game.active_pitcher().unwrap().player_id, reliever.player_id);
    }

    #[test]
    fn session_round_trips_through_its_entity() {
        let mut game = session();
        let batter = game.current_batter().unwrap().clone();
        game.open_at_bat = Some(AtBat::open(
            &game.inning,
            &batter,
            game.pitchers[0].player_id,
            1,
        ));

        let entity: GameEntity = game.clone().into();
        let back: GameSession = entity.into();
        assert_eq!(back, game);
    }

    #[test]
    fn live_state_prefers_the_open_at_bat_batter() {
        let mut game = session();
        assert_eq!(
            game.live_state().current_batter_id,
            game.current_batter().map(|slot| slot.player_id)
        );

        let batter = game.lineup.get(&3).unwrap().clone();
        game.open_at_bat = Some(AtBat::open(
            &game.inning,
            &batter,
            game.pitchers[0].player_id,
            0,
        ));
        assert_eq!(game.live_state().current_batter_id, Some(batter.player_id));
    }
}

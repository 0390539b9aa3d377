//! Game and at-bat lifecycle: opening at-bats, logging pitches, resolving
//! results, and the derived walk/strikeout/inning transitions.
//!
//! Every mutating intent applies to local state first, then rides the
//! optimistic dispatch path; pitch-by-pitch entry never waits on the network.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;
use validator::Validate;

use crate::dao::models::{
    AtBatResultKind, GameEntity, InningHalf, PitchLocation, PitchOutcome,
};
use crate::error::ServiceError;
use crate::remote::models::{
    ActionPayload, CreateAtBatRequest, EndGameRequest, LogPitchRequest, RecordPlayRequest,
    StartGameRequest, UpdateAtBatRequest,
};
use crate::services::sync_service::submit_action;
use crate::state::SharedState;
use crate::state::count::{derive_count, outs_contributed};
use crate::state::game::{
    AtBat, GameSession, LINEUP_SIZE, LineupSlot, PitchEvent, PitcherTenure,
};
use crate::state::state_machine::{GameEvent, GamePhase, GameStateMachine, PlayPhase};

/// Request to start scoring a new game.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct StartGameInput {
    /// Opposing team name, if recorded.
    pub opponent: Option<String>,
    /// Which half the tracked team bats in.
    #[serde(default = "default_half")]
    pub half: InningHalf,
    /// Batting order, exactly one slot per position 1..=9.
    #[validate(
        length(min = 9, max = 9, message = "lineup must have exactly nine slots"),
        nested
    )]
    pub lineup: Vec<LineupSlotInput>,
    /// Pitcher starting the game.
    #[validate(nested)]
    pub starting_pitcher: PitcherInput,
}

fn default_half() -> InningHalf {
    InningHalf::Top
}

/// One lineup slot in a start-game request.
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct LineupSlotInput {
    /// Player filling the slot.
    pub player_id: Uuid,
    /// Display name for the player.
    #[validate(length(min = 1, message = "player name must not be empty"))]
    pub name: String,
    /// Batting order position.
    #[validate(range(min = 1, max = 9, message = "batting order must be within 1..=9"))]
    pub order: u8,
}

/// Pitcher selection in a start-game or substitution request.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PitcherInput {
    /// Selected player.
    pub player_id: Uuid,
    /// Display name for the pitcher.
    #[validate(length(min = 1, message = "pitcher name must not be empty"))]
    pub name: String,
}

/// One pitch as entered by the scorekeeper.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PitchInput {
    /// What happened on the pitch.
    pub outcome: PitchOutcome,
    /// Where the pitch crossed the plate, if charted.
    pub location: Option<PitchLocation>,
    /// Where the catcher set the target, if charted.
    pub target_location: Option<PitchLocation>,
    /// Pitch velocity in mph, if measured.
    #[validate(range(min = 30.0, max = 110.0, message = "velocity out of plausible range"))]
    pub velocity: Option<f32>,
}

/// Summary of the session returned by game-level operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameSummary {
    /// Primary key of the game.
    pub id: Uuid,
    /// Opposing team name, if recorded.
    pub opponent: Option<String>,
    /// Inning number in progress.
    pub inning_number: u8,
    /// Which half the tracked team bats in.
    pub half: InningHalf,
    /// Outs recorded in the current half-inning.
    pub outs: u8,
    /// Runs scored by the tracked team.
    pub runs: u32,
    /// Batting order position due up (1..=9).
    pub batting_pointer: u8,
}

impl From<&GameSession> for GameSummary {
    fn from(game: &GameSession) -> Self {
        Self {
            id: game.id,
            opponent: game.opponent.clone(),
            inning_number: game.inning.number,
            half: game.inning.half,
            outs: game.outs,
            runs: game.runs,
            batting_pointer: game.batting_pointer,
        }
    }
}

/// Effect of a resolved at-bat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolutionView {
    /// Result the at-bat closed with.
    pub result: AtBatResultKind,
    /// Outs after the resolution (capped at 3).
    pub outs_after: u8,
    /// Whether the resolution completed the half-inning.
    pub inning_over: bool,
    /// Batter of the automatically opened next at-bat, if any.
    pub next_batter_id: Option<Uuid>,
}

/// Count after a logged pitch, plus the resolution it forced, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PitchView {
    /// Balls after the pitch.
    pub balls: u8,
    /// Displayed strikes after the pitch (capped at 2).
    pub strikes: u8,
    /// Walk/strikeout resolution derived from the new count.
    pub resolution: Option<ResolutionView>,
}

/// Bootstrap a fresh game during the idle state.
pub async fn start_game(
    state: &SharedState,
    input: StartGameInput,
) -> Result<GameSummary, ServiceError> {
    input.validate()?;
    let _gate = state.mutation_gate().lock().await;

    let session = build_session(input)?;
    state.apply_game_event(GameEvent::StartGame).await?;

    let request = StartGameRequest {
        game_id: session.id,
        opponent: session.opponent.clone(),
        started_at: session.created_at,
        lineup: session
            .lineup
            .values()
            .cloned()
            .map(Into::into)
            .collect(),
        starting_pitcher_id: session.pitchers[0].player_id,
    };
    let summary = GameSummary::from(&session);

    {
        let mut slot = state.current_game().write().await;
        *slot = Some(session);
    }

    persist_session(state).await?;
    submit_action(state, ActionPayload::StartGame(request)).await?;

    Ok(summary)
}

/// Open the at-bat for the batter the lineup pointer designates.
///
/// Preconditions (a selected batter, an active pitcher, a resolved inning)
/// fail fast with [`ServiceError::Precondition`]; nothing is queued.
pub async fn start_at_bat(state: &SharedState) -> Result<AtBat, ServiceError> {
    let _gate = state.mutation_gate().lock().await;
    open_at_bat_locked(state).await
}

/// Record a pitch against the open at-bat and re-derive the count.
///
/// Ball four and strike three resolve the at-bat automatically; the forced
/// resolution is reported alongside the count.
pub async fn log_pitch(state: &SharedState, input: PitchInput) -> Result<PitchView, ServiceError> {
    input.validate()?;
    let _gate = state.mutation_gate().lock().await;

    ensure_play_phase(state, PlayPhase::AtBat).await?;

    let (request, count) = {
        let mut guard = state.current_game().write().await;
        let game = guard
            .as_mut()
            .ok_or_else(|| ServiceError::InvalidState("no game in progress".into()))?;
        let at_bat = game
            .open_at_bat
            .as_mut()
            .ok_or_else(|| ServiceError::InvalidState("no open at-bat".into()))?;

        let sequence = state.pitch_events(at_bat.id).len() as u32 + 1;
        let event = PitchEvent {
            id: Uuid::new_v4(),
            at_bat_id: at_bat.id,
            game_id: game.id,
            pitcher_id: at_bat.pitcher_id,
            outcome: input.outcome,
            location: input.location,
            target_location: input.target_location,
            velocity: input.velocity,
            sequence,
            created_at: OffsetDateTime::now_utc(),
        };
        state.append_pitch(event.clone());

        let count = derive_count(&state.pitch_events(at_bat.id));
        at_bat.balls = count.balls;
        at_bat.strikes = count.displayed_strikes();
        game.touch();

        let request = LogPitchRequest {
            pitch_id: event.id,
            at_bat_id: event.at_bat_id,
            game_id: event.game_id,
            pitcher_id: event.pitcher_id,
            outcome: event.outcome,
            location: event.location,
            target_location: event.target_location,
            velocity: event.velocity,
            sequence: event.sequence,
        };
        (request, count)
    };

    persist_session(state).await?;
    submit_action(state, ActionPayload::LogPitch(request)).await?;

    let resolution = match count.auto_resolution() {
        Some(auto) => Some(resolve_at_bat_locked(state, auto.result_kind()).await?),
        None => None,
    };

    Ok(PitchView {
        balls: count.balls,
        strikes: count.displayed_strikes(),
        resolution,
    })
}

/// Close the open at-bat with an explicit result.
pub async fn resolve_at_bat(
    state: &SharedState,
    result: AtBatResultKind,
) -> Result<ResolutionView, ServiceError> {
    let _gate = state.mutation_gate().lock().await;
    resolve_at_bat_locked(state, result).await
}

/// End the game from any in-progress phase.
pub async fn end_game(state: &SharedState) -> Result<(), ServiceError> {
    let _gate = state.mutation_gate().lock().await;

    state.apply_game_event(GameEvent::EndGame).await?;

    let request = {
        let mut guard = state.current_game().write().await;
        let game = guard
            .as_mut()
            .ok_or_else(|| ServiceError::InvalidState("no game in progress".into()))?;
        if let Some(at_bat) = game.open_at_bat.take() {
            state.take_pitch_events(at_bat.id);
        }
        game.touch();
        EndGameRequest {
            game_id: game.id,
            ended_at: OffsetDateTime::now_utc(),
        }
    };

    persist_session(state).await?;
    submit_action(state, ActionPayload::EndGame(request)).await?;
    Ok(())
}

/// Restore a cached game into the live state, rebuilding the derived count
/// from the persisted pitch buffer.
pub async fn load_game(state: &SharedState, id: Uuid) -> Result<GameSummary, ServiceError> {
    let _gate = state.mutation_gate().lock().await;

    if state.phase().await != GamePhase::Idle {
        return Err(ServiceError::InvalidState(
            "a game is already being scored".into(),
        ));
    }

    let store = state.store();
    let Some(entity) = store.load_cached_game(id).await? else {
        return Err(ServiceError::NotFound(format!("game `{id}` not found")));
    };
    let session: GameSession = entity.into();

    if let Some(cached) = store.load_game_state(id).await?
        && let Some(at_bat) = session.open_at_bat.as_ref()
    {
        let events = cached
            .pitch_events
            .into_iter()
            .map(Into::into)
            .collect::<Vec<PitchEvent>>();
        state.restore_pitch_events(at_bat.id, events);
    }

    let phase = if session.open_at_bat.is_some() {
        GamePhase::InProgress(PlayPhase::AtBat)
    } else if session.outs >= 3 {
        GamePhase::InProgress(PlayPhase::InningBreak)
    } else {
        GamePhase::InProgress(PlayPhase::BetweenBatters)
    };
    state
        .install_state_machine(GameStateMachine::restore(phase))
        .await;

    let summary = GameSummary::from(&session);
    {
        let mut slot = state.current_game().write().await;
        *slot = Some(session);
    }

    Ok(summary)
}

/// Persist the current session and its derived live state to the cache
/// tables. A session must exist.
pub(crate) async fn persist_session(state: &SharedState) -> Result<(), ServiceError> {
    let snapshot = {
        let guard = state.current_game().read().await;
        guard.as_ref().map(|game| {
            let events = game
                .open_at_bat
                .as_ref()
                .map(|at_bat| state.pitch_events(at_bat.id))
                .unwrap_or_default()
                .into_iter()
                .map(Into::into)
                .collect();
            (GameEntity::from(game.clone()), game.state_entity(events))
        })
    };

    if let Some((game_entity, state_entity)) = snapshot {
        let store = state.store();
        store.save_cached_game(game_entity).await?;
        store.save_game_state(state_entity).await?;
    }
    Ok(())
}

async fn ensure_play_phase(state: &SharedState, expected: PlayPhase) -> Result<(), ServiceError> {
    let phase = state.phase().await;
    if phase != GamePhase::InProgress(expected) {
        return Err(ServiceError::InvalidState(format!(
            "operation requires {expected:?}, but the game is in {phase:?}"
        )));
    }
    Ok(())
}

fn build_session(input: StartGameInput) -> Result<GameSession, ServiceError> {
    let StartGameInput {
        opponent,
        half,
        lineup,
        starting_pitcher,
    } = input;

    let mut seen_orders = HashSet::new();
    let lineup = lineup
        .into_iter()
        .map(|slot| {
            if !seen_orders.insert(slot.order) {
                return Err(ServiceError::Precondition(format!(
                    "duplicate batting order position {}",
                    slot.order
                )));
            }
            Ok(LineupSlot {
                player_id: slot.player_id,
                name: slot.name,
                order: slot.order,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    for order in 1..=LINEUP_SIZE {
        if !seen_orders.contains(&order) {
            return Err(ServiceError::Precondition(format!(
                "lineup is missing batting order position {order}"
            )));
        }
    }

    let starter = PitcherTenure {
        player_id: starting_pitcher.player_id,
        name: starting_pitcher.name,
        entered_inning: 1,
        exited_inning: None,
    };

    Ok(GameSession::new(opponent, half, lineup, starter))
}

/// Open the next at-bat; assumes the mutation gate is held.
async fn open_at_bat_locked(state: &SharedState) -> Result<AtBat, ServiceError> {
    ensure_play_phase(state, PlayPhase::BetweenBatters).await?;

    let (at_bat, request) = {
        let mut guard = state.current_game().write().await;
        let game = guard
            .as_mut()
            .ok_or_else(|| ServiceError::Precondition("no game in progress".into()))?;
        let batter = game.current_batter().cloned().ok_or_else(|| {
            ServiceError::Precondition(format!(
                "no batter at lineup position {}",
                game.batting_pointer
            ))
        })?;
        let pitcher = game
            .active_pitcher()
            .cloned()
            .ok_or_else(|| ServiceError::Precondition("no active pitcher selected".into()))?;

        state.apply_game_event(GameEvent::AtBatOpened).await?;

        let at_bat = AtBat::open(&game.inning, &batter, pitcher.player_id, game.outs);
        game.open_at_bat = Some(at_bat.clone());
        game.touch();

        let request = CreateAtBatRequest {
            at_bat_id: at_bat.id,
            game_id: game.id,
            inning_id: at_bat.inning_id,
            batter_id: at_bat.batter_id,
            pitcher_id: at_bat.pitcher_id,
            batting_order: at_bat.batting_order,
            outs_before: at_bat.outs_before,
        };
        (at_bat, request)
    };

    persist_session(state).await?;
    submit_action(state, ActionPayload::CreateAtBat(request)).await?;

    Ok(at_bat)
}

/// Resolve the open at-bat; assumes the mutation gate is held.
async fn resolve_at_bat_locked(
    state: &SharedState,
    result: AtBatResultKind,
) -> Result<ResolutionView, ServiceError> {
    ensure_play_phase(state, PlayPhase::AtBat).await?;

    let mut dispatches = Vec::new();
    let view = {
        let mut guard = state.current_game().write().await;
        let game = guard
            .as_mut()
            .ok_or_else(|| ServiceError::InvalidState("no game in progress".into()))?;
        let mut at_bat = game
            .open_at_bat
            .take()
            .ok_or_else(|| ServiceError::InvalidState("no open at-bat".into()))?;

        let contributed = outs_contributed(result);
        let outs_after = (at_bat.outs_before + contributed).min(3);
        let inning_over = outs_after >= 3;

        // The event buffer is cleared here; the resolved count is final.
        let events = state.take_pitch_events(at_bat.id);
        let count = derive_count(&events);
        at_bat.balls = count.balls;
        at_bat.strikes = count.displayed_strikes();
        at_bat.outs_after = Some(outs_after);
        at_bat.result = Some(result);

        game.outs = outs_after;
        game.advance_batting_pointer();

        state
            .apply_game_event(GameEvent::AtBatResolved { inning_over })
            .await?;

        dispatches.push(ActionPayload::RecordPlay(RecordPlayRequest {
            play_id: Uuid::new_v4(),
            game_id: game.id,
            at_bat_id: at_bat.id,
            result,
            outs_recorded: contributed,
        }));
        dispatches.push(ActionPayload::UpdateAtBat(UpdateAtBatRequest {
            at_bat_id: at_bat.id,
            game_id: game.id,
            balls: at_bat.balls,
            strikes: at_bat.strikes,
            outs_after: Some(outs_after),
            result: Some(result),
        }));

        let mut next_batter_id = None;
        if !inning_over {
            let batter = game.current_batter().cloned().ok_or_else(|| {
                ServiceError::Precondition(format!(
                    "no batter at lineup position {}",
                    game.batting_pointer
                ))
            })?;
            let pitcher_id = at_bat.pitcher_id;

            state.apply_game_event(GameEvent::AtBatOpened).await?;

            let next = AtBat::open(&game.inning, &batter, pitcher_id, outs_after);
            next_batter_id = Some(batter.player_id);
            dispatches.push(ActionPayload::CreateAtBat(CreateAtBatRequest {
                at_bat_id: next.id,
                game_id: game.id,
                inning_id: next.inning_id,
                batter_id: next.batter_id,
                pitcher_id: next.pitcher_id,
                batting_order: next.batting_order,
                outs_before: next.outs_before,
            }));
            game.open_at_bat = Some(next);
        }

        game.touch();

        ResolutionView {
            result,
            outs_after,
            inning_over,
            next_batter_id,
        }
    };

    persist_session(state).await?;
    for payload in dispatches {
        submit_action(state, payload).await?;
    }

    Ok(view)
}

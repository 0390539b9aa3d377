//! Inning advancement after the third out.
//!
//! The break between half-innings blocks new at-bats until the runs for the
//! completed half are entered; the advance then rides the same queue path as
//! every other mutation.

use crate::dao::models::InningHalf;
use crate::error::ServiceError;
use crate::remote::models::{ActionPayload, AdvanceInningRequest};
use crate::services::scoring_service::persist_session;
use crate::services::sync_service::submit_action;
use crate::state::SharedState;
use crate::state::state_machine::{GameEvent, GamePhase, PlayPhase};

/// Session state after an inning advance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InningView {
    /// Inning number now in progress.
    pub number: u8,
    /// Which half the tracked team bats in.
    pub half: InningHalf,
    /// Outs in the fresh half-inning (always 0).
    pub outs: u8,
    /// Run total for the tracked team after the score delta.
    pub runs_total: u32,
}

/// Record the runs scored in the completed half-inning and advance the
/// marker.
///
/// The marker moves two half-steps (the opposing half is not tracked), outs
/// reset to 0, and the batting order resumes at the pointer left by the last
/// resolution.
pub async fn complete_inning(
    state: &SharedState,
    runs_scored: u8,
) -> Result<InningView, ServiceError> {
    let _gate = state.mutation_gate().lock().await;

    let phase = state.phase().await;
    if phase != GamePhase::InProgress(PlayPhase::InningBreak) {
        return Err(ServiceError::InvalidState(format!(
            "inning can only advance during the break, but the game is in {phase:?}"
        )));
    }

    let (request, view) = {
        let mut guard = state.current_game().write().await;
        let game = guard
            .as_mut()
            .ok_or_else(|| ServiceError::InvalidState("no game in progress".into()))?;

        let completed = game.inning.clone();
        game.runs += u32::from(runs_scored);
        game.inning = completed.advance_two_halves();
        game.outs = 0;
        game.touch();

        state.apply_game_event(GameEvent::InningAdvanced).await?;

        let request = AdvanceInningRequest {
            game_id: game.id,
            completed_number: completed.number,
            half: completed.half,
            runs_scored,
            next_number: game.inning.number,
        };
        let view = InningView {
            number: game.inning.number,
            half: game.inning.half,
            outs: game.outs,
            runs_total: game.runs,
        };
        (request, view)
    };

    persist_session(state).await?;
    submit_action(state, ActionPayload::AdvanceInning(request)).await?;

    Ok(view)
}

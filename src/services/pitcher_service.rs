//! Pitcher substitution, keeping exactly one active tenure per game.
//!
//! Substitution is not a queueable action kind: the remote call is attempted
//! directly. A remote conflict (the player already has an unresolved tenure)
//! aborts the change; a transient failure applies it locally and reconciles
//! on the next game-state sync.

use tracing::warn;
use validator::Validate;

use crate::error::ServiceError;
use crate::remote::error::ErrorClass;
use crate::remote::models::ChangePitcherRequest;
use crate::services::scoring_service::{PitcherInput, persist_session};
use crate::state::SharedState;
use crate::state::game::PitcherTenure;

/// Result of a substitution request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubstitutionView {
    /// The requested player was already the active pitcher.
    AlreadyActive,
    /// The substitution was applied.
    Changed {
        /// Inning number the new pitcher entered in.
        entered_inning: u8,
    },
}

/// Replace the active pitcher with `input`, entering in `inning_entered`.
pub async fn change_pitcher(
    state: &SharedState,
    input: PitcherInput,
    inning_entered: u8,
) -> Result<SubstitutionView, ServiceError> {
    input.validate()?;
    let _gate = state.mutation_gate().lock().await;

    let request = {
        let guard = state.current_game().read().await;
        let game = guard
            .as_ref()
            .ok_or_else(|| ServiceError::Precondition("no game in progress".into()))?;

        if game
            .active_pitcher()
            .is_some_and(|tenure| tenure.player_id == input.player_id)
        {
            return Ok(SubstitutionView::AlreadyActive);
        }

        ChangePitcherRequest {
            game_id: game.id,
            player_id: input.player_id,
            name: input.name.clone(),
            inning_entered,
        }
    };

    if state.network().is_online() {
        match state.api().change_pitcher(request.clone()).await {
            Ok(()) => {}
            Err(err) if err.class() == ErrorClass::Conflict => {
                return Err(ServiceError::Conflict(format!(
                    "player already has an unresolved pitching tenure: {err}"
                )));
            }
            Err(err) if err.is_transient() => {
                warn!(
                    player_id = %request.player_id,
                    error = %err,
                    "substitution call failed; applying locally, reconciling on next sync"
                );
            }
            Err(err) => return Err(ServiceError::Remote(err)),
        }
    } else {
        warn!(
            player_id = %request.player_id,
            "offline; applying substitution locally, reconciling on next sync"
        );
    }

    {
        let mut guard = state.current_game().write().await;
        let game = guard
            .as_mut()
            .ok_or_else(|| ServiceError::Precondition("no game in progress".into()))?;

        for tenure in &mut game.pitchers {
            if tenure.is_active() {
                tenure.exited_inning = Some(inning_entered);
            }
        }
        game.pitchers.push(PitcherTenure {
            player_id: input.player_id,
            name: input.name,
            entered_inning: inning_entered,
            exited_inning: None,
        });

        if let Some(at_bat) = game.open_at_bat.as_mut() {
            at_bat.pitcher_id = input.player_id;
        }
        game.touch();
    }

    persist_session(state).await?;

    Ok(SubstitutionView::Changed {
        entered_inning: inning_entered,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::network_monitor::ConnectionStatus;
    use crate::services::scoring_service::{
        LineupSlotInput, StartGameInput, start_at_bat, start_game,
    };
    use crate::services::test_support::{ScriptedApi, scripted_state};
    use crate::dao::models::InningHalf;
    use uuid::Uuid;

    fn start_input() -> StartGameInput {
        StartGameInput {
            opponent: None,
            half: InningHalf::Top,
            lineup: (1..=9)
                .map(|order| LineupSlotInput {
                    player_id: Uuid::new_v4(),
                    name: format!("Player {order}"),
                    order,
                })
                .collect(),
            starting_pitcher: PitcherInput {
                player_id: Uuid::new_v4(),
                name: "Starter".into(),
            },
        }
    }

    fn reliever() -> PitcherInput {
        PitcherInput {
            player_id: Uuid::new_v4(),
            name: "Reliever".into(),
        }
    }

    async fn active_pitchers(state: &crate::state::SharedState) -> Vec<PitcherTenure> {
        let guard = state.current_game().read().await;
        guard
            .as_ref()
            .unwrap()
            .pitchers
            .iter()
            .filter(|tenure| tenure.is_active())
            .cloned()
            .collect()
    }

    #[tokio::test]
    async fn same_pitcher_is_a_noop_without_a_remote_call() {
        let api = ScriptedApi::new();
        let (_dir, state) = scripted_state(api.clone());
        state.network().set_status(ConnectionStatus::Online);

        let input = start_input();
        let starter = input.starting_pitcher.clone();
        start_game(&state, input).await.unwrap();
        let calls_before = api.calls().len();

        let view = change_pitcher(&state, starter, 3).await.unwrap();
        assert_eq!(view, SubstitutionView::AlreadyActive);
        assert_eq!(api.calls().len(), calls_before);
        assert_eq!(active_pitchers(&state).await.len(), 1);
    }

    #[tokio::test]
    async fn substitution_closes_the_previous_tenure() {
        let api = ScriptedApi::new();
        let (_dir, state) = scripted_state(api.clone());
        state.network().set_status(ConnectionStatus::Online);

        start_game(&state, start_input()).await.unwrap();
        let incoming = reliever();
        let view = change_pitcher(&state, incoming.clone(), 4).await.unwrap();
        assert_eq!(view, SubstitutionView::Changed { entered_inning: 4 });

        let active = active_pitchers(&state).await;
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].player_id, incoming.player_id);
        assert_eq!(active[0].entered_inning, 4);

        let guard = state.current_game().read().await;
        let game = guard.as_ref().unwrap();
        let previous = game
            .pitchers
            .iter()
            .find(|tenure| tenure.player_id != incoming.player_id)
            .unwrap();
        assert_eq!(previous.exited_inning, Some(4));
    }

    #[tokio::test]
    async fn offline_substitution_applies_locally() {
        let api = ScriptedApi::new();
        let (_dir, state) = scripted_state(api.clone());

        start_game(&state, start_input()).await.unwrap();
        let incoming = reliever();
        change_pitcher(&state, incoming.clone(), 2).await.unwrap();

        // No remote call was made while offline.
        assert!(!api.calls().iter().any(|call| call.starts_with("CHANGE_PITCHER")));
        let active = active_pitchers(&state).await;
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].player_id, incoming.player_id);
    }

    #[tokio::test]
    async fn remote_conflict_aborts_the_local_change() {
        let api = ScriptedApi::new();
        api.conflict_on("CHANGE_PITCHER");
        let (_dir, state) = scripted_state(api.clone());
        state.network().set_status(ConnectionStatus::Online);

        let input = start_input();
        let starter_id = input.starting_pitcher.player_id;
        start_game(&state, input).await.unwrap();

        let err = change_pitcher(&state, reliever(), 5).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));

        let active = active_pitchers(&state).await;
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].player_id, starter_id);
    }

    #[tokio::test]
    async fn mid_at_bat_substitution_updates_the_open_at_bat() {
        let api = ScriptedApi::new();
        let (_dir, state) = scripted_state(api.clone());

        start_game(&state, start_input()).await.unwrap();
        start_at_bat(&state).await.unwrap();

        let incoming = reliever();
        change_pitcher(&state, incoming.clone(), 1).await.unwrap();

        let guard = state.current_game().read().await;
        let game = guard.as_ref().unwrap();
        assert_eq!(
            game.open_at_bat.as_ref().unwrap().pitcher_id,
            incoming.player_id
        );
    }
}

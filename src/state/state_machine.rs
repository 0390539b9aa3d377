use thiserror::Error;

/// High-level phases a scoring session can be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GamePhase {
    /// No game is currently being scored.
    Idle,
    /// A game is active and can be in one of the play sub-phases.
    InProgress(PlayPhase),
    /// The game has ended; no further scoring events are accepted.
    Final,
}

/// Fine-grained phase while a game is in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayPhase {
    /// No at-bat is open; the next batter can step in.
    BetweenBatters,
    /// An at-bat is open and accumulating pitch events.
    AtBat,
    /// Three outs were recorded; new at-bats are blocked until the
    /// half-inning score is entered and the inning advances.
    InningBreak,
}

/// Events that can be applied to the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameEvent {
    /// A game starts from the idle state.
    StartGame,
    /// An at-bat opens for the current batter.
    AtBatOpened,
    /// The open at-bat resolved; `inning_over` is set when the resolution
    /// landed on three outs.
    AtBatResolved {
        /// Whether the resolution completed the half-inning.
        inning_over: bool,
    },
    /// The inning marker advanced after the break.
    InningAdvanced,
    /// The game ends.
    EndGame,
}

/// Error returned when attempting to apply an invalid transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while in {from:?}")]
pub struct InvalidTransition {
    /// The phase the state machine was in when the invalid event arrived.
    pub from: GamePhase,
    /// The event that cannot be applied from this phase.
    pub event: GameEvent,
}

/// Snapshot of the current state machine state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    /// Current phase of the state machine.
    pub phase: GamePhase,
    /// Version number of the state machine (increments on each transition).
    pub version: usize,
}

/// State machine gating the at-bat/inning lifecycle.
///
/// Transitions apply immediately: local state is optimistic by design, so a
/// failed remote delivery never rolls a phase back — it is replayed from the
/// action queue instead.
#[derive(Debug, Clone)]
pub struct GameStateMachine {
    phase: GamePhase,
    version: usize,
}

impl Default for GameStateMachine {
    fn default() -> Self {
        Self {
            phase: GamePhase::Idle,
            version: 0,
        }
    }
}

impl GameStateMachine {
    /// Create a new state machine initialised in the idle state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a machine in a known phase, e.g. when restoring a cached game.
    pub fn restore(phase: GamePhase) -> Self {
        Self { phase, version: 0 }
    }

    /// Inspect the current phase.
    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    /// Create a snapshot of the current state machine state.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            phase: self.phase,
            version: self.version,
        }
    }

    /// Apply an event, moving the state machine to the next phase.
    pub fn apply(&mut self, event: GameEvent) -> Result<GamePhase, InvalidTransition> {
        let next = self.compute_transition(event)?;
        self.phase = next;
        self.version += 1;
        Ok(self.phase)
    }

    /// Compute a transition from an event if the transition is valid.
    fn compute_transition(&self, event: GameEvent) -> Result<GamePhase, InvalidTransition> {
        let next = match (self.phase, event) {
            (GamePhase::Idle, GameEvent::StartGame) => {
                GamePhase::InProgress(PlayPhase::BetweenBatters)
            }
            (GamePhase::InProgress(PlayPhase::BetweenBatters), GameEvent::AtBatOpened) => {
                GamePhase::InProgress(PlayPhase::AtBat)
            }
            (
                GamePhase::InProgress(PlayPhase::AtBat),
                GameEvent::AtBatResolved { inning_over: false },
            ) => GamePhase::InProgress(PlayPhase::BetweenBatters),
            (
                GamePhase::InProgress(PlayPhase::AtBat),
                GameEvent::AtBatResolved { inning_over: true },
            ) => GamePhase::InProgress(PlayPhase::InningBreak),
            (GamePhase::InProgress(PlayPhase::InningBreak), GameEvent::InningAdvanced) => {
                GamePhase::InProgress(PlayPhase::BetweenBatters)
            }
            (GamePhase::InProgress(_), GameEvent::EndGame) => GamePhase::Final,
            (from, event) => return Err(InvalidTransition { from, event }),
        };

        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(sm: &mut GameStateMachine, event: GameEvent) -> GamePhase {
        sm.apply(event).unwrap()
    }

    #[test]
    fn initial_state_is_idle() {
        let sm = GameStateMachine::new();
        assert_eq!(sm.phase(), GamePhase::Idle);
    }

    #[test]
    fn full_happy_path_through_a_half_inning() {
        let mut sm = GameStateMachine::new();

        assert_eq!(
            apply(&mut sm, GameEvent::StartGame),
            GamePhase::InProgress(PlayPhase::BetweenBatters)
        );
        assert_eq!(
            apply(&mut sm, GameEvent::AtBatOpened),
            GamePhase::InProgress(PlayPhase::AtBat)
        );
        assert_eq!(
            apply(&mut sm, GameEvent::AtBatResolved { inning_over: false }),
            GamePhase::InProgress(PlayPhase::BetweenBatters)
        );
        assert_eq!(
            apply(&mut sm, GameEvent::AtBatOpened),
            GamePhase::InProgress(PlayPhase::AtBat)
        );
        assert_eq!(
            apply(&mut sm, GameEvent::AtBatResolved { inning_over: true }),
            GamePhase::InProgress(PlayPhase::InningBreak)
        );
        assert_eq!(
            apply(&mut sm, GameEvent::InningAdvanced),
            GamePhase::InProgress(PlayPhase::BetweenBatters)
        );
        assert_eq!(apply(&mut sm, GameEvent::EndGame), GamePhase::Final);
    }

    #[test]
    fn inning_break_blocks_new_at_bats() {
        let mut sm = GameStateMachine::new();
        apply(&mut sm, GameEvent::StartGame);
        apply(&mut sm, GameEvent::AtBatOpened);
        apply(&mut sm, GameEvent::AtBatResolved { inning_over: true });

        let err = sm.apply(GameEvent::AtBatOpened).unwrap_err();
        assert_eq!(err.from, GamePhase::InProgress(PlayPhase::InningBreak));
        assert_eq!(err.event, GameEvent::AtBatOpened);
    }

    #[test]
    fn game_can_end_from_any_in_progress_phase() {
        for setup in [
            Vec::new(),
            vec![GameEvent::AtBatOpened],
            vec![
                GameEvent::AtBatOpened,
                GameEvent::AtBatResolved { inning_over: true },
            ],
        ] {
            let mut sm = GameStateMachine::new();
            apply(&mut sm, GameEvent::StartGame);
            for event in setup {
                apply(&mut sm, event);
            }
            assert_eq!(apply(&mut sm, GameEvent::EndGame), GamePhase::Final);
        }
    }

    #[test]
    fn invalid_transition_returns_error_and_keeps_phase() {
        let mut sm = GameStateMachine::new();
        let err = sm.apply(GameEvent::AtBatOpened).unwrap_err();
        assert_eq!(err.from, GamePhase::Idle);
        assert_eq!(sm.phase(), GamePhase::Idle);
        assert_eq!(sm.snapshot().version, 0);
    }

    #[test]
    fn version_increments_on_each_applied_transition() {
        let mut sm = GameStateMachine::new();
        apply(&mut sm, GameEvent::StartGame);
        apply(&mut sm, GameEvent::AtBatOpened);
        assert_eq!(sm.snapshot().version, 2);
    }

    #[test]
    fn restore_rebuilds_a_machine_in_the_given_phase() {
        let sm = GameStateMachine::restore(GamePhase::InProgress(PlayPhase::AtBat));
        assert_eq!(sm.phase(), GamePhase::InProgress(PlayPhase::AtBat));
    }
}

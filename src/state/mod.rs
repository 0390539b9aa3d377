pub mod count;
pub mod game;
pub mod state_machine;

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::dao::offline_store::OfflineStore;
use crate::remote::ScoreApi;
use crate::services::network_monitor::{ConnectionStatus, NetworkMonitor};
use crate::state::game::{GameSession, PitchEvent};
use crate::state::state_machine::{GameEvent, GamePhase, GameStateMachine, InvalidTransition};

pub use self::state_machine::Snapshot;

/// Shared handle to the application state.
pub type SharedState = Arc<AppState>;

/// Central application state: store/API handles, the lifecycle state
/// machine, the in-memory event store, and the serialization gates.
pub struct AppState {
    config: AppConfig,
    store: Arc<dyn OfflineStore>,
    api: Arc<dyn ScoreApi>,
    network: NetworkMonitor,
    game: RwLock<GameStateMachine>,
    current_game: RwLock<Option<GameSession>>,
    pitch_events: DashMap<Uuid, Vec<PitchEvent>>,
    id_map: DashMap<Uuid, Uuid>,
    mutation_gate: Mutex<()>,
    drain_gate: Mutex<()>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be
    /// cloned cheaply. The connectivity flag starts offline until the probe
    /// loop observes the backend.
    pub fn new(
        config: AppConfig,
        store: Arc<dyn OfflineStore>,
        api: Arc<dyn ScoreApi>,
    ) -> SharedState {
        Arc::new(Self {
            config,
            store,
            api,
            network: NetworkMonitor::new(ConnectionStatus::Offline),
            game: RwLock::new(GameStateMachine::new()),
            current_game: RwLock::new(None),
            pitch_events: DashMap::new(),
            id_map: DashMap::new(),
            mutation_gate: Mutex::new(()),
            drain_gate: Mutex::new(()),
        })
    }

    /// Immutable runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Handle to the device-local store.
    pub fn store(&self) -> Arc<dyn OfflineStore> {
        self.store.clone()
    }

    /// Handle to the remote scoring API.
    pub fn api(&self) -> Arc<dyn ScoreApi> {
        self.api.clone()
    }

    /// Connectivity observer.
    pub fn network(&self) -> &NetworkMonitor {
        &self.network
    }

    /// Currently active game session data.
    pub fn current_game(&self) -> &RwLock<Option<GameSession>> {
        &self.current_game
    }

    /// Gate serializing mutating intents (single-writer model).
    pub fn mutation_gate(&self) -> &Mutex<()> {
        &self.mutation_gate
    }

    /// Gate preventing overlapping drain passes; `try_lock` failure means a
    /// pass is already running.
    pub fn drain_gate(&self) -> &Mutex<()> {
        &self.drain_gate
    }

    /// Whether a drain pass currently holds the gate.
    pub fn is_draining(&self) -> bool {
        self.drain_gate.try_lock().is_err()
    }

    /// Snapshot the current phase of the shared state machine.
    pub async fn phase(&self) -> GamePhase {
        self.game.read().await.phase()
    }

    /// Snapshot the shared state machine.
    pub async fn snapshot(&self) -> Snapshot {
        self.game.read().await.snapshot()
    }

    /// Apply an event to the shared state machine.
    pub async fn apply_game_event(
        &self,
        event: GameEvent,
    ) -> Result<GamePhase, InvalidTransition> {
        let mut sm = self.game.write().await;
        sm.apply(event)
    }

    /// Replace the shared state machine, e.g. when restoring a cached game.
    pub async fn install_state_machine(&self, machine: GameStateMachine) {
        let mut sm = self.game.write().await;
        *sm = machine;
    }

    /// Append a pitch to the in-memory event store of its at-bat.
    pub fn append_pitch(&self, event: PitchEvent) {
        self.pitch_events
            .entry(event.at_bat_id)
            .or_default()
            .push(event);
    }

    /// Current pitch buffer for an at-bat, oldest first.
    pub fn pitch_events(&self, at_bat_id: Uuid) -> Vec<PitchEvent> {
        self.pitch_events
            .get(&at_bat_id)
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Remove and return the pitch buffer for a resolved at-bat.
    pub fn take_pitch_events(&self, at_bat_id: Uuid) -> Vec<PitchEvent> {
        self.pitch_events
            .remove(&at_bat_id)
            .map(|(_, events)| events)
            .unwrap_or_default()
    }

    /// Seed the pitch buffer for an at-bat, used when restoring a cached game.
    pub fn restore_pitch_events(&self, at_bat_id: Uuid, events: Vec<PitchEvent>) {
        self.pitch_events.insert(at_bat_id, events);
    }

    /// Record that the server assigned `server` for locally generated `temp`.
    pub fn record_id_mapping(&self, temp: Uuid, server: Uuid) {
        self.id_map.insert(temp, server);
    }

    /// Resolve an id through the reconciliation map, falling back to itself.
    pub fn resolve_id(&self, id: Uuid) -> Uuid {
        self.id_map.get(&id).map(|entry| *entry).unwrap_or(id)
    }

    /// Move an at-bat's pitch buffer and open-at-bat references from a
    /// temporary id to the server-assigned one.
    pub async fn reconcile_at_bat_id(&self, temp: Uuid, server: Uuid) {
        self.record_id_mapping(temp, server);

        if let Some((_, events)) = self.pitch_events.remove(&temp) {
            let events = events
                .into_iter()
                .map(|mut event| {
                    event.at_bat_id = server;
                    event
                })
                .collect();
            self.pitch_events.insert(server, events);
        }

        let mut guard = self.current_game.write().await;
        if let Some(game) = guard.as_mut()
            && let Some(at_bat) = game.open_at_bat.as_mut()
            && at_bat.id == temp
        {
            at_bat.id = server;
        }
    }
}

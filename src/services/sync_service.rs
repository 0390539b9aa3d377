//! Optimistic dispatch and queue draining against the remote scoring API.
//!
//! A mutating intent is attempted remotely right away when the device is
//! online; on transient failure (or while offline) the same intent is
//! persisted in the action queue and replayed later by [`drain`]. Draining is
//! strictly sequential so causally related operations keep their order.

use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tokio::sync::watch;
use tokio::time::interval;
use tokio_stream::{StreamExt, wrappers::WatchStream};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::dao::models::PendingActionEntity;
use crate::error::ServiceError;
use crate::remote::error::ApiError;
use crate::remote::models::ActionPayload;
use crate::services::network_monitor::ConnectionStatus;
use crate::state::SharedState;

/// Metadata key recording the wall-clock end of the last completed pass.
pub const LAST_SYNC_AT_KEY: &str = "last_sync_at";
/// Metadata key counting actions dropped without delivery.
pub const FAILED_ACTIONS_KEY: &str = "failed_actions";

/// Aggregate sync status surfaced to the UI badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncBadge {
    /// The backend is unreachable; intents queue locally.
    Offline,
    /// A drain pass is currently running.
    Syncing,
    /// This many intents await delivery.
    Pending(u64),
    /// Queue is empty and the backend is reachable.
    Synced,
}

/// Row-level accounting for one drain pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Rows for which a delivery was attempted.
    pub attempted: u64,
    /// Rows delivered and removed.
    pub succeeded: u64,
    /// Rows that failed transiently and stay queued.
    pub retried: u64,
    /// Rows dropped permanently (ceiling reached or rejected).
    pub discarded: u64,
}

/// What a call to [`drain`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainOutcome {
    /// A pass ran to completion (possibly stopping early on connectivity
    /// loss); the report covers the rows it touched.
    Completed(DrainReport),
    /// Another pass already holds the gate; nothing was done.
    AlreadyRunning,
    /// The device is offline; nothing was attempted.
    Offline,
}

/// Deliver a mutating intent, optimistic-first.
///
/// Local state is the caller's responsibility and is already updated by the
/// time this runs; this function only decides between immediate delivery and
/// queueing. It never blocks the caller on a retry loop.
pub async fn submit_action(state: &SharedState, payload: ActionPayload) -> Result<(), ServiceError> {
    let kind = payload.kind().as_str();

    if !state.network().is_online() {
        let action = PendingActionEntity::new(payload);
        debug!(kind, id = %action.id, "offline; queueing action");
        state.store().enqueue(action).await?;
        return Ok(());
    }

    match execute_remote(state, payload.clone()).await {
        Ok(()) => Ok(()),
        Err(err) if err.is_transient() => {
            let action = PendingActionEntity::new(payload);
            warn!(kind, id = %action.id, error = %err, "remote call failed; queueing for retry");
            state.store().enqueue(action).await?;
            Ok(())
        }
        Err(err) => {
            // Rejected outright: queueing would only replay the same refusal.
            warn!(kind, error = %err, "remote rejected action; dropping");
            bump_failed_counter(state).await?;
            Ok(())
        }
    }
}

/// Replay everything currently queued, oldest first.
///
/// Re-entrant-safe: a second caller (manual trigger, timer) while a pass is
/// active is a no-op. Items are processed one at a time; a connectivity loss
/// observed mid-pass stops the pass and leaves unattempted rows untouched.
pub async fn drain(state: &SharedState) -> Result<DrainOutcome, ServiceError> {
    let Ok(_guard) = state.drain_gate().try_lock() else {
        debug!("drain already in progress; ignoring trigger");
        return Ok(DrainOutcome::AlreadyRunning);
    };

    if !state.network().is_online() {
        return Ok(DrainOutcome::Offline);
    }

    let store = state.store();
    let pending = store.list_pending().await?;
    let mut report = DrainReport::default();

    for action in pending {
        if !state.network().is_online() {
            info!("connectivity lost mid-drain; stopping pass");
            break;
        }

        let kind = action.action.kind().as_str();
        report.attempted += 1;

        match execute_remote(state, action.action.clone()).await {
            Ok(()) => {
                store.mark_succeeded(action.id).await?;
                report.succeeded += 1;
            }
            Err(err) if err.is_transient() => {
                let updated = store.mark_failed(action.id, err.to_string()).await?;
                if updated.retry_count >= state.config().retry_ceiling {
                    warn!(
                        kind,
                        id = %action.id,
                        retry_count = updated.retry_count,
                        "retry ceiling reached; dropping action"
                    );
                    store.discard(action.id).await?;
                    bump_failed_counter(state).await?;
                    report.discarded += 1;
                } else {
                    debug!(kind, id = %action.id, error = %err, "delivery failed; will retry");
                    report.retried += 1;
                }
            }
            Err(err) => {
                warn!(kind, id = %action.id, error = %err, "rejected by remote; dropping without retry");
                store.discard(action.id).await?;
                bump_failed_counter(state).await?;
                report.discarded += 1;
            }
        }
    }

    if let Ok(stamp) = OffsetDateTime::now_utc().format(&Rfc3339) {
        store.set_metadata(LAST_SYNC_AT_KEY, stamp).await?;
    }

    info!(
        attempted = report.attempted,
        succeeded = report.succeeded,
        retried = report.retried,
        discarded = report.discarded,
        "sync pass finished"
    );
    Ok(DrainOutcome::Completed(report))
}

/// Background task: drain on a fixed interval while online and non-empty,
/// and immediately on offline→online transitions.
///
/// Pass-level failures are logged, never propagated; the task only ends when
/// the shutdown watch fires.
pub async fn run_sync_supervisor(state: SharedState, mut shutdown: watch::Receiver<bool>) {
    let mut ticker = interval(state.config().sync_interval);
    let mut transitions = WatchStream::new(state.network().subscribe());

    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                info!("stopping sync supervisor");
                break;
            }
            _ = ticker.tick() => {
                maybe_drain(&state, "interval").await;
            }
            Some(status) = transitions.next() => {
                if status == ConnectionStatus::Online {
                    maybe_drain(&state, "reconnect").await;
                }
            }
        }
    }
}

async fn maybe_drain(state: &SharedState, trigger: &str) {
    if !state.network().is_online() {
        return;
    }

    match state.store().pending_count().await {
        Ok(0) => return,
        Ok(_) => {}
        Err(err) => {
            error!(trigger, error = %err, "failed to read pending count");
            return;
        }
    }

    if let Err(err) = drain(state).await {
        error!(trigger, error = %err, "sync pass failed");
    }
}

/// Aggregate status for the persistent badge.
pub async fn sync_badge(state: &SharedState) -> Result<SyncBadge, ServiceError> {
    if !state.network().is_online() {
        return Ok(SyncBadge::Offline);
    }
    if state.is_draining() {
        return Ok(SyncBadge::Syncing);
    }
    let pending = state.store().pending_count().await?;
    Ok(if pending == 0 {
        SyncBadge::Synced
    } else {
        SyncBadge::Pending(pending)
    })
}

/// Number of actions dropped without delivery since the store was created.
pub async fn failed_action_count(state: &SharedState) -> Result<u64, ServiceError> {
    let value = state.store().get_metadata(FAILED_ACTIONS_KEY).await?;
    Ok(value.and_then(|raw| raw.parse().ok()).unwrap_or(0))
}

async fn bump_failed_counter(state: &SharedState) -> Result<(), ServiceError> {
    let store = state.store();
    let current = store
        .get_metadata(FAILED_ACTIONS_KEY)
        .await?
        .and_then(|raw| raw.parse::<u64>().ok())
        .unwrap_or(0);
    store
        .set_metadata(FAILED_ACTIONS_KEY, (current + 1).to_string())
        .await?;
    Ok(())
}

/// Map a queued command to its remote operation and run it.
///
/// At-bat references are resolved through the reconciliation map first: a
/// payload snapshot taken at the start of a pass may still name a temporary
/// id that a `CREATE_AT_BAT` earlier in the same pass replaced.
async fn execute_remote(state: &SharedState, mut payload: ActionPayload) -> Result<(), ApiError> {
    match &mut payload {
        ActionPayload::LogPitch(request) => request.at_bat_id = state.resolve_id(request.at_bat_id),
        ActionPayload::UpdateAtBat(request) => {
            request.at_bat_id = state.resolve_id(request.at_bat_id);
        }
        ActionPayload::RecordPlay(request) => {
            request.at_bat_id = state.resolve_id(request.at_bat_id);
        }
        _ => {}
    }

    let api = state.api();
    match payload {
        ActionPayload::LogPitch(request) => {
            let pitch_id = request.pitch_id;
            let created = api.log_pitch(request).await?;
            if created.id != pitch_id {
                state.record_id_mapping(pitch_id, created.id);
            }
            Ok(())
        }
        ActionPayload::CreateAtBat(request) => {
            let temp = request.at_bat_id;
            let created = api.create_at_bat(request).await?;
            if created.id != temp {
                reconcile_at_bat(state, temp, created.id).await;
            }
            Ok(())
        }
        ActionPayload::UpdateAtBat(request) => api.update_at_bat(request).await,
        ActionPayload::RecordPlay(request) => api.record_play(request).await,
        ActionPayload::StartGame(request) => api.start_game(request).await,
        ActionPayload::EndGame(request) => api.end_game(request).await,
        ActionPayload::AdvanceInning(request) => api.advance_inning(request).await,
    }
}

async fn reconcile_at_bat(state: &SharedState, temp: Uuid, server: Uuid) {
    state.reconcile_at_bat_id(temp, server).await;
    match state.store().rewrite_at_bat_refs(temp, server).await {
        Ok(0) => {}
        Ok(count) => debug!(%temp, %server, count, "rewrote queued at-bat references"),
        Err(err) => {
            // The id map still covers these rows at send time.
            error!(%temp, %server, error = %err, "failed to rewrite queued at-bat references");
        }
    }
}

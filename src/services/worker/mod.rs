//! Background worker: the check scheduler and the log-rotation scheduler.
//!
//! Both loops are spawned once at startup and run until the shutdown channel
//! flips. Check execution fans out one task per check per tick; ticks are
//! measured start to start and never wait for the previous fan-out to drain,
//! so overlapping ticks are possible and each probe is individually guarded
//! by its `OutcomeSlot`.

pub mod outcome;
pub mod probe;
pub mod rotation;
pub mod validation;

use crate::AppState;
use reqwest::Client;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Collection holding the check records.
pub const CHECKS: &str = "checks";

/// Owns the shutdown channel and the two scheduler tasks.
pub struct WorkerHandle {
    shutdown: watch::Sender<bool>,
    check_loop: JoinHandle<()>,
    rotation_loop: JoinHandle<()>,
}

impl WorkerHandle {
    /// Signal both loops to stop and wait for them to exit. In-flight probes
    /// drain on their own timeouts.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        let _ = self.check_loop.await;
        let _ = self.rotation_loop.await;
    }
}

/// Spawn both scheduler loops. The first tick of each fires immediately, so
/// startup runs one full gather and one log rotation right away.
pub fn start(state: AppState) -> WorkerHandle {
    info!("Background workers are running");

    let (shutdown, rx) = watch::channel(false);
    let check_loop = tokio::spawn(check_loop(state.clone(), rx.clone()));
    let rotation_loop = tokio::spawn(rotation_loop(state, rx));

    WorkerHandle {
        shutdown,
        check_loop,
        rotation_loop,
    }
}

async fn check_loop(state: AppState, mut shutdown: watch::Receiver<bool>) {
    let client = Client::new();
    let mut ticker = interval(Duration::from_secs(state.config.check_interval_secs));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => gather_all_checks(&state, &client).await,
            _ = shutdown.changed() => {
                info!("Check scheduler stopping");
                break;
            }
        }
    }
}

async fn rotation_loop(state: AppState, mut shutdown: watch::Receiver<bool>) {
    let mut ticker = interval(Duration::from_secs(state.config.log_rotation_interval_secs));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => rotation::rotate_logs(&state.logs).await,
            _ = shutdown.changed() => {
                info!("Log rotation scheduler stopping");
                break;
            }
        }
    }
}

/// One scheduler tick: list every check and route each through
/// read -> validate -> probe -> process as its own task. The tick itself
/// returns as soon as the fan-out is spawned.
async fn gather_all_checks(state: &AppState, client: &Client) {
    let ids = match state.store.list(CHECKS).await {
        Ok(ids) => ids,
        Err(e) => {
            error!("Could not list checks to process: {e}");
            return;
        }
    };

    if ids.is_empty() {
        debug!("No checks to process this tick");
        return;
    }
    debug!("Gathering {} checks", ids.len());

    for id in ids {
        let state = state.clone();
        let client = client.clone();
        tokio::spawn(async move {
            run_check_pipeline(&state, &client, &id).await;
        });
    }
}

async fn run_check_pipeline(state: &AppState, client: &Client, id: &str) {
    let raw = match state.store.read_raw(CHECKS, id).await {
        Ok(raw) => raw,
        Err(e) => {
            warn!("Error reading check {id}: {e}");
            return;
        }
    };

    let validation = validation::validate_check(&raw);
    let Some(check) = validation.check else {
        warn!(
            "Check {id} is not properly formatted (invalid: {}), skipping it",
            validation.fields.failing().join(", ")
        );
        return;
    };

    let outcome = probe::perform_check(client, &check).await;
    outcome::process_outcome(state, check, outcome).await;
}

use super::probe::CheckOutcome;
use super::CHECKS;
use crate::models::check::{Check, CheckState};
use crate::utils::clock::now_ms;
use crate::AppState;
use serde::Serialize;
use tracing::{debug, error, info, warn};

/// One line in a check's live log: the check snapshot, the outcome, the
/// derived state and the alert decision, stamped with the probe time.
#[derive(Debug, Serialize)]
pub struct LogEntry<'a> {
    pub check: &'a Check,
    pub outcome: &'a CheckOutcome,
    pub state: CheckState,
    pub alert: bool,
    pub time: i64,
}

/// A check is up iff the probe produced a response whose status code is one
/// of the check's success codes. Any error, timeout included, is down.
pub fn derive_state(check: &Check, outcome: &CheckOutcome) -> CheckState {
    let code_matches = outcome
        .response_code
        .map(|code| check.success_codes.contains(&code))
        .unwrap_or(false);

    if outcome.error.is_none() && code_matches {
        CheckState::Up
    } else {
        CheckState::Down
    }
}

/// Alert only on a transition, and never on a check's first-ever probe.
pub fn alert_warranted(check: &Check, new_state: CheckState) -> bool {
    check.last_checked.is_some() && check.state != new_state
}

/// Fold one probe outcome into the system: append the log entry, persist the
/// check's new state, and notify the owner if the state changed. Every
/// failure here is terminal for this cycle only; the next tick retries.
pub async fn process_outcome(state: &AppState, check: Check, outcome: CheckOutcome) {
    let new_state = derive_state(&check, &outcome);
    let alert = alert_warranted(&check, new_state);
    let time = now_ms();

    let entry = LogEntry {
        check: &check,
        outcome: &outcome,
        state: new_state,
        alert,
        time,
    };
    if let Err(e) = state.logs.append(&check.id, &entry).await {
        warn!("Failed to append log entry for check {}: {e}", check.id);
    }

    let mut updated = check;
    updated.state = new_state;
    updated.last_checked = Some(time);

    match state.store.update(CHECKS, &updated.id, &updated).await {
        Ok(()) => {
            if alert {
                alert_status_change(state, &updated).await;
            } else {
                debug!("Check {} outcome has not changed, no alert needed", updated.id);
            }
        }
        Err(e) => {
            // An unsaved transition also suppresses its alert; alerting on a
            // state we failed to record would repeat every cycle until the
            // write heals.
            if alert {
                error!(
                    "Failed to save check {}, dropping a warranted alert: {e}",
                    updated.id
                );
            } else {
                error!("Failed to save updates to check {}: {e}", updated.id);
            }
        }
    }
}

async fn alert_status_change(state: &AppState, check: &Check) {
    let msg = format!(
        "Alert: your check for {} {}://{} is currently {}",
        check.method.as_str().to_uppercase(),
        check.protocol,
        check.url,
        check.state
    );

    match state.notifier.send_sms(&check.user_phone, &msg).await {
        Ok(()) => info!("User alerted to a status change in check {}: {msg}", check.id),
        Err(e) => error!(
            "Could not send sms alert for state change in check {}: {e}",
            check.id
        ),
    }
}

use crate::store::LogStore;
use crate::utils::clock::now_ms;
use tracing::{debug, error};

/// Rotate every live log: gzip its contents into a fresh archive entry, then
/// reset it to empty. Archive names are `<check id>-<unix ms>`, so entries
/// never collide. Files are handled independently; one failure never blocks
/// the rest.
pub async fn rotate_logs(logs: &LogStore) {
    let names = match logs.list(false).await {
        Ok(names) => names,
        Err(e) => {
            error!("Could not list log files for rotation: {e}");
            return;
        }
    };

    if names.is_empty() {
        debug!("No logs to rotate");
        return;
    }

    for name in names {
        let archive_id = format!("{}-{}", name, now_ms());

        if let Err(e) = logs.compress(&name, &archive_id).await {
            error!("Error compressing log file {name}: {e}");
            continue;
        }
        if let Err(e) = logs.truncate(&name).await {
            error!("Error truncating log file {name}: {e}");
            continue;
        }
        debug!("Rotated log {name} into archive {archive_id}");
    }
}

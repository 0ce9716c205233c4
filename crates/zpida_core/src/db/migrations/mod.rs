//! Update script selection and execution.
//!
//! # Responsibility
//! - Pick the update scripts newer than the recorded schema version.
//! - Apply them one by one in ascending target-version order.
//!
//! # Invariants
//! - Scripts at or below the recorded version never run.
//! - Each script commits before the next one starts.
//! - The version row is advanced by the script itself.

use super::{read_version, run_script, DbResult, UpdateScript};
use log::{info, warn};
use rusqlite::Connection;

/// Returns the update scripts whose target version is above `current_version`,
/// sorted ascending by version.
pub fn pending_updates(current_version: u32, updates: &[UpdateScript]) -> Vec<&UpdateScript> {
    let mut pending: Vec<&UpdateScript> = updates
        .iter()
        .filter(|update| update.version > current_version)
        .collect();
    pending.sort_by_key(|update| update.version);
    pending
}

/// Applies all pending update scripts on the provided connection.
///
/// An empty `updates` slice is a no-op. A failing script aborts the run and
/// leaves the database at the last committed script.
///
/// Returns the names of the applied scripts in the order they ran.
pub fn apply_pending(
    conn: &mut Connection,
    current_version: u32,
    updates: &[UpdateScript],
) -> DbResult<Vec<String>> {
    let pending = pending_updates(current_version, updates);
    let mut applied = Vec::with_capacity(pending.len());

    for update in pending {
        run_script(conn, &update.script)?;
        info!(
            "event=schema_update module=db status=ok script={} target_version={}",
            update.name(),
            update.version
        );

        let recorded = read_version(conn)?;
        if recorded != update.version {
            warn!(
                "event=schema_update module=db status=warn script={} target_version={} recorded_version={}",
                update.name(),
                update.version,
                recorded
            );
        }
        applied.push(update.script.name.clone());
    }

    Ok(applied)
}

//! First-run schema installation.

use super::{execute_script, DbResult, SqlScript};
use log::debug;
use rusqlite::Connection;

/// Installs the base schema and every seed script on a fresh database.
///
/// Seeds run in lexicographic name order. Everything is committed as one
/// transaction, so an interrupted install leaves no tracking table behind and
/// the next open starts the install over.
///
/// Returns the names of all seed scripts applied.
pub fn install(
    conn: &mut Connection,
    base_schema: &SqlScript,
    seeds: &[SqlScript],
) -> DbResult<Vec<String>> {
    let mut ordered: Vec<&SqlScript> = seeds.iter().collect();
    ordered.sort_by(|left, right| left.name.cmp(&right.name));

    let tx = conn.transaction()?;
    execute_script(&tx, base_schema)?;
    debug!(
        "event=schema_create module=db status=ok script={}",
        base_schema.name
    );

    let mut applied = Vec::with_capacity(ordered.len());
    for seed in ordered {
        execute_script(&tx, seed)?;
        debug!("event=schema_populate module=db status=ok script={}", seed.name);
        applied.push(seed.name.clone());
    }
    tx.commit()?;

    Ok(applied)
}

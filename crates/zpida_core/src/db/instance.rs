//! Persistent instance identifier stored in `config_t`.

use super::DbResult;
use crate::config_store::{self, ConfigEntry, DATABASE_SECTION, UUID_PROPERTY};
use log::warn;
use rusqlite::Connection;
use uuid::Uuid;

/// Returns the database instance UUID, minting one when needed.
///
/// A valid stored value is returned as stored and never rewritten. An absent
/// or malformed value, including one padded with whitespace, is replaced by
/// a fresh v4 UUID.
pub fn ensure_uuid(conn: &Connection) -> DbResult<String> {
    match config_store::get(conn, DATABASE_SECTION, UUID_PROPERTY)? {
        Some(stored) if Uuid::parse_str(&stored).is_ok() => Ok(stored),
        Some(stored) => {
            warn!(
                "event=db_uuid module=db status=warn reason=malformed value_len={}",
                stored.len()
            );
            write_new_uuid(conn)
        }
        None => write_new_uuid(conn),
    }
}

fn write_new_uuid(conn: &Connection) -> DbResult<String> {
    let guid = Uuid::new_v4().to_string();
    config_store::upsert(
        conn,
        &ConfigEntry::new(DATABASE_SECTION, UUID_PROPERTY, guid.as_str()),
    )?;
    Ok(guid)
}

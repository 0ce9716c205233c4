//! Schema version lookups against the tracking table.

use super::{DbError, DbResult};
use crate::config_store::{self, CONFIG_TABLE, DATABASE_SECTION, VERSION_PROPERTY};
use rusqlite::Connection;

/// Returns whether the `config_t` tracking table exists.
pub fn config_table_exists(conn: &Connection) -> DbResult<bool> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [CONFIG_TABLE],
        |row| row.get(0),
    )?;
    Ok(exists)
}

/// Returns the recorded schema version, or `None` on a fresh database.
///
/// Only a missing tracking table yields `None`; once the table exists every
/// other failure is propagated.
pub fn try_query_version(conn: &Connection) -> DbResult<Option<u32>> {
    if !config_table_exists(conn)? {
        return Ok(None);
    }
    read_version(conn).map(Some)
}

/// Reads the schema version from an installed database.
///
/// # Errors
/// - `DbError::MissingVersion` when the version row is absent.
/// - `DbError::InvalidVersion` when the value is not a non-negative integer.
pub fn read_version(conn: &Connection) -> DbResult<u32> {
    let raw = config_store::get(conn, DATABASE_SECTION, VERSION_PROPERTY)?
        .ok_or(DbError::MissingVersion)?;
    let parsed = raw.trim().parse::<u32>();
    parsed.map_err(|_| DbError::InvalidVersion(raw))
}

#[cfg(test)]
mod tests {
    use super::{config_table_exists, read_version, try_query_version};
    use crate::db::DbError;
    use rusqlite::Connection;

    fn with_config_table() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE config_t (section TEXT, property TEXT, value TEXT);")
            .unwrap();
        conn
    }

    #[test]
    fn fresh_database_has_no_version() {
        let conn = Connection::open_in_memory().unwrap();
        assert!(!config_table_exists(&conn).unwrap());
        assert_eq!(try_query_version(&conn).unwrap(), None);
    }

    #[test]
    fn reads_text_version() {
        let conn = with_config_table();
        conn.execute_batch("INSERT INTO config_t VALUES ('database', 'version', '4');")
            .unwrap();
        assert_eq!(try_query_version(&conn).unwrap(), Some(4));
        assert_eq!(read_version(&conn).unwrap(), 4);
    }

    #[test]
    fn table_without_version_row_is_an_error() {
        let conn = with_config_table();
        assert!(matches!(
            try_query_version(&conn),
            Err(DbError::MissingVersion)
        ));
    }

    #[test]
    fn non_numeric_version_is_rejected() {
        let conn = with_config_table();
        conn.execute_batch("INSERT INTO config_t VALUES ('database', 'version', 'v2');")
            .unwrap();
        match read_version(&conn) {
            Err(DbError::InvalidVersion(value)) => assert_eq!(value, "v2"),
            other => panic!("unexpected result: {other:?}"),
        }
    }
}

//! Key/value access to the `config_t` tracking table.
//!
//! # Invariants
//! - At most one row per `(section, property)`; writes replace, never duplicate.
//! - Text, integer and real values all read back as strings.

use rusqlite::types::ValueRef;
use rusqlite::{params, Connection, OptionalExtension};

pub const CONFIG_TABLE: &str = "config_t";
pub const DATABASE_SECTION: &str = "database";
pub const VERSION_PROPERTY: &str = "version";
pub const UUID_PROPERTY: &str = "uuid";

/// One `config_t` row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigEntry {
    pub section: String,
    pub property: String,
    pub value: String,
}

impl ConfigEntry {
    pub fn new(
        section: impl Into<String>,
        property: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            section: section.into(),
            property: property.into(),
            value: value.into(),
        }
    }
}

/// Reads the value stored for `(section, property)`.
///
/// Returns `None` when the row is absent or its value is `NULL`.
pub fn get(conn: &Connection, section: &str, property: &str) -> rusqlite::Result<Option<String>> {
    let value = conn
        .query_row(
            "SELECT value FROM config_t WHERE section = ?1 AND property = ?2;",
            params![section, property],
            |row| {
                let value = match row.get_ref(0)? {
                    ValueRef::Null => None,
                    ValueRef::Integer(number) => Some(number.to_string()),
                    ValueRef::Real(number) => Some(number.to_string()),
                    ValueRef::Text(text) => Some(String::from_utf8_lossy(text).into_owned()),
                    ValueRef::Blob(_) => {
                        return Err(rusqlite::Error::InvalidColumnType(
                            0,
                            "value".to_string(),
                            rusqlite::types::Type::Blob,
                        ))
                    }
                };
                Ok(value)
            },
        )
        .optional()?;
    Ok(value.flatten())
}

/// Writes `entry`, replacing any existing row with the same key.
///
/// Updates first and inserts only when nothing matched, so the single-row
/// invariant also holds on tables created without a key constraint.
pub fn upsert(conn: &Connection, entry: &ConfigEntry) -> rusqlite::Result<()> {
    let updated = conn.execute(
        "UPDATE config_t SET value = ?3 WHERE section = ?1 AND property = ?2;",
        params![entry.section, entry.property, entry.value],
    )?;
    if updated == 0 {
        conn.execute(
            "INSERT INTO config_t (section, property, value) VALUES (?1, ?2, ?3);",
            params![entry.section, entry.property, entry.value],
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{get, upsert, ConfigEntry};
    use rusqlite::Connection;

    fn keyless_config_table() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE config_t (section TEXT, property TEXT, value TEXT);")
            .unwrap();
        conn
    }

    #[test]
    fn get_returns_none_for_missing_row() {
        let conn = keyless_config_table();
        assert_eq!(get(&conn, "database", "uuid").unwrap(), None);
    }

    #[test]
    fn upsert_replaces_without_duplicating() {
        let conn = keyless_config_table();
        upsert(&conn, &ConfigEntry::new("database", "uuid", "first")).unwrap();
        upsert(&conn, &ConfigEntry::new("database", "uuid", "second")).unwrap();

        assert_eq!(get(&conn, "database", "uuid").unwrap().as_deref(), Some("second"));
        let rows: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM config_t WHERE section = 'database' AND property = 'uuid';",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[test]
    fn get_stringifies_numeric_values() {
        let conn = keyless_config_table();
        conn.execute_batch("INSERT INTO config_t VALUES ('database', 'version', 3);")
            .unwrap();
        assert_eq!(get(&conn, "database", "version").unwrap().as_deref(), Some("3"));
    }
}

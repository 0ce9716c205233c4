//! SQLite storage bootstrap and schema migration entry points.
//!
//! # Responsibility
//! - Create or open the database file for a collector run.
//! - Install the base schema and seed data on first run.
//! - Apply pending update scripts in ascending version order.
//! - Keep a persistent instance UUID in the tracking table.
//!
//! # Invariants
//! - Schema version is tracked in `config_t` (`database`/`version`).
//! - The version row is only advanced by script content, never by the engine.
//! - Core code must not read/write application data before bootstrap succeeds.

use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub mod assets;
mod install;
mod instance;
pub mod migrations;
mod open;
mod version;

pub use assets::{AssetError, AssetResult, SchemaAssets, SqlScript, UpdateScript};
pub use install::install;
pub use instance::ensure_uuid;
pub use migrations::apply_pending;
pub use open::{
    bootstrap_database, create_or_open_database, open_or_create, BootstrapReport, SchemaAction,
};
pub use version::{config_table_exists, read_version, try_query_version};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Sqlite(rusqlite::Error),
    Script {
        name: String,
        source: rusqlite::Error,
    },
    MissingVersion,
    InvalidVersion(String),
    Asset(AssetError),
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "cannot prepare database file `{}`: {source}", path.display())
            }
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::Script { name, source } => {
                write!(f, "sql script `{name}` failed: {source}")?;
                if source.to_string().contains("within a transaction") {
                    write!(
                        f,
                        " (scripts run inside a transaction owned by zpida; remove BEGIN/COMMIT from the script)"
                    )?;
                }
                Ok(())
            }
            Self::MissingVersion => write!(f, "config_t exists but holds no database version row"),
            Self::InvalidVersion(value) => {
                write!(f, "database version `{value}` is not a non-negative integer")
            }
            Self::Asset(err) => write!(f, "{err}"),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Sqlite(err) => Some(err),
            Self::Script { source, .. } => Some(source),
            Self::MissingVersion | Self::InvalidVersion(_) => None,
            Self::Asset(err) => Some(err),
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

impl From<AssetError> for DbError {
    fn from(value: AssetError) -> Self {
        Self::Asset(value)
    }
}

/// Executes every statement of `script` on `conn` without committing.
pub(crate) fn execute_script(conn: &Connection, script: &SqlScript) -> DbResult<()> {
    conn.execute_batch(&script.sql)
        .map_err(|source| script_error(script, source))
}

/// Runs one script as its own transaction and commits it.
///
/// Scripts must not carry their own `BEGIN`/`COMMIT` statements.
pub(crate) fn run_script(conn: &mut Connection, script: &SqlScript) -> DbResult<()> {
    let tx = conn
        .transaction()
        .map_err(|source| script_error(script, source))?;
    execute_script(&tx, script)?;
    tx.commit().map_err(|source| script_error(script, source))?;
    Ok(())
}

fn script_error(script: &SqlScript, source: rusqlite::Error) -> DbError {
    DbError::Script {
        name: script.name.clone(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::{run_script, DbError, SqlScript};
    use rusqlite::Connection;

    #[test]
    fn script_with_own_transaction_names_the_restriction() {
        let mut conn = Connection::open_in_memory().unwrap();
        let script = SqlScript::new(
            "02_wrapped.sql",
            "BEGIN TRANSACTION; CREATE TABLE wrapped_t (id INTEGER); COMMIT;",
        );

        let err = run_script(&mut conn, &script).expect_err("nested BEGIN must fail");

        assert!(matches!(err, DbError::Script { ref name, .. } if name == "02_wrapped.sql"));
        let message = err.to_string();
        assert!(message.contains("02_wrapped.sql"), "{message}");
        assert!(message.contains("remove BEGIN/COMMIT"), "{message}");
    }
}

//! Connection bootstrap utilities for SQLite.
//!
//! # Responsibility
//! - Create the database file (and its directory) when missing.
//! - Install or migrate the schema before handing out a connection.
//! - Guarantee a valid instance UUID on every returned connection.
//!
//! # Invariants
//! - Returned connections have the schema installed and all pending updates
//!   applied.
//! - There is no locking: one process bootstraps a location at a time.

use super::install::install;
use super::instance::ensure_uuid;
use super::migrations::apply_pending;
use super::version::{read_version, try_query_version};
use super::{DbError, DbResult, SchemaAssets};
use log::{debug, error, info, warn};
use rusqlite::Connection;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// What the bootstrap did to the schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaAction {
    /// Fresh database: base schema plus every seed script.
    Installed { seeds: Vec<String> },
    /// Existing database: only the update scripts newer than `from_version`.
    Migrated {
        from_version: u32,
        updates: Vec<String>,
    },
}

impl SchemaAction {
    /// Names of the seed or update scripts that ran, in execution order.
    pub fn applied_scripts(&self) -> &[String] {
        match self {
            Self::Installed { seeds } => seeds,
            Self::Migrated { updates, .. } => updates,
        }
    }
}

/// Outcome of [`bootstrap_database`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapReport {
    pub location: PathBuf,
    /// `true` when the database file did not exist before this call.
    pub created_file: bool,
    pub action: SchemaAction,
    pub version: u32,
    pub uuid: String,
}

/// Opens the database file at `location`, creating it and its parent
/// directories when missing.
///
/// Returns the connection and whether the file was just created.
///
/// # Errors
/// - `DbError::Io` when the directory or file cannot be created.
/// - `DbError::Sqlite` when SQLite cannot open the file.
pub fn open_or_create(location: impl AsRef<Path>) -> DbResult<(Connection, bool)> {
    let location = location.as_ref();
    if let Some(parent) = location.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_error(parent))?;
    }

    let created = !location.exists();
    if created {
        OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(location)
            .map_err(io_error(location))?;
    }

    let conn = Connection::open(location)?;
    conn.busy_timeout(Duration::from_secs(5))?;
    Ok((conn, created))
}

/// Opens the database at `location` and brings its schema up to date.
///
/// # Side effects
/// - Creates the file and directories when missing.
/// - Installs or migrates the schema and may write the instance UUID.
/// - Emits `db_open` logging events with duration and status.
pub fn bootstrap_database(
    location: impl AsRef<Path>,
    assets: &SchemaAssets,
) -> DbResult<(Connection, BootstrapReport)> {
    let location = location.as_ref();
    let started_at = Instant::now();
    info!(
        "event=db_open module=db status=start location={}",
        location.display()
    );

    match bootstrap_inner(location, assets) {
        Ok(opened) => {
            info!(
                "event=db_open module=db status=ok location={} duration_ms={}",
                location.display(),
                started_at.elapsed().as_millis()
            );
            Ok(opened)
        }
        Err(err) => {
            error!(
                "event=db_open module=db status=error location={} duration_ms={} error={}",
                location.display(),
                started_at.elapsed().as_millis(),
                err
            );
            Err(err)
        }
    }
}

/// Opens the database at `location` and brings its schema up to date,
/// discarding the bootstrap report.
pub fn create_or_open_database(
    location: impl AsRef<Path>,
    assets: &SchemaAssets,
) -> DbResult<Connection> {
    bootstrap_database(location, assets).map(|(conn, _)| conn)
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> DbError {
    let path = path.to_path_buf();
    move |source| DbError::Io { path, source }
}

fn bootstrap_inner(
    location: &Path,
    assets: &SchemaAssets,
) -> DbResult<(Connection, BootstrapReport)> {
    let (mut conn, created_file) = open_or_create(location)?;
    if created_file {
        warn!(
            "event=db_file_created module=db status=ok location={}",
            location.display()
        );
    }

    let action = match try_query_version(&conn)? {
        None => {
            let seeds = install(&mut conn, assets.schema(), assets.seeds())?;
            for seed in &seeds {
                info!("event=schema_populate module=db status=ok script={seed}");
            }
            SchemaAction::Installed { seeds }
        }
        Some(from_version) => {
            if let Some(latest) = assets.latest_update_version() {
                if from_version > latest {
                    warn!(
                        "event=schema_check module=db status=warn db_version={} latest_known={}",
                        from_version, latest
                    );
                }
            }
            let updates = apply_pending(&mut conn, from_version, assets.updates())?;
            if updates.is_empty() {
                debug!("event=schema_update module=db status=skip version={from_version}");
            }
            SchemaAction::Migrated {
                from_version,
                updates,
            }
        }
    };

    let version = read_version(&conn)?;
    let uuid = ensure_uuid(&conn)?;
    info!(
        "event=db_ready module=db status=ok location={} version={} uuid={}",
        location.display(),
        version,
        uuid
    );

    let report = BootstrapReport {
        location: location.to_path_buf(),
        created_file,
        action,
        version,
        uuid,
    };
    Ok((conn, report))
}

//! Database location resolution from the process environment.
//!
//! A `.env` file in the working directory (or one of its parents) fills in
//! variables the real environment does not set.

use std::error::Error;
use std::ffi::OsString;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

/// Environment variable holding the database file path.
pub const DATABASE_URL_ENV: &str = "DATABASE_URL";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingsError {
    MissingDatabaseUrl,
    EmptyDatabaseUrl,
}

impl Display for SettingsError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingDatabaseUrl => write!(f, "{DATABASE_URL_ENV} is not set"),
            Self::EmptyDatabaseUrl => write!(f, "{DATABASE_URL_ENV} is set but empty"),
        }
    }
}

impl Error for SettingsError {}

/// Resolves the database location, preferring an explicit override over
/// `DATABASE_URL` from the environment or a `.env` file.
pub fn database_url(override_path: Option<PathBuf>) -> Result<PathBuf, SettingsError> {
    match override_path {
        Some(path) => resolve(Some(path.into_os_string())),
        None => database_url_from_env(None),
    }
}

/// Reads `DATABASE_URL` after loading `env_file`, or the nearest `.env` when
/// `None`. Variables already in the environment are never overridden.
fn database_url_from_env(env_file: Option<&Path>) -> Result<PathBuf, SettingsError> {
    let loaded = match env_file {
        Some(path) => dotenvy::from_path(path).map(|()| path.to_path_buf()),
        None => dotenvy::dotenv(),
    };
    match loaded {
        Ok(path) => log::debug!(
            "event=env_file module=settings status=ok path={}",
            path.display()
        ),
        Err(err) if err.not_found() => {}
        Err(err) => log::warn!("event=env_file module=settings status=warn error={err}"),
    }
    resolve(std::env::var_os(DATABASE_URL_ENV))
}

fn resolve(raw: Option<OsString>) -> Result<PathBuf, SettingsError> {
    let raw = raw.ok_or(SettingsError::MissingDatabaseUrl)?;
    let blank = raw.to_str().is_some_and(|text| text.trim().is_empty());
    if raw.is_empty() || blank {
        return Err(SettingsError::EmptyDatabaseUrl);
    }
    Ok(PathBuf::from(raw))
}

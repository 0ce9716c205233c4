//! Core of the zero point data collector.
//! Owns the SQLite bootstrap: schema install, migrations and instance identity.

pub mod config_store;
pub mod db;
pub mod logging;
pub mod settings;

pub use config_store::ConfigEntry;
pub use db::{
    bootstrap_database, create_or_open_database, BootstrapReport, DbError, DbResult,
    SchemaAction, SchemaAssets,
};
pub use logging::{init_logging, level_for_verbosity, logging_status, LogOptions};
pub use settings::{database_url, SettingsError, DATABASE_URL_ENV};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}

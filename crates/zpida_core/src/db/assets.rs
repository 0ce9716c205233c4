//! Schema asset set: base schema, seed scripts and numbered update scripts.
//!
//! # Responsibility
//! - Load the script set either from the binary or from an asset directory.
//! - Parse the two-digit target-version prefix of every update script.
//!
//! # Invariants
//! - Seed scripts are kept in lexicographic filename order.
//! - Update scripts are kept in strictly increasing version order.
//! - Malformed update names and duplicate versions are rejected at load time.

use once_cell::sync::Lazy;
use regex::Regex;
use std::borrow::Cow;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub const SCHEMA_FILE_NAME: &str = "schema.sql";
pub const SEED_DIR_NAME: &str = "initial";
pub const UPDATE_DIR_NAME: &str = "updates";

const BUNDLED_SCHEMA: &str = include_str!("sql/schema.sql");
const BUNDLED_SEEDS: &[(&str, &str)] = &[("config.sql", include_str!("sql/initial/config.sql"))];
// Append new `NN_*.sql` files here as the schema evolves.
const BUNDLED_UPDATES: &[(&str, &str)] = &[];

static UPDATE_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([0-9]{2})(?:[^0-9][^/\\]*)?\.sql$").expect("valid update name regex")
});

pub type AssetResult<T> = Result<T, AssetError>;

#[derive(Debug)]
pub enum AssetError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    MissingSchema(PathBuf),
    InvalidUpdateName(String),
    DuplicateUpdateVersion {
        version: u32,
        first: String,
        second: String,
    },
}

impl Display for AssetError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "cannot read `{}`: {source}", path.display()),
            Self::MissingSchema(path) => {
                write!(f, "base schema script not found at `{}`", path.display())
            }
            Self::InvalidUpdateName(name) => write!(
                f,
                "update script `{name}` must start with a two-digit target version, e.g. `07_add_index.sql`"
            ),
            Self::DuplicateUpdateVersion {
                version,
                first,
                second,
            } => write!(
                f,
                "update scripts `{first}` and `{second}` both target version {version}"
            ),
        }
    }
}

impl Error for AssetError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// One named SQL script.
///
/// The SQL must not open or commit transactions of its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlScript {
    /// File name, used for ordering and logging.
    pub name: String,
    pub sql: Cow<'static, str>,
}

impl SqlScript {
    pub fn new(name: impl Into<String>, sql: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: name.into(),
            sql: sql.into(),
        }
    }
}

/// An update script together with the version it upgrades the database to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateScript {
    pub version: u32,
    pub script: SqlScript,
}

impl UpdateScript {
    /// Parses the target version from the script's two-digit name prefix.
    ///
    /// # Errors
    /// - Returns `AssetError::InvalidUpdateName` when the name is not
    ///   `NN.sql` or `NN<non-digit>...sql`.
    pub fn parse(script: SqlScript) -> AssetResult<Self> {
        let version = UPDATE_NAME_RE
            .captures(&script.name)
            .and_then(|caps| caps.get(1))
            .and_then(|prefix| prefix.as_str().parse::<u32>().ok())
            .ok_or_else(|| AssetError::InvalidUpdateName(script.name.clone()))?;
        Ok(Self { version, script })
    }

    pub fn name(&self) -> &str {
        &self.script.name
    }
}

/// The full set of scripts a database is bootstrapped from.
///
/// Built once at process start and passed into the bootstrap, so tests can
/// swap in their own fixtures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaAssets {
    schema: SqlScript,
    seeds: Vec<SqlScript>,
    updates: Vec<UpdateScript>,
}

impl SchemaAssets {
    /// Builds an asset set, ordering seeds by name and updates by version.
    ///
    /// # Errors
    /// - Returns an error when an update name has no valid prefix.
    /// - Returns an error when two update scripts target the same version.
    pub fn new(
        schema: SqlScript,
        mut seeds: Vec<SqlScript>,
        updates: Vec<SqlScript>,
    ) -> AssetResult<Self> {
        seeds.sort_by(|left, right| left.name.cmp(&right.name));

        let mut updates = updates
            .into_iter()
            .map(UpdateScript::parse)
            .collect::<AssetResult<Vec<_>>>()?;
        updates.sort_by(|left, right| {
            left.version
                .cmp(&right.version)
                .then_with(|| left.script.name.cmp(&right.script.name))
        });
        for pair in updates.windows(2) {
            if pair[0].version == pair[1].version {
                return Err(AssetError::DuplicateUpdateVersion {
                    version: pair[0].version,
                    first: pair[0].script.name.clone(),
                    second: pair[1].script.name.clone(),
                });
            }
        }

        Ok(Self {
            schema,
            seeds,
            updates,
        })
    }

    /// Returns the scripts compiled into this binary.
    pub fn bundled() -> AssetResult<Self> {
        Self::new(
            SqlScript::new(SCHEMA_FILE_NAME, BUNDLED_SCHEMA),
            BUNDLED_SEEDS
                .iter()
                .map(|(name, sql)| SqlScript::new(*name, *sql))
                .collect(),
            BUNDLED_UPDATES
                .iter()
                .map(|(name, sql)| SqlScript::new(*name, *sql))
                .collect(),
        )
    }

    /// Loads `schema.sql`, `initial/*.sql` and `updates/*.sql` below `root`.
    ///
    /// Missing `initial/` or `updates/` directories mean "no scripts".
    ///
    /// Every script runs inside a transaction the bootstrap opens and
    /// commits, so scripts must not contain `BEGIN`/`COMMIT` themselves.
    ///
    /// # Errors
    /// - Returns `AssetError::MissingSchema` when `schema.sql` is absent.
    /// - Returns `AssetError::Io` when a directory or script cannot be read.
    pub fn from_dir(root: impl AsRef<Path>) -> AssetResult<Self> {
        let root = root.as_ref();
        let schema_path = root.join(SCHEMA_FILE_NAME);
        if !schema_path.is_file() {
            return Err(AssetError::MissingSchema(schema_path));
        }
        let schema = SqlScript::new(SCHEMA_FILE_NAME, read_to_string(&schema_path)?);
        let seeds = read_sql_dir(&root.join(SEED_DIR_NAME))?;
        let updates = read_sql_dir(&root.join(UPDATE_DIR_NAME))?;
        Self::new(schema, seeds, updates)
    }

    pub fn schema(&self) -> &SqlScript {
        &self.schema
    }

    pub fn seeds(&self) -> &[SqlScript] {
        &self.seeds
    }

    pub fn updates(&self) -> &[UpdateScript] {
        &self.updates
    }

    /// Highest version any bundled update script leads to.
    pub fn latest_update_version(&self) -> Option<u32> {
        self.updates.last().map(|update| update.version)
    }
}

fn read_sql_dir(dir: &Path) -> AssetResult<Vec<SqlScript>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let io_error = |source| AssetError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut scripts = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(io_error)? {
        let path = entry.map_err(io_error)?.path();
        if !path.is_file() || path.extension().and_then(|ext| ext.to_str()) != Some("sql") {
            continue;
        }
        let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
            log::warn!(
                "event=asset_skip module=db status=warn reason=non_utf8_name path={}",
                path.display()
            );
            continue;
        };
        scripts.push(SqlScript::new(name.to_string(), read_to_string(&path)?));
    }
    Ok(scripts)
}

fn read_to_string(path: &Path) -> AssetResult<String> {
    std::fs::read_to_string(path).map_err(|source| AssetError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::{AssetError, SchemaAssets, SqlScript, UpdateScript};

    fn update(name: &str) -> SqlScript {
        SqlScript::new(name, "SELECT 1;")
    }

    #[test]
    fn parse_reads_two_digit_prefix() {
        let parsed = UpdateScript::parse(update("07_add_index.sql")).unwrap();
        assert_eq!(parsed.version, 7);
        assert_eq!(parsed.name(), "07_add_index.sql");

        assert_eq!(UpdateScript::parse(update("12.sql")).unwrap().version, 12);
    }

    #[test]
    fn parse_rejects_malformed_prefixes() {
        for name in ["7_add.sql", "123_add.sql", "ab_add.sql", "07_add.txt", "add_07.sql"] {
            let err = UpdateScript::parse(update(name)).expect_err("malformed name must fail");
            assert!(matches!(err, AssetError::InvalidUpdateName(ref bad) if bad == name));
        }
    }

    #[test]
    fn new_orders_seeds_by_name_and_updates_by_version() {
        let assets = SchemaAssets::new(
            SqlScript::new("schema.sql", ""),
            vec![update("b.sql"), update("a.sql")],
            vec![update("10_c.sql"), update("02_a.sql"), update("05_b.sql")],
        )
        .unwrap();

        let seeds: Vec<_> = assets.seeds().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(seeds, ["a.sql", "b.sql"]);
        let versions: Vec<_> = assets.updates().iter().map(|u| u.version).collect();
        assert_eq!(versions, [2, 5, 10]);
        assert_eq!(assets.latest_update_version(), Some(10));
    }

    #[test]
    fn new_rejects_duplicate_update_versions() {
        let err = SchemaAssets::new(
            SqlScript::new("schema.sql", ""),
            Vec::new(),
            vec![update("03_b.sql"), update("03_a.sql")],
        )
        .expect_err("duplicate versions must fail");
        match err {
            AssetError::DuplicateUpdateVersion {
                version,
                first,
                second,
            } => {
                assert_eq!(version, 3);
                assert_eq!(first, "03_a.sql");
                assert_eq!(second, "03_b.sql");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn bundled_assets_are_well_formed() {
        let assets = SchemaAssets::bundled().unwrap();
        assert!(assets.schema().sql.contains("config_t"));
        assert!(!assets.seeds().is_empty());
    }
}

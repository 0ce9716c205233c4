//! Process logging bootstrap.
//!
//! # Responsibility
//! - Initialize console and/or daily-rotated file logging once per process.
//! - Capture panics as sanitized log events.
//!
//! # Invariants
//! - Logging init is idempotent for identical options.
//! - Re-initialization with different options is rejected.
//! - Logging initialization must not panic.

use flexi_logger::{
    Age, Cleanup, Criterion, Duplicate, FileSpec, Logger, LoggerHandle, Naming, WriteMode,
};
use log::{error, info};
use once_cell::sync::OnceCell;
use std::path::PathBuf;

const MAX_LOG_FILES: usize = 365;
const MAX_PANIC_PAYLOAD_CHARS: usize = 160;

static LOGGING_STATE: OnceCell<LoggingState> = OnceCell::new();
static PANIC_HOOK_INSTALLED: OnceCell<()> = OnceCell::new();

struct LoggingState {
    options: ResolvedOptions,
    _logger: LoggerHandle,
}

/// Where and how verbosely to log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogOptions {
    /// One of `trace|debug|info|warn|error` (case-insensitive).
    pub level: String,
    /// Write log lines to stderr.
    pub console: bool,
    /// Write log lines to this file, rotated at midnight.
    pub log_file: Option<PathBuf>,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            console: false,
            log_file: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ResolvedOptions {
    level: &'static str,
    console: bool,
    log_file: Option<PathBuf>,
}

/// Initializes process logging.
///
/// With neither `console` nor `log_file` set, log records are discarded.
///
/// # Errors
/// - Returns an error when `level` is unsupported or `log_file` is blank.
/// - Returns an error when logging is already active with other options.
/// - Returns an error when the logger backend cannot start.
pub fn init_logging(options: &LogOptions) -> Result<(), String> {
    let resolved = resolve_options(options)?;

    let state = LOGGING_STATE.get_or_try_init(|| -> Result<LoggingState, String> {
        let logger = start_logger(&resolved)?;
        install_panic_hook_once();

        info!(
            "event=app_start module=core status=ok platform={} version={}",
            std::env::consts::OS,
            env!("CARGO_PKG_VERSION")
        );
        info!(
            "event=logging_init module=core status=ok level={} console={} log_file={}",
            resolved.level,
            resolved.console,
            resolved
                .log_file
                .as_deref()
                .map_or_else(|| "-".to_string(), |path| path.display().to_string())
        );

        Ok(LoggingState {
            options: resolved.clone(),
            _logger: logger,
        })
    })?;

    if state.options != resolved {
        return Err(format!(
            "logging already initialized with {:?}; refusing to switch to {:?}",
            state.options, resolved
        ));
    }

    Ok(())
}

/// Returns the active level and log file, or `None` before initialization.
pub fn logging_status() -> Option<(&'static str, Option<PathBuf>)> {
    LOGGING_STATE
        .get()
        .map(|state| (state.options.level, state.options.log_file.clone()))
}

/// Maps the CLI verbosity switches to a level name.
pub fn level_for_verbosity(verbose: bool, quiet: bool) -> &'static str {
    if verbose {
        "debug"
    } else if quiet {
        "error"
    } else {
        "info"
    }
}

fn start_logger(options: &ResolvedOptions) -> Result<LoggerHandle, String> {
    let logger = Logger::try_with_str(options.level)
        .map_err(|err| format!("invalid log level `{}`: {err}", options.level))?;

    let logger = match (&options.log_file, options.console) {
        (Some(path), console) => {
            let file_spec = FileSpec::try_from(path.as_path())
                .map_err(|err| format!("invalid log file `{}`: {err}", path.display()))?;
            logger
                .log_to_file(file_spec)
                .rotate(
                    Criterion::Age(Age::Day),
                    Naming::Timestamps,
                    Cleanup::KeepLogFiles(MAX_LOG_FILES),
                )
                .append()
                .format_for_files(flexi_logger::detailed_format)
                .duplicate_to_stderr(if console {
                    Duplicate::All
                } else {
                    Duplicate::None
                })
                .format_for_stderr(flexi_logger::opt_format)
                .write_mode(WriteMode::BufferAndFlush)
        }
        (None, true) => logger
            .log_to_stderr()
            .format_for_stderr(flexi_logger::opt_format),
        (None, false) => logger.do_not_log(),
    };

    logger
        .start()
        .map_err(|err| format!("failed to start logger: {err}"))
}

fn resolve_options(options: &LogOptions) -> Result<ResolvedOptions, String> {
    let level = normalize_level(&options.level)?;
    let log_file = match &options.log_file {
        Some(path) if path.as_os_str().is_empty() => {
            return Err("log_file cannot be empty".to_string())
        }
        Some(path) => {
            if let Some(parent) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).map_err(|err| {
                    format!("failed to create log directory `{}`: {err}", parent.display())
                })?;
            }
            Some(path.clone())
        }
        None => None,
    };
    Ok(ResolvedOptions {
        level,
        console: options.console,
        log_file,
    })
}

fn normalize_level(level: &str) -> Result<&'static str, String> {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => Ok("trace"),
        "debug" => Ok("debug"),
        "info" => Ok("info"),
        "warn" | "warning" => Ok("warn"),
        "error" => Ok("error"),
        other => Err(format!(
            "unsupported log level `{other}`; expected trace|debug|info|warn|error"
        )),
    }
}

fn install_panic_hook_once() {
    if PANIC_HOOK_INSTALLED.get().is_some() {
        return;
    }

    let previous_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let location = panic_info
            .location()
            .map(|loc| format!("{}:{}", loc.file(), loc.line()))
            .unwrap_or_else(|| "unknown".to_string());
        let payload = panic_payload_summary(panic_info);
        error!(
            "event=panic_captured module=core status=error location={} payload={}",
            location, payload
        );
        previous_hook(panic_info);
    }));

    let _ = PANIC_HOOK_INSTALLED.set(());
}

fn panic_payload_summary(info: &std::panic::PanicHookInfo<'_>) -> String {
    let payload = if let Some(message) = info.payload().downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = info.payload().downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    };

    sanitize_message(&payload, MAX_PANIC_PAYLOAD_CHARS)
}

fn sanitize_message(value: &str, max_chars: usize) -> String {
    let normalized = value.replace(['\n', '\r'], " ");
    let mut truncated = normalized.chars().take(max_chars).collect::<String>();
    if normalized.chars().count() > max_chars {
        truncated.push_str("...");
    }
    truncated
}

#[cfg(test)]
mod tests {
    use super::{
        init_logging, level_for_verbosity, logging_status, normalize_level, resolve_options,
        sanitize_message, LogOptions,
    };
    use std::path::PathBuf;

    #[test]
    fn normalize_level_accepts_known_values() {
        assert_eq!(normalize_level("INFO").expect("INFO should normalize"), "info");
        assert_eq!(
            normalize_level(" warning ").expect("warning should normalize"),
            "warn"
        );
        assert!(normalize_level("verbose").is_err());
    }

    #[test]
    fn verbosity_switches_map_to_levels() {
        assert_eq!(level_for_verbosity(true, false), "debug");
        assert_eq!(level_for_verbosity(false, true), "error");
        assert_eq!(level_for_verbosity(false, false), "info");
    }

    #[test]
    fn resolve_options_rejects_empty_log_file() {
        let options = LogOptions {
            log_file: Some(PathBuf::new()),
            ..LogOptions::default()
        };
        let error = resolve_options(&options).expect_err("empty path must be rejected");
        assert!(error.contains("empty"));
    }

    #[test]
    fn sanitize_message_removes_newlines_and_truncates() {
        let sanitized = sanitize_message("line1\nline2\rline3", 8);
        assert!(!sanitized.contains('\n'));
        assert!(!sanitized.contains('\r'));
        assert!(sanitized.ends_with("..."));
    }

    #[test]
    fn init_logging_is_idempotent_for_same_options_and_rejects_conflicts() {
        let dir = tempfile::tempdir().expect("temp dir");
        let options = LogOptions {
            level: "info".to_string(),
            console: false,
            log_file: Some(dir.path().join("logs").join("zpida.log")),
        };

        init_logging(&options).expect("first init should succeed");
        init_logging(&options).expect("same options should be idempotent");

        let level_error = init_logging(&LogOptions {
            level: "debug".to_string(),
            ..options.clone()
        })
        .expect_err("level conflict should fail");
        assert!(level_error.contains("refusing to switch"));

        let file_error = init_logging(&LogOptions {
            log_file: Some(dir.path().join("other.log")),
            ..options.clone()
        })
        .expect_err("file conflict should fail");
        assert!(file_error.contains("refusing to switch"));

        let (active_level, active_file) = logging_status().expect("logging should be active");
        assert_eq!(active_level, "info");
        assert_eq!(active_file, options.log_file);
    }
}

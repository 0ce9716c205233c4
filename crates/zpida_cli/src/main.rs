//! `zpida` command line entry point.
//!
//! # Responsibility
//! - Parse global logging switches and subcommands.
//! - Resolve the database location and run the selected command.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{error, info};
use std::path::PathBuf;
use std::process::ExitCode;
use zpida_core::{
    bootstrap_database, database_url, init_logging, level_for_verbosity, LogOptions,
    SchemaAction, SchemaAssets,
};

/// Zero point data collector tool
#[derive(Parser, Debug)]
#[command(name = "zpida", version, about = "Zero point data collector tool")]
struct Cli {
    /// Verbose output
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Quiet output
    #[arg(short, long)]
    quiet: bool,

    /// Log to console
    #[arg(short, long)]
    console: bool,

    /// Optional log file, rotated daily
    #[arg(short, long)]
    log_file: Option<PathBuf>,

    /// Database file; defaults to $DATABASE_URL
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Directory with schema.sql, initial/ and updates/ replacing the bundled scripts
    #[arg(long, global = true)]
    assets: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Database commands
    Dbase {
        #[command(subcommand)]
        action: DbaseCommand,
    },
}

#[derive(Subcommand, Debug)]
enum DbaseCommand {
    /// Create the database or apply pending schema updates
    Update,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let options = LogOptions {
        level: level_for_verbosity(cli.verbose, cli.quiet).to_string(),
        console: cli.console,
        log_file: cli.log_file.clone(),
    };
    if let Err(message) = init_logging(&options) {
        eprintln!("zpida: {message}");
        return ExitCode::FAILURE;
    }
    info!(
        "============== zpida {} ==============",
        zpida_core::core_version()
    );

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=cli_exit module=cli status=error error={err:#}");
            eprintln!("zpida: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Dbase {
            action: DbaseCommand::Update,
        } => dbase_update(cli.database, cli.assets),
    }
}

fn dbase_update(database: Option<PathBuf>, assets_dir: Option<PathBuf>) -> Result<()> {
    let location = database_url(database)?;
    let assets = match assets_dir {
        Some(dir) => SchemaAssets::from_dir(&dir)
            .with_context(|| format!("loading schema assets from {}", dir.display()))?,
        None => SchemaAssets::bundled().context("loading bundled schema assets")?,
    };

    let (_conn, report) = bootstrap_database(&location, &assets)
        .with_context(|| format!("opening database {}", location.display()))?;

    let verb = match &report.action {
        SchemaAction::Installed { .. } => "populated",
        SchemaAction::Migrated { .. } => "updated",
    };
    for script in report.action.applied_scripts() {
        println!("{verb}: {script}");
    }
    println!(
        "database {} version={} uuid={}",
        report.location.display(),
        report.version,
        report.uuid
    );
    Ok(())
}

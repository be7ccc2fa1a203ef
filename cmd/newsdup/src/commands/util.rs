//! Utility functions for CLI commands.

use std::sync::Arc;

use anyhow::Context as _;
use chrono::{NaiveDate, Utc};
use newsdup_engine::{EngineConfig, RunContext};
use newsdup_kv::RedbStore;
use tracing::debug;

use crate::Cli;

/// Loads the engine configuration, or the defaults without `--config`.
pub fn load_config(cli: &Cli) -> anyhow::Result<EngineConfig> {
    match cli.config.as_deref() {
        Some(path) => Ok(EngineConfig::from_yaml_file(path)?),
        None => Ok(EngineConfig::default()),
    }
}

/// Resolves `--run-date`, defaulting to today in UTC.
pub fn run_date(cli: &Cli) -> anyhow::Result<NaiveDate> {
    match cli.run_date.as_deref() {
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .with_context(|| format!("invalid --run-date {s:?}, want YYYY-MM-DD")),
        None => Ok(Utc::now().date_naive()),
    }
}

/// Opens the database and warm-loads a run context.
pub fn open_context(cli: &Cli) -> anyhow::Result<RunContext> {
    let cfg = load_config(cli)?;
    let date = run_date(cli)?;
    debug!(db = %cli.db, run_date = %date, "opening run");

    let kv = RedbStore::open(&cli.db).with_context(|| format!("open {}", cli.db))?;
    Ok(RunContext::open(cfg, Arc::new(kv), date)?)
}

/// Outputs result as JSON or YAML.
pub fn output_result<T: serde::Serialize>(result: &T, as_json: bool) -> anyhow::Result<()> {
    let output = if as_json {
        serde_json::to_string_pretty(result)? + "\n"
    } else {
        serde_yaml::to_string(result)?
    };
    print!("{}", output);
    Ok(())
}

/// Prints a success message to stderr.
pub fn print_success(msg: &str) {
    eprintln!("\x1b[32m✓\x1b[0m {}", msg);
}

/// Prints a message to stderr when verbose.
pub fn print_verbose(cli: &Cli, msg: &str) {
    if cli.verbose {
        eprintln!("[verbose] {}", msg);
    }
}

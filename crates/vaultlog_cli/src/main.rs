//! CLI smoke entry point.
//!
//! # Responsibility
//! - Feed one batch of log text from stdin into a SQLite vault file.
//! - Print where the text was placed, for quick local sanity checks.

mod cli;

use clap::Parser;
use cli::Cli;
use std::io::Read;
use std::process::ExitCode;
use vaultlog_core::db::open_db;
use vaultlog_core::{default_log_level, init_logging, RollingWriter, SqliteRecordStore};

fn main() -> ExitCode {
    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("vaultlog: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), String> {
    if let Some(log_dir) = &cli.log_dir {
        let level = cli.log_level.as_deref().unwrap_or_else(|| default_log_level());
        init_logging(level, log_dir)?;
    }

    let conn = open_db(&cli.vault).map_err(|err| err.to_string())?;
    let config = cli.rolling_config();
    let store = SqliteRecordStore::new(&conn);
    // Smoke runs bootstrap their own vault structure.
    store
        .provision_structure(config.shape)
        .map_err(|err| err.to_string())?;
    let writer = RollingWriter::new(store, config).map_err(|err| err.to_string())?;

    let mut batch = String::new();
    std::io::stdin()
        .read_to_string(&mut batch)
        .map_err(|err| format!("failed to read stdin: {err}"))?;

    let report = writer
        .try_save_log_message(&batch)
        .map_err(|err| err.to_string())?;
    if let Some(title) = &report.appended_to {
        println!("appended {} chars to {title}", report.appended_chars);
    }
    for title in &report.created {
        println!("created {title}");
    }
    for title in &report.failed_creates {
        println!("failed to create {title}");
    }
    log::info!(
        "event=cli_save module=cli status=ok created={} failed_creates={}",
        report.created.len(),
        report.failed_creates.len()
    );
    Ok(())
}

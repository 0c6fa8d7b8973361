//! Command-line arguments for the smoke binary.

use clap::Parser;
use std::path::PathBuf;
use vaultlog_core::{RollingLogConfig, DEFAULT_TITLE_PREFIX};

/// Append one batch of log text from stdin to a SQLite vault.
#[derive(Parser, Debug)]
#[command(name = "vaultlog", version)]
pub struct Cli {
    /// SQLite vault file; created and provisioned when missing
    #[arg(value_name = "VAULT")]
    pub vault: PathBuf,

    /// Title prefix placed before the record date
    #[arg(value_name = "PREFIX", default_value = DEFAULT_TITLE_PREFIX)]
    pub prefix: String,

    /// Write uncapped file records instead of capped property records
    #[arg(long)]
    pub file: bool,

    /// Absolute directory for diagnostic logs; logging stays off when unset
    #[arg(long, value_name = "DIR", env = "VAULTLOG_LOG_DIR")]
    pub log_dir: Option<String>,

    /// Diagnostic log level (trace|debug|info|warn|error)
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,
}

impl Cli {
    /// Writer configuration selected by the arguments.
    pub fn rolling_config(&self) -> RollingLogConfig {
        if self.file {
            RollingLogConfig::file(self.prefix.clone())
        } else {
            RollingLogConfig::property(self.prefix.clone())
        }
    }
}

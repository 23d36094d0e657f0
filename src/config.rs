//! Command-line configuration.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use crate::error::KeygenError;
use crate::matcher::SearchQuery;
use crate::worker::SearchOptions;

/// Ethereum Key Generator
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Generate random keypairs
    Generate(GenerateArgs),
    /// Search for a keypair whose address has a given prefix and/or suffix
    Search(SearchArgs),
}

#[derive(Args, Debug, Clone)]
pub struct GenerateArgs {
    /// Number of keypairs to generate
    #[arg(short = 'n', long, default_value = "1", allow_negative_numbers = true)]
    pub count: i64,

    /// Write the keypairs as JSON to this file (e.g. eth_keys.json)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct SearchArgs {
    /// Address prefix (hex, `0x` optional)
    #[arg(short, long)]
    pub prefix: Option<String>,

    /// Address suffix (hex)
    #[arg(short, long)]
    pub suffix: Option<String>,

    /// Match against the EIP-55 checksum casing
    #[arg(short = 'c', long, default_value = "false")]
    pub case_sensitive: bool,

    /// Number of worker threads (default: number of CPU cores)
    #[arg(short = 'w', long)]
    pub workers: Option<usize>,

    /// Progress report interval in milliseconds
    #[arg(short = 'r', long, default_value = "1000")]
    pub report_interval_ms: u64,

    /// Write the found keypair as JSON to this file (e.g. eth_keys.json)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl SearchArgs {
    /// Returns the number of workers, defaulting to CPU count
    pub fn worker_count(&self) -> usize {
        self.workers.unwrap_or_else(num_cpus::get)
    }

    /// Builds the validated query.
    pub fn query(&self) -> Result<SearchQuery, KeygenError> {
        SearchQuery::new(
            self.prefix.as_deref(),
            self.suffix.as_deref(),
            self.case_sensitive,
        )
    }

    pub fn search_options(&self) -> SearchOptions {
        SearchOptions {
            workers: self.worker_count(),
            progress_interval: Duration::from_millis(self.report_interval_ms),
        }
    }
}

impl Config {
    /// Validates the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        match &self.command {
            Command::Generate(args) => {
                if args.count < 1 {
                    return Err(ConfigError::InvalidCount(args.count));
                }
            }
            Command::Search(args) => {
                args.query()?;
                if args.worker_count() == 0 {
                    return Err(ConfigError::InvalidWorkers);
                }
                if args.report_interval_ms == 0 {
                    return Err(ConfigError::InvalidInterval);
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid count {0}: must be at least 1")]
    InvalidCount(i64),

    #[error(transparent)]
    InvalidQuery(#[from] KeygenError),

    #[error("Worker count must be at least 1")]
    InvalidWorkers,

    #[error("Report interval must be greater than zero")]
    InvalidInterval,
}

//! CLI command definitions and subcommands

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::domain::{Mode, Tier};

/// Tierscan - tiered enrichment scan orchestrator
#[derive(Parser)]
#[command(
    name = "tierscan",
    about = "Calendar-aware orchestrator for tiered enrichment scans",
    version = env!("CARGO_PKG_VERSION"),
    after_help = "Logs are written to: ~/.local/share/tierscan/logs/tierscan.log"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    /// Log to stderr instead of the log file
    #[arg(long, global = true)]
    pub stderr: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Subcommand)]
pub enum Command {
    /// Run the orchestrator in the foreground until SIGINT/SIGTERM
    Run,

    /// Launch one tier scan now and wait for it to finish
    Scan {
        /// Tier to scan (hot, active, dormant)
        #[arg(value_name = "TIER")]
        tier: Tier,

        /// Override the tier's default mode (full, standard, fast, turbo)
        #[arg(short, long)]
        mode: Option<Mode>,
    },

    /// Print the current tier ranking
    Rank {
        /// How many top entries to list
        #[arg(short, long, default_value = "10")]
        top: usize,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Check whether scheduled runs are allowed on a date
    CheckDay {
        /// Date to check (YYYY-MM-DD); defaults to today in the operative timezone
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },

    /// Show the last status snapshot written by `run`
    Status {
        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },
}

/// Output format for status/rank commands
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "plain" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown format: {}. Use: text or json", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
        }
    }
}

/// Path of the log file the binary writes to
pub fn get_log_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tierscan")
        .join("logs")
        .join("tierscan.log")
}

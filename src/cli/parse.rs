//! CLI parse: clap types for Pixbatch. No behavior; definitions only.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Pixbatch CLI - Batch sprite generation
#[derive(Parser)]
#[command(name = "pixbatch")]
#[command(about = "Generate batches of sprites from a session description")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace root directory
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file layered over global, workspace and environment settings
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(long, default_value = "false")]
    pub verbose: bool,

    /// Disable logging entirely
    #[arg(long, default_value = "false")]
    pub quiet: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file, both)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output includes a file)
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate every item of a session and write its record
    Run {
        /// Session description (JSON)
        input: PathBuf,
        /// Generation strategy (synchronous, async_polled)
        #[arg(long)]
        strategy: Option<String>,
        /// Directory for the session record
        #[arg(long)]
        records_dir: Option<PathBuf>,
        /// Pause between consecutive items, in milliseconds
        #[arg(long)]
        pacing_ms: Option<u64>,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Check a session description without contacting the service
    Validate {
        /// Session description (JSON)
        input: PathBuf,
    },
    /// Print the flattened task list of a session
    Plan {
        /// Session description (JSON)
        input: PathBuf,
        /// Write the task list to this file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
        /// Output format (text or json)
        #[arg(long, default_value = "json")]
        format: String,
    },
    /// Show the effective configuration
    Config,
}

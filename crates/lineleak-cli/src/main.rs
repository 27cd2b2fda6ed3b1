//! lineleak CLI tool.
//!
//! Usage:
//! ```bash
//! lineleak check [OPTIONS] [PATH]
//! lineleak init
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod config_resolver;

use commands::check::{CheckArgs, LineleakOverrides};

/// Counts live code lines in Python files and flags files over the limit
#[derive(Parser)]
#[command(name = "lineleak")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "LINELEAK_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check files for live code leaks
    Check {
        /// File or directory to analyze (default: current directory)
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,

        /// Exclude patterns (can be specified multiple times)
        #[arg(short, long)]
        exclude: Vec<String>,

        /// Fail instead of skipping files that cannot be tokenized
        #[arg(long)]
        fail_on_parse_error: bool,

        #[command(flatten)]
        overrides: LineleakOverrides,
    },

    /// Initialize configuration file
    Init {
        /// Overwrite existing config
        #[arg(long)]
        force: bool,
    },
}

/// Output format for lint results.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output.
    Json,
    /// One-line-per-finding compact format.
    Compact,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Check {
            path,
            format,
            exclude,
            fail_on_parse_error,
            overrides,
        } => {
            let source = config_resolver::resolve(&path, cli.config.as_deref());
            let args = CheckArgs {
                path,
                format,
                exclude,
                fail_on_parse_error,
                overrides,
            };
            let failed = commands::check::run(&args, &source)?;
            if failed {
                std::process::exit(1);
            }
            Ok(())
        }
        Commands::Init { force } => commands::init::run(force),
    }
}

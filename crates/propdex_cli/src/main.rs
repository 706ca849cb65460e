//! propdex CLI
//!
//! Command-line tools for propdex index directories.
//!
//! # Commands
//!
//! - `stats` - Display document counts, log size and generation
//! - `search` - Run a query against one entity class
//! - `dump` - Print stored documents
//! - `compact` - Rewrite the index log without deleted documents
//! - `clean` - Delete the index directory

mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// propdex command-line index tools.
#[derive(Parser)]
#[command(name = "propdex")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the index directory
    #[arg(global = true, short, long)]
    path: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    /// Human-readable text
    Text,
    /// Pretty-printed JSON
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Display index statistics
    Stats {
        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: Format,
    },

    /// Search the documents of one entity class
    Search {
        /// Fully qualified entity class
        #[arg(short, long)]
        class: String,

        /// Query text
        query: String,

        /// Number of ranked hits to skip
        #[arg(long, default_value = "0")]
        offset: usize,

        /// Maximum number of hits
        #[arg(short, long, default_value = "10")]
        limit: usize,

        /// Print stored documents instead of identifiers
        #[arg(short, long)]
        raw: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: Format,
    },

    /// Print stored documents
    Dump {
        /// Maximum number of documents to print
        #[arg(short, long)]
        limit: Option<usize>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: Format,
    },

    /// Rewrite the index log with live documents only
    Compact,

    /// Delete the index directory
    Clean,

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Stats { format } => {
            let path = cli.path.ok_or("Index path required for stats")?;
            commands::stats::run(&path, format)?;
        }
        Commands::Search {
            class,
            query,
            offset,
            limit,
            raw,
            format,
        } => {
            let path = cli.path.ok_or("Index path required for search")?;
            let request = commands::search::SearchRequest {
                class: &class,
                query: &query,
                offset,
                limit,
                raw,
            };
            commands::search::run(&path, &request, format)?;
        }
        Commands::Dump { limit, format } => {
            let path = cli.path.ok_or("Index path required for dump")?;
            commands::dump::run(&path, limit, format)?;
        }
        Commands::Compact => {
            let path = cli.path.ok_or("Index path required for compact")?;
            commands::compact::run(&path)?;
        }
        Commands::Clean => {
            let path = cli.path.ok_or("Index path required for clean")?;
            commands::clean::run(&path)?;
        }
        Commands::Version => {
            println!("propdex CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("propdex core v{}", propdex_core::VERSION);
        }
    }

    Ok(())
}

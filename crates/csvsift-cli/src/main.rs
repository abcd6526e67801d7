//! # csvsift CLI
//!
//! Command-line interface for searching CSV files inside ZIP archives.
//!
//! ## Commands
//!
//! - `csvsift search <folder> --query <file>` - Scan archives and export matches
//! - `csvsift columns <folder>` - List the columns of the first CSV found
//! - `csvsift query <action>` - Create and edit query files
//!
//! ## Example Usage
//!
//! ```bash
//! # Build a query: Age > 18 AND (City = oslo OR City = bergen)
//! csvsift query new adults.json
//! csvsift query add adults.json --column Age --type gt --value 18
//! csvsift query add adults.json --column City --type eq --value oslo --indent 1
//! csvsift query add adults.json --column City --type eq --value bergen --or --indent 1
//!
//! # Search every archive below ./data
//! csvsift search ./data --query adults.json -r -o adults.csv
//! ```

mod commands;

use clap::{Parser, Subcommand};
use csvsift_core::SearchType;
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// csvsift - Boolean search over CSV files packed in ZIP archives
#[derive(Parser)]
#[command(name = "csvsift")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search the archives in a folder
    Search {
        /// Folder holding the archives
        folder: PathBuf,

        /// Query file (JSON list of criteria)
        #[arg(long)]
        query: PathBuf,

        /// Include subfolders
        #[arg(short, long, overrides_with = "no_recursive")]
        recursive: bool,

        /// Only the folder itself, even if the config enables recursion
        #[arg(long, overrides_with = "recursive")]
        no_recursive: bool,

        /// Export path (defaults to a timestamped file name)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// List the columns of the first CSV file in the first archive
    Columns {
        /// Folder holding the archives
        folder: PathBuf,

        /// Include subfolders
        #[arg(short, long, overrides_with = "no_recursive")]
        recursive: bool,

        /// Only the folder itself, even if the config enables recursion
        #[arg(long, overrides_with = "recursive")]
        no_recursive: bool,
    },

    /// Create and edit query files
    #[command(subcommand)]
    Query(QueryCommand),
}

#[derive(Subcommand)]
enum QueryCommand {
    /// Create an empty query file
    New {
        file: PathBuf,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Append a criterion
    Add {
        file: PathBuf,

        /// Column to test
        #[arg(long)]
        column: String,

        /// Search type (eq, in, re, gt, lt, between, on, before, after, between-dates)
        #[arg(short = 't', long = "type")]
        search_type: SearchType,

        /// Value to compare against
        #[arg(long)]
        value: String,

        /// Upper bound for range searches
        #[arg(long)]
        value2: Option<String>,

        /// Negate the test
        #[arg(long)]
        not: bool,

        /// Join with OR instead of AND
        #[arg(long)]
        or: bool,

        /// Nesting level
        #[arg(long, default_value = "0")]
        indent: u32,
    },

    /// Remove the criterion at a position (1-based)
    Remove { file: PathBuf, index: usize },

    /// Nest the criterion at a position one level deeper
    Indent { file: PathBuf, index: usize },

    /// Move the criterion at a position one level out
    Outdent { file: PathBuf, index: usize },

    /// Print the criteria and the expression they form
    Show { file: PathBuf },
}

#[derive(Clone, Debug, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

/// Recursion requested on the command line, if any. `None` defers to the config.
fn recursion(recursive: bool, no_recursive: bool) -> Option<bool> {
    match (recursive, no_recursive) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = match &cli.config {
        Some(path) => csvsift_core::Config::load_from(path)?,
        None => csvsift_core::Config::load()?,
    };

    // Setup logging
    let log_level = if cli.quiet {
        "error".to_string()
    } else {
        match cli.verbose {
            0 => config.general.log_level.clone(),
            1 => "debug".to_string(),
            _ => "trace".to_string(),
        }
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_level)))
        .init();

    // Execute command
    match cli.command {
        Commands::Search {
            folder,
            query,
            recursive,
            no_recursive,
            output,
            format,
        } => commands::search::run(
            &config,
            &folder,
            &query,
            recursion(recursive, no_recursive),
            output.as_deref(),
            format,
            cli.quiet,
        ),
        Commands::Columns {
            folder,
            recursive,
            no_recursive,
        } => commands::columns::run(
            &config,
            &folder,
            recursion(recursive, no_recursive),
            cli.quiet,
        ),
        Commands::Query(action) => match action {
            QueryCommand::New { file, force } => commands::query::new(&file, force),
            QueryCommand::Add {
                file,
                column,
                search_type,
                value,
                value2,
                not,
                or,
                indent,
            } => {
                let mut criterion = csvsift_core::Criterion::new(column, search_type, value);
                if let Some(value2) = value2 {
                    criterion = criterion.with_value2(value2);
                }
                if not {
                    criterion = criterion.negated();
                }
                if or {
                    criterion = criterion.joined_by(csvsift_core::LogicalOperator::Or);
                }
                commands::query::add(&file, criterion, indent)
            }
            QueryCommand::Remove { file, index } => commands::query::remove(&file, index),
            QueryCommand::Indent { file, index } => commands::query::indent(&file, index),
            QueryCommand::Outdent { file, index } => commands::query::outdent(&file, index),
            QueryCommand::Show { file } => commands::query::show(&file),
        },
    }
}

//! CLI entry point for the `xfacet` command-line tool.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

use crossfacet::cli::commands;
use crossfacet::FacetError;

#[derive(Parser)]
#[command(
    name = "xfacet",
    about = "xfacet: faceted filter counts over barrier inventories"
)]
struct Cli {
    /// Output format: "text" (default) or "json"
    #[arg(long, default_value = "text")]
    format: String,

    /// Enable debug logging
    #[arg(long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print filtered and per-dimension counts
    Summary {
        /// Dimension configuration (.toml or .json)
        #[arg(long)]
        config: PathBuf,
        /// Record file (.json or .csv)
        data: PathBuf,
        /// Filter as dimension=value; repeat to select more values
        #[arg(long = "select")]
        selections: Vec<String>,
        /// Also write the snapshot as JSON to this file
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// List ids of records matching the filters
    Ids {
        /// Dimension configuration (.toml or .json)
        #[arg(long)]
        config: PathBuf,
        /// Record file (.json or .csv)
        data: PathBuf,
        /// Filter as dimension=value; repeat to select more values
        #[arg(long = "select")]
        selections: Vec<String>,
        /// Maximum ids to print
        #[arg(long, default_value = "100")]
        limit: usize,
    },
    /// List the configured dimensions
    Dimensions {
        /// Dimension configuration (.toml or .json)
        config: PathBuf,
    },
    /// Validate a configuration and report data anomalies
    Validate {
        /// Dimension configuration (.toml or .json)
        config: PathBuf,
        /// Record file to check against the configuration
        #[arg(long)]
        data: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();
    let json = cli.format == "json";

    let default_level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let result = match cli.command {
        Commands::Summary {
            config,
            data,
            selections,
            output,
        } => commands::cmd_summary(&config, &data, &selections, output.as_deref(), json),
        Commands::Ids {
            config,
            data,
            selections,
            limit,
        } => commands::cmd_ids(&config, &data, &selections, limit, json),
        Commands::Dimensions { config } => commands::cmd_dimensions(&config, json),
        Commands::Validate { config, data } => {
            commands::cmd_validate(&config, data.as_deref(), json)
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        let code = match &e {
            FacetError::Io(_) => 1,
            FacetError::Json(_)
            | FacetError::Toml(_)
            | FacetError::Csv(_)
            | FacetError::InvalidRecordSet(_)
            | FacetError::UnsupportedFormat(_) => 2,
            e if e.is_config_error() => 3,
            e if e.is_filter_error() => 4,
            _ => 5,
        };
        process::exit(code);
    }
}

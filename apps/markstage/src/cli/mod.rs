//! # Markstage CLI Module
//!
//! This module implements the CLI interface for Markstage.
//!
//! ## Available Commands
//!
//! - `summary` - Show what the dataset contains (default)
//! - `stages` - Per-stage metric table
//! - `best` - Best stage per group
//! - `aggregate` - Grouped totals and means
//! - `product` - Single-product report
//! - `server` - Start the HTTP server

mod commands;

use crate::config::AppConfig;
use crate::loader::SchemaChoice;
use clap::{Args, Parser, Subcommand};
use markstage_core::{GroupKey, MarkstageError, Mode, Objective, RecordFilter, StageSelector};
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Markstage - retail markdown stage analysis
///
/// Computes price, revenue and sell-through at each of four markdown stages
/// and picks the best stage per product, category or season.
#[derive(Parser, Debug)]
#[command(name = "markstage")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the dataset CSV (overrides the config file)
    #[arg(short = 'D', long, global = true)]
    pub data: Option<PathBuf>,

    /// Input layout: auto, wide or long (overrides the config file)
    #[arg(short = 'S', long, global = true)]
    pub schema: Option<SchemaChoice>,

    /// Path to a TOML config file
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Category / season narrowing shared by the table commands.
#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// Only products in this category
    #[arg(long)]
    pub category: Option<String>,

    /// Only products in this season
    #[arg(long)]
    pub season: Option<String>,
}

impl From<FilterArgs> for RecordFilter {
    fn from(args: FilterArgs) -> Self {
        RecordFilter {
            category: args.category,
            season: args.season,
        }
    }
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start HTTP server
    Server {
        /// Host to bind to
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// Port to bind to
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Show dataset summary
    Summary,

    /// Show the per-stage metric table
    Stages {
        #[command(flatten)]
        filter: FilterArgs,

        /// Write CSV to this file instead of printing
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show the best stage per group
    Best {
        /// Grouping: product, category, category_stage, category_season, season, all
        #[arg(short, long, default_value = "product")]
        key: GroupKey,

        /// Objective: revenue, sell_through, sales
        #[arg(short = 'b', long, default_value = "revenue")]
        objective: Objective,

        /// Mode: best (single row), sum, mean
        #[arg(short, long, default_value = "best")]
        mode: Mode,

        #[command(flatten)]
        filter: FilterArgs,

        /// Write CSV to this file instead of printing
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show grouped totals and means
    Aggregate {
        /// Grouping: product, category, category_stage, category_season, season, all
        #[arg(short, long, default_value = "category")]
        key: GroupKey,

        #[command(flatten)]
        filter: FilterArgs,

        /// Write CSV to this file instead of printing
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show the stage-by-stage report of one product
    Product {
        /// Product id
        #[arg(short, long)]
        id: String,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), MarkstageError> {
    let config = AppConfig::load(cli.config.as_deref())?;
    let mut ctx = Context::new(&cli, &config)?;

    match cli.command {
        Some(Commands::Server { host, port }) => {
            let host = host.unwrap_or_else(|| config.server.host.clone());
            let port = port.unwrap_or(config.server.port);
            cmd_server(ctx, &host, port).await
        }
        Some(Commands::Summary) | None => cmd_summary(&mut ctx),
        Some(Commands::Stages { filter, output }) => {
            cmd_stages(&mut ctx, &filter.into(), output.as_deref())
        }
        Some(Commands::Best {
            key,
            objective,
            mode,
            filter,
            output,
        }) => cmd_best(
            &mut ctx,
            key,
            StageSelector::new(objective).with_mode(mode),
            &filter.into(),
            output.as_deref(),
        ),
        Some(Commands::Aggregate {
            key,
            filter,
            output,
        }) => cmd_aggregate(&mut ctx, key, &filter.into(), output.as_deref()),
        Some(Commands::Product { id }) => cmd_product(&mut ctx, &id),
    }
}

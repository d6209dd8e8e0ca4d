//! # Markstage - Markdown Stage Analysis
//!
//! The main binary for Markstage.
//!
//! This application provides:
//! - CLI interface for stage tables, best-stage selection and aggregates
//! - HTTP REST API server (axum-based)
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                apps/markstage (THE BINARY)           │
//! │                                                      │
//! │  ┌─────────────┐  ┌─────────────┐  ┌──────────────┐  │
//! │  │    CLI      │  │  HTTP API   │  │ CSV loader + │  │
//! │  │   (clap)    │  │   (axum)    │  │ blake3 cache │  │
//! │  └──────┬──────┘  └──────┬──────┘  └──────┬───────┘  │
//! │         └────────────────┼────────────────┘          │
//! │                          ▼                           │
//! │                 ┌────────────────┐                   │
//! │                 │ markstage-core │                   │
//! │                 │  (THE LOGIC)   │                   │
//! │                 └────────────────┘                   │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! markstage --data markdowns.csv summary
//! markstage --data markdowns.csv best --key category --objective sell_through
//! markstage --data markdowns.csv aggregate --key category_season -o totals.csv
//! markstage --data markdowns.csv server --port 8080
//! ```

use clap::Parser;
use markstage::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    let cli = cli::Cli::parse();

    // MARKSTAGE_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("MARKSTAGE_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let default_filter = if cli.verbose {
        "markstage=debug,markstage_core=debug,tower_http=debug"
    } else {
        "markstage=info,tower_http=debug"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    if let Err(e) = cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Print the Markstage startup banner.
fn print_banner() {
    println!(
        r#"
  Markstage v{}
  Markdown stages M1..M4: price, revenue, sell-through
"#,
        env!("CARGO_PKG_VERSION")
    );
}

//! # woundcare - Wound Registry Server
//!
//! The main binary for the woundcare clinical-stage engine.
//!
//! This application provides:
//! - HTTP REST API server (axum-based)
//! - CLI interface for wound and treatment records
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │               apps/woundcare (THE BINARY)            │
//! │                                                      │
//! │     ┌─────────────┐          ┌─────────────┐         │
//! │     │    CLI      │          │  HTTP API   │         │
//! │     │   (clap)    │          │   (axum)    │         │
//! │     └──────┬──────┘          └──────┬──────┘         │
//! │            └──────────┬─────────────┘                │
//! │                       ▼                              │
//! │               ┌────────────────┐                     │
//! │               │ woundcare-core │                     │
//! │               │  (THE RULES)   │                     │
//! │               └────────────────┘                     │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Start the HTTP server
//! woundcare server --host 0.0.0.0 --port 8080
//!
//! # CLI operations
//! woundcare register --patient 12 --pain 4 --exudate moderado --length 3,5 --width 2
//! woundcare treat 0 --notes "limpieza y apósito"
//! woundcare summary
//! ```

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use woundcare::cli;

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    // WOUNDCARE_LOG_FORMAT=json enables machine-parseable output. Logs go to
    // stderr so `--json-mode` output on stdout stays parseable.
    let log_format = std::env::var("WOUNDCARE_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "woundcare=info,woundcare_core=info,tower_http=debug".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    let cli = cli::Cli::parse();

    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    if let Err(e) = cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Print the startup banner.
fn print_banner() {
    println!(
        r#"
  woundcare v{}

  Wound registry with clinical-stage auto-evaluation
"#,
        env!("CARGO_PKG_VERSION")
    );
}

//! # Keyscope - Value Inspector
//!
//! The main binary for Keyscope.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    apps/keyscope (THE BINARY)                   │
//! │                                                                 │
//! │  ┌─────────────┐    ┌─────────────┐    ┌──────────────────┐   │
//! │  │   CLI       │    │   Config    │    │  Graph dumps     │   │
//! │  │  (clap)     │    │   (toml)    │    │  (JSON files)    │   │
//! │  └──────┬──────┘    └──────┬──────┘    └────────┬─────────┘   │
//! │         │                  │                    │              │
//! │         └──────────────────┼────────────────────┘              │
//! │                            ▼                                   │
//! │                    ┌───────────────┐                           │
//! │                    │ keyscope-core │                           │
//! │                    │  (THE LOGIC)  │                           │
//! │                    └───────────────┘                           │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! keyscope detect --text '{"a":1}'
//! keyscope decode -e hex --text 68656c6c6f
//! keyscope encode -e base64 -f payload.bin -o stored.txt
//! keyscope materialize -g session.graph.json --plain
//! keyscope inspect -f value.bin -g value.graph.json
//! ```

use clap::Parser;
use keyscope::cli;
use keyscope::config::{AppConfig, LogFormat};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

fn main() {
    let cli = cli::Cli::parse();
    let config_path = AppConfig::resolve_path(cli.config.as_deref());
    let config = AppConfig::load_resolved(config_path.as_deref());

    // KEYSCOPE_LOG_FORMAT=json wins over the config file's [log] format.
    let (format, configured_filter) = match &config {
        Ok(config) => (config.log.format, config.log.filter.clone()),
        Err(_) => (LogFormat::default(), None),
    };
    let format = std::env::var("KEYSCOPE_LOG_FORMAT")
        .map(|value| LogFormat::from_env_value(&value))
        .unwrap_or(format);
    init_tracing(format, default_filter(&cli, configured_filter));
    if let Some(path) = &config_path {
        tracing::debug!(path = %path.display(), "loading configuration");
    }

    if let Err(e) = config.and_then(|config| cli::execute(cli, config)) {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Filter used when `RUST_LOG` is unset.
fn default_filter(cli: &cli::Cli, configured: Option<String>) -> String {
    if cli.verbose {
        "keyscope=debug,keyscope_core=debug".to_string()
    } else if cli.quiet {
        "keyscope=warn,keyscope_core=warn".to_string()
    } else {
        configured.unwrap_or_else(|| "keyscope=info,keyscope_core=info".to_string())
    }
}

/// Install the global subscriber. Logs go to stderr; stdout carries output.
fn init_tracing(format: LogFormat, default_filter: String) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr),
                )
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}

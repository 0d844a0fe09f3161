//! # Keyscope CLI Module
//!
//! This module implements the CLI interface for Keyscope.
//!
//! ## Available Commands
//!
//! - `detect` - Guess the encoding of a stored value
//! - `decode` - Decode a stored value for display
//! - `encode` - Encode display text back into stored form
//! - `materialize` - Materialize an object graph dump into a bounded tree
//! - `inspect` - Run the full pipeline on a stored value
//! - `view` - Render the members of a collection key
//! - `encodings` - List the encodings Keyscope understands

mod commands;

use crate::config::AppConfig;
use clap::{Args, Parser, Subcommand};
use keyscope_core::KeyscopeError;
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Keyscope - key-value store value inspector
///
/// Detects how a stored value is encoded, decodes it for display and turns
/// decoded object graphs into bounded, cycle-free JSON trees.
#[derive(Parser, Debug)]
#[command(name = "keyscope")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to a keyscope.toml configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Depth at which materialization stops (overrides the config file)
    #[arg(long, global = true)]
    pub max_depth: Option<usize>,

    /// Length a value must exceed to be treated as an object stream
    /// (overrides the config file)
    #[arg(long, global = true)]
    pub magic_min_length: Option<usize>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Where a stored value comes from.
#[derive(Args, Debug, Clone)]
#[group(required = true, multiple = false)]
pub struct InputArgs {
    /// Read the value from a file
    #[arg(short, long)]
    pub file: Option<PathBuf>,

    /// Take the value from the command line
    #[arg(long)]
    pub text: Option<String>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Guess the encoding of a stored value
    Detect {
        #[command(flatten)]
        input: InputArgs,
    },

    /// Decode a stored value for display
    Decode {
        #[command(flatten)]
        input: InputArgs,

        /// Encoding to decode with, or "auto" to detect it
        #[arg(short, long, default_value = "auto")]
        encoding: String,

        /// Write the decoded payload to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Encode display text back into stored form
    Encode {
        #[command(flatten)]
        input: InputArgs,

        /// Target encoding (json, base64, hex, url, raw)
        #[arg(short, long)]
        encoding: String,

        /// Write the stored bytes to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Materialize an object graph dump (JSON) into a bounded tree
    Materialize {
        /// Path to the graph dump
        #[arg(short, long)]
        graph: PathBuf,

        /// Print the untagged display form instead of the tagged tree
        #[arg(long)]
        plain: bool,
    },

    /// Detect, decode and materialize a stored value
    Inspect {
        #[command(flatten)]
        input: InputArgs,

        /// Encoding override, or "auto" to detect it
        #[arg(short, long, default_value = "auto")]
        encoding: String,

        /// Graph dump to use when the value is an object stream
        #[arg(short, long)]
        graph: Option<PathBuf>,

        /// Container kind the store reported (string, hash, list, set, zset)
        #[arg(short, long, default_value = "string")]
        kind: String,
    },

    /// Render the members of a collection key from a JSON document
    View {
        /// Container kind (hash, list, set, zset)
        #[arg(short, long)]
        kind: String,

        /// JSON document holding the members
        #[arg(short, long)]
        file: PathBuf,
    },

    /// List the encodings Keyscope understands
    Encodings,
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub fn execute(cli: Cli, mut config: AppConfig) -> Result<(), KeyscopeError> {
    config.apply_overrides(cli.max_depth, cli.magic_min_length);
    let json_mode = cli.json_mode;

    match cli.command {
        Some(Commands::Detect { input }) => cmd_detect(&read_input(&input)?, &config, json_mode),
        Some(Commands::Decode {
            input,
            encoding,
            output,
        }) => cmd_decode(
            &read_input(&input)?,
            &encoding,
            output.as_deref(),
            &config,
            json_mode,
        ),
        Some(Commands::Encode {
            input,
            encoding,
            output,
        }) => cmd_encode(&read_input(&input)?, &encoding, output.as_deref(), json_mode),
        Some(Commands::Materialize { graph, plain }) => cmd_materialize(&graph, plain, &config),
        Some(Commands::Inspect {
            input,
            encoding,
            graph,
            kind,
        }) => cmd_inspect(
            &read_input(&input)?,
            &encoding,
            &kind,
            graph.as_deref(),
            &config,
            json_mode,
        ),
        Some(Commands::View { kind, file }) => cmd_view(&kind, &file),
        Some(Commands::Encodings) | None => {
            // No subcommand - list encodings by default
            cmd_encodings(json_mode)
        }
    }
}

//! CLI parse: clap types for oexplorer. No behavior; definitions only.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// oexplorer - browse Object Explorer trees served by fixture providers
#[derive(Parser, Debug)]
#[command(name = "oexplorer")]
#[command(about = "Drive the Object Explorer coordinator against file-backed providers")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path (layered over defaults and the global config)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Fixture tree to serve as the primary provider
    #[arg(long)]
    pub fixture: Option<PathBuf>,

    /// Provider id to open the session with
    #[arg(long)]
    pub provider: Option<String>,

    /// Connection id used for the session
    #[arg(long, default_value = "default")]
    pub connection: String,

    /// Server name passed to the provider
    #[arg(long, default_value = "localhost")]
    pub server: String,

    /// Enable verbose logging
    #[arg(long, default_value = "false")]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output is "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Print the tree below a node, expanding as needed
    Tree {
        /// Node path to start from (defaults to the connection root)
        #[arg(long, default_value = "")]
        path: String,
        /// Levels to expand below the starting node
        #[arg(long, default_value = "2")]
        depth: usize,
    },
    /// Expand one node and list its merged children
    Expand {
        /// Node path to expand
        path: String,
        /// Refresh instead of expanding
        #[arg(long)]
        refresh: bool,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Resolve a node path, expanding its ancestors
    Resolve {
        /// Node path to resolve
        path: String,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Search the provider for nodes
    Find {
        /// Node type to match
        #[arg(long = "type")]
        node_type: String,
        /// Object name to match
        #[arg(long, default_value = "")]
        name: String,
        #[arg(long)]
        schema: Option<String>,
        #[arg(long)]
        database: Option<String>,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
}

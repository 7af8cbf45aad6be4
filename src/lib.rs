//! oexplorer: Object Explorer session and node-expansion coordinator
//!
//! Hierarchical metadata trees (servers, databases, tables, ...) are supplied
//! by pluggable providers. The coordinator fans each expand request out to
//! every provider contributing to a node, merges their asynchronous responses
//! in a fixed order, and keeps at most one fan-out in flight per session and
//! node path.

pub mod cli;
pub mod config;
pub mod connection;
pub mod error;
pub mod expansion;
pub mod explorer;
pub mod logging;
pub mod provider;
pub mod session;
pub mod tree;
pub mod types;
pub mod view;

pub use error::ExplorerError;
pub use explorer::{ObjectExplorer, ResponseSink};

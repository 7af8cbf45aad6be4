//! CLI domain: parse, route and presentation only.

mod parse;
mod presentation;
mod route;

pub use parse::{Cli, Commands};
pub use route::{RunContext, DEFAULT_FIXTURE_PROVIDER};

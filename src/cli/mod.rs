//! CLI module for Relay
//!
//! # Commands
//!
//! - `route` - Dry-run a routing decision against a config's workers
//! - `catalog` - List configured workers
//! - `config` - Configuration utilities (init, check)
//!
//! # Example
//!
//! ```bash
//! relay config init -o relay.toml
//! relay route --config relay.toml --domain code --priority critical
//! relay catalog --capability review
//! ```

pub mod catalog;
pub mod config;
pub mod route;
pub mod setup;

pub use catalog::handle_catalog;
pub use config::{handle_config_check, handle_config_init};
pub use route::handle_route;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::request::Priority;

/// Relay - cost-aware LLM routing and mission scheduling
#[derive(Parser, Debug)]
#[command(
    name = "relay",
    version,
    about = "Cost-aware LLM worker router and mission scheduler"
)]
pub struct Cli {
    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true, env = "RELAY_LOG_LEVEL")]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compute a routing decision without invoking any worker
    Route(RouteArgs),
    /// List configured workers
    Catalog(CatalogArgs),
    /// Configuration utilities
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Args, Debug)]
pub struct RouteArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "relay.toml")]
    pub config: PathBuf,

    /// Request domain (e.g. chat, code, analysis)
    #[arg(short, long)]
    pub domain: String,

    /// Task description
    #[arg(short, long, default_value = "")]
    pub task: String,

    /// Priority (low, normal, high, critical)
    #[arg(short, long, default_value = "normal")]
    pub priority: Priority,

    /// Tenant charged for the request
    #[arg(long, default_value = "default")]
    pub tenant: String,

    /// Maximum estimated cost in USD
    #[arg(long)]
    pub max_cost: Option<f64>,

    /// Maximum p95 latency in milliseconds
    #[arg(long)]
    pub max_latency_ms: Option<u32>,

    /// Minimum quality score (0.0-1.0)
    #[arg(long)]
    pub min_quality: Option<f64>,

    /// Required capability (repeatable)
    #[arg(long = "capability")]
    pub capabilities: Vec<String>,
}

#[derive(Args, Debug)]
pub struct CatalogArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "relay.toml")]
    pub config: PathBuf,

    /// Only list workers with this capability (repeatable)
    #[arg(long = "capability")]
    pub capabilities: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Generate an example configuration file
    Init(ConfigInitArgs),
    /// Validate a configuration file
    Check(ConfigCheckArgs),
}

#[derive(Args, Debug)]
pub struct ConfigInitArgs {
    /// Output file path
    #[arg(short, long, default_value = "relay.toml")]
    pub output: PathBuf,

    /// Overwrite existing file
    #[arg(short, long)]
    pub force: bool,
}

#[derive(Args, Debug)]
pub struct ConfigCheckArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "relay.toml")]
    pub config: PathBuf,
}

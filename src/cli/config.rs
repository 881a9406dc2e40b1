//! Config command handlers

use anyhow::{bail, Context};
use std::fs;

use crate::cli::{ConfigCheckArgs, ConfigInitArgs};
use crate::config::{RelayConfig, EXAMPLE_CONFIG};

/// Handle `relay config init`
pub fn handle_config_init(args: &ConfigInitArgs) -> anyhow::Result<String> {
    if args.output.exists() && !args.force {
        bail!(
            "File already exists: {}. Use --force to overwrite.",
            args.output.display()
        );
    }

    fs::write(&args.output, EXAMPLE_CONFIG)
        .with_context(|| format!("failed to write {}", args.output.display()))?;

    Ok(format!(
        "✓ Configuration file created: {}\n  Edit this file to declare your workers and budgets.",
        args.output.display()
    ))
}

/// Handle `relay config check`
///
/// Unlike the other commands, a missing file is an error here.
pub fn handle_config_check(args: &ConfigCheckArgs) -> anyhow::Result<String> {
    let config = RelayConfig::load(Some(&args.config))
        .with_context(|| format!("failed to load {}", args.config.display()))?;
    config
        .validate()
        .with_context(|| format!("invalid configuration in {}", args.config.display()))?;

    Ok(format!(
        "✓ {} is valid ({} workers, {} tenant budgets)",
        args.config.display(),
        config.workers.len(),
        config.budget.tenants.len()
    ))
}

//! `relay catalog`: list configured workers

use serde_json::json;

use crate::catalog::WorkerView;
use crate::cli::setup::load_config_with_overrides;
use crate::cli::CatalogArgs;

/// Handle `relay catalog`, returning workers as pretty JSON in config order.
pub fn handle_catalog(args: &CatalogArgs, log_level: Option<&str>) -> anyhow::Result<String> {
    let config = load_config_with_overrides(&args.config, log_level)?;

    let workers: Vec<WorkerView> = config
        .workers
        .iter()
        .map(|w| w.to_worker())
        .filter(|w| w.supports_all(&args.capabilities))
        .map(|w| w.view())
        .collect();

    Ok(serde_json::to_string_pretty(&json!({ "workers": workers }))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EXAMPLE_CONFIG;

    #[test]
    fn test_catalog_filters_by_capability() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("relay.toml");
        std::fs::write(&path, EXAMPLE_CONFIG).unwrap();

        let out = handle_catalog(
            &CatalogArgs {
                config: path,
                capabilities: vec!["monitoring".to_string()],
            },
            None,
        )
        .unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        let workers = value["workers"].as_array().unwrap();
        assert_eq!(workers.len(), 1);
        assert_eq!(workers[0]["id"], "local-llama");
    }
}

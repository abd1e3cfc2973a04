pub mod ask;
pub mod config_cmd;
pub mod serve;

use anyhow::Context;
use ragbridge_config::AppConfig;
use std::path::Path;

/// Load config from `path` when given, otherwise from the default location.
/// Environment overrides and validation apply either way.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<AppConfig> {
    match path {
        None => AppConfig::load().context("Failed to load config"),
        Some(path) => {
            let mut config = AppConfig::load_from(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?;
            config.apply_env(|key| std::env::var(key).ok());
            config.validate().context("Invalid configuration")?;
            Ok(config)
        }
    }
}

//! `ragbridge config`: Configuration management commands.

use anyhow::Context;
use ragbridge_config::AppConfig;
use std::path::{Path, PathBuf};

fn resolve_path(config_path: Option<&Path>) -> PathBuf {
    config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| AppConfig::config_dir().join("config.toml"))
}

/// Non-fatal findings about a config that already passed validation.
pub fn warnings(config: &AppConfig) -> Vec<&'static str> {
    let mut warnings = Vec::new();

    if config.rag.api_key.is_none() {
        warnings.push("No RAG API key set (set RAGBRIDGE_RAG_API_KEY or AZURE_OPENAI_API_KEY)");
    }
    if config.auth.app_id.is_none() {
        warnings.push("No app id set: token audience is not verified");
    }
    if config.auth.allow_local_tests && !config.auth.local_tests_enabled() {
        warnings.push("allow_local_tests is ignored in the production environment");
    }
    if config.auth.jwks_cache_ttl_secs == 0 {
        warnings.push("JWKS caching disabled: every request fetches the key set");
    }
    if config.gateway.host == "0.0.0.0" && config.auth.local_tests_enabled() {
        warnings.push("Public bind with local tests allowed: unauthenticated requests accepted");
    }

    warnings
}

pub fn validate(config_path: Option<&Path>) -> anyhow::Result<()> {
    println!("Validating configuration...");

    let config = super::load_config(config_path)?;
    println!("   Config parsed successfully");

    let warnings = warnings(&config);
    if warnings.is_empty() {
        println!("   All checks passed");
    } else {
        println!();
        for w in &warnings {
            println!("   warning: {w}");
        }
    }

    println!();
    println!("   Backend:  {}", config.rag.api_url);
    println!("   Model:    {}", config.rag.model);
    println!("   Gateway:  {}:{}", config.gateway.host, config.gateway.port);
    println!("   History:  {}", config.history.backend);
    println!("   Env:      {}", config.auth.environment);
    Ok(())
}

pub fn show(config_path: Option<&Path>) -> anyhow::Result<()> {
    let mut config = super::load_config(config_path)?;
    if config.rag.api_key.is_some() {
        config.rag.api_key = Some("[REDACTED]".into());
    }
    let toml_str = toml::to_string_pretty(&config).context("Failed to render config")?;
    println!("{toml_str}");
    Ok(())
}

pub fn path(config_path: Option<&Path>) {
    println!("{}", resolve_path(config_path).display());
}

pub fn init(config_path: Option<&Path>) -> anyhow::Result<()> {
    let path = resolve_path(config_path);
    if path.exists() {
        println!("Config already exists at {}", path.display());
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(&path, AppConfig::default_toml())
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("Wrote default config to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_path_is_config_toml() {
        let path = resolve_path(None);
        assert!(path.to_str().unwrap().ends_with("config.toml"));
    }

    #[test]
    fn explicit_path_wins() {
        let path = resolve_path(Some(Path::new("/tmp/x.toml")));
        assert_eq!(path, PathBuf::from("/tmp/x.toml"));
    }

    #[test]
    fn defaults_warn_about_key_and_audience() {
        let w = warnings(&AppConfig::default());
        assert!(w.iter().any(|m| m.contains("API key")));
        assert!(w.iter().any(|m| m.contains("audience")));
    }

    #[test]
    fn production_local_test_flag_is_flagged() {
        let mut config = AppConfig::default();
        config.auth.allow_local_tests = true;
        let w = warnings(&config);
        assert!(w.iter().any(|m| m.contains("ignored in the production")));
    }

    #[test]
    fn init_writes_loadable_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        init(Some(&path)).unwrap();
        let loaded = AppConfig::load_from(&path).unwrap();
        assert_eq!(loaded.gateway.port, 3978);
    }
}

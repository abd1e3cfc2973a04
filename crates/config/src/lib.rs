//! Configuration loading, validation, and management for RagBridge.
//!
//! Loads configuration from `~/.ragbridge/config.toml` with environment
//! variable overrides. Validates all settings at startup. Credentials have no
//! literal defaults: they come from the file or the environment.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.ragbridge/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP listener settings
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Inbound token validation
    #[serde(default)]
    pub auth: AuthConfig,

    /// RAG backend settings
    #[serde(default)]
    pub rag: RagConfig,

    /// Conversation history storage
    #[serde(default)]
    pub history: HistoryConfig,

    /// Bot reply texts
    #[serde(default)]
    pub bot: BotConfig,
}

fn default_true() -> bool {
    true
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    /// Maximum accepted request body size in bytes
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_port() -> u16 {
    3978
}
fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_max_body_bytes() -> usize {
    1024 * 1024
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// OpenID discovery document of the token issuer
    #[serde(default = "default_openid_config_url")]
    pub openid_config_url: String,

    /// The `iss` claim must start with this prefix
    #[serde(default = "default_issuer_prefix")]
    pub issuer_prefix: String,

    /// Bot application id. When set, the `aud` claim must equal it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_id: Option<String>,

    /// Signature algorithms accepted in token headers
    #[serde(default = "default_allowed_algorithms")]
    pub allowed_algorithms: Vec<String>,

    /// How long a fetched key set is reused. 0 = fetch on every validation.
    #[serde(default = "default_jwks_cache_ttl_secs")]
    pub jwks_cache_ttl_secs: u64,

    /// Let requests without an Authorization header through.
    /// Ignored when `environment` is "production".
    #[serde(default)]
    pub allow_local_tests: bool,

    /// Deployment environment name
    #[serde(default = "default_environment")]
    pub environment: String,
}

fn default_openid_config_url() -> String {
    "https://login.botframework.com/v1/.well-known/openidconfiguration".into()
}
fn default_issuer_prefix() -> String {
    "https://api.botframework.com".into()
}
fn default_allowed_algorithms() -> Vec<String> {
    vec!["RS256".into()]
}
fn default_jwks_cache_ttl_secs() -> u64 {
    3600
}
fn default_environment() -> String {
    "production".into()
}

impl AuthConfig {
    /// Whether unauthenticated local testing is effectively enabled.
    pub fn local_tests_enabled(&self) -> bool {
        self.allow_local_tests && !self.environment.eq_ignore_ascii_case("production")
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            openid_config_url: default_openid_config_url(),
            issuer_prefix: default_issuer_prefix(),
            app_id: None,
            allowed_algorithms: default_allowed_algorithms(),
            jwks_cache_ttl_secs: default_jwks_cache_ttl_secs(),
            allow_local_tests: false,
            environment: default_environment(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct RagConfig {
    /// Base URL of an OpenAI-compatible API (or an Azure deployment URL)
    #[serde(default = "default_rag_api_url")]
    pub api_url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// "authorization" sends `Authorization: Bearer <key>`,
    /// anything else is used as the header name (Azure uses "api-key")
    #[serde(default = "default_api_key_header")]
    pub api_key_header: String,

    /// Azure `api-version` query parameter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Prepended to every transcript as a system message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,

    /// Retrieval sources forwarded verbatim as `data_sources`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_sources: Option<serde_json::Value>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_rag_api_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_api_key_header() -> String {
    "authorization".into()
}
fn default_model() -> String {
    "gpt-4o".into()
}
fn default_temperature() -> f32 {
    0.3
}
fn default_max_tokens() -> u32 {
    800
}
fn default_timeout_secs() -> u64 {
    60
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            api_url: default_rag_api_url(),
            api_key: None,
            api_key_header: default_api_key_header(),
            api_version: None,
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            system_prompt: None,
            data_sources: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl std::fmt::Debug for RagConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RagConfig")
            .field("api_url", &self.api_url)
            .field("api_key", &redact(&self.api_key))
            .field("api_key_header", &self.api_key_header)
            .field("api_version", &self.api_version)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("system_prompt", &self.system_prompt.as_ref().map(|s| s.len()))
            .field("data_sources", &self.data_sources.is_some())
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// "memory" or "file"
    #[serde(default = "default_history_backend")]
    pub backend: String,

    /// Directory for the file backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

fn default_history_backend() -> String {
    "memory".into()
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            backend: default_history_backend(),
            path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// Display name reported by the health endpoint
    #[serde(default = "default_bot_name")]
    pub name: String,

    /// Sent to members joining a conversation
    #[serde(default = "default_welcome_text")]
    pub welcome_text: String,

    /// Greet members added to a conversation
    #[serde(default = "default_true")]
    pub greet_new_members: bool,

    /// Used when the backend returns no usable choice
    #[serde(default = "default_fallback_reply")]
    pub fallback_reply: String,

    /// Used when the backend call fails
    #[serde(default = "default_apology_text")]
    pub apology_text: String,
}

fn default_bot_name() -> String {
    "RAG Bot".into()
}
fn default_welcome_text() -> String {
    "Hello and welcome! I'm an assistant that answers questions from your documents. Ask me anything.".into()
}
fn default_fallback_reply() -> String {
    "No response.".into()
}
fn default_apology_text() -> String {
    "Sorry, something went wrong while processing your message. Please try again.".into()
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            name: default_bot_name(),
            welcome_text: default_welcome_text(),
            greet_new_members: true,
            fallback_reply: default_fallback_reply(),
            apology_text: default_apology_text(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.ragbridge/config.toml).
    ///
    /// Environment overrides (highest priority):
    /// - `RAGBRIDGE_RAG_API_KEY`, then `AZURE_OPENAI_API_KEY`
    /// - `RAGBRIDGE_RAG_URL`, `RAGBRIDGE_RAG_MODEL`
    /// - `RAGBRIDGE_APP_ID`, then `MicrosoftAppId`
    /// - `ALLOW_LOCAL_TESTS` ("1" enables), `RAGBRIDGE_ENV`
    /// - `FUNCTIONS_CUSTOMHANDLER_PORT`, then `PORT`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through `lookup` (injectable for tests).
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let first = |keys: &[&str]| keys.iter().find_map(|k| lookup(*k).filter(|v| !v.is_empty()));

        if let Some(key) = first(&["RAGBRIDGE_RAG_API_KEY", "AZURE_OPENAI_API_KEY"]) {
            self.rag.api_key = Some(key);
        }
        if let Some(url) = first(&["RAGBRIDGE_RAG_URL"]) {
            self.rag.api_url = url;
        }
        if let Some(model) = first(&["RAGBRIDGE_RAG_MODEL"]) {
            self.rag.model = model;
        }
        if let Some(app_id) = first(&["RAGBRIDGE_APP_ID", "MicrosoftAppId"]) {
            self.auth.app_id = Some(app_id);
        }
        if let Some(flag) = first(&["ALLOW_LOCAL_TESTS"]) {
            self.auth.allow_local_tests = flag == "1";
        }
        if let Some(env) = first(&["RAGBRIDGE_ENV"]) {
            self.auth.environment = env;
        }
        if let Some(port) = first(&["FUNCTIONS_CUSTOMHANDLER_PORT", "PORT"]) {
            match port.parse() {
                Ok(p) => self.gateway.port = p,
                Err(_) => tracing::warn!(value = %port, "Ignoring non-numeric port override"),
            }
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".ragbridge")
    }

    /// Default directory for the file history backend.
    pub fn history_dir(&self) -> PathBuf {
        self.history
            .path
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| Self::config_dir().join("history"))
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rag.temperature < 0.0 || self.rag.temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "rag.temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.auth.allowed_algorithms.is_empty() {
            return Err(ConfigError::ValidationError(
                "auth.allowed_algorithms must not be empty".into(),
            ));
        }

        if !matches!(self.history.backend.as_str(), "memory" | "file") {
            return Err(ConfigError::ValidationError(format!(
                "history.backend must be \"memory\" or \"file\", got {:?}",
                self.history.backend
            )));
        }

        if self.rag.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "rag.timeout_secs must be > 0".into(),
            ));
        }

        Ok(())
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn default_config_is_strict() {
        let config = AppConfig::default();
        assert_eq!(config.gateway.port, 3978);
        assert!(!config.auth.allow_local_tests);
        assert!(!config.auth.local_tests_enabled());
        assert!(config.rag.api_key.is_none());
        assert_eq!(config.bot.fallback_reply, "No response.");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.gateway.port, config.gateway.port);
        assert_eq!(parsed.auth.issuer_prefix, config.auth.issuer_prefix);
    }

    #[test]
    fn local_tests_ignored_in_production() {
        let mut auth = AuthConfig {
            allow_local_tests: true,
            ..AuthConfig::default()
        };
        assert!(!auth.local_tests_enabled());
        auth.environment = "development".into();
        assert!(auth.local_tests_enabled());
    }

    #[test]
    fn env_overrides_credentials_and_port() {
        let mut config = AppConfig::default();
        config.apply_env(env(&[
            ("AZURE_OPENAI_API_KEY", "azure-key"),
            ("MicrosoftAppId", "app-123"),
            ("ALLOW_LOCAL_TESTS", "1"),
            ("RAGBRIDGE_ENV", "dev"),
            ("FUNCTIONS_CUSTOMHANDLER_PORT", "7071"),
        ]));
        assert_eq!(config.rag.api_key.as_deref(), Some("azure-key"));
        assert_eq!(config.auth.app_id.as_deref(), Some("app-123"));
        assert!(config.auth.local_tests_enabled());
        assert_eq!(config.gateway.port, 7071);
    }

    #[test]
    fn ragbridge_key_wins_over_azure_key() {
        let mut config = AppConfig::default();
        config.apply_env(env(&[
            ("RAGBRIDGE_RAG_API_KEY", "primary"),
            ("AZURE_OPENAI_API_KEY", "secondary"),
        ]));
        assert_eq!(config.rag.api_key.as_deref(), Some("primary"));
    }

    #[test]
    fn bad_port_override_is_ignored() {
        let mut config = AppConfig::default();
        config.apply_env(env(&[("PORT", "not-a-port")]));
        assert_eq!(config.gateway.port, 3978);
    }

    #[test]
    fn debug_output_redacts_api_key() {
        let mut config = AppConfig::default();
        config.rag.api_key = Some("sk-very-secret".into());
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-very-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn invalid_temperature_rejected() {
        let mut config = AppConfig::default();
        config.rag.temperature = 5.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn unknown_history_backend_rejected() {
        let mut config = AppConfig::default();
        config.history.backend = "redis".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let result = AppConfig::load_from(Path::new("/nonexistent/config.toml"));
        assert!(result.is_ok());
        assert_eq!(result.unwrap().gateway.port, 3978);
    }

    #[test]
    fn loads_azure_rag_section_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[rag]
api_url = "https://contoso.openai.azure.com/openai/deployments/gpt-4o"
api_key_header = "api-key"
api_version = "2024-02-15-preview"
system_prompt = "Answer only from the indexed documents."

[[rag.data_sources]]
type = "azure_search"
[rag.data_sources.parameters]
endpoint = "https://contoso.search.windows.net"
index_name = "handbook"

[history]
backend = "file"
path = "/var/lib/ragbridge"
"#,
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.rag.api_key_header, "api-key");
        assert_eq!(config.rag.api_version.as_deref(), Some("2024-02-15-preview"));
        let sources = config.rag.data_sources.unwrap();
        assert_eq!(sources[0]["type"], "azure_search");
        assert_eq!(sources[0]["parameters"]["index_name"], "handbook");
        assert_eq!(config.history.backend, "file");
    }

    #[test]
    fn unparseable_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "gateway = [not toml").unwrap();
        let err = AppConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
        assert!(err.to_string().contains("config.toml"));
    }
}

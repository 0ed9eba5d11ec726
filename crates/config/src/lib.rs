//! Configuration loading, validation, and management for Doppel.
//!
//! Three artifacts configure a deployment:
//! - `~/.doppel/config.toml`: process-level settings ([`AppConfig`])
//! - `<persona_dir>/settings.txt`: flat generation knobs ([`Settings`])
//! - `<persona_dir>/system_prompt.txt`: the persona directive ([`PersonaDirective`])
//!
//! Environment variables override the TOML file. Everything is validated at
//! startup.

pub mod persona;
pub mod settings;

pub use persona::PersonaDirective;
pub use settings::Settings;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.doppel/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key for the completion service (can be overridden per-provider)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Completion provider name
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Model passed to the provider
    #[serde(default = "default_model")]
    pub model: String,

    /// Persona and corpus settings
    #[serde(default)]
    pub persona: PersonaConfig,

    /// HTTP gateway settings
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Persistence settings
    #[serde(default)]
    pub store: StoreConfig,

    /// Provider-specific overrides
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

fn default_provider() -> String {
    "groq".into()
}
fn default_model() -> String {
    "llama-3.1-8b-instant".into()
}
fn default_true() -> bool {
    true
}

fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("persona", &self.persona)
            .field("gateway", &self.gateway)
            .field("store", &self.store)
            .field("providers", &self.providers)
            .finish()
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonaConfig {
    /// The owner's first name, used in prompts and deflections
    #[serde(default = "default_owner_name")]
    pub owner_name: String,

    /// Directory of owner-authored documents
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Directory holding `settings.txt` and `system_prompt.txt`
    #[serde(default = "default_persona_dir")]
    pub persona_dir: PathBuf,

    /// Upper bound on a single completion call
    #[serde(default = "default_generation_timeout")]
    pub generation_timeout_secs: u64,

    /// Extra blocked-topic terms appended to the built-in list
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra_blocked_terms: Vec<String>,
}

fn default_owner_name() -> String {
    "Cameron".into()
}
fn default_data_dir() -> PathBuf {
    AppConfig::config_dir().join("data")
}
fn default_persona_dir() -> PathBuf {
    AppConfig::config_dir().join("persona")
}
fn default_generation_timeout() -> u64 {
    30
}

impl Default for PersonaConfig {
    fn default() -> Self {
        Self {
            owner_name: default_owner_name(),
            data_dir: default_data_dir(),
            persona_dir: default_persona_dir(),
            generation_timeout_secs: default_generation_timeout(),
            extra_blocked_terms: vec![],
        }
    }
}

impl PersonaConfig {
    pub fn settings_path(&self) -> PathBuf {
        self.persona_dir.join(settings::SETTINGS_FILE)
    }

    pub fn system_prompt_path(&self) -> PathBuf {
        self.persona_dir.join(persona::SYSTEM_PROMPT_FILE)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    /// Kill switch: when false the pipeline is never invoked
    #[serde(default = "default_true")]
    pub chat_enabled: bool,

    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,

    /// Chat requests allowed per client per minute
    #[serde(default = "default_rate_limit")]
    pub rate_limit_per_minute: usize,
}

fn default_port() -> u16 {
    8000
}
fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_allowed_origins() -> Vec<String> {
    vec!["http://localhost:5173".into()]
}
fn default_rate_limit() -> usize {
    30
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            chat_enabled: true,
            allowed_origins: default_allowed_origins(),
            rate_limit_per_minute: default_rate_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// "sqlite", "memory", or "none"
    #[serde(default = "default_store_backend")]
    pub backend: String,

    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

fn default_store_backend() -> String {
    "sqlite".into()
}
fn default_store_path() -> PathBuf {
    AppConfig::config_dir().join("doppel.db")
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_store_backend(),
            path: default_store_path(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
}

impl AppConfig {
    /// Load configuration from the default path (~/.doppel/config.toml),
    /// then apply environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
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

    /// Apply environment overrides through a lookup function.
    ///
    /// Recognized variables:
    /// - `DOPPEL_API_KEY`, `GROQ_API_KEY`, `OPENAI_API_KEY` (first found wins, only if unset)
    /// - `DOPPEL_PROVIDER`, `DOPPEL_MODEL`, `DOPPEL_DATA_DIR`
    /// - `CHAT_ENABLED` (kill switch, "true"/"false")
    /// - `ALLOWED_ORIGINS` (comma-separated)
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if self.api_key.is_none() {
            self.api_key = lookup("DOPPEL_API_KEY")
                .or_else(|| lookup("GROQ_API_KEY"))
                .or_else(|| lookup("OPENAI_API_KEY"));
        }

        if let Some(provider) = lookup("DOPPEL_PROVIDER") {
            self.provider = provider;
        }

        if let Some(model) = lookup("DOPPEL_MODEL") {
            self.model = model;
        }

        if let Some(dir) = lookup("DOPPEL_DATA_DIR") {
            self.persona.data_dir = PathBuf::from(dir);
        }

        if let Some(enabled) = lookup("CHAT_ENABLED") {
            self.gateway.chat_enabled = enabled.trim().eq_ignore_ascii_case("true");
        }

        if let Some(origins) = lookup("ALLOWED_ORIGINS") {
            self.gateway.allowed_origins = origins
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect();
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".doppel")
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.persona.owner_name.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "persona.owner_name must not be empty".into(),
            ));
        }

        if self.persona.generation_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "persona.generation_timeout_secs must be > 0".into(),
            ));
        }

        if self.gateway.rate_limit_per_minute == 0 {
            return Err(ConfigError::ValidationError(
                "gateway.rate_limit_per_minute must be > 0".into(),
            ));
        }

        match self.store.backend.as_str() {
            "sqlite" | "memory" | "none" => {}
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "store.backend must be one of sqlite, memory, none (got '{other}')"
                )));
            }
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
            || self
                .providers
                .get(&self.provider)
                .is_some_and(|p| p.api_key.is_some())
    }

    /// Generate a default config TOML string (for the `init` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            provider: default_provider(),
            model: default_model(),
            persona: PersonaConfig::default(),
            gateway: GatewayConfig::default(),
            store: StoreConfig::default(),
            providers: HashMap::new(),
        }
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

    #[error("Invalid value '{value}' for setting '{key}': {reason}")]
    InvalidSetting {
        key: String,
        value: String,
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert_eq!(config.provider, "groq");
        assert_eq!(config.gateway.port, 8000);
        assert!(config.gateway.chat_enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.provider, config.provider);
        assert_eq!(parsed.persona.data_dir, config.persona.data_dir);
    }

    #[test]
    fn unknown_store_backend_rejected() {
        let mut config = AppConfig::default();
        config.store.backend = "mongo".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let config = AppConfig::load_from(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.model, "llama-3.1-8b-instant");
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
model = "llama-3.3-70b-versatile"

[persona]
owner_name = "Jordan"
extra_blocked_terms = ["crypto"]

[gateway]
chat_enabled = false
"#,
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.model, "llama-3.3-70b-versatile");
        assert_eq!(config.persona.owner_name, "Jordan");
        assert_eq!(config.persona.extra_blocked_terms, vec!["crypto".to_string()]);
        assert!(!config.gateway.chat_enabled);
        assert_eq!(config.gateway.port, 8000);
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = AppConfig::default();
        config.apply_env_overrides(|key| match key {
            "GROQ_API_KEY" => Some("gsk-test".into()),
            "CHAT_ENABLED" => Some("false".into()),
            "ALLOWED_ORIGINS" => Some("https://a.dev, https://b.dev".into()),
            "DOPPEL_DATA_DIR" => Some("/srv/persona".into()),
            _ => None,
        });
        assert_eq!(config.api_key.as_deref(), Some("gsk-test"));
        assert!(!config.gateway.chat_enabled);
        assert_eq!(config.gateway.allowed_origins.len(), 2);
        assert_eq!(config.persona.data_dir, PathBuf::from("/srv/persona"));
    }

    #[test]
    fn explicit_api_key_not_overridden_by_env() {
        let mut config = AppConfig {
            api_key: Some("from-file".into()),
            ..AppConfig::default()
        };
        config.apply_env_overrides(|key| (key == "GROQ_API_KEY").then(|| "from-env".into()));
        assert_eq!(config.api_key.as_deref(), Some("from-file"));
    }

    #[test]
    fn debug_redacts_api_key() {
        let config = AppConfig {
            api_key: Some("gsk-secret".into()),
            ..AppConfig::default()
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("gsk-secret"));
        assert!(debug.contains("[REDACTED]"));
    }
}

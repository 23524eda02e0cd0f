//! Configuration file support for repforge.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/repforge/config.toml`.
//! Providers are listed as an ordered `[[providers]]` array; generation tries
//! them in the order they appear.

use crate::providers::{
    self, GeminiProvider, OpenAiProvider, ProviderClient, ProviderSettings,
};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_providers")]
    pub providers: Vec<ProviderConfig>,

    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub user: UserConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            providers: default_providers(),
            data: DataConfig::default(),
            user: UserConfig::default(),
        }
    }
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

/// Acting user
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UserConfig {
    #[serde(default = "default_user_id")]
    pub id: String,
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            id: default_user_id(),
        }
    }
}

/// Supported provider APIs
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Openai,
    Gemini,
}

impl ProviderKind {
    fn default_model(&self) -> &'static str {
        match self {
            ProviderKind::Openai => providers::openai::DEFAULT_MODEL,
            ProviderKind::Gemini => providers::gemini::DEFAULT_MODEL,
        }
    }

    fn default_base_url(&self) -> &'static str {
        match self {
            ProviderKind::Openai => providers::openai::DEFAULT_BASE_URL,
            ProviderKind::Gemini => providers::gemini::DEFAULT_BASE_URL,
        }
    }

    fn default_api_key_env(&self) -> &'static str {
        match self {
            ProviderKind::Openai => providers::openai::API_KEY_ENV,
            ProviderKind::Gemini => providers::gemini::API_KEY_ENV,
        }
    }
}

/// One entry in the ordered provider list
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ProviderConfig {
    pub id: String,
    pub kind: ProviderKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Literal key; takes precedence over `api_key_env`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Environment variable holding the key (defaults per kind)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl ProviderConfig {
    fn with_defaults(id: &str, kind: ProviderKind) -> Self {
        Self {
            id: id.to_string(),
            kind,
            model: None,
            base_url: None,
            api_key: None,
            api_key_env: None,
            timeout_secs: default_timeout_secs(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }

    /// Resolve the API key, ignoring unset and placeholder values
    pub fn resolve_api_key(&self) -> Option<String> {
        let key = match &self.api_key {
            Some(key) => Some(key.clone()),
            None => {
                let var = self
                    .api_key_env
                    .as_deref()
                    .unwrap_or_else(|| self.kind.default_api_key_env());
                std::env::var(var).ok()
            }
        };
        key.map(|k| k.trim().to_string())
            .filter(|k| !is_placeholder_key(k))
    }

    /// Settings for building a client, or `None` when no usable key is set
    pub fn settings(&self) -> Option<ProviderSettings> {
        let api_key = self.resolve_api_key()?;
        Some(ProviderSettings {
            id: self.id.clone(),
            model: self
                .model
                .clone()
                .unwrap_or_else(|| self.kind.default_model().to_string()),
            base_url: self
                .base_url
                .clone()
                .unwrap_or_else(|| self.kind.default_base_url().to_string()),
            api_key,
            timeout: Duration::from_secs(self.timeout_secs),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        })
    }
}

/// Keys copied from a sample env file (`your_openai_api_key_here`) count as unset
fn is_placeholder_key(key: &str) -> bool {
    let lower = key.to_lowercase();
    lower.is_empty() || (lower.starts_with("your_") && lower.ends_with("_here")) || lower == "changeme"
}

// Default value functions
fn default_providers() -> Vec<ProviderConfig> {
    vec![
        ProviderConfig::with_defaults("openai", ProviderKind::Openai),
        ProviderConfig::with_defaults("gemini", ProviderKind::Gemini),
    ]
}

fn default_database_path() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(|| {
        std::env::var("HOME")
            .map(|home| PathBuf::from(home).join(".local/share"))
            .unwrap_or_else(|_| PathBuf::from("."))
    });
    base.join("repforge").join("repforge.db")
}

fn default_user_id() -> String {
    "demo-user".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_tokens() -> u32 {
    2000
}

fn default_temperature() -> f32 {
    0.7
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir().unwrap_or_else(|| {
            std::env::var("HOME")
                .map(|home| PathBuf::from(home).join(".config"))
                .unwrap_or_else(|_| PathBuf::from("."))
        });
        base.join("repforge").join("config.toml")
    }

    /// Save the current configuration to the default path
    pub fn save(&self) -> Result<()> {
        let config_path = Self::default_config_path();
        self.save_to(&config_path)
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }

    /// Reject configs the orchestrator cannot use
    pub fn validate(&self) -> Result<()> {
        if self.user.id.trim().is_empty() {
            return Err(Error::Config("user.id must not be empty".into()));
        }

        let mut seen = std::collections::HashSet::new();
        for provider in &self.providers {
            if provider.id.trim().is_empty() {
                return Err(Error::Config("provider id must not be empty".into()));
            }
            if provider.id == crate::FALLBACK_PROVENANCE {
                return Err(Error::Config(format!(
                    "provider id '{}' is reserved",
                    provider.id
                )));
            }
            if !seen.insert(provider.id.as_str()) {
                return Err(Error::Config(format!(
                    "duplicate provider id '{}'",
                    provider.id
                )));
            }
            if provider.timeout_secs == 0 {
                return Err(Error::Config(format!(
                    "provider '{}' needs a non-zero timeout_secs",
                    provider.id
                )));
            }
        }
        Ok(())
    }

    /// Build clients for every provider with a usable key, in config order
    pub fn build_providers(&self) -> Result<Vec<Box<dyn ProviderClient>>> {
        let mut clients: Vec<Box<dyn ProviderClient>> = Vec::new();

        for entry in &self.providers {
            let Some(settings) = entry.settings() else {
                tracing::warn!("Skipping provider '{}': no API key configured", entry.id);
                continue;
            };
            let client: Box<dyn ProviderClient> = match entry.kind {
                ProviderKind::Openai => Box::new(OpenAiProvider::new(settings)?),
                ProviderKind::Gemini => Box::new(GeminiProvider::new(settings)?),
            };
            clients.push(client);
        }

        Ok(clients)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.user.id, "demo-user");
        let ids: Vec<_> = config.providers.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["openai", "gemini"]);
        assert!(config.data.database_path.ends_with("repforge/repforge.db"));
    }

    #[test]
    fn test_config_roundtrip() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();

        assert_eq!(config.providers, parsed.providers);
        assert_eq!(config.user.id, parsed.user.id);
    }

    #[test]
    fn test_partial_config() {
        let toml_str = r#"
[[providers]]
id = "local"
kind = "openai"
base_url = "http://localhost:8080/v1"
api_key = "sk-local"

[user]
id = "alice"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.providers.len(), 1);
        assert_eq!(config.providers[0].timeout_secs, 30); // default
        assert_eq!(config.user.id, "alice");

        let settings = config.providers[0].settings().unwrap();
        assert_eq!(settings.model, "gpt-3.5-turbo");
        assert_eq!(settings.base_url, "http://localhost:8080/v1");
    }

    #[test]
    fn test_empty_provider_list() {
        let config: Config = toml::from_str("providers = []\n").unwrap();
        assert!(config.providers.is_empty());
        assert!(config.build_providers().unwrap().is_empty());
    }

    #[test]
    fn test_placeholder_keys_are_unset() {
        let mut entry = ProviderConfig::with_defaults("openai", ProviderKind::Openai);
        entry.api_key = Some("your_openai_api_key_here".into());
        assert_eq!(entry.resolve_api_key(), None);
        assert!(entry.settings().is_none());

        entry.api_key = Some("  ".into());
        assert_eq!(entry.resolve_api_key(), None);

        entry.api_key = Some("sk-real".into());
        assert_eq!(entry.resolve_api_key().as_deref(), Some("sk-real"));
    }

    #[test]
    fn test_key_from_named_env_var() {
        std::env::set_var("REPFORGE_TEST_GEMINI_KEY", "g-from-env");
        let mut entry = ProviderConfig::with_defaults("gemini", ProviderKind::Gemini);
        entry.api_key_env = Some("REPFORGE_TEST_GEMINI_KEY".into());
        assert_eq!(entry.resolve_api_key().as_deref(), Some("g-from-env"));

        entry.api_key_env = Some("REPFORGE_TEST_UNSET_KEY".into());
        assert_eq!(entry.resolve_api_key(), None);
    }

    #[test]
    fn test_validate_rejects_bad_provider_lists() {
        let mut config = Config::default();
        config.providers[1].id = "openai".into();
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let mut config = Config::default();
        config.providers[0].id = "fallback".into();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.providers[0].timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = Config::default();
        config.user.id = "bob".into();
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.user.id, "bob");
        assert_eq!(loaded.providers.len(), 2);
    }
}

//! Chatty configuration management

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main Chatty configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChattyConfig {
    /// Conversational memory configuration
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Text generation backend configuration
    #[serde(default)]
    pub backend: BackendConfig,

    /// Channel configurations
    #[serde(default)]
    pub channels: ChannelsConfig,

    /// Storage configuration
    #[serde(default)]
    pub storage: StorageConfig,
}

impl ChattyConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the stores cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.memory.max_exchanges == 0 {
            return Err(Error::Config(
                "memory.max_exchanges must be at least 1".to_string(),
            ));
        }
        if self.memory.timeout_secs == 0 {
            return Err(Error::Config(
                "memory.timeout_secs must be at least 1".to_string(),
            ));
        }
        if self.backend.default_model.trim().is_empty() {
            return Err(Error::Config(
                "backend.default_model must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// When the memory store is flushed to disk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SavePolicy {
    /// Flush after every recorded answer or reset, and at shutdown
    #[default]
    EveryTurn,

    /// Flush only at shutdown
    OnShutdown,
}

/// Conversational memory configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Maximum exchanges kept per user
    pub max_exchanges: usize,

    /// Idle seconds after which a user's history is discarded
    pub timeout_secs: u64,

    /// Label rendered before user turns
    pub user_label: String,

    /// Label rendered before bot turns
    pub bot_label: String,

    /// Maximum number of users kept in memory (0 = unlimited)
    pub max_users: usize,

    /// Flush policy
    pub save_policy: SavePolicy,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_exchanges: 5,
            timeout_secs: 600,
            user_label: "User".to_string(),
            bot_label: "Bot".to_string(),
            max_users: 0,
            save_policy: SavePolicy::EveryTurn,
        }
    }
}

/// Text generation backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Generative Language API base URL
    pub base_url: String,

    /// Environment variable holding the API key
    pub api_key_env: String,

    /// Model used when the registry file is missing or empty
    pub default_model: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
            default_model: "gemini-1.5-flash".to_string(),
        }
    }
}

impl BackendConfig {
    /// Resolve the API key from the configured environment variable
    pub fn resolve_api_key(&self) -> Result<String> {
        std::env::var(&self.api_key_env)
            .or_else(|_| std::env::var(self.api_key_env.to_uppercase()))
            .map_err(|_| {
                Error::Config(format!(
                    "API key not found in environment variable {}",
                    self.api_key_env
                ))
            })
    }
}

/// Channel configurations
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChannelsConfig {
    /// Discord channel config
    pub discord: Option<DiscordConfig>,

    /// Telegram channel config
    pub telegram: Option<TelegramConfig>,
}

/// Discord channel configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscordConfig {
    /// Role names granting admin commands
    pub admin_roles: Vec<String>,

    /// User ID that is always admin
    pub fallback_admin_id: u64,
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            admin_roles: vec!["Admin".to_string(), "Boss".to_string()],
            fallback_admin_id: 0,
        }
    }
}

/// Telegram channel configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    /// Username that is always admin
    pub fallback_admin_username: String,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Base directory for storage
    pub base_dir: PathBuf,

    /// Conversational memory snapshot
    pub memory_file: PathBuf,

    /// Scope → context filename mapping
    pub context_file: PathBuf,

    /// Directory holding context prompt text files
    pub prompts_dir: PathBuf,

    /// Supported/active model registry
    pub models_file: PathBuf,
}

impl StorageConfig {
    /// Lay out every storage path under one base directory
    pub fn under(base: PathBuf) -> Self {
        Self {
            memory_file: base.join("memory.json"),
            context_file: base.join("config").join("context.json"),
            prompts_dir: base.join("prompts"),
            models_file: base.join("config").join("models.json"),
            base_dir: base,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let base = dirs_next::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("chatty");
        Self::under(base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ChattyConfig::default();
        assert_eq!(config.memory.max_exchanges, 5);
        assert_eq!(config.memory.timeout_secs, 600);
        assert_eq!(config.memory.save_policy, SavePolicy::EveryTurn);
        assert_eq!(config.backend.default_model, "gemini-1.5-flash");
        assert!(config.channels.discord.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_storage_layout() {
        let storage = StorageConfig::under(PathBuf::from("/tmp/chatty"));
        assert_eq!(storage.memory_file, PathBuf::from("/tmp/chatty/memory.json"));
        assert_eq!(
            storage.context_file,
            PathBuf::from("/tmp/chatty/config/context.json")
        );
        assert_eq!(storage.prompts_dir, PathBuf::from("/tmp/chatty/prompts"));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: ChattyConfig = toml::from_str(
            r#"
            [memory]
            max_exchanges = 8
            save_policy = "on_shutdown"

            [channels.telegram]
            fallback_admin_username = "operator"

            [channels.discord]
            fallback_admin_id = 42
            "#,
        )
        .unwrap();

        assert_eq!(config.memory.max_exchanges, 8);
        assert_eq!(config.memory.timeout_secs, 600);
        assert_eq!(config.memory.save_policy, SavePolicy::OnShutdown);
        assert_eq!(
            config.channels.telegram.unwrap().fallback_admin_username,
            "operator"
        );
        let discord = config.channels.discord.unwrap();
        assert_eq!(discord.fallback_admin_id, 42);
        assert_eq!(discord.admin_roles, vec!["Admin".to_string(), "Boss".to_string()]);
    }

    #[test]
    fn test_validate_rejects_zero_bound() {
        let mut config = ChattyConfig::default();
        config.memory.max_exchanges = 0;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_from_file_missing() {
        let result = ChattyConfig::from_file(Path::new("/nonexistent/chatty.toml"));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_config_toml_roundtrip() {
        let config = ChattyConfig::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: ChattyConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.memory.user_label, "User");
        assert_eq!(parsed.storage.memory_file, config.storage.memory_file);
    }
}

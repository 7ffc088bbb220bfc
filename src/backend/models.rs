//! Supported/active model registry
//!
//! Persisted as:
//!
//! ```text
//! { "gemini_models": ["gemini-1.5-flash", "gemini-1.5-pro"],
//!   "last_used_model": "gemini-1.5-flash" }
//! ```

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::sync::Mutex;

/// On-disk registry layout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelsFile {
    #[serde(default)]
    pub gemini_models: Vec<String>,
    #[serde(default)]
    pub last_used_model: Option<String>,
}

/// Model registry backed by a JSON file
pub struct ModelRegistry {
    path: PathBuf,
    default_model: String,
    write_lock: Mutex<()>,
}

impl ModelRegistry {
    pub fn new(path: PathBuf, default_model: impl Into<String>) -> Self {
        Self {
            path,
            default_model: default_model.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Read the registry, falling back to the default model on any failure
    pub async fn load(&self) -> ModelsFile {
        let fallback = ModelsFile {
            gemini_models: vec![self.default_model.clone()],
            last_used_model: Some(self.default_model.clone()),
        };

        let data = match tokio::fs::read_to_string(&self.path).await {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!("Failed to load models file {}: {}", self.path.display(), e);
                return fallback;
            }
        };
        match serde_json::from_str(&data) {
            Ok(file) => file,
            Err(e) => {
                tracing::error!("Failed to parse models file {}: {}", self.path.display(), e);
                fallback
            }
        }
    }

    /// Supported model names
    pub async fn supported_models(&self) -> Vec<String> {
        let file = self.load().await;
        if file.gemini_models.is_empty() {
            vec![self.default_model.clone()]
        } else {
            file.gemini_models
        }
    }

    /// Last used model if still supported, else the first supported one
    pub async fn current_model(&self) -> String {
        let file = self.load().await;
        match file.last_used_model {
            Some(last) if file.gemini_models.contains(&last) => last,
            _ => file
                .gemini_models
                .first()
                .cloned()
                .unwrap_or_else(|| self.default_model.clone()),
        }
    }

    /// Switch the active model. Returns false for unsupported names or
    /// when the registry cannot be written.
    pub async fn change_model(&self, name: &str) -> bool {
        let _guard = self.write_lock.lock().await;

        let mut file = self.load().await;
        if file.gemini_models.is_empty() {
            file.gemini_models.push(self.default_model.clone());
        }
        if !file.gemini_models.iter().any(|m| m == name) {
            tracing::warn!("Attempted to switch to invalid model: {}", name);
            return false;
        }

        file.last_used_model = Some(name.to_string());
        match self.write(&file).await {
            Ok(()) => {
                tracing::info!("Model changed to: {}", name);
                true
            }
            Err(e) => {
                tracing::error!("Failed to update last_used_model: {}", e);
                false
            }
        }
    }

    async fn write(&self, file: &ModelsFile) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let json = serde_json::to_string_pretty(file)?;
        tokio::fs::write(&self.path, json).await?;
        Ok(())
    }
}

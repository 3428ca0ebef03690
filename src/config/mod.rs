//! Configuration management for chat-stream
//!
//! Implements a hierarchical configuration system:
//! 1. Global config (`<config dir>/chat-stream/config.json`)
//! 2. Project config (`./.chat-stream.json`)
//! 3. Environment variables (API keys)
//! 4. CLI parameters (highest priority)

pub mod models;
pub mod settings;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub use self::{
    models::{ModelProfile, ProviderType},
    settings::{GlobalConfig, ProjectConfig, StreamSettings},
};
use crate::error::{ChatStreamError, Result};

/// Main configuration structure combining global and project settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Global configuration
    #[serde(flatten)]
    pub global: GlobalConfig,

    /// Project-specific configuration
    #[serde(skip)]
    pub project: ProjectConfig,
}

impl Config {
    /// Load configuration from files and environment
    ///
    /// # Errors
    ///
    /// Returns an error if configuration files cannot be read or parsed
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::global_config_path(), &Self::project_config_path())
    }

    /// Load configuration from explicit file locations
    ///
    /// # Errors
    ///
    /// Returns an error if configuration files cannot be read or parsed
    pub fn load_from(global: &Path, project: &Path) -> Result<Self> {
        let global = GlobalConfig::load_from_path(global)?;
        let project = ProjectConfig::load_from_path(project)?;

        Ok(Self { global, project })
    }

    /// Get the configuration directory path
    #[must_use]
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("chat-stream")
    }

    /// Get the global config file path
    #[must_use]
    pub fn global_config_path() -> PathBuf {
        Self::config_dir().join("config.json")
    }

    /// Get the project config file path in the current directory
    #[must_use]
    pub fn project_config_path() -> PathBuf {
        PathBuf::from(".chat-stream.json")
    }

    /// Get a model profile by model identifier or profile name
    #[must_use]
    pub fn get_model(&self, name: &str) -> Option<&ModelProfile> {
        let profiles = &self.global.model_profiles;
        profiles
            .iter()
            .find(|profile| profile.model_name == name)
            .or_else(|| profiles.iter().find(|profile| profile.name == name))
    }

    /// Name of the default model; the project setting wins
    #[must_use]
    pub fn default_model_name(&self) -> Option<&str> {
        self.project
            .default_model_name
            .as_deref()
            .or(self.global.default_model_name.as_deref())
    }

    /// Get the default model profile
    #[must_use]
    pub fn default_model(&self) -> Option<&ModelProfile> {
        self.default_model_name().and_then(|name| self.get_model(name))
    }

    /// Pick the profile for a turn: `requested` if given, else the default,
    /// else the only configured profile
    ///
    /// # Errors
    ///
    /// Returns `ModelNotFound` if nothing matches
    pub fn resolve_model(&self, requested: Option<&str>) -> Result<&ModelProfile> {
        if let Some(name) = requested {
            return self
                .get_model(name)
                .ok_or_else(|| ChatStreamError::ModelNotFound(name.to_string()));
        }

        if let Some(name) = self.default_model_name() {
            return self
                .get_model(name)
                .ok_or_else(|| ChatStreamError::ModelNotFound(name.to_string()));
        }

        match self.global.model_profiles.as_slice() {
            [only] => Ok(only),
            _ => Err(ChatStreamError::ModelNotFound(
                "no default model configured".to_string(),
            )),
        }
    }

    /// Debug logging requested by the command line or the global config
    #[must_use]
    pub fn verbose(&self, cli_flag: bool) -> bool {
        cli_flag || self.global.verbose
    }

    /// System prompt for new turns
    #[must_use]
    pub fn system_prompt(&self) -> Option<&str> {
        self.project.system_prompt.as_deref()
    }

    /// Check the loaded configuration for problems that would fail a turn
    #[must_use]
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        for profile in &self.global.model_profiles {
            if profile.provider.requires_api_key() && profile.resolved_api_key().is_none() {
                errors.push(ValidationError::MissingApiKey(profile.provider.to_string()));
            }
            if profile.effective_base_url().is_none() {
                errors.push(ValidationError::InvalidModel(format!(
                    "{}: no base_url for provider {}",
                    profile.name, profile.provider
                )));
            }
        }

        if let Some(name) = self.default_model_name() {
            if self.get_model(name).is_none() {
                errors.push(ValidationError::UnknownDefaultModel(name.to_string()));
            }
        }

        if let Err(e) = self.global.stream.validate() {
            errors.push(ValidationError::InvalidStream(e.to_string()));
        }

        errors
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    MissingApiKey(String),
    InvalidModel(String),
    UnknownDefaultModel(String),
    InvalidStream(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingApiKey(provider) => {
                write!(f, "Missing API key for provider: {provider}")
            }
            Self::InvalidModel(name) => write!(f, "Invalid model configuration: {name}"),
            Self::UnknownDefaultModel(name) => write!(f, "Default model not found: {name}"),
            Self::InvalidStream(message) => write!(f, "{message}"),
        }
    }
}

impl std::error::Error for ValidationError {}

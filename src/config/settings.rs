//! Global and project-specific settings

use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use super::ModelProfile;
use crate::{
    error::{ChatStreamError, Result},
    services::{
        driver::{DriverOptions, DEFAULT_MAX_LINE_BYTES},
        streaming::{
            decoder::{DEFAULT_MAX_BYTES, DEFAULT_MAX_DEPTH},
            sse_parser::{DATA_PREFIX, DONE_SENTINEL},
            DecodeLimits, ParseOptions,
        },
    },
};

/// Global configuration (stored in `<config dir>/chat-stream/config.json`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Verbose logging enabled
    #[serde(default)]
    pub verbose: bool,

    /// Model profiles
    #[serde(default)]
    pub model_profiles: Vec<ModelProfile>,

    /// Default model name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model_name: Option<String>,

    /// Stream parsing settings
    #[serde(default)]
    pub stream: StreamSettings,

    /// Keep at most this many messages in history
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_history: Option<usize>,

    /// HTTP proxy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy: Option<String>,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            model_profiles: Vec::new(),
            default_model_name: None,
            stream: StreamSettings::default(),
            max_history: None,
            proxy: None,
        }
    }
}

/// Limits and framing for the streaming pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamSettings {
    /// Largest accepted payload, in UTF-8 bytes
    pub max_payload_bytes: usize,

    /// Deepest accepted payload nesting
    pub max_depth: usize,

    /// Field prefix of data lines
    pub field_prefix: String,

    /// End-of-stream sentinel payload
    pub done_sentinel: String,

    /// Ceiling on a single unterminated line
    pub max_line_bytes: usize,

    /// Use tool-aware adapters
    pub tool_events: bool,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            max_payload_bytes: DEFAULT_MAX_BYTES,
            max_depth: DEFAULT_MAX_DEPTH,
            field_prefix: DATA_PREFIX.to_string(),
            done_sentinel: DONE_SENTINEL.to_string(),
            max_line_bytes: DEFAULT_MAX_LINE_BYTES,
            tool_events: true,
        }
    }
}

impl StreamSettings {
    /// Line parser settings
    #[must_use]
    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            field_prefix: self.field_prefix.clone(),
            done_sentinel: self.done_sentinel.clone(),
            limits: DecodeLimits {
                max_bytes: self.max_payload_bytes,
                max_depth: self.max_depth,
            },
        }
    }

    /// Driver settings
    #[must_use]
    pub fn driver_options(&self) -> DriverOptions {
        DriverOptions {
            parse: self.parse_options(),
            max_line_bytes: self.max_line_bytes,
        }
    }

    /// Validated driver settings
    ///
    /// # Errors
    ///
    /// Returns an error if [`validate`](Self::validate) rejects the settings
    pub fn try_driver_options(&self) -> Result<DriverOptions> {
        self.validate()?;
        Ok(self.driver_options())
    }

    /// Reject settings that would make every payload fail
    ///
    /// # Errors
    ///
    /// Returns an error naming the offending field
    pub fn validate(&self) -> Result<()> {
        if self.max_payload_bytes == 0 {
            return Err(ChatStreamError::ConfigValidation(
                "stream.max_payload_bytes must be greater than 0".to_string(),
            ));
        }
        if self.max_line_bytes == 0 {
            return Err(ChatStreamError::ConfigValidation(
                "stream.max_line_bytes must be greater than 0".to_string(),
            ));
        }
        if self.field_prefix.is_empty() {
            return Err(ChatStreamError::ConfigValidation(
                "stream.field_prefix must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl GlobalConfig {
    /// Load global configuration from disk
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed
    pub fn load() -> Result<Self> {
        let path = super::Config::global_config_path();
        Self::load_from_path(&path)
    }

    /// Load configuration from a specific path
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed
    pub fn load_from_path(path: &Path) -> Result<Self> {
        load_json(path)
    }

    /// Save configuration to disk
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written
    pub fn save(&self) -> Result<()> {
        let path = super::Config::global_config_path();
        self.save_to_path(&path)
    }

    /// Save configuration to a specific path
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        // Ensure directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = serde_json::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }
}

/// Project-specific configuration (stored in `./.chat-stream.json`)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Overrides the global default model
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model_name: Option<String>,

    /// System prompt sent with every turn
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
}

impl ProjectConfig {
    /// Load project configuration from current directory
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed
    pub fn load() -> Result<Self> {
        let path = super::Config::project_config_path();
        Self::load_from_path(&path)
    }

    /// Load configuration from a specific path
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed
    pub fn load_from_path(path: &Path) -> Result<Self> {
        load_json(path)
    }

    /// Save configuration to a specific path
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        let contents = serde_json::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }
}

/// Read a JSON config file; a missing file yields the default
fn load_json<T>(path: &Path) -> Result<T>
where
    T: Default + for<'de> Deserialize<'de>,
{
    if !path.exists() {
        return Ok(T::default());
    }

    let contents = fs::read_to_string(path).map_err(|e| ChatStreamError::ConfigParse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    serde_json::from_str(&contents).map_err(|e| ChatStreamError::ConfigParse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

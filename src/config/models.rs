//! Model configuration and profiles

use serde::{Deserialize, Serialize};

use crate::services::{StreamAdapter, StreamAdapterFactory, WireFormat};

/// AI provider types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    #[serde(rename = "openai")]
    OpenAI,
    Anthropic,
    Gemini,
    Ollama,
    Groq,
    #[serde(rename = "custom-openai")]
    CustomOpenAI,
}

impl ProviderType {
    /// Get the default base URL for this provider
    #[must_use]
    pub const fn default_base_url(&self) -> Option<&'static str> {
        match self {
            Self::OpenAI => Some("https://api.openai.com/v1"),
            Self::Anthropic => Some("https://api.anthropic.com"),
            Self::Gemini => Some("https://generativelanguage.googleapis.com"),
            Self::Ollama => Some("http://localhost:11434/v1"),
            Self::Groq => Some("https://api.groq.com/openai/v1"),
            Self::CustomOpenAI => None, // requires a user-specified endpoint
        }
    }

    /// Check if this provider requires an API key
    #[must_use]
    pub const fn requires_api_key(&self) -> bool {
        !matches!(self, Self::Ollama)
    }

    /// Environment variable consulted for the API key
    #[must_use]
    pub const fn api_key_env(&self) -> Option<&'static str> {
        match self {
            Self::OpenAI | Self::CustomOpenAI => Some("OPENAI_API_KEY"),
            Self::Anthropic => Some("ANTHROPIC_API_KEY"),
            Self::Gemini => Some("GEMINI_API_KEY"),
            Self::Groq => Some("GROQ_API_KEY"),
            Self::Ollama => None,
        }
    }

    /// Streaming payload shape; OpenAI-compatible providers share one
    #[must_use]
    pub const fn wire_format(&self) -> WireFormat {
        match self {
            Self::Anthropic => WireFormat::Anthropic,
            Self::Gemini => WireFormat::Gemini,
            Self::OpenAI | Self::Ollama | Self::Groq | Self::CustomOpenAI => WireFormat::OpenAI,
        }
    }

    /// Fresh stream adapter for one streaming call
    #[must_use]
    pub fn create_adapter(self, tool_support: bool) -> Box<dyn StreamAdapter + Send> {
        StreamAdapterFactory::create(self, tool_support)
    }
}

impl std::fmt::Display for ProviderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OpenAI => write!(f, "openai"),
            Self::Anthropic => write!(f, "anthropic"),
            Self::Gemini => write!(f, "gemini"),
            Self::Ollama => write!(f, "ollama"),
            Self::Groq => write!(f, "groq"),
            Self::CustomOpenAI => write!(f, "custom-openai"),
        }
    }
}

/// Model profile configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelProfile {
    /// User-friendly name for the profile
    pub name: String,

    /// Provider type
    pub provider: ProviderType,

    /// Actual model identifier (primary key)
    pub model_name: String,

    /// Custom API endpoint (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// API key; empty means "look in the environment"
    #[serde(default)]
    pub api_key: String,

    /// Maximum output tokens
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_max_tokens() -> u32 {
    4096
}

impl ModelProfile {
    /// Create a new model profile
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        provider: ProviderType,
        model_name: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            provider,
            model_name: model_name.into(),
            base_url: None,
            api_key: api_key.into(),
            max_tokens: default_max_tokens(),
        }
    }

    /// Point the profile at a custom endpoint
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Get the effective base URL (custom or default), without trailing slash
    #[must_use]
    pub fn effective_base_url(&self) -> Option<String> {
        self.base_url
            .as_deref()
            .or_else(|| self.provider.default_base_url())
            .map(|url| url.trim_end_matches('/').to_string())
    }

    /// API key from the profile, falling back to the provider's env var
    #[must_use]
    pub fn resolved_api_key(&self) -> Option<String> {
        if !self.api_key.is_empty() {
            return Some(self.api_key.clone());
        }
        self.provider
            .api_key_env()
            .and_then(|var| std::env::var(var).ok())
            .filter(|key| !key.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_provider_default_urls() {
        assert_eq!(
            ProviderType::Anthropic.default_base_url(),
            Some("https://api.anthropic.com")
        );
        assert_eq!(
            ProviderType::OpenAI.default_base_url(),
            Some("https://api.openai.com/v1")
        );
        assert!(ProviderType::CustomOpenAI.default_base_url().is_none());
    }

    #[test]
    fn test_wire_formats() {
        assert_eq!(ProviderType::Groq.wire_format(), WireFormat::OpenAI);
        assert_eq!(ProviderType::Ollama.wire_format(), WireFormat::OpenAI);
        assert_eq!(ProviderType::Anthropic.wire_format(), WireFormat::Anthropic);
        assert_eq!(ProviderType::Gemini.wire_format(), WireFormat::Gemini);
    }

    #[test]
    fn test_provider_serde_names() {
        let provider: ProviderType = serde_json::from_value(json!("custom-openai")).unwrap();
        assert_eq!(provider, ProviderType::CustomOpenAI);
        assert_eq!(serde_json::to_value(ProviderType::OpenAI).unwrap(), json!("openai"));
        assert_eq!(ProviderType::CustomOpenAI.to_string(), "custom-openai");
    }

    #[test]
    fn test_profile_defaults_from_json() {
        let profile: ModelProfile = serde_json::from_value(json!({
            "name": "Local",
            "provider": "ollama",
            "model_name": "llama3"
        }))
        .unwrap();

        assert_eq!(profile.max_tokens, 4096);
        assert!(profile.api_key.is_empty());
        assert_eq!(
            profile.effective_base_url().as_deref(),
            Some("http://localhost:11434/v1")
        );
        assert_eq!(profile.resolved_api_key(), None);
    }

    #[test]
    fn test_effective_base_url_trims_slash() {
        let profile = ModelProfile::new("Proxy", ProviderType::CustomOpenAI, "m", "k")
            .with_base_url("https://proxy.local/v1/");
        assert_eq!(
            profile.effective_base_url().as_deref(),
            Some("https://proxy.local/v1")
        );
        assert_eq!(profile.resolved_api_key().as_deref(), Some("k"));
    }
}

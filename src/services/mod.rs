//! Service layer for streaming LLM providers
//!
//! This module provides the canonical event model and per-provider pieces:
//! - Request builders for OpenAI, Anthropic and Gemini style endpoints
//! - Stream adapters normalizing provider frames into [`CanonicalEvent`]s
//! - The [`StreamDriver`](driver::StreamDriver) running the read loop

pub mod anthropic;
pub mod driver;
pub mod gemini;
pub mod mock;
pub mod openai;
pub mod streaming;
pub mod transport;

use serde::{Deserialize, Serialize};

use crate::{
    config::models::{ModelProfile, ProviderType},
    error::{ChatStreamError, Result},
    messages::ChatMessage,
};

use self::{
    streaming::{
        AnthropicStreamAdapter, AnthropicTextAdapter, Frame, GeminiStreamAdapter,
        GeminiTextAdapter, OpenAIStreamAdapter, OpenAITextAdapter,
    },
    transport::StreamRequest,
};

/// Normalized, provider-agnostic unit of streaming output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CanonicalEvent {
    /// Incremental assistant text
    TextToken { content: String },

    /// Incremental content attributed to a tool
    ToolContent { content: String },

    /// A tool invocation has begun
    ToolStart {
        tool_name: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        input: Option<String>,
    },

    /// A tool invocation has completed; `output` is opaque
    ToolEnd {
        tool_name: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        output: Option<String>,
    },

    /// Failure reported by the backend itself
    Error { message: String },
}

impl CanonicalEvent {
    /// Create a text token event
    #[must_use]
    pub fn text(content: impl Into<String>) -> Self {
        Self::TextToken {
            content: content.into(),
        }
    }

    /// Create a backend error event
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Text this event contributes to the visible message, if any
    #[must_use]
    pub fn visible_text(&self) -> Option<&str> {
        match self {
            Self::TextToken { content } | Self::ToolContent { content } => Some(content),
            _ => None,
        }
    }
}

/// Transforms decoded provider frames into canonical events
///
/// An instance is bound to one streaming call. Stateful implementations keep
/// their tool-call accumulation private, so two concurrent calls with their
/// own instances never see each other's fragments.
pub trait StreamAdapter {
    /// Map one frame to zero or more events
    ///
    /// Unrecognized shapes yield an empty `Vec`, which does not allocate.
    fn apply(&mut self, frame: &Frame) -> Vec<CanonicalEvent>;

    /// Flush anything still pending when the body ends normally
    fn finish(&mut self) -> Vec<CanonicalEvent> {
        Vec::new()
    }
}

impl<A: StreamAdapter + ?Sized> StreamAdapter for Box<A> {
    fn apply(&mut self, frame: &Frame) -> Vec<CanonicalEvent> {
        (**self).apply(frame)
    }

    fn finish(&mut self) -> Vec<CanonicalEvent> {
        (**self).finish()
    }
}

/// Factory for stream adapters
pub struct StreamAdapterFactory;

impl StreamAdapterFactory {
    /// Create a fresh adapter for a provider
    ///
    /// Without tool support the stateless text-only variant is returned.
    #[must_use]
    pub fn create(provider: ProviderType, tool_support: bool) -> Box<dyn StreamAdapter + Send> {
        match (provider.wire_format(), tool_support) {
            (WireFormat::OpenAI, true) => Box::new(OpenAIStreamAdapter::new()),
            (WireFormat::OpenAI, false) => Box::new(OpenAITextAdapter),
            (WireFormat::Anthropic, true) => Box::new(AnthropicStreamAdapter::new()),
            (WireFormat::Anthropic, false) => Box::new(AnthropicTextAdapter),
            (WireFormat::Gemini, true) => Box::new(GeminiStreamAdapter),
            (WireFormat::Gemini, false) => Box::new(GeminiTextAdapter),
        }
    }
}

/// Payload shape spoken by a provider's streaming endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireFormat {
    OpenAI,
    Anthropic,
    Gemini,
}

/// Build the outbound streaming request for a profile
///
/// `history` holds completed messages only; the in-flight placeholder must
/// not be included.
///
/// # Errors
///
/// Returns an error if no API key is available or a header is invalid
pub fn build_request(
    profile: &ModelProfile,
    history: &[ChatMessage],
    system_prompt: Option<&str>,
) -> Result<StreamRequest> {
    match profile.provider.wire_format() {
        WireFormat::OpenAI => openai::build_request(profile, history, system_prompt),
        WireFormat::Anthropic => anthropic::build_request(profile, history, system_prompt),
        WireFormat::Gemini => gemini::build_request(profile, history, system_prompt),
    }
}

/// Base URL for a profile, without trailing slash
pub(crate) fn require_base_url(profile: &ModelProfile) -> Result<String> {
    profile.effective_base_url().ok_or_else(|| {
        ChatStreamError::ConfigValidation(format!(
            "model profile '{}' needs a base_url for provider {}",
            profile.name, profile.provider
        ))
    })
}

/// API key for a profile; `None` only for providers that need none
pub(crate) fn require_api_key(profile: &ModelProfile) -> Result<Option<String>> {
    match profile.resolved_api_key() {
        Some(key) => Ok(Some(key)),
        None if profile.provider.requires_api_key() => Err(ChatStreamError::MissingApiKey {
            provider: profile.provider.to_string(),
        }),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_serialization() {
        let event = CanonicalEvent::ToolStart {
            tool_name: "search".into(),
            input: None,
        };
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({"type": "tool_start", "tool_name": "search"})
        );

        let parsed: CanonicalEvent =
            serde_json::from_value(json!({"type": "text_token", "content": "hi"})).unwrap();
        assert_eq!(parsed, CanonicalEvent::text("hi"));
    }

    #[test]
    fn test_visible_text() {
        assert_eq!(CanonicalEvent::text("a").visible_text(), Some("a"));
        assert_eq!(
            CanonicalEvent::ToolContent {
                content: "b".into()
            }
            .visible_text(),
            Some("b")
        );
        assert_eq!(CanonicalEvent::error("boom").visible_text(), None);
    }

    #[test]
    fn test_factory_returns_independent_instances() {
        let frame = Frame::Json(json!({
            "choices": [{"delta": {"tool_calls": [
                {"index": 0, "function": {"name": "search", "arguments": "{\"q\":"}}
            ]}}]
        }));
        let finish = Frame::Json(json!({"choices": [{"delta": {}, "finish_reason": "tool_calls"}]}));

        let mut first = StreamAdapterFactory::create(ProviderType::OpenAI, true);
        let mut second = StreamAdapterFactory::create(ProviderType::OpenAI, true);

        assert_eq!(first.apply(&frame).len(), 1);
        // The second instance never saw the tool call
        assert!(second.apply(&finish).is_empty());
        assert_eq!(first.apply(&finish).len(), 1);
    }

    #[test]
    fn test_factory_text_only_ignores_tools() {
        let mut adapter = StreamAdapterFactory::create(ProviderType::Anthropic, false);
        let start = Frame::Json(json!({
            "type": "content_block_start",
            "index": 0,
            "content_block": {"type": "tool_use", "id": "t1", "name": "search"}
        }));
        assert!(adapter.apply(&start).is_empty());
    }
}

//! Streaming support for AI model responses
//!
//! Provides infrastructure for ingesting Server-Sent Events (SSE) streams
//! from various AI providers (Anthropic, OpenAI, Gemini):
//! bytes → lines → frames → canonical events.
//!
//! The wire types below are deliberately lenient. Vendors evolve these
//! shapes, so unknown fields are ignored and unknown event tags map to a
//! catch-all variant rather than failing.

pub mod anthropic_stream;
pub mod decoder;
pub mod gemini_stream;
pub mod line_splitter;
pub mod openai_stream;
pub mod sse_parser;
pub mod text_stream;

pub use anthropic_stream::{AnthropicStreamAdapter, AnthropicTextAdapter};
pub use decoder::{decode_guarded, DecodeLimits};
pub use gemini_stream::{GeminiStreamAdapter, GeminiTextAdapter};
pub use line_splitter::LineSplitter;
pub use openai_stream::{OpenAIStreamAdapter, OpenAITextAdapter};
pub use sse_parser::{parse_line, Frame, ParseOptions};
pub use text_stream::PlainTextAdapter;

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

/// Deserialize a typed view of a JSON frame, or `None` for text frames and
/// shapes that don't match
pub(crate) fn typed_frame<'a, T>(frame: &'a Frame, provider: &str) -> Option<T>
where
    T: Deserialize<'a>,
{
    let value = frame.as_json()?;
    match T::deserialize(value) {
        Ok(typed) => Some(typed),
        Err(e) => {
            debug!(provider, error = %e, "Ignoring unrecognized frame");
            None
        }
    }
}

/// Stream event types for Anthropic API
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnthropicStreamEvent {
    /// Initial message metadata
    MessageStart,

    /// Start of a content block
    ContentBlockStart {
        #[serde(default)]
        index: usize,
        content_block: ContentBlockStart,
    },

    /// Delta update for content block
    ContentBlockDelta {
        #[serde(default)]
        index: usize,
        delta: ContentDelta,
    },

    /// End of a content block
    ContentBlockStop {
        #[serde(default)]
        index: usize,
    },

    /// Message-level delta (usage, stop reason, etc.)
    MessageDelta,

    /// End of message stream
    MessageStop,

    /// Ping event (keepalive)
    Ping,

    /// Error event
    Error { error: ErrorData },

    /// Event type this crate does not know about
    #[serde(other)]
    Unknown,
}

/// Content block start data
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlockStart {
    Text {
        #[serde(default)]
        text: String,
    },
    ToolUse {
        #[serde(default)]
        id: String,
        name: String,
    },
    #[serde(other)]
    Other,
}

/// Content delta types
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentDelta {
    TextDelta {
        text: String,
    },
    InputJsonDelta {
        #[serde(default)]
        partial_json: String,
    },
    #[serde(other)]
    Other,
}

/// Error payload shared by Anthropic and OpenAI error frames
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorData {
    #[serde(rename = "type", default)]
    pub error_type: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ErrorData {
    /// Human-readable message, falling back to the error type
    #[must_use]
    pub fn describe(&self) -> String {
        match (&self.message, &self.error_type) {
            (Some(message), _) if !message.is_empty() => message.clone(),
            (_, Some(error_type)) => error_type.clone(),
            _ => "Unknown stream error".to_string(),
        }
    }
}

/// OpenAI stream event (chunk)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OpenAIStreamChunk {
    #[serde(default)]
    pub choices: Vec<OpenAIChoice>,
    #[serde(default)]
    pub error: Option<ErrorData>,
}

/// OpenAI choice in stream
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OpenAIChoice {
    #[serde(default)]
    pub delta: OpenAIDelta,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// OpenAI delta content
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OpenAIDelta {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub tool_calls: Option<Vec<ToolCallDelta>>,
}

/// Tool call delta for OpenAI
#[derive(Debug, Clone, Deserialize)]
pub struct ToolCallDelta {
    #[serde(default)]
    pub index: usize,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub function: Option<FunctionDelta>,
}

/// Function call delta
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FunctionDelta {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub arguments: Option<String>,
}

/// Gemini `streamGenerateContent` chunk
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GeminiStreamChunk {
    #[serde(default)]
    pub candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    pub error: Option<ErrorData>,
}

/// Gemini candidate
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GeminiCandidate {
    #[serde(default)]
    pub content: Option<GeminiContent>,
}

/// Gemini candidate content
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GeminiContent {
    #[serde(default)]
    pub parts: Vec<GeminiPart>,
}

/// One part of a Gemini candidate: text, a function call, or a function
/// response
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiPart {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub function_call: Option<GeminiFunctionCall>,
    #[serde(default)]
    pub function_response: Option<GeminiFunctionResponse>,
}

/// Gemini function call, delivered whole
#[derive(Debug, Clone, Deserialize)]
pub struct GeminiFunctionCall {
    pub name: String,
    #[serde(default)]
    pub args: Value,
}

/// Gemini function response
#[derive(Debug, Clone, Deserialize)]
pub struct GeminiFunctionResponse {
    pub name: String,
    #[serde(default)]
    pub response: Value,
}

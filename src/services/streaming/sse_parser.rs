//! Event-stream line parser
//!
//! Interprets one `text/event-stream` line at a time. Lines are expected to
//! come out of a [`LineSplitter`](super::LineSplitter), so a line is always
//! complete; blank lines are record separators and carry no payload.

use serde_json::Value;

use super::decoder::{decode_guarded, DecodeLimits};

/// Default field prefix for payload lines
pub const DATA_PREFIX: &str = "data:";

/// OpenAI's end-of-stream sentinel
pub const DONE_SENTINEL: &str = "[DONE]";

/// Comment marker at the start of a line
const COMMENT_PREFIX: char = ':';

/// One payload extracted from a single data line
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// Payload decoded as JSON
    Json(Value),

    /// Payload that did not decode, kept as trimmed text
    Text(String),
}

impl Frame {
    /// JSON payload, if this frame decoded
    #[must_use]
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(value) => Some(value),
            Self::Text(_) => None,
        }
    }

    /// Raw text payload, if this frame did not decode
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Json(_) => None,
            Self::Text(text) => Some(text),
        }
    }
}

/// Options for [`parse_line`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOptions {
    /// Field prefix identifying payload lines
    pub field_prefix: String,

    /// Payload that marks end of stream without an event
    pub done_sentinel: String,

    /// Limits handed to the guarded decoder
    pub limits: DecodeLimits,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            field_prefix: DATA_PREFIX.to_string(),
            done_sentinel: DONE_SENTINEL.to_string(),
            limits: DecodeLimits::default(),
        }
    }
}

/// Parse one event-stream line into a frame
///
/// Returns `None` for blank lines, comments, lines with another field name
/// (`event:`, `id:`, `retry:`), the done sentinel, and empty payloads.
///
/// A payload that fails to decode is returned as [`Frame::Text`] instead of
/// being dropped. Some backends send plain-text data lines, and those must
/// not lose content. The flip side is that malformed JSON and intentional
/// plain text look the same to callers; adapters that expect JSON simply
/// ignore text frames.
#[must_use]
pub fn parse_line(line: &str, options: &ParseOptions) -> Option<Frame> {
    if line.trim().is_empty() {
        return None;
    }

    if line.starts_with(COMMENT_PREFIX) {
        return None;
    }

    let payload = line.strip_prefix(options.field_prefix.as_str())?.trim();

    if payload.is_empty() || payload == options.done_sentinel {
        return None;
    }

    match decode_guarded(payload, &options.limits) {
        Some(value) => Some(Frame::Json(value)),
        None => Some(Frame::Text(payload.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_json_data_line() {
        let frame = parse_line(r#"data: {"text":"hello"}"#, &ParseOptions::default());
        assert_eq!(frame, Some(Frame::Json(json!({"text": "hello"}))));
    }

    #[test]
    fn test_parse_without_space_after_colon() {
        let frame = parse_line(r#"data:{"a":1}"#, &ParseOptions::default());
        assert_eq!(frame, Some(Frame::Json(json!({"a": 1}))));
    }

    #[test]
    fn test_parse_done_marker() {
        assert_eq!(parse_line("data: [DONE]", &ParseOptions::default()), None);
        assert_eq!(parse_line("data:[DONE]  ", &ParseOptions::default()), None);
    }

    #[test]
    fn test_blank_lines_are_separators() {
        let options = ParseOptions::default();
        assert_eq!(parse_line("", &options), None);
        assert_eq!(parse_line("   ", &options), None);
        assert_eq!(parse_line("\r", &options), None);
    }

    #[test]
    fn test_ignore_comments() {
        assert_eq!(parse_line(": keep-alive", &ParseOptions::default()), None);
        assert_eq!(parse_line(":", &ParseOptions::default()), None);
    }

    #[test]
    fn test_other_fields_ignored() {
        let options = ParseOptions::default();
        assert_eq!(parse_line("event: message_start", &options), None);
        assert_eq!(parse_line("id: 42", &options), None);
        assert_eq!(parse_line("retry: 1000", &options), None);
    }

    #[test]
    fn test_plain_text_fallback() {
        let frame = parse_line("data: hello", &ParseOptions::default());
        assert_eq!(frame, Some(Frame::Text("hello".to_string())));
        assert_eq!(frame.as_ref().and_then(Frame::as_text), Some("hello"));
    }

    #[test]
    fn test_truncated_json_falls_back_to_text() {
        let frame = parse_line(r#"data: {"choices":[{"del"#, &ParseOptions::default());
        assert_eq!(frame, Some(Frame::Text(r#"{"choices":[{"del"#.to_string())));
    }

    #[test]
    fn test_empty_payload_is_none() {
        assert_eq!(parse_line("data:", &ParseOptions::default()), None);
        assert_eq!(parse_line("data:    ", &ParseOptions::default()), None);
    }

    #[test]
    fn test_custom_prefix_and_sentinel() {
        let options = ParseOptions {
            field_prefix: "payload:".to_string(),
            done_sentinel: "END".to_string(),
            ..ParseOptions::default()
        };
        assert_eq!(parse_line("payload: END", &options), None);
        assert_eq!(parse_line("data: 1", &options), None);
        assert_eq!(parse_line("payload: 1", &options), Some(Frame::Json(json!(1))));
    }

    #[test]
    fn test_oversized_payload_falls_back_to_text() {
        let options = ParseOptions {
            limits: DecodeLimits {
                max_bytes: 4,
                ..DecodeLimits::default()
            },
            ..ParseOptions::default()
        };
        let frame = parse_line(r#"data: {"a":1}"#, &options);
        assert_eq!(frame, Some(Frame::Text(r#"{"a":1}"#.to_string())));
    }
}

//! OpenAI API stream adapter
//!
//! Normalizes Chat Completions `chat.completion.chunk` frames. Tool calls
//! arrive fragmented: the first delta for a slot carries the function name,
//! later deltas carry pieces of the JSON arguments. Fragments are held per
//! slot until the chunk's finish reason says the calls are complete.

use indexmap::IndexMap;
use tracing::{debug, trace};

use crate::services::{CanonicalEvent, StreamAdapter};

use super::{typed_frame, Frame, OpenAIStreamChunk, ToolCallDelta};

/// Finish reason marking that the tool calls of this response are complete
pub const TOOL_CALLS_FINISH_REASON: &str = "tool_calls";

/// Tool call being assembled from deltas
#[derive(Debug, Clone, Default)]
struct ToolCallBuilder {
    id: String,
    name: String,
    arguments: String,
}

/// Adapter for OpenAI streaming responses, with tool-call reassembly
#[derive(Debug, Default)]
pub struct OpenAIStreamAdapter {
    /// Tool calls being assembled (slot index -> builder), in start order
    tool_calls: IndexMap<usize, ToolCallBuilder>,
}

impl OpenAIStreamAdapter {
    /// Create an adapter with empty accumulation state
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tool calls started but not yet closed
    #[must_use]
    pub fn pending_tool_calls(&self) -> usize {
        self.tool_calls.len()
    }

    /// Process a tool call delta
    fn process_tool_call_delta(&mut self, delta: ToolCallDelta, events: &mut Vec<CanonicalEvent>) {
        let function = delta.function.unwrap_or_default();

        match function.name.filter(|name| !name.is_empty()) {
            Some(name) => {
                trace!(slot = delta.index, tool = %name, "Tool call started");
                self.tool_calls.insert(
                    delta.index,
                    ToolCallBuilder {
                        id: delta.id.unwrap_or_default(),
                        name: name.clone(),
                        arguments: function.arguments.unwrap_or_default(),
                    },
                );
                events.push(CanonicalEvent::ToolStart {
                    tool_name: name,
                    input: None,
                });
            }
            None => {
                let Some(arguments) = function.arguments else {
                    return;
                };
                match self.tool_calls.get_mut(&delta.index) {
                    Some(builder) => builder.arguments.push_str(&arguments),
                    None => debug!(slot = delta.index, "Arguments for unknown tool call slot"),
                }
            }
        }
    }

    /// Close every accumulated tool call
    fn drain_tool_calls(&mut self, events: &mut Vec<CanonicalEvent>) {
        for (slot, builder) in self.tool_calls.drain(..) {
            trace!(slot, id = %builder.id, tool = %builder.name, "Tool call finished");
            events.push(CanonicalEvent::ToolEnd {
                tool_name: builder.name,
                output: Some(builder.arguments),
            });
        }
    }
}

impl StreamAdapter for OpenAIStreamAdapter {
    fn apply(&mut self, frame: &Frame) -> Vec<CanonicalEvent> {
        let Some(chunk) = typed_frame::<OpenAIStreamChunk>(frame, "openai") else {
            return Vec::new();
        };

        let mut events = Vec::new();

        if let Some(error) = chunk.error {
            events.push(CanonicalEvent::error(error.describe()));
            return events;
        }

        let Some(choice) = chunk.choices.into_iter().next() else {
            return events;
        };

        if let Some(content) = choice.delta.content.filter(|c| !c.is_empty()) {
            events.push(CanonicalEvent::TextToken { content });
        }

        if let Some(tool_call_deltas) = choice.delta.tool_calls {
            for tool_delta in tool_call_deltas {
                self.process_tool_call_delta(tool_delta, &mut events);
            }
        }

        if choice.finish_reason.as_deref() == Some(TOOL_CALLS_FINISH_REASON) {
            self.drain_tool_calls(&mut events);
        }

        events
    }

    fn finish(&mut self) -> Vec<CanonicalEvent> {
        if !self.tool_calls.is_empty() {
            debug!(
                pending = self.tool_calls.len(),
                "Stream ended without tool_calls finish reason, flushing"
            );
        }
        let mut events = Vec::new();
        self.drain_tool_calls(&mut events);
        events
    }
}

/// Stateless OpenAI adapter that only emits text
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenAITextAdapter;

impl StreamAdapter for OpenAITextAdapter {
    fn apply(&mut self, frame: &Frame) -> Vec<CanonicalEvent> {
        typed_frame::<OpenAIStreamChunk>(frame, "openai")
            .and_then(|chunk| chunk.choices.into_iter().next())
            .and_then(|choice| choice.delta.content)
            .filter(|content| !content.is_empty())
            .map(|content| vec![CanonicalEvent::TextToken { content }])
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::streaming::{parse_line, ParseOptions};
    use pretty_assertions::assert_eq;

    fn frame(line: &str) -> Frame {
        parse_line(line, &ParseOptions::default()).expect("line should carry a frame")
    }

    fn feed(adapter: &mut impl StreamAdapter, lines: &[&str]) -> Vec<CanonicalEvent> {
        lines
            .iter()
            .flat_map(|line| adapter.apply(&frame(line)))
            .collect()
    }

    #[test]
    fn test_simple_text_stream() {
        let mut adapter = OpenAIStreamAdapter::new();

        let events = feed(
            &mut adapter,
            &[
                r#"data: {"id":"chatcmpl-123","object":"chat.completion.chunk","created":1234567890,"model":"gpt-4","choices":[{"index":0,"delta":{"role":"assistant","content":"Hello"},"finish_reason":null}]}"#,
                r#"data: {"id":"chatcmpl-123","object":"chat.completion.chunk","created":1234567890,"model":"gpt-4","choices":[{"index":0,"delta":{"content":" world"},"finish_reason":null}]}"#,
                r#"data: {"id":"chatcmpl-123","object":"chat.completion.chunk","created":1234567890,"model":"gpt-4","choices":[{"index":0,"delta":{},"finish_reason":"stop"}]}"#,
            ],
        );

        assert_eq!(
            events,
            vec![CanonicalEvent::text("Hello"), CanonicalEvent::text(" world")]
        );
        assert!(adapter.finish().is_empty());
    }

    #[test]
    fn test_tool_call_stream() {
        let mut adapter = OpenAIStreamAdapter::new();

        let events = feed(
            &mut adapter,
            &[
                r#"data: {"choices":[{"index":0,"delta":{"role":"assistant","tool_calls":[{"index":0,"id":"call_abc","type":"function","function":{"name":"search","arguments":""}}]},"finish_reason":null}]}"#,
                r#"data: {"choices":[{"index":0,"delta":{"tool_calls":[{"index":0,"function":{"arguments":"{\"query\":"}}]},"finish_reason":null}]}"#,
                r#"data: {"choices":[{"index":0,"delta":{"tool_calls":[{"index":0,"function":{"arguments":"\"rust\"}"}}]},"finish_reason":null}]}"#,
            ],
        );
        assert_eq!(
            events,
            vec![CanonicalEvent::ToolStart {
                tool_name: "search".into(),
                input: None,
            }]
        );
        assert_eq!(adapter.pending_tool_calls(), 1);

        let events = feed(
            &mut adapter,
            &[r#"data: {"choices":[{"index":0,"delta":{},"finish_reason":"tool_calls"}]}"#],
        );
        assert_eq!(
            events,
            vec![CanonicalEvent::ToolEnd {
                tool_name: "search".into(),
                output: Some(r#"{"query":"rust"}"#.into()),
            }]
        );
        assert_eq!(adapter.pending_tool_calls(), 0);
    }

    #[test]
    fn test_parallel_tool_calls_close_in_start_order() {
        let mut adapter = OpenAIStreamAdapter::new();

        let events = feed(
            &mut adapter,
            &[
                r#"data: {"choices":[{"delta":{"tool_calls":[{"index":1,"function":{"name":"weather","arguments":"{\"city\":\"Oslo\"}"}}]}}]}"#,
                r#"data: {"choices":[{"delta":{"tool_calls":[{"index":0,"function":{"name":"time","arguments":"{}"}}]}}]}"#,
                r#"data: {"choices":[{"delta":{},"finish_reason":"tool_calls"}]}"#,
            ],
        );

        assert_eq!(events.len(), 4);
        assert_eq!(
            events[2],
            CanonicalEvent::ToolEnd {
                tool_name: "weather".into(),
                output: Some(r#"{"city":"Oslo"}"#.into()),
            }
        );
        assert_eq!(
            events[3],
            CanonicalEvent::ToolEnd {
                tool_name: "time".into(),
                output: Some("{}".into()),
            }
        );
    }

    #[test]
    fn test_slot_index_defaults_to_zero() {
        let mut adapter = OpenAIStreamAdapter::new();
        let events = feed(
            &mut adapter,
            &[
                r#"data: {"choices":[{"delta":{"tool_calls":[{"function":{"name":"lookup"}}]}}]}"#,
                r#"data: {"choices":[{"delta":{"tool_calls":[{"function":{"arguments":"[1]"}}]}}]}"#,
                r#"data: {"choices":[{"delta":{},"finish_reason":"tool_calls"}]}"#,
            ],
        );
        assert_eq!(
            events.last(),
            Some(&CanonicalEvent::ToolEnd {
                tool_name: "lookup".into(),
                output: Some("[1]".into()),
            })
        );
    }

    #[test]
    fn test_arguments_for_unknown_slot_are_ignored() {
        let mut adapter = OpenAIStreamAdapter::new();
        let events = feed(
            &mut adapter,
            &[r#"data: {"choices":[{"delta":{"tool_calls":[{"index":3,"function":{"arguments":"{}"}}]}}]}"#],
        );
        assert!(events.is_empty());
        assert_eq!(adapter.pending_tool_calls(), 0);
    }

    #[test]
    fn test_finish_flushes_unclosed_tool_calls() {
        let mut adapter = OpenAIStreamAdapter::new();
        feed(
            &mut adapter,
            &[r#"data: {"choices":[{"delta":{"tool_calls":[{"index":0,"function":{"name":"search","arguments":"{}"}}]}}]}"#],
        );
        assert_eq!(
            adapter.finish(),
            vec![CanonicalEvent::ToolEnd {
                tool_name: "search".into(),
                output: Some("{}".into()),
            }]
        );
        assert!(adapter.finish().is_empty());
    }

    #[test]
    fn test_error_frame() {
        let mut adapter = OpenAIStreamAdapter::new();
        let events = feed(
            &mut adapter,
            &[r#"data: {"error":{"message":"Rate limit reached","type":"requests"}}"#],
        );
        assert_eq!(events, vec![CanonicalEvent::error("Rate limit reached")]);
    }

    #[test]
    fn test_unrecognized_frames_yield_nothing() {
        let mut adapter = OpenAIStreamAdapter::new();
        assert!(adapter.apply(&frame("data: hello")).is_empty());
        assert!(adapter.apply(&frame(r#"data: {"choices":[]}"#)).is_empty());
        assert!(adapter.apply(&frame(r#"data: {"choices":"nope"}"#)).is_empty());
        assert!(adapter
            .apply(&frame(r#"data: {"choices":[{"delta":{"content":""}}]}"#))
            .is_empty());
    }

    #[test]
    fn test_text_adapter_ignores_tool_calls() {
        let mut adapter = OpenAITextAdapter;
        let events = feed(
            &mut adapter,
            &[
                r#"data: {"choices":[{"delta":{"tool_calls":[{"index":0,"function":{"name":"search"}}]}}]}"#,
                r#"data: {"choices":[{"delta":{"content":"Hi"}}]}"#,
                r#"data: {"choices":[{"delta":{},"finish_reason":"tool_calls"}]}"#,
            ],
        );
        assert_eq!(events, vec![CanonicalEvent::text("Hi")]);
    }
}

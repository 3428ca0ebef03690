//! Anthropic API stream adapter
//!
//! Processes Messages API stream events. The event `type` drives behavior;
//! tool input arrives as `input_json_delta` fragments between a block's
//! start and stop.

use std::collections::HashMap;

use tracing::{debug, trace};

use crate::services::{CanonicalEvent, StreamAdapter};

use super::{typed_frame, AnthropicStreamEvent, ContentBlockStart, ContentDelta, Frame};

/// Tool use block being assembled
#[derive(Debug, Clone)]
struct ToolUseState {
    id: String,
    name: String,
    input_json: String,
}

/// Adapter for Anthropic streaming responses
#[derive(Debug, Default)]
pub struct AnthropicStreamAdapter {
    /// Open tool_use blocks (content block index -> state)
    tool_uses: HashMap<usize, ToolUseState>,
}

impl AnthropicStreamAdapter {
    /// Create an adapter with empty accumulation state
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle content_block_start event
    fn handle_content_block_start(
        &mut self,
        index: usize,
        content_block: ContentBlockStart,
    ) -> Option<CanonicalEvent> {
        match content_block {
            ContentBlockStart::ToolUse { id, name } => {
                trace!(index, tool = %name, "Tool use block started");
                self.tool_uses.insert(
                    index,
                    ToolUseState {
                        id,
                        name: name.clone(),
                        input_json: String::new(),
                    },
                );
                Some(CanonicalEvent::ToolStart {
                    tool_name: name,
                    input: None,
                })
            }
            ContentBlockStart::Text { text } if !text.is_empty() => {
                Some(CanonicalEvent::TextToken { content: text })
            }
            ContentBlockStart::Text { .. } | ContentBlockStart::Other => None,
        }
    }

    /// Handle content_block_delta event
    fn handle_content_block_delta(
        &mut self,
        index: usize,
        delta: ContentDelta,
    ) -> Option<CanonicalEvent> {
        match delta {
            ContentDelta::TextDelta { text } if !text.is_empty() => {
                Some(CanonicalEvent::TextToken { content: text })
            }
            ContentDelta::InputJsonDelta { partial_json } => {
                match self.tool_uses.get_mut(&index) {
                    Some(state) => state.input_json.push_str(&partial_json),
                    None => debug!(index, "Input JSON for unknown content block"),
                }
                None
            }
            ContentDelta::TextDelta { .. } | ContentDelta::Other => None,
        }
    }

    /// Handle content_block_stop event
    fn handle_content_block_stop(&mut self, index: usize) -> Option<CanonicalEvent> {
        let state = self.tool_uses.remove(&index)?;
        trace!(index, id = %state.id, tool = %state.name, "Tool use block finished");
        Some(CanonicalEvent::ToolEnd {
            tool_name: state.name,
            output: Some(state.input_json),
        })
    }
}

impl StreamAdapter for AnthropicStreamAdapter {
    fn apply(&mut self, frame: &Frame) -> Vec<CanonicalEvent> {
        let Some(stream_event) = typed_frame::<AnthropicStreamEvent>(frame, "anthropic") else {
            return Vec::new();
        };

        let event = match stream_event {
            AnthropicStreamEvent::ContentBlockStart {
                index,
                content_block,
            } => self.handle_content_block_start(index, content_block),

            AnthropicStreamEvent::ContentBlockDelta { index, delta } => {
                self.handle_content_block_delta(index, delta)
            }

            AnthropicStreamEvent::ContentBlockStop { index } => {
                self.handle_content_block_stop(index)
            }

            AnthropicStreamEvent::Error { error } => Some(CanonicalEvent::error(error.describe())),

            AnthropicStreamEvent::MessageStart
            | AnthropicStreamEvent::MessageDelta
            | AnthropicStreamEvent::MessageStop
            | AnthropicStreamEvent::Ping
            | AnthropicStreamEvent::Unknown => None,
        };

        event.into_iter().collect()
    }
}

/// Stateless Anthropic adapter that only emits text
#[derive(Debug, Clone, Copy, Default)]
pub struct AnthropicTextAdapter;

impl StreamAdapter for AnthropicTextAdapter {
    fn apply(&mut self, frame: &Frame) -> Vec<CanonicalEvent> {
        match typed_frame::<AnthropicStreamEvent>(frame, "anthropic") {
            Some(AnthropicStreamEvent::ContentBlockDelta {
                delta: ContentDelta::TextDelta { text },
                ..
            }) if !text.is_empty() => vec![CanonicalEvent::TextToken { content: text }],
            _ => Vec::new(),
        }
    }
}

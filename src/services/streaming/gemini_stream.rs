//! Gemini API stream adapter
//!
//! Gemini streams as `data: {JSON}` lines, each a full
//! `GenerateContentResponse`. Function calls arrive whole in a single part,
//! so no accumulation state is needed.

use serde_json::Value;

use crate::services::{CanonicalEvent, StreamAdapter};

use super::{typed_frame, Frame, GeminiPart, GeminiStreamChunk};

/// Adapter for Gemini streaming responses
#[derive(Debug, Clone, Copy, Default)]
pub struct GeminiStreamAdapter;

/// Parts of the first candidate, or nothing if the frame has none
fn first_candidate_parts(chunk: GeminiStreamChunk) -> Vec<GeminiPart> {
    chunk
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| content.parts)
        .unwrap_or_default()
}

fn serialize_opaque(value: &Value) -> String {
    // Serializing a `Value` cannot fail
    serde_json::to_string(value).unwrap_or_default()
}

impl StreamAdapter for GeminiStreamAdapter {
    fn apply(&mut self, frame: &Frame) -> Vec<CanonicalEvent> {
        let Some(chunk) = typed_frame::<GeminiStreamChunk>(frame, "gemini") else {
            return Vec::new();
        };

        if let Some(error) = &chunk.error {
            return vec![CanonicalEvent::error(error.describe())];
        }

        first_candidate_parts(chunk)
            .into_iter()
            .filter_map(|part| {
                if let Some(call) = part.function_call {
                    Some(CanonicalEvent::ToolStart {
                        input: Some(serialize_opaque(&call.args)),
                        tool_name: call.name,
                    })
                } else if let Some(response) = part.function_response {
                    Some(CanonicalEvent::ToolEnd {
                        output: Some(serialize_opaque(&response.response)),
                        tool_name: response.name,
                    })
                } else {
                    part.text
                        .filter(|text| !text.is_empty())
                        .map(|content| CanonicalEvent::TextToken { content })
                }
            })
            .collect()
    }
}

/// Stateless Gemini adapter that only emits text
#[derive(Debug, Clone, Copy, Default)]
pub struct GeminiTextAdapter;

impl StreamAdapter for GeminiTextAdapter {
    fn apply(&mut self, frame: &Frame) -> Vec<CanonicalEvent> {
        let Some(chunk) = typed_frame::<GeminiStreamChunk>(frame, "gemini") else {
            return Vec::new();
        };

        first_candidate_parts(chunk)
            .into_iter()
            .filter_map(|part| part.text)
            .filter(|text| !text.is_empty())
            .map(|content| CanonicalEvent::TextToken { content })
            .collect()
    }
}

//! Adapter for backends that stream raw text in `data:` lines

use crate::services::{CanonicalEvent, StreamAdapter};

use super::Frame;

/// Emits every non-JSON frame as a text token
///
/// JSON frames are ignored: this adapter is meant for endpoints whose data
/// lines are plain text, which the line parser hands over as
/// [`Frame::Text`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextAdapter;

impl StreamAdapter for PlainTextAdapter {
    fn apply(&mut self, frame: &Frame) -> Vec<CanonicalEvent> {
        match frame.as_text() {
            Some(text) if !text.is_empty() => vec![CanonicalEvent::text(text)],
            _ => Vec::new(),
        }
    }
}

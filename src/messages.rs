//! Message types for streamed conversations
//!
//! A [`ChatMessage`] keeps its segments and its concatenated content string
//! in sync; an assistant message is only mutated while its turn is in
//! flight, and is frozen afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

/// Message role in the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    /// Wire name used by OpenAI and Anthropic style APIs
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
        }
    }
}

/// One ordered piece of a message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentSegment {
    Text {
        text: String,
    },
    /// Reserved for rendering tool activity; not populated by streaming
    Tool {
        tool_name: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        input: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        output: Option<String>,
    },
}

/// A single message in the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub role: Role,
    content: String,
    segments: Vec<ContentSegment>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    frozen: bool,
}

impl ChatMessage {
    fn new(role: Role, text: String, frozen: bool) -> Self {
        let segments = if text.is_empty() {
            Vec::new()
        } else {
            vec![ContentSegment::Text { text: text.clone() }]
        };

        Self {
            id: Uuid::new_v4(),
            role,
            content: text,
            segments,
            created_at: Utc::now(),
            frozen,
        }
    }

    /// Create a new user message
    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, text.into(), true)
    }

    /// Create a new, complete assistant message
    #[must_use]
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, text.into(), true)
    }

    /// Create a new system message
    #[must_use]
    pub fn system(text: impl Into<String>) -> Self {
        Self::new(Role::System, text.into(), true)
    }

    /// Empty assistant message that receives streamed text
    #[must_use]
    pub fn placeholder() -> Self {
        Self::new(Role::Assistant, String::new(), false)
    }

    /// Concatenated text of all segments
    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    #[must_use]
    pub fn segments(&self) -> &[ContentSegment] {
        &self.segments
    }

    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Check if no visible text has been accumulated
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Append streamed text to the trailing text segment
    ///
    /// Returns `false` (and changes nothing) once the message is frozen.
    pub fn append_text(&mut self, text: &str) -> bool {
        if self.frozen {
            debug!(id = %self.id, "Ignoring text for frozen message");
            return false;
        }
        if text.is_empty() {
            return true;
        }

        match self.segments.last_mut() {
            Some(ContentSegment::Text { text: last }) => last.push_str(text),
            _ => self.segments.push(ContentSegment::Text {
                text: text.to_string(),
            }),
        }
        self.content.push_str(text);
        true
    }

    /// Make the message immutable
    pub fn freeze(&mut self) {
        self.frozen = true;
    }
}

/// Ordered completed messages with an optional size cap
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationHistory {
    messages: Vec<ChatMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    max_messages: Option<usize>,
}

impl ConversationHistory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// History that keeps at most `max_messages` entries
    #[must_use]
    pub fn with_max_messages(max_messages: usize) -> Self {
        Self {
            messages: Vec::new(),
            max_messages: Some(max_messages),
        }
    }

    #[must_use]
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    #[must_use]
    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ChatMessage> {
        self.messages.iter()
    }

    /// Append a message
    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    /// Drop the oldest messages beyond the cap
    ///
    /// Returns the number of messages removed.
    pub fn trim_to_capacity(&mut self) -> usize {
        let Some(max) = self.max_messages else {
            return 0;
        };
        let excess = self.messages.len().saturating_sub(max);
        if excess > 0 {
            self.messages.drain(..excess);
            debug!(removed = excess, "Trimmed conversation history");
        }
        excess
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub(crate) fn last_mut(&mut self) -> Option<&mut ChatMessage> {
        self.messages.last_mut()
    }

    pub(crate) fn truncate(&mut self, len: usize) {
        self.messages.truncate(len);
    }
}

impl<'a> IntoIterator for &'a ConversationHistory {
    type Item = &'a ChatMessage;
    type IntoIter = std::slice::Iter<'a, ChatMessage>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.iter()
    }
}

//! Message accumulation state machine
//!
//! A [`Conversation`] owns the history and at most one in-flight turn. A turn
//! is the user message plus the assistant message being streamed into:
//!
//! ```text
//! Idle --begin_turn--> Sending --complete/cancel/fail--> Idle
//! ```
//!
//! Cancelling or failing a turn that produced no visible text removes the
//! whole turn, so history is exactly what it was before `begin_turn`. A
//! backend error event fails the turn at once; anything after it is ignored.

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::{
    config::models::ModelProfile,
    error::{ChatStreamError, Result},
    messages::{ChatMessage, ConversationHistory},
    services::{
        build_request,
        driver::{StreamDriver, StreamOutcome, StreamSink},
        transport::HttpTransport,
        CanonicalEvent,
    },
};

/// Whether a turn is in flight
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    Idle,
    Sending,
}

/// How a turn ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    Completed,
    Cancelled,
    Failed(String),
}

/// Conversation history plus the in-flight turn
#[derive(Debug, Clone)]
pub struct Conversation {
    history: ConversationHistory,
    state: TurnState,
    /// History length before the in-flight turn began
    turn_start: usize,
    /// How the most recent turn ended
    last_outcome: Option<TurnOutcome>,
    system_prompt: Option<String>,
    tool_events: bool,
}

impl Default for Conversation {
    fn default() -> Self {
        Self::with_history(ConversationHistory::new())
    }
}

impl Conversation {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Continue an existing history
    #[must_use]
    pub fn with_history(history: ConversationHistory) -> Self {
        Self {
            history,
            state: TurnState::Idle,
            turn_start: 0,
            last_outcome: None,
            system_prompt: None,
            tool_events: true,
        }
    }

    /// Send `prompt` as the system prompt of every turn
    #[must_use]
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Choose tool-aware or text-only adapters for [`send`](Self::send)
    #[must_use]
    pub fn with_tool_events(mut self, enabled: bool) -> Self {
        self.tool_events = enabled;
        self
    }

    #[must_use]
    pub fn state(&self) -> TurnState {
        self.state
    }

    #[must_use]
    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    /// The assistant message being streamed into, while sending
    #[must_use]
    pub fn in_flight(&self) -> Option<&ChatMessage> {
        match self.state {
            TurnState::Sending => self.history.last(),
            TurnState::Idle => None,
        }
    }

    /// Messages to send upstream: everything but the in-flight placeholder
    #[must_use]
    pub fn request_history(&self) -> &[ChatMessage] {
        let messages = self.history.messages();
        match self.state {
            TurnState::Sending => &messages[..messages.len().saturating_sub(1)],
            TurnState::Idle => messages,
        }
    }

    /// Start a turn: append the user message and an empty assistant message
    ///
    /// # Errors
    ///
    /// Returns `TurnInProgress` if a turn is already sending
    pub fn begin_turn(&mut self, prompt: impl Into<String>) -> Result<()> {
        if self.state == TurnState::Sending {
            return Err(ChatStreamError::TurnInProgress);
        }

        self.turn_start = self.history.len();
        self.last_outcome = None;
        self.history.push(ChatMessage::user(prompt));
        self.history.push(ChatMessage::placeholder());
        self.state = TurnState::Sending;

        debug!(history_len = self.turn_start, "Turn started");
        Ok(())
    }

    /// Apply one event to the in-flight message
    pub fn handle_event(&mut self, event: &CanonicalEvent) {
        if self.state != TurnState::Sending {
            debug!(?event, "Ignoring event outside a turn");
            return;
        }

        match event {
            CanonicalEvent::TextToken { content } | CanonicalEvent::ToolContent { content } => {
                if let Some(message) = self.history.last_mut() {
                    message.append_text(content);
                }
            }
            CanonicalEvent::ToolStart { tool_name, input } => {
                trace!(tool = %tool_name, ?input, "Tool started");
            }
            CanonicalEvent::ToolEnd { tool_name, output } => {
                trace!(tool = %tool_name, ?output, "Tool finished");
            }
            CanonicalEvent::Error { message } => {
                warn!(error = %message, "Backend reported an error");
                self.end_failed(message.clone());
            }
        }
    }

    /// Body ended normally
    ///
    /// Returns `None` if no turn is in flight.
    pub fn complete(&mut self) -> Option<TurnOutcome> {
        if self.state != TurnState::Sending {
            return None;
        }

        self.freeze_in_flight();
        Some(self.end(TurnOutcome::Completed))
    }

    /// Stop the turn, keeping any visible partial text
    ///
    /// Returns `None` if no turn is in flight.
    pub fn cancel(&mut self) -> Option<TurnOutcome> {
        if self.state != TurnState::Sending {
            return None;
        }

        self.discard_or_freeze();
        Some(self.end(TurnOutcome::Cancelled))
    }

    /// Transport or setup failure
    ///
    /// Returns `None` if no turn is in flight.
    pub fn fail(&mut self, error: impl std::fmt::Display) -> Option<TurnOutcome> {
        if self.state != TurnState::Sending {
            return None;
        }

        Some(self.end_failed(error.to_string()))
    }

    /// Run a whole turn: build the request, stream it, apply every event
    ///
    /// `observer` sees each event before it is applied. Stream failures are
    /// reported as [`TurnOutcome::Failed`], not as `Err`.
    ///
    /// # Errors
    ///
    /// Returns `TurnInProgress` if a turn is already sending
    pub async fn send<T, O>(
        &mut self,
        prompt: impl Into<String>,
        driver: &StreamDriver<T>,
        profile: &ModelProfile,
        cancel: &CancellationToken,
        observer: O,
    ) -> Result<TurnOutcome>
    where
        T: HttpTransport,
        O: FnMut(&CanonicalEvent),
    {
        self.begin_turn(prompt)?;

        let request = match build_request(
            profile,
            self.request_history(),
            self.system_prompt.as_deref(),
        ) {
            Ok(request) => request,
            Err(e) => return Ok(self.end_failed(e.to_string())),
        };

        let mut adapter = profile.provider.create_adapter(self.tool_events);
        let mut sink = TurnSink {
            conversation: &mut *self,
            observer,
            error: None,
        };

        let outcome = driver.run(&request, &mut adapter, &mut sink, cancel).await;
        let error = sink.error.take();

        let turn = match outcome {
            StreamOutcome::Completed => self.complete(),
            StreamOutcome::Cancelled => self.cancel(),
            StreamOutcome::Failed => {
                let message = error.map_or_else(|| "stream failed".to_string(), |e| e.to_string());
                self.fail(message)
            }
        };

        // A backend error event may have ended the turn mid-stream
        Ok(turn
            .or_else(|| self.last_outcome.clone())
            .unwrap_or(TurnOutcome::Cancelled))
    }

    fn end_failed(&mut self, error: String) -> TurnOutcome {
        self.discard_or_freeze();
        self.end(TurnOutcome::Failed(error))
    }

    /// Remove a turn with no visible output; otherwise freeze what arrived
    fn discard_or_freeze(&mut self) {
        let empty = self.history.last().map_or(true, ChatMessage::is_empty);
        if empty {
            self.history.truncate(self.turn_start);
        } else {
            self.freeze_in_flight();
        }
    }

    fn freeze_in_flight(&mut self) {
        if let Some(message) = self.history.last_mut() {
            message.freeze();
        }
    }

    fn end(&mut self, outcome: TurnOutcome) -> TurnOutcome {
        self.state = TurnState::Idle;
        self.last_outcome = Some(outcome.clone());
        self.history.trim_to_capacity();

        match &outcome {
            TurnOutcome::Failed(error) => info!(%error, "Turn failed"),
            _ => info!(?outcome, history_len = self.history.len(), "Turn ended"),
        }
        outcome
    }
}

/// Routes driver callbacks into a conversation
struct TurnSink<'a, O> {
    conversation: &'a mut Conversation,
    observer: O,
    error: Option<ChatStreamError>,
}

impl<O: FnMut(&CanonicalEvent)> StreamSink for TurnSink<'_, O> {
    fn on_event(&mut self, event: CanonicalEvent) {
        if self.conversation.state() != TurnState::Sending {
            return;
        }
        (self.observer)(&event);
        self.conversation.handle_event(&event);
    }

    fn on_complete(&mut self) {}

    fn on_error(&mut self, error: ChatStreamError) {
        self.error = Some(error);
    }
}

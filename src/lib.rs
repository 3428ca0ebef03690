//! chat-stream: streaming ingestion pipeline for chat interfaces
//!
//! Turns an HTTP event stream from an LLM backend into canonical events and
//! accumulates them into conversation history:
//! bytes → [`LineSplitter`](services::streaming::LineSplitter) →
//! [`parse_line`](services::streaming::parse_line) →
//! [`StreamAdapter`](services::StreamAdapter) →
//! [`Conversation`](conversation::Conversation).

#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions, clippy::too_many_lines)]

pub mod cli;
pub mod config;
pub mod conversation;
pub mod error;
pub mod messages;
pub mod services;

// Re-exports for convenience
pub use conversation::{Conversation, TurnOutcome, TurnState};
pub use error::{ChatStreamError, Result};
pub use services::{
    driver::{StreamDriver, StreamOutcome, StreamSink},
    CanonicalEvent, StreamAdapter,
};

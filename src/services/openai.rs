//! OpenAI-style streaming requests
//!
//! Supports:
//! - OpenAI official API
//! - OpenAI-compatible endpoints (Groq, Ollama, custom proxies)

use serde::Serialize;

use crate::{config::models::ModelProfile, error::Result, messages::ChatMessage};

use super::{require_api_key, require_base_url, transport::StreamRequest};

#[derive(Debug, Serialize)]
struct OpenAIRequest<'a> {
    model: &'a str,
    messages: Vec<OpenAIMessage<'a>>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct OpenAIMessage<'a> {
    role: &'a str,
    content: &'a str,
}

/// Build a streaming `POST {base}/chat/completions` request
///
/// # Errors
///
/// Returns an error if the profile has no API key or base URL
pub fn build_request(
    profile: &ModelProfile,
    history: &[ChatMessage],
    system_prompt: Option<&str>,
) -> Result<StreamRequest> {
    let base_url = require_base_url(profile)?;
    let api_key = require_api_key(profile)?;

    let mut messages = Vec::with_capacity(history.len() + 1);
    if let Some(system) = system_prompt {
        messages.push(OpenAIMessage {
            role: "system",
            content: system,
        });
    }
    messages.extend(history.iter().map(|message| OpenAIMessage {
        role: message.role.as_str(),
        content: message.content(),
    }));

    let body = serde_json::to_value(OpenAIRequest {
        model: &profile.model_name,
        messages,
        stream: true,
    })?;

    let mut request = StreamRequest::post(format!("{base_url}/chat/completions"))
        .header("content-type", "application/json")
        .json(body);
    if let Some(key) = api_key {
        request = request.header("authorization", format!("Bearer {key}"));
    }

    Ok(request)
}

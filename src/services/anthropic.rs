//! Anthropic Messages API streaming requests

use serde::Serialize;

use crate::{
    config::models::ModelProfile,
    error::Result,
    messages::{ChatMessage, Role},
};

use super::{require_api_key, require_base_url, transport::StreamRequest};

/// API version sent with every request
pub const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<AnthropicMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: &'a str,
}

/// Build a streaming `POST {base}/v1/messages` request
///
/// System messages in `history` are folded into the top-level `system`
/// field after `system_prompt`.
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

    let system_parts: Vec<&str> = system_prompt
        .into_iter()
        .chain(
            history
                .iter()
                .filter(|message| message.role == Role::System)
                .map(ChatMessage::content),
        )
        .collect();
    let system = (!system_parts.is_empty()).then(|| system_parts.join("\n\n"));

    let messages = history
        .iter()
        .filter(|message| message.role != Role::System)
        .map(|message| AnthropicMessage {
            role: message.role.as_str(),
            content: message.content(),
        })
        .collect();

    let body = serde_json::to_value(AnthropicRequest {
        model: &profile.model_name,
        max_tokens: profile.max_tokens,
        messages,
        system,
        stream: true,
    })?;

    let mut request = StreamRequest::post(format!("{base_url}/v1/messages"))
        .header("content-type", "application/json")
        .header("anthropic-version", ANTHROPIC_VERSION)
        .json(body);
    if let Some(key) = api_key {
        request = request.header("x-api-key", key);
    }

    Ok(request)
}

//! Gemini `streamGenerateContent` requests

use serde::Serialize;

use crate::{
    config::models::ModelProfile,
    error::Result,
    messages::{ChatMessage, Role},
};

use super::{require_api_key, require_base_url, transport::StreamRequest};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest<'a> {
    contents: Vec<GeminiContent<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiInstruction>,
}

#[derive(Debug, Serialize)]
struct GeminiContent<'a> {
    role: &'a str,
    parts: [GeminiPart<'a>; 1],
}

#[derive(Debug, Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct GeminiInstruction {
    parts: [OwnedPart; 1],
}

#[derive(Debug, Serialize)]
struct OwnedPart {
    text: String,
}

/// Build a streaming
/// `POST {base}/v1beta/models/{model}:streamGenerateContent?alt=sse` request
///
/// Assistant turns are sent with role `model`; system messages are folded
/// into `systemInstruction`.
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
    let system_instruction = (!system_parts.is_empty()).then(|| GeminiInstruction {
        parts: [OwnedPart {
            text: system_parts.join("\n\n"),
        }],
    });

    let contents = history
        .iter()
        .filter_map(|message| {
            let role = match message.role {
                Role::User => "user",
                Role::Assistant => "model",
                Role::System => return None,
            };
            Some(GeminiContent {
                role,
                parts: [GeminiPart {
                    text: message.content(),
                }],
            })
        })
        .collect();

    let body = serde_json::to_value(GeminiRequest {
        contents,
        system_instruction,
    })?;

    let url = format!(
        "{base_url}/v1beta/models/{}:streamGenerateContent?alt=sse",
        profile.model_name
    );
    let mut request = StreamRequest::post(url)
        .header("content-type", "application/json")
        .json(body);
    if let Some(key) = api_key {
        request = request.header("x-goog-api-key", key);
    }

    Ok(request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderType;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_request_shape() {
        let profile = ModelProfile::new("Gemini", ProviderType::Gemini, "gemini-2.0-flash", "g-key");
        let history = vec![ChatMessage::user("Hi"), ChatMessage::assistant("Hello")];

        let request = build_request(&profile, &history, Some("Be brief.")).unwrap();

        assert_eq!(
            request.url,
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:streamGenerateContent?alt=sse"
        );
        assert_eq!(request.header_value("x-goog-api-key"), Some("g-key"));
        assert_eq!(
            request.body,
            Some(json!({
                "contents": [
                    {"role": "user", "parts": [{"text": "Hi"}]},
                    {"role": "model", "parts": [{"text": "Hello"}]}
                ],
                "systemInstruction": {"parts": [{"text": "Be brief."}]}
            }))
        );
    }
}

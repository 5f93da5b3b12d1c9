//! Inference Request API
//!
//! Caller-supplied inference requests and the payload forwarded upstream.

use crate::config::PayloadDefaults;
use crate::error::{GatewayError, Result};
use serde::{Deserialize, Serialize};

/// A message in a chat conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Role: "system", "user", "assistant", or "tool"
    pub role: String,

    /// Message content (can be string or array of content parts)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<MessageContent>,

    /// Any other fields (name, tool_calls, tool_call_id, ...) are forwarded untouched
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Message {
    /// Plain text user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: Some(MessageContent::Text(content.into())),
            extra: serde_json::Map::new(),
        }
    }

    /// Textual content, empty when absent
    pub fn text(&self) -> String {
        self.content
            .as_ref()
            .map(MessageContent::to_string_content)
            .unwrap_or_default()
    }
}

/// Message content - can be a simple string or array of parts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    /// Simple string content
    Text(String),

    /// Array of content parts (for multimodal); forwarded verbatim
    Parts(Vec<serde_json::Value>),
}

impl MessageContent {
    /// Convert to string (concatenating text parts if needed)
    pub fn to_string_content(&self) -> String {
        match self {
            MessageContent::Text(s) => s.clone(),
            MessageContent::Parts(parts) => parts
                .iter()
                .filter(|p| p.get("type").and_then(|t| t.as_str()) == Some("text"))
                .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
                .collect::<Vec<_>>()
                .join(""),
        }
    }
}

/// Inference request as sent by the caller
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InferenceRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub messages: Option<Vec<Message>>,

    /// Explicitly requested model
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
}

impl InferenceRequest {
    /// Parse a raw request body. Anything but a well-typed JSON object is a bad request.
    pub fn parse(body: &[u8]) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_slice(body)
            .map_err(|e| GatewayError::BadRequest(format!("body is not valid JSON: {}", e)))?;

        if !value.is_object() {
            return Err(GatewayError::BadRequest(
                "body must be a JSON object".to_string(),
            ));
        }

        serde_json::from_value(value)
            .map_err(|e| GatewayError::BadRequest(format!("invalid request: {}", e)))
    }

    /// Text used for content-based routing.
    ///
    /// A non-empty `prompt` wins; otherwise all message contents are joined with
    /// single spaces in order and trimmed.
    pub fn extract_prompt(&self) -> String {
        if let Some(prompt) = self.prompt.as_deref().filter(|p| !p.is_empty()) {
            return prompt.to_string();
        }

        match &self.messages {
            Some(messages) if !messages.is_empty() => messages
                .iter()
                .map(Message::text)
                .collect::<Vec<_>>()
                .join(" ")
                .trim()
                .to_string(),
            _ => String::new(),
        }
    }

    /// Explicit model name, ignoring empty strings
    pub fn explicit_model(&self) -> Option<&str> {
        self.model.as_deref().filter(|m| !m.is_empty())
    }
}

/// Payload forwarded to the selected upstream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundPayload {
    pub model: String,
    pub messages: Vec<Message>,
    pub max_tokens: u32,
    pub temperature: f64,
    pub stream: bool,
}

impl OutboundPayload {
    /// Assemble the upstream payload for `model` from the caller's request.
    ///
    /// Caller messages are forwarded as-is; without them a single user message
    /// carrying `prompt` is synthesized.
    pub fn build(
        model: &str,
        request: &InferenceRequest,
        prompt: &str,
        defaults: &PayloadDefaults,
    ) -> Self {
        let messages = match &request.messages {
            Some(messages) if !messages.is_empty() => messages.clone(),
            _ => vec![Message::user(prompt)],
        };

        Self {
            model: model.to_string(),
            messages,
            max_tokens: request.max_tokens.unwrap_or(defaults.max_tokens),
            temperature: request.temperature.unwrap_or(defaults.temperature),
            stream: request.stream.unwrap_or(defaults.stream),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> InferenceRequest {
        InferenceRequest::parse(json.as_bytes()).unwrap()
    }

    #[test]
    fn test_prompt_field_preferred() {
        let request = parse(
            r#"{"prompt": "direct", "messages": [{"role": "user", "content": "ignored"}]}"#,
        );
        assert_eq!(request.extract_prompt(), "direct");
    }

    #[test]
    fn test_messages_joined_in_order() {
        let request = parse(
            r#"{"messages": [
                {"role": "system", "content": "be brief"},
                {"role": "user", "content": "hello"},
                {"role": "assistant"},
                {"role": "user", "content": "again "}
            ]}"#,
        );
        assert_eq!(request.extract_prompt(), "be brief hello  again");
    }

    #[test]
    fn test_empty_prompt_falls_back_to_messages() {
        let request = parse(r#"{"prompt": "", "messages": [{"role": "user", "content": "hi"}]}"#);
        assert_eq!(request.extract_prompt(), "hi");
    }

    #[test]
    fn test_no_text_yields_empty_prompt() {
        assert_eq!(parse("{}").extract_prompt(), "");
        assert_eq!(parse(r#"{"messages": []}"#).extract_prompt(), "");
    }

    #[test]
    fn test_multipart_content_text_only() {
        let request = parse(
            r#"{"messages": [{"role": "user", "content": [
                {"type": "text", "text": "look at "},
                {"type": "image_url", "image_url": {"url": "data:image/png;base64,AAAA"}},
                {"type": "text", "text": "this"}
            ]}]}"#,
        );
        assert_eq!(request.extract_prompt(), "look at this");
    }

    #[test]
    fn test_malformed_bodies_are_bad_requests() {
        for body in ["", "not json", "[1, 2]", "\"text\"", r#"{"messages": "hello"}"#, r#"{"max_tokens": -1}"#] {
            let result = InferenceRequest::parse(body.as_bytes());
            assert!(
                matches!(result, Err(GatewayError::BadRequest(_))),
                "expected bad request for {:?}",
                body
            );
        }
    }

    #[test]
    fn test_payload_defaults() {
        let request = parse(r#"{"messages": [{"role": "user", "content": "hello"}]}"#);
        let payload = OutboundPayload::build("gpt-4", &request, "hello", &PayloadDefaults::default());

        assert_eq!(payload.model, "gpt-4");
        assert_eq!(payload.max_tokens, 1024);
        assert_eq!(payload.temperature, 0.7);
        assert!(!payload.stream);
        assert_eq!(payload.messages, request.messages.unwrap());
    }

    #[test]
    fn test_payload_keeps_caller_values() {
        let request = parse(r#"{"prompt": "hi", "max_tokens": 64, "temperature": 0.0, "stream": true}"#);
        let payload = OutboundPayload::build("llama2", &request, "hi", &PayloadDefaults::default());

        assert_eq!(payload.max_tokens, 64);
        assert_eq!(payload.temperature, 0.0);
        assert!(payload.stream);
        assert_eq!(payload.messages, vec![Message::user("hi")]);
    }

    #[test]
    fn test_message_extra_fields_forwarded() {
        let request = parse(
            r#"{"messages": [{"role": "tool", "content": "42", "tool_call_id": "call_1"}]}"#,
        );
        let payload = OutboundPayload::build("gpt-4", &request, "42", &PayloadDefaults::default());
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["messages"][0]["tool_call_id"], "call_1");
    }

    #[test]
    fn test_explicit_model_ignores_empty() {
        assert_eq!(parse(r#"{"model": ""}"#).explicit_model(), None);
        assert_eq!(parse(r#"{"model": "gpt-4"}"#).explicit_model(), Some("gpt-4"));
    }
}

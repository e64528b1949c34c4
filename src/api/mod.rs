//! Wire payloads for OpenAI-compatible chat completion endpoints.

use serde::{Deserialize, Serialize};

use crate::core::message::{Message, MessageRole};

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl From<&Message> for ChatMessage {
    fn from(message: &Message) -> Self {
        Self {
            role: message.role.as_str().to_string(),
            content: message.content.clone(),
        }
    }
}

impl ChatMessage {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role: role.as_str().to_string(),
            content: content.into(),
        }
    }
}

#[derive(Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
}

#[derive(Deserialize)]
pub struct ChatResponseDelta {
    pub content: Option<String>,
}

#[derive(Deserialize)]
pub struct ChatResponseChoice {
    pub delta: ChatResponseDelta,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Deserialize)]
pub struct ChatResponse {
    pub choices: Vec<ChatResponseChoice>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::message::MessageId;

    #[test]
    fn request_serializes_stream_flag() {
        let request = ChatRequest {
            model: "gpt-4o-mini".into(),
            messages: vec![ChatMessage::new(MessageRole::User, "hi")],
            stream: true,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["stream"], true);
        assert_eq!(value["messages"][0]["role"], "user");
    }

    #[test]
    fn delta_without_content_parses() {
        let raw = r#"{"choices":[{"delta":{"role":"assistant"},"finish_reason":null}]}"#;
        let response: ChatResponse = serde_json::from_str(raw).unwrap();
        assert!(response.choices[0].delta.content.is_none());
    }

    #[test]
    fn chat_message_from_transcript_message() {
        let message = Message::new(MessageId(1), MessageRole::System, "be brief");
        let wire = ChatMessage::from(&message);
        assert_eq!(wire.role, "system");
        assert_eq!(wire.content, "be brief");
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stable identity used to reconcile a message across re-renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MessageId(pub u64);

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum MessageRole {
    User,
    Assistant,
    System,
}

impl MessageRole {
    pub fn as_str(self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
            MessageRole::System => "system",
        }
    }

    pub fn is_user(self) -> bool {
        self == MessageRole::User
    }

    pub fn is_assistant(self) -> bool {
        self == MessageRole::Assistant
    }
}

impl AsRef<str> for MessageRole {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl PartialEq<&str> for MessageRole {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

impl TryFrom<&str> for MessageRole {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "user" => Ok(MessageRole::User),
            "assistant" => Ok(MessageRole::Assistant),
            "system" => Ok(MessageRole::System),
            _ => Err(format!("invalid message role: {value}")),
        }
    }
}

impl TryFrom<String> for MessageRole {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::try_from(value.as_str())
    }
}

impl From<MessageRole> for String {
    fn from(value: MessageRole) -> Self {
        value.as_str().to_string()
    }
}

/// Lifecycle of a message while a response is being produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    /// Created but no request is attached yet.
    #[default]
    Idle,
    /// A streaming request is filling this message.
    Loading,
    /// Content is final.
    Success,
    /// The request failed; whatever arrived before the failure is kept.
    Error,
}

impl MessageStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, MessageStatus::Success | MessageStatus::Error)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub role: MessageRole,
    pub content: String,
    #[serde(default)]
    pub status: MessageStatus,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn new(id: MessageId, role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            id,
            role,
            content: content.into(),
            status: MessageStatus::Idle,
            created_at: Utc::now(),
        }
    }

    pub fn with_status(mut self, status: MessageStatus) -> Self {
        self.status = status;
        self
    }

    pub fn is_streaming(&self) -> bool {
        self.status == MessageStatus::Loading
    }
}

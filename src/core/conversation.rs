use std::collections::VecDeque;

use tracing::debug;

use crate::api::ChatMessage;
use crate::core::message::{Message, MessageId, MessageRole, MessageStatus};
use crate::stream::StreamUpdate;

/// Ordered chat transcript. Streaming replies are updated in place by id.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: VecDeque<Message>,
    next_id: u64,
    system_prompt: Option<String>,
    fallback_message: Option<String>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sent ahead of the transcript in every request.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Used as the content of a reply that failed before any text arrived.
    pub fn with_fallback_message(mut self, fallback: Option<String>) -> Self {
        self.fallback_message = fallback;
        self
    }

    pub fn messages(&self) -> &VecDeque<Message> {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn get(&self, id: MessageId) -> Option<&Message> {
        self.messages.iter().find(|message| message.id == id)
    }

    fn get_mut(&mut self, id: MessageId) -> Option<&mut Message> {
        self.messages.iter_mut().find(|message| message.id == id)
    }

    pub fn push(
        &mut self,
        role: MessageRole,
        content: impl Into<String>,
        status: MessageStatus,
    ) -> MessageId {
        self.next_id += 1;
        let id = MessageId(self.next_id);
        self.messages
            .push_back(Message::new(id, role, content).with_status(status));
        id
    }

    /// Record the user's text and an empty assistant reply waiting for a
    /// stream. Returns the reply's id.
    pub fn submit(&mut self, text: impl Into<String>) -> MessageId {
        self.push(MessageRole::User, text, MessageStatus::Success);
        let id = self.push(MessageRole::Assistant, String::new(), MessageStatus::Loading);
        debug!(message = %id, "Submitted user message");
        id
    }

    /// Apply a streaming update to the message with `id`. Returns false when
    /// the message is gone or already finished.
    pub fn apply(&mut self, id: MessageId, update: &StreamUpdate) -> bool {
        let fallback = self.fallback_message.clone();
        let Some(message) = self.get_mut(id) else {
            debug!(message = %id, "Update for unknown message");
            return false;
        };
        if message.status.is_terminal() {
            return false;
        }

        match update {
            StreamUpdate::Chunk { snapshot } => {
                message.content = snapshot.to_string();
                message.status = MessageStatus::Loading;
            }
            StreamUpdate::Done { snapshot } => {
                message.content = snapshot.to_string();
                message.status = MessageStatus::Success;
            }
            StreamUpdate::Error { snapshot, .. } => {
                message.content = match fallback {
                    Some(text) if snapshot.trim().is_empty() => text,
                    _ => snapshot.to_string(),
                };
                message.status = MessageStatus::Error;
            }
        }
        true
    }

    /// Drop every message after the first `len`.
    pub fn truncate(&mut self, len: usize) {
        self.messages.truncate(len);
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn last_assistant(&self) -> Option<&Message> {
        self.messages
            .iter()
            .rev()
            .find(|message| message.role.is_assistant())
    }

    /// Messages for the next request: the system prompt, then user turns and
    /// finished assistant replies. Pending and failed replies are left out.
    pub fn api_messages(&self) -> Vec<ChatMessage> {
        let mut out = Vec::with_capacity(self.messages.len() + 1);
        if let Some(prompt) = &self.system_prompt {
            out.push(ChatMessage::new(MessageRole::System, prompt.clone()));
        }
        out.extend(
            self.messages
                .iter()
                .filter(|message| match message.role {
                    MessageRole::User => true,
                    MessageRole::Assistant => message.status == MessageStatus::Success,
                    MessageRole::System => false,
                })
                .map(ChatMessage::from),
        );
        out
    }
}

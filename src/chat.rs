//! Chat transcript driven by a [`TextGenerator`].

use serde::{Deserialize, Serialize};

use crate::ai::TextGenerator;

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    /// Text typed by the person using the assistant.
    User,
    /// Generated reply, or a rendered failure.
    Assistant,
}

/// One entry in a chat transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Who wrote the message.
    pub role: ChatRole,
    /// Message body.
    pub content: String,
}

impl ChatMessage {
    fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Ordered transcript of prompts and replies.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSession {
    messages: Vec<ChatMessage>,
}

impl ChatSession {
    /// Creates an empty session.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            messages: Vec::new(),
        }
    }

    /// Messages in the order they were recorded.
    #[must_use]
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Returns true when nothing has been recorded.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Discards the transcript.
    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// Records `input`, asks `generator` for a reply, and records the reply.
    ///
    /// Non-blank input is sent and recorded exactly as given. Blank input is
    /// ignored and yields `None`. A failed request is recorded
    /// as an assistant message reading `Error: <reason>`, so the returned
    /// message is always present for non-blank input.
    pub async fn submit(
        &mut self,
        generator: &dyn TextGenerator,
        input: &str,
    ) -> Option<&ChatMessage> {
        if input.trim().is_empty() {
            return None;
        }

        self.messages.push(ChatMessage::user(input));
        let reply = match generator.generate(input).await {
            Ok(text) => text,
            Err(error) => {
                tracing::debug!("chat request failed: {error}");
                format!("Error: {error}")
            }
        };
        self.messages.push(ChatMessage::assistant(reply));
        self.messages.last()
    }
}

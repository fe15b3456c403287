use chrono::Local;

use crate::attachments::Attachment;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Model,
}

impl Role {
    /// Role tag expected by the generation API.
    pub fn as_wire(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Model => "model",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    pub files: Vec<Attachment>,
    pub timestamp: String,
}

impl ChatMessage {
    pub fn user(content: String, files: Vec<Attachment>) -> Self {
        Self {
            role: Role::User,
            content,
            files,
            timestamp: Local::now().format("%H:%M:%S").to_string(),
        }
    }

    /// Empty model message appended when a generation starts. Fragments are
    /// pushed onto it as they arrive.
    pub fn model_placeholder() -> Self {
        Self {
            role: Role::Model,
            content: String::new(),
            files: Vec::new(),
            timestamp: Local::now().format("%H:%M:%S").to_string(),
        }
    }

    pub fn model(content: String) -> Self {
        Self {
            content,
            ..Self::model_placeholder()
        }
    }
}

/// Ordered transcript of one session. Append-only while chatting; cleared as
/// a whole when the user starts a new chat.
#[derive(Debug, Default)]
pub struct Conversation {
    pub messages: Vec<ChatMessage>,
}

impl Conversation {
    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// Append a streamed fragment to the trailing model message. Only the
    /// last message is ever mutated, and only while a generation is running.
    pub fn append_to_last(&mut self, fragment: &str) {
        if let Some(last) = self.messages.last_mut() {
            if last.role == Role::Model {
                last.content.push_str(fragment);
            }
        }
    }

    pub fn last_is_empty_model(&self) -> bool {
        self.messages
            .last()
            .map(|m| m.role == Role::Model && m.content.is_empty())
            .unwrap_or(false)
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }
}

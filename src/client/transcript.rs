use crate::models::{ ChatMessage, Role };

/// Conversation history owned by the client and resent in full on every turn.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    messages: Vec<ChatMessage>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.messages.push(ChatMessage::user(content));
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.messages.push(ChatMessage::assistant(content));
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// Drops the trailing user message of a turn that failed.
    pub(crate) fn rollback_user(&mut self) -> Option<ChatMessage> {
        match self.messages.last() {
            Some(m) if m.role == Role::User => self.messages.pop(),
            _ => None,
        }
    }
}

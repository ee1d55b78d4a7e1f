use std::error::Error;
use std::fmt;
use std::fs;
use std::path::Path;
use log::info;

use crate::models::ChatMessage;

/// Persona and reply-language policy sent ahead of every conversation.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a legal assistant for citizens. \
Explain legal questions in plain language, cite the relevant law or code article when you can, \
and recommend consulting a licensed lawyer for decisions with serious consequences. \
Do not invent statutes or case numbers; say so when you are unsure. \
Always reply in the language of the user's most recent message; if it is unclear, reply in Russian.";

#[derive(Debug)]
pub enum PromptError {
    IoError(std::io::Error),
    Empty(String),
}

impl fmt::Display for PromptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PromptError::IoError(e) => write!(f, "Prompt file IO error: {}", e),
            PromptError::Empty(path) => write!(f, "Prompt file '{}' is empty", path),
        }
    }
}

impl Error for PromptError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            PromptError::IoError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for PromptError {
    fn from(err: std::io::Error) -> Self {
        PromptError::IoError(err)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemPrompt {
    text: String,
}

impl Default for SystemPrompt {
    fn default() -> Self {
        Self { text: DEFAULT_SYSTEM_PROMPT.to_string() }
    }
}

impl SystemPrompt {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, PromptError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let text = text.trim();
        if text.is_empty() {
            return Err(PromptError::Empty(path.display().to_string()));
        }
        info!("Loaded system prompt from {} ({} chars)", path.display(), text.chars().count());
        Ok(Self::new(text))
    }

    /// Built-in directive unless a path is given.
    pub fn from_optional_path(path: Option<&str>) -> Result<Self, PromptError> {
        match path {
            Some(p) if !p.trim().is_empty() => Self::load(p.trim()),
            _ => Ok(Self::default()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Returns the conversation with the directive placed first.
    pub fn apply(&self, messages: Vec<ChatMessage>) -> Vec<ChatMessage> {
        let mut out = Vec::with_capacity(messages.len() + 1);
        out.push(ChatMessage::developer(self.text.clone()));
        out.extend(messages);
        out
    }
}

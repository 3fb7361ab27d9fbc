//! UI-agnostic application state types
//!
//! This module contains data structures that are shared between the chat
//! widget and whatever front end draws it, and don't depend on any specific
//! UI framework.

use serde::{Deserialize, Serialize};

/// One line of chat history. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationEntry {
    pub author: Author,
    pub text: String,
}

impl ConversationEntry {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            author: Author::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            author: Author::Assistant,
            text: text.into(),
        }
    }
}

/// Who wrote a conversation entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Author {
    User,
    Assistant,
}

/// The two UI hint flags. They are independent: all four combinations can
/// occur, and the push channel may overwrite either at any time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionState {
    pub listening: bool,
    pub speaking: bool,
}

impl InteractionState {
    pub fn is_idle(&self) -> bool {
        !self.listening && !self.speaking
    }

    /// Label for the voice toggle button
    pub fn voice_label(&self) -> &'static str {
        if self.listening {
            "LISTENING"
        } else {
            "VOICE"
        }
    }
}

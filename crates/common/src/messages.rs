use faststr::FastStr;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    System,
    User,
    Assistant,
    Tool,
}

impl MessageRole {
    /// System content is hoisted out of the conversation on some upstreams.
    pub fn is_system(&self) -> bool {
        matches!(self, MessageRole::System)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Message {
    pub role:    MessageRole,
    pub content: FastStr,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name:    Option<FastStr>,
}

impl Message {
    pub fn new(role: MessageRole, content: impl Into<FastStr>) -> Self {
        Self {
            role,
            content: content.into(),
            name: None,
        }
    }

    /// A prompt-only completion is submitted upstream as a single user message.
    pub fn user(content: impl Into<FastStr>) -> Self {
        Self::new(MessageRole::User, content)
    }
}

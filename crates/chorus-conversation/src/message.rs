//! Conversation messages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// A message stored on a conversation node. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    /// Model that produced the message, empty for user input.
    pub model: String,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

/// Input for `ConversationTree::add_message`; id and timestamp are assigned
/// when the node is created.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMessage {
    pub role: Role,
    pub content: String,
    pub model: String,
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl NewMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            model: String::new(),
            metadata: serde_json::Map::new(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(model: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content).with_model(model)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub(crate) fn into_message(self, id: String, created_at: DateTime<Utc>) -> Message {
        Message {
            id,
            role: self.role,
            content: self.content,
            model: self.model,
            metadata: self.metadata,
            created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Assistant).unwrap(), "\"assistant\"");
        let role: Role = serde_json::from_str("\"system\"").unwrap();
        assert_eq!(role, Role::System);
    }

    #[test]
    fn assistant_builder_sets_model() {
        let msg = NewMessage::assistant("@openai/gpt4o", "hello")
            .with_metadata("inputTokens", serde_json::json!(12));
        assert_eq!(msg.role, Role::Assistant);
        assert_eq!(msg.model, "@openai/gpt4o");
        assert_eq!(msg.metadata["inputTokens"], 12);
    }

    #[test]
    fn message_uses_camel_case_fields() {
        let msg = NewMessage::user("hi").into_message("m1".into(), Utc::now());
        let json = serde_json::to_value(&msg).unwrap();
        assert!(json.get("createdAt").is_some());
        assert_eq!(json["role"], "user");
        assert_eq!(json["content"], "hi");
    }
}

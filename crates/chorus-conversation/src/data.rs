//! Persisted conversation record.

use chorus_common::ConversationId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::message::Message;

/// One point in the conversation log.
///
/// `children` lists the ids of nodes whose `parent` is this node, in the
/// order they were appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(default)]
    pub children: Vec<String>,
}

impl Node {
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

/// The full record of a conversation. `mapping` is append-only: nodes are
/// never removed, and the only mutation after creation is appending to a
/// node's `children`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationData {
    pub id: ConversationId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_node_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_node_id: Option<String>,
    #[serde(default)]
    pub mapping: Vec<Node>,
    pub created_at: DateTime<Utc>,
    pub update_time: DateTime<Utc>,
}

impl ConversationData {
    pub fn new(title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: ConversationId::new(),
            title: title.into(),
            root_node_id: None,
            current_node_id: None,
            mapping: Vec::new(),
            created_at: now,
            update_time: now,
        }
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.mapping.iter().find(|n| n.id == id)
    }

    pub(crate) fn node_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.mapping.iter_mut().find(|n| n.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.mapping.is_empty()
    }
}

impl Default for ConversationData {
    fn default() -> Self {
        Self::new("New Conversation")
    }
}

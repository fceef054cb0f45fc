//! Bridges between the merged event stream and the conversation tree.
//!
//! [`chat_history`] turns a branch of stored messages into provider input;
//! [`ReplyCollector`] folds a session's events back into one reply per
//! model, ready to be appended to the tree.

use std::collections::BTreeMap;

use chorus_conversation::{Message, NewMessage};
use serde_json::json;

use crate::events::{StreamEvent, StreamEventKind};
use crate::{ChatMessage, Role, TokenUsage};

impl From<&Message> for ChatMessage {
    fn from(message: &Message) -> Self {
        let role = match message.role {
            chorus_conversation::Role::User => Role::User,
            chorus_conversation::Role::Assistant => Role::Assistant,
            chorus_conversation::Role::System => Role::System,
        };
        ChatMessage::new(role, message.content.clone())
    }
}

/// Provider input for a branch of stored messages, oldest first.
pub fn chat_history<'a>(messages: impl IntoIterator<Item = &'a Message>) -> Vec<ChatMessage> {
    messages.into_iter().map(ChatMessage::from).collect()
}

/// Everything one model produced during a session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelReply {
    pub model_index: usize,
    pub model_id: String,
    pub content: String,
    pub usage: TokenUsage,
    /// Names of tools that completed, in call order.
    pub tools: Vec<String>,
    pub error: Option<String>,
}

impl ModelReply {
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// The reply as an assistant message for the conversation tree.
    pub fn to_message(&self) -> NewMessage {
        let mut message = NewMessage::assistant(&self.model_id, &self.content)
            .with_metadata("modelIndex", json!(self.model_index))
            .with_metadata("usage", json!(self.usage));
        if !self.tools.is_empty() {
            message = message.with_metadata("tools", json!(self.tools));
        }
        if let Some(error) = &self.error {
            message = message.with_metadata("error", json!(error));
        }
        message
    }
}

/// Folds stream events into per-model replies, keyed by model index.
#[derive(Debug, Default)]
pub struct ReplyCollector {
    replies: BTreeMap<usize, ModelReply>,
}

impl ReplyCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, event: &StreamEvent) {
        let reply = self
            .replies
            .entry(event.model_index)
            .or_insert_with(|| ModelReply {
                model_index: event.model_index,
                model_id: event.model_id.clone(),
                ..ModelReply::default()
            });
        match &event.kind {
            StreamEventKind::Content { content } => reply.content.push_str(content),
            StreamEventKind::UsageMetadata {
                input_tokens,
                output_tokens,
            } => {
                reply.usage.input_tokens += input_tokens;
                reply.usage.output_tokens += output_tokens;
            }
            StreamEventKind::ToolStart { .. } => {}
            StreamEventKind::ToolEnd { name, .. } => reply.tools.push(name.clone()),
            StreamEventKind::Error { message, .. } => reply.error = Some(message.clone()),
        }
    }

    pub fn get(&self, model_index: usize) -> Option<&ModelReply> {
        self.replies.get(&model_index)
    }

    pub fn len(&self) -> usize {
        self.replies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.replies.is_empty()
    }

    /// Replies ordered by model index.
    pub fn into_replies(self) -> Vec<ModelReply> {
        self.replies.into_values().collect()
    }
}

#[cfg(test)]
mod tests {
    use chorus_conversation::ConversationTree;

    use super::*;
    use crate::error::{AiError, ProviderError};

    fn event(index: usize, kind: StreamEventKind) -> StreamEvent {
        StreamEvent {
            model_index: index,
            model_id: format!("@test/m{index}"),
            kind,
        }
    }

    #[test]
    fn folds_events_per_model() {
        let mut collector = ReplyCollector::new();
        let events = [
            event(2, StreamEventKind::content("Hel")),
            event(0, StreamEventKind::content("Hi")),
            event(2, StreamEventKind::content("lo")),
            event(
                2,
                StreamEventKind::ToolEnd {
                    name: "weather".into(),
                    input: json!({}),
                    output: "sunny".into(),
                },
            ),
            event(
                2,
                StreamEventKind::usage(TokenUsage {
                    input_tokens: 4,
                    output_tokens: 2,
                }),
            ),
            event(
                0,
                StreamEventKind::error(&AiError::from(ProviderError::RateLimited)),
            ),
        ];
        for e in &events {
            collector.observe(e);
        }

        let replies = collector.into_replies();
        assert_eq!(replies.len(), 2);
        assert_eq!(replies[0].model_index, 0);
        assert!(replies[0].is_error());
        assert_eq!(replies[1].content, "Hello");
        assert_eq!(replies[1].tools, vec!["weather"]);
        assert_eq!(replies[1].usage.total_tokens(), 6);
    }

    #[test]
    fn replies_append_to_the_tree() {
        let mut tree = ConversationTree::new();
        let user = tree.add_message(NewMessage::user("hello there"), None);

        let reply = ModelReply {
            model_index: 1,
            model_id: "@local/echo".into(),
            content: "hello there".into(),
            ..ModelReply::default()
        };
        let node = tree.add_message(reply.to_message(), Some(&user.id));
        let message = node.message.as_ref().unwrap();
        assert_eq!(message.model, "@local/echo");
        assert_eq!(message.metadata["modelIndex"], 1);

        let history = chat_history(tree.nodes().iter().filter_map(|n| n.message.as_ref()));
        assert_eq!(
            history,
            vec![ChatMessage::user("hello there"), ChatMessage::assistant("hello there")]
        );
    }
}

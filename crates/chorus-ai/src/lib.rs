//! Multi-model streaming engine for Chorus.
//!
//! Fans one prompt out to several chat models at once and merges their
//! output into a single event stream:
//! - Parameter schemas with environment-backed defaults
//! - Tool extensions bound per model selection
//! - A per-model runner with a bounded tool-call loop
//! - A fan-in aggregator with cooperative cancellation
//! - OpenAI-compatible SSE streaming and an offline echo model

pub mod aggregator;
pub mod error;
pub mod events;
pub mod extension;
pub mod history;
pub mod models;
pub mod openai;
pub mod provider;
pub mod registry;
pub mod runner;
pub mod schema;
pub mod session;
pub mod streaming;
pub mod token_tracker;

#[cfg(test)]
pub(crate) mod testing;

pub use aggregator::{AggregatedStream, EventSink, Producer, StreamAggregator};
pub use error::{AiError, ErrorKind, ProviderError, ToolError, ValidationError, ValidationIssue};
pub use events::{StreamEvent, StreamEventKind};
pub use extension::{BoundTool, Extension, ExtensionBuilder, ExtensionKit, ToolCapabilityProvider};
pub use history::{chat_history, ModelReply, ReplyCollector};
pub use models::{builtin_models, ChatModel, EchoModel, ModelMetadata};
pub use provider::{LanguageModelProvider, ProviderChunk, ProviderRequest, ProviderStream};
pub use registry::{ChorusCore, ChorusCoreBuilder};
pub use runner::{ModelRunner, RunnerTask};
pub use schema::{DefaultValue, Env, FieldKind, FieldSpec, ParameterSchema, Params};
pub use session::{CapabilitySelection, ChatRequest, ConversationSession, ModelSelection};
pub use token_tracker::TokenTracker;

/// A message in the provider-facing chat history.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// Assistant turn that requested the given tool calls.
    pub fn tool_calls(content: impl Into<String>, calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls: calls,
            ..Self::assistant(content)
        }
    }

    /// Result of a single tool call, linked back by `call_id`.
    pub fn tool_result(call_id: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            tool_call_id: Some(call_id.into()),
            ..Self::new(Role::Tool, output)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
    Tool,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: serde_json::Value,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl TokenUsage {
    pub fn total_tokens(&self) -> u64 {
        self.input_tokens.saturating_add(self.output_tokens)
    }
}

//! Events emitted on a conversation session's merged stream.

use serde::{Deserialize, Serialize};

use crate::error::{AiError, ErrorKind, ValidationIssue};
use crate::TokenUsage;

/// A single event, tagged with the model that produced it.
///
/// Serializes flat, e.g.
/// `{"modelIndex":0,"modelId":"@local/echo","type":"content","content":"hi"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamEvent {
    /// Position of the model in the request's selection list.
    pub model_index: usize,
    pub model_id: String,
    #[serde(flatten)]
    pub kind: StreamEventKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEventKind {
    Content {
        content: String,
    },
    UsageMetadata {
        #[serde(rename = "inputTokens")]
        input_tokens: u64,
        #[serde(rename = "outputTokens")]
        output_tokens: u64,
    },
    ToolStart {
        name: String,
        input: serde_json::Value,
    },
    ToolEnd {
        name: String,
        input: serde_json::Value,
        output: String,
    },
    Error {
        #[serde(rename = "errorKind")]
        error_kind: ErrorKind,
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        issues: Option<Vec<ValidationIssue>>,
    },
}

impl StreamEventKind {
    pub fn content(text: impl Into<String>) -> Self {
        StreamEventKind::Content {
            content: text.into(),
        }
    }

    pub fn usage(usage: TokenUsage) -> Self {
        StreamEventKind::UsageMetadata {
            input_tokens: usage.input_tokens,
            output_tokens: usage.output_tokens,
        }
    }

    pub fn error(err: &AiError) -> Self {
        StreamEventKind::Error {
            error_kind: err.kind(),
            message: err.to_string(),
            issues: err.issues().map(<[ValidationIssue]>::to_vec),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, StreamEventKind::Error { .. })
    }
}

impl StreamEvent {
    pub fn content(&self) -> Option<&str> {
        match &self.kind {
            StreamEventKind::Content { content } => Some(content),
            _ => None,
        }
    }

    pub fn is_error(&self) -> bool {
        self.kind.is_error()
    }
}

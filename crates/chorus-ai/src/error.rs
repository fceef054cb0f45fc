//! Error types for the streaming engine.
//!
//! Failures inside a single model's producer never cross into other
//! producers. They are converted into one terminal `error` event whose
//! `kind` comes from [`AiError::kind`].

use serde::{Deserialize, Serialize};

/// One field-level problem found while parsing parameters or tool input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// Dotted field path; empty for the value as a whole.
    pub path: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// A parameter object failed its schema. Carries every issue found.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid parameters: {}", summarize(.issues))]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationError {
    pub fn new(issues: Vec<ValidationIssue>) -> Self {
        Self { issues }
    }

    pub fn single(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(vec![ValidationIssue::new(path, message)])
    }
}

fn summarize(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(|issue| {
            if issue.path.is_empty() {
                issue.message.clone()
            } else {
                format!("{}: {}", issue.path, issue.message)
            }
        })
        .collect::<Vec<_>>()
        .join("; ")
}

/// Failures raised by a language-model backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    #[error("API error: {0}")]
    Api(String),
    #[error("Rate limited")]
    RateLimited,
    #[error("Network error: {0}")]
    Network(String),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Authentication error: {0}")]
    Auth(String),
    #[error("Timeout")]
    Timeout,
}

/// Failures raised while running a tool on behalf of a model.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ToolError {
    #[error("unknown tool: {0}")]
    UnknownTool(String),
    #[error("invalid input for tool {tool}: {source}")]
    InvalidInput {
        tool: String,
        #[source]
        source: ValidationError,
    },
    #[error("tool {tool} failed: {message}")]
    Failed { tool: String, message: String },
}

/// Top-level error for a single model's producer.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error(transparent)]
    Tool(#[from] ToolError),
    #[error("unknown model: {0}")]
    UnknownModel(String),
    #[error("session stream was already started")]
    AlreadyStreamed,
    #[error("internal error: {0}")]
    Internal(String),
}

/// Error category reported on `error` events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Provider,
    Tool,
    Internal,
}

impl AiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AiError::Validation(_) => ErrorKind::Validation,
            AiError::Provider(_) => ErrorKind::Provider,
            AiError::Tool(_) => ErrorKind::Tool,
            AiError::UnknownModel(_) | AiError::AlreadyStreamed | AiError::Internal(_) => {
                ErrorKind::Internal
            }
        }
    }

    /// Field-level issues, for validation failures only.
    pub fn issues(&self) -> Option<&[ValidationIssue]> {
        match self {
            AiError::Validation(err) => Some(&err.issues),
            AiError::Tool(ToolError::InvalidInput { source, .. }) => Some(&source.issues),
            _ => None,
        }
    }
}

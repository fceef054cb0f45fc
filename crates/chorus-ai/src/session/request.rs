//! Chat requests and model selections.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ChatMessage;

/// Input to [`crate::ChorusCore::chat`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub models: Vec<ModelSelection>,
    pub messages: Vec<ChatMessage>,
}

impl ChatRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            models: Vec::new(),
            messages,
        }
    }

    /// A request with a single user message.
    pub fn prompt(text: impl Into<String>) -> Self {
        Self::new(vec![ChatMessage::user(text)])
    }

    pub fn with_model(mut self, selection: impl Into<ModelSelection>) -> Self {
        self.models.push(selection.into());
        self
    }
}

/// One model to run, with its raw parameters and requested capabilities.
///
/// Deserializes from any of:
/// `"id"`, `["id", {params}]`, `["id", {params}, {"extensions": [...]}]`
/// or `{"modelId": "id", "params": {...}, "extensions": [...]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "RawSelection")]
pub struct ModelSelection {
    pub model_id: String,
    pub params: Value,
    pub extensions: Vec<CapabilitySelection>,
}

impl ModelSelection {
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            params: Value::Null,
            extensions: Vec::new(),
        }
    }

    pub fn with_params(mut self, params: Value) -> Self {
        self.params = params;
        self
    }

    pub fn with_extension(mut self, id: impl Into<String>, params: Value) -> Self {
        self.extensions.push(CapabilitySelection {
            id: id.into(),
            params,
        });
        self
    }
}

impl From<&str> for ModelSelection {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ModelSelection {
    fn from(id: String) -> Self {
        Self::new(id)
    }
}

/// A capability (extension) id plus its raw parameters.
///
/// Deserializes from `"id"`, `["id", {params}]` or `{"id": .., "params": ..}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawCapability")]
pub struct CapabilitySelection {
    pub id: String,
    pub params: Value,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawCapability {
    Id(String),
    Pair(String, Value),
    Full {
        id: String,
        #[serde(default)]
        params: Value,
    },
}

impl From<RawCapability> for CapabilitySelection {
    fn from(raw: RawCapability) -> Self {
        let (id, params) = match raw {
            RawCapability::Id(id) => (id, Value::Null),
            RawCapability::Pair(id, params) | RawCapability::Full { id, params } => (id, params),
        };
        Self { id, params }
    }
}

#[derive(Deserialize)]
struct RawOptions {
    #[serde(default)]
    extensions: Vec<CapabilitySelection>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawSelection {
    Id(String),
    Triple(String, Value, RawOptions),
    Pair(String, Value),
    #[serde(rename_all = "camelCase")]
    Full {
        model_id: String,
        #[serde(default)]
        params: Value,
        #[serde(default)]
        extensions: Vec<CapabilitySelection>,
    },
}

impl From<RawSelection> for ModelSelection {
    fn from(raw: RawSelection) -> Self {
        match raw {
            RawSelection::Id(model_id) => Self::new(model_id),
            RawSelection::Pair(model_id, params) => Self::new(model_id).with_params(params),
            RawSelection::Triple(model_id, params, options) => Self {
                model_id,
                params,
                extensions: options.extensions,
            },
            RawSelection::Full {
                model_id,
                params,
                extensions,
            } => Self {
                model_id,
                params,
                extensions,
            },
        }
    }
}

//! Chat model definitions.
//!
//! A [`ChatModel`] describes a selectable model: its metadata, its
//! parameter schema, and how to build a provider from validated
//! parameters. The registry holds these; runners call into them.

mod echo;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::provider::LanguageModelProvider;
use crate::schema::{ParameterSchema, Params};

pub use echo::EchoModel;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelMetadata {
    pub id: String,
    pub name: String,
    pub group: String,
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl ModelMetadata {
    pub fn new(id: impl Into<String>, name: impl Into<String>, group: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            group: group.into(),
            description: String::new(),
            tags: Vec::new(),
        }
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn tagged(mut self, tags: &[&str]) -> Self {
        self.tags = tags.iter().map(|t| t.to_string()).collect();
        self
    }
}

pub trait ChatModel: Send + Sync {
    fn metadata(&self) -> &ModelMetadata;

    fn parameters(&self) -> &ParameterSchema;

    /// Build a provider from parameters already validated by
    /// [`ChatModel::parameters`].
    fn provider(&self, params: &Params) -> Result<Arc<dyn LanguageModelProvider>, ProviderError>;
}

/// Every model that ships with the engine.
pub fn builtin_models() -> Vec<Arc<dyn ChatModel>> {
    vec![
        Arc::new(crate::openai::OpenAiModel::gpt35_turbo()),
        Arc::new(crate::openai::OpenAiModel::gpt4()),
        Arc::new(crate::openai::OpenAiModel::gpt4o()),
        Arc::new(EchoModel::new()),
    ]
}

//! OpenAI-compatible chat models.

mod api;
mod client;

use std::sync::Arc;

use serde_json::{json, Value};

use crate::error::ProviderError;
use crate::models::{ChatModel, ModelMetadata};
use crate::provider::LanguageModelProvider;
use crate::schema::{FieldSpec, ParameterSchema, Params};

pub use client::{OpenAiClient, OpenAiConfig, DEFAULT_BASE_URL};

pub const API_KEY_ENV: &str = "MODEL_OPENAI_API_KEY";
pub const BASE_URL_ENV: &str = "MODEL_OPENAI_BASE_URL";

/// A Chat Completions model exposed under an `@openai/...` id.
pub struct OpenAiModel {
    metadata: ModelMetadata,
    model_name: String,
    parameters: ParameterSchema,
}

impl OpenAiModel {
    pub fn new(id: &str, name: &str, model_name: &str) -> Self {
        Self {
            metadata: ModelMetadata::new(id, name, "openai").tagged(&["chat", "tools"]),
            model_name: model_name.to_string(),
            parameters: Self::schema(),
        }
    }

    pub fn gpt35_turbo() -> Self {
        let model = Self::new("@openai/gpt3.5-turbo", "GPT-3.5 Turbo", "gpt-3.5-turbo");
        model.described("Fast, inexpensive model for simple tasks")
    }

    pub fn gpt4() -> Self {
        Self::new("@openai/gpt4", "GPT-4", "gpt-4").described("High-intelligence flagship model")
    }

    pub fn gpt4o() -> Self {
        Self::new("@openai/gpt4o", "GPT-4o", "gpt-4o")
            .described("Multimodal flagship model, faster and cheaper than GPT-4")
    }

    fn described(mut self, description: &str) -> Self {
        self.metadata.description = description.to_string();
        self
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    fn schema() -> ParameterSchema {
        ParameterSchema::new()
            .field(
                FieldSpec::number("temperature")
                    .range(0.0, 2.0)
                    .default_value(0.5)
                    .describe("Sampling temperature"),
            )
            .field(
                FieldSpec::integer("maxTokens")
                    .min(-1.0)
                    .default_value(-1)
                    .describe("Completion token limit, -1 for no limit"),
            )
            .field(
                FieldSpec::string("apiKey")
                    .default_from_env(API_KEY_ENV, Some(json!("")))
                    .describe("OpenAI API key"),
            )
            .field(
                FieldSpec::string("baseUrl")
                    .default_from_env(BASE_URL_ENV, Some(json!(DEFAULT_BASE_URL)))
                    .describe("API base URL"),
            )
    }
}

impl ChatModel for OpenAiModel {
    fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }

    fn parameters(&self) -> &ParameterSchema {
        &self.parameters
    }

    fn provider(&self, params: &Params) -> Result<Arc<dyn LanguageModelProvider>, ProviderError> {
        let api_key = params.get("apiKey").and_then(Value::as_str).unwrap_or_default();
        let base_url = params
            .get("baseUrl")
            .and_then(Value::as_str)
            .filter(|url| !url.is_empty())
            .unwrap_or(DEFAULT_BASE_URL);
        let max_tokens = params
            .get("maxTokens")
            .and_then(Value::as_i64)
            .filter(|n| *n > 0)
            .map(|n| n as u64);
        let temperature = params.get("temperature").and_then(Value::as_f64).unwrap_or(0.5);

        let config = OpenAiConfig::new(api_key, &self.model_name)
            .with_base_url(base_url)
            .with_temperature(temperature)
            .with_max_tokens(max_tokens);
        Ok(Arc::new(OpenAiClient::new(config)?))
    }
}

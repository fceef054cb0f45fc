//! Model registry and session factory.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::extension::{Extension, ExtensionKit, ToolCapabilityProvider};
use crate::models::{ChatModel, ModelMetadata};
use crate::runner::{ModelRunner, DEFAULT_MAX_ITERATIONS};
use crate::schema::Env;
use crate::session::{ChatRequest, ConversationSession};
use crate::{ChatMessage, Role};

/// Registered models and extensions, plus the environment they read.
pub struct ChorusCore {
    models: Vec<Arc<dyn ChatModel>>,
    extensions: Arc<ExtensionKit>,
    env: Arc<Env>,
    max_iterations: u32,
    system_prompt: Option<String>,
}

impl ChorusCore {
    pub fn builder() -> ChorusCoreBuilder {
        ChorusCoreBuilder::default()
    }

    pub fn registered_models(&self) -> Vec<&ModelMetadata> {
        self.models.iter().map(|m| m.metadata()).collect()
    }

    pub fn model(&self, id: &str) -> Option<Arc<dyn ChatModel>> {
        self.models.iter().find(|m| m.metadata().id == id).cloned()
    }

    /// JSON Schema of a model's parameters.
    pub fn model_parameters_schema(&self, id: &str) -> Option<Value> {
        self.model(id).map(|m| m.parameters().to_json_schema())
    }

    pub fn extensions(&self) -> &ExtensionKit {
        &self.extensions
    }

    pub fn env(&self, key: &str) -> Option<&str> {
        self.env.get(key).map(String::as_str)
    }

    pub fn env_or(&self, key: &str, default: &str) -> String {
        self.env(key).unwrap_or(default).to_string()
    }

    pub fn envs(&self) -> &Env {
        &self.env
    }

    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    /// Build a session for `request`. Selections naming an unregistered
    /// model, or whose parameters or capabilities fail to resolve, are
    /// dropped; the rest keep their position as `model_index`.
    pub fn chat(&self, request: ChatRequest) -> ConversationSession {
        let kit: Arc<dyn ToolCapabilityProvider> = self.extensions.clone();
        let runners: Vec<ModelRunner> = request
            .models
            .into_iter()
            .enumerate()
            .filter_map(|(index, selection)| {
                let Some(model) = self.model(&selection.model_id) else {
                    warn!(model_id = %selection.model_id, "unknown model dropped from selection");
                    return None;
                };
                let runner = ModelRunner::new(
                    index,
                    model,
                    selection.params,
                    Arc::clone(&kit),
                    Arc::clone(&self.env),
                )
                .with_capabilities(selection.extensions)
                .with_max_iterations(self.max_iterations);
                if let Err(e) = runner.resolve() {
                    warn!(model_id = %selection.model_id, error = %e, "unresolvable selection dropped");
                    return None;
                }
                Some(runner)
            })
            .collect();

        let mut messages = request.messages;
        if let Some(prompt) = &self.system_prompt {
            if !messages.iter().any(|m| m.role == Role::System) {
                messages.insert(0, ChatMessage::system(prompt.clone()));
            }
        }

        debug!(models = runners.len(), messages = messages.len(), "session created");
        ConversationSession::new(runners, messages)
    }
}

pub struct ChorusCoreBuilder {
    models: Vec<Arc<dyn ChatModel>>,
    extensions: ExtensionKit,
    env: Env,
    max_iterations: u32,
    system_prompt: Option<String>,
}

impl Default for ChorusCoreBuilder {
    fn default() -> Self {
        Self {
            models: Vec::new(),
            extensions: ExtensionKit::default(),
            env: Env::new(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            system_prompt: None,
        }
    }
}

impl ChorusCoreBuilder {
    /// Register a model. A later model with the same id replaces the earlier.
    pub fn model(mut self, model: Arc<dyn ChatModel>) -> Self {
        let id = model.metadata().id.clone();
        if let Some(pos) = self.models.iter().position(|m| m.metadata().id == id) {
            warn!(model_id = %id, "replacing registered model");
            self.models.remove(pos);
        }
        self.models.push(model);
        self
    }

    pub fn models(self, models: impl IntoIterator<Item = Arc<dyn ChatModel>>) -> Self {
        models.into_iter().fold(self, Self::model)
    }

    pub fn extension(mut self, extension: Extension) -> Self {
        self.extensions.register(extension);
        self
    }

    pub fn env(mut self, env: Env) -> Self {
        self.env = env;
        self
    }

    pub fn env_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    pub fn system_prompt(mut self, prompt: Option<String>) -> Self {
        self.system_prompt = prompt.filter(|p| !p.trim().is_empty());
        self
    }

    pub fn build(self) -> ChorusCore {
        ChorusCore {
            models: self.models,
            extensions: Arc::new(self.extensions),
            env: Arc::new(self.env),
            max_iterations: self.max_iterations,
            system_prompt: self.system_prompt,
        }
    }
}

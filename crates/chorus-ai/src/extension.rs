//! Tool extensions.
//!
//! An [`Extension`] is a named bundle of tools plus a parameter schema for
//! the bundle as a whole. A model selection names extensions by id together
//! with their parameters; [`ExtensionKit`] resolves those names into
//! [`BoundTool`]s the runner can offer to the model.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use serde_json::Value;
use tracing::debug;

use crate::error::{ToolError, ValidationError};
use crate::schema::{Env, ParameterSchema, Params};
use crate::ToolDefinition;

/// Async tool body: `(extension_params, tool_input) -> output`.
pub type ToolFn = Arc<dyn Fn(Params, Params) -> BoxFuture<'static, Result<String, String>> + Send + Sync>;

#[derive(Clone)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub input_schema: ParameterSchema,
    func: ToolFn,
}

impl fmt::Debug for ToolSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolSpec")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub struct Extension {
    pub id: String,
    pub name: String,
    pub description: String,
    pub tags: Vec<String>,
    pub schema: ParameterSchema,
    tools: Vec<ToolSpec>,
}

impl Extension {
    pub fn builder(id: impl Into<String>) -> ExtensionBuilder {
        let id = id.into();
        ExtensionBuilder {
            extension: Extension {
                name: id.clone(),
                id,
                description: String::new(),
                tags: Vec::new(),
                schema: ParameterSchema::new(),
                tools: Vec::new(),
            },
        }
    }

    pub fn tools(&self) -> &[ToolSpec] {
        &self.tools
    }

    /// Validate `params` and bind every tool to them.
    pub fn bind(&self, params: &Value, env: &Arc<Env>) -> Result<Vec<BoundTool>, ValidationError> {
        let params = self.schema.parse(params, env)?;
        Ok(self
            .tools
            .iter()
            .map(|tool| BoundTool {
                name: tool.name.clone(),
                description: tool.description.clone(),
                input_schema: tool.input_schema.clone(),
                extension_params: params.clone(),
                env: Arc::clone(env),
                func: Arc::clone(&tool.func),
            })
            .collect())
    }
}

pub struct ExtensionBuilder {
    extension: Extension,
}

impl ExtensionBuilder {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.extension.name = name.into();
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.extension.description = description.into();
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.extension.tags.push(tag.into());
        self
    }

    pub fn schema(mut self, schema: ParameterSchema) -> Self {
        self.extension.schema = schema;
        self
    }

    pub fn tool<F, Fut>(
        mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: ParameterSchema,
        func: F,
    ) -> Self
    where
        F: Fn(Params, Params) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String, String>> + Send + 'static,
    {
        let func: ToolFn = Arc::new(
            move |params: Params, input: Params| -> BoxFuture<'static, Result<String, String>> {
                Box::pin(func(params, input))
            },
        );
        self.extension.tools.push(ToolSpec {
            name: name.into(),
            description: description.into(),
            input_schema,
            func,
        });
        self
    }

    pub fn build(self) -> Extension {
        self.extension
    }
}

/// A tool bound to validated extension parameters.
#[derive(Clone)]
pub struct BoundTool {
    pub name: String,
    pub description: String,
    pub input_schema: ParameterSchema,
    extension_params: Params,
    env: Arc<Env>,
    func: ToolFn,
}

impl fmt::Debug for BoundTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundTool")
            .field("name", &self.name)
            .field("extension_params", &self.extension_params)
            .finish_non_exhaustive()
    }
}

impl BoundTool {
    pub fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name.clone(),
            description: self.description.clone(),
            parameters: self.input_schema.to_json_schema(),
        }
    }

    /// Validate `input` and run the tool.
    pub async fn invoke(&self, input: &Value) -> Result<String, ToolError> {
        let input = self
            .input_schema
            .parse(input, &self.env)
            .map_err(|source| ToolError::InvalidInput {
                tool: self.name.clone(),
                source,
            })?;
        debug!(tool = %self.name, "invoking tool");
        (self.func)(self.extension_params.clone(), input)
            .await
            .map_err(|message| ToolError::Failed {
                tool: self.name.clone(),
                message,
            })
    }
}

/// Resolves capability ids into tools for one model selection.
pub trait ToolCapabilityProvider: Send + Sync {
    /// `Ok(None)` when `id` is not a known capability.
    fn tools(
        &self,
        id: &str,
        params: &Value,
        env: &Arc<Env>,
    ) -> Result<Option<Vec<BoundTool>>, ValidationError>;
}

/// Registry of extensions available to every session.
#[derive(Debug, Clone, Default)]
pub struct ExtensionKit {
    extensions: Vec<Arc<Extension>>,
}

impl ExtensionKit {
    pub fn new(extensions: impl IntoIterator<Item = Extension>) -> Self {
        Self {
            extensions: extensions.into_iter().map(Arc::new).collect(),
        }
    }

    /// Later registrations with the same id replace earlier ones.
    pub fn register(&mut self, extension: Extension) {
        self.extensions.retain(|e| e.id != extension.id);
        self.extensions.push(Arc::new(extension));
    }

    pub fn get(&self, id: &str) -> Option<&Extension> {
        self.extensions.iter().find(|e| e.id == id).map(Arc::as_ref)
    }

    pub fn extensions(&self) -> impl Iterator<Item = &Extension> {
        self.extensions.iter().map(Arc::as_ref)
    }

    pub fn len(&self) -> usize {
        self.extensions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }
}

impl ToolCapabilityProvider for ExtensionKit {
    fn tools(
        &self,
        id: &str,
        params: &Value,
        env: &Arc<Env>,
    ) -> Result<Option<Vec<BoundTool>>, ValidationError> {
        match self.get(id) {
            Some(extension) => extension.bind(params, env).map(Some),
            None => Ok(None),
        }
    }
}

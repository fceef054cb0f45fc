//! Per-model runner.
//!
//! A [`ModelRunner`] binds one model selection (model, raw parameters,
//! requested capabilities) to the engine's environment. Starting it yields a
//! [`RunnerTask`], the producer the aggregator drives. The task validates
//! parameters, assembles tools, then streams provider rounds, running any
//! tool calls between rounds up to the iteration limit.

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::StreamExt;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::aggregator::{EventSink, Producer};
use crate::error::{AiError, ToolError, ValidationError};
use crate::events::StreamEventKind;
use crate::extension::{BoundTool, ToolCapabilityProvider};
use crate::models::ChatModel;
use crate::provider::{ProviderChunk, ProviderRequest};
use crate::schema::{Env, Params};
use crate::session::CapabilitySelection;
use crate::{ChatMessage, ToolCall, ToolDefinition};

/// Default number of provider rounds per producer.
pub const DEFAULT_MAX_ITERATIONS: u32 = 3;

pub struct ModelRunner {
    model_index: usize,
    model: Arc<dyn ChatModel>,
    params: Value,
    capabilities: Vec<CapabilitySelection>,
    kit: Arc<dyn ToolCapabilityProvider>,
    env: Arc<Env>,
    max_iterations: u32,
}

impl ModelRunner {
    pub fn new(
        model_index: usize,
        model: Arc<dyn ChatModel>,
        params: Value,
        kit: Arc<dyn ToolCapabilityProvider>,
        env: Arc<Env>,
    ) -> Self {
        Self {
            model_index,
            model,
            params,
            capabilities: Vec::new(),
            kit,
            env,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    pub fn with_capabilities(mut self, capabilities: Vec<CapabilitySelection>) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    pub fn model_index(&self) -> usize {
        self.model_index
    }

    pub fn model_id(&self) -> &str {
        &self.model.metadata().id
    }

    pub fn model(&self) -> &Arc<dyn ChatModel> {
        &self.model
    }

    pub fn capabilities(&self) -> &[CapabilitySelection] {
        &self.capabilities
    }

    /// Validate the raw selection parameters against the model's schema.
    pub fn parse_params(&self) -> Result<Params, ValidationError> {
        self.model.parameters().parse(&self.params, &self.env)
    }

    /// Resolve requested capabilities. Unknown ids are dropped.
    pub fn assemble_tools(&self) -> Result<Vec<BoundTool>, ValidationError> {
        let mut tools = Vec::new();
        for capability in &self.capabilities {
            match self.kit.tools(&capability.id, &capability.params, &self.env)? {
                Some(bound) => tools.extend(bound),
                None => debug!(
                    model_index = self.model_index,
                    capability = %capability.id,
                    "unknown capability dropped"
                ),
            }
        }
        Ok(tools)
    }

    /// Check that parameters and capabilities resolve against the current
    /// environment. The task repeats both checks when it starts.
    pub fn resolve(&self) -> Result<(), ValidationError> {
        self.parse_params()?;
        self.assemble_tools()?;
        Ok(())
    }

    /// Bind this runner to a prompt. Nothing runs until the task is polled.
    pub fn start_task(
        self: &Arc<Self>,
        messages: Arc<Vec<ChatMessage>>,
        cancel: CancellationToken,
    ) -> RunnerTask {
        RunnerTask {
            runner: Arc::clone(self),
            messages,
            cancel,
        }
    }
}

/// A runner bound to one prompt; the aggregator's producer for one model.
pub struct RunnerTask {
    runner: Arc<ModelRunner>,
    messages: Arc<Vec<ChatMessage>>,
    cancel: CancellationToken,
}

impl RunnerTask {
    async fn run(&self, sink: &EventSink) -> Result<(), AiError> {
        let runner = &self.runner;
        let model_index = runner.model_index;

        let params = runner.parse_params()?;
        let tools = runner.assemble_tools()?;
        let provider = runner.model.provider(&params)?;
        let definitions: Vec<ToolDefinition> = tools.iter().map(BoundTool::definition).collect();

        let mut messages = self.messages.as_ref().clone();
        for round in 1..=runner.max_iterations {
            let request = ProviderRequest {
                messages: messages.clone(),
                tools: definitions.clone(),
            };
            let mut stream = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Ok(()),
                stream = provider.stream(request, self.cancel.clone()) => stream?,
            };

            let mut text = String::new();
            let mut calls: Vec<ToolCall> = Vec::new();
            loop {
                let chunk = tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => {
                        debug!(model_index, "round cancelled");
                        return Ok(());
                    }
                    chunk = stream.next() => chunk,
                };
                let Some(chunk) = chunk else { break };
                match chunk? {
                    ProviderChunk::Content(delta) => {
                        if delta.is_empty() {
                            continue;
                        }
                        text.push_str(&delta);
                        if !sink.emit(StreamEventKind::content(delta)) {
                            return Ok(());
                        }
                    }
                    ProviderChunk::Usage(usage) => {
                        sink.emit(StreamEventKind::usage(usage));
                    }
                    ProviderChunk::ToolCalls(requested) => calls.extend(requested),
                }
            }

            if calls.is_empty() {
                debug!(model_index, round, "model finished");
                return Ok(());
            }
            if round == runner.max_iterations {
                debug!(model_index, round, "iteration limit reached with tools pending");
                return Ok(());
            }

            messages.push(ChatMessage::tool_calls(text, calls.clone()));
            for call in calls {
                let output = self.call_tool(&tools, &call, sink).await?;
                let Some(output) = output else {
                    return Ok(());
                };
                messages.push(ChatMessage::tool_result(call.id, output));
            }
        }
        Ok(())
    }

    /// Run one tool call, bracketed by start/end events. `None` on cancel.
    async fn call_tool(
        &self,
        tools: &[BoundTool],
        call: &ToolCall,
        sink: &EventSink,
    ) -> Result<Option<String>, AiError> {
        let tool = tools
            .iter()
            .find(|t| t.name == call.name)
            .ok_or_else(|| ToolError::UnknownTool(call.name.clone()))?;

        sink.emit(StreamEventKind::ToolStart {
            name: call.name.clone(),
            input: call.arguments.clone(),
        });
        info!(
            model_index = self.runner.model_index,
            tool = %call.name,
            "running tool"
        );
        let output = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Ok(None),
            output = tool.invoke(&call.arguments) => output,
        };
        let output = match output {
            Ok(output) => output,
            Err(err) => {
                warn!(model_index = self.runner.model_index, tool = %call.name, error = %err, "tool failed");
                return Err(err.into());
            }
        };
        sink.emit(StreamEventKind::ToolEnd {
            name: call.name.clone(),
            input: call.arguments.clone(),
            output: output.clone(),
        });
        Ok(Some(output))
    }
}

#[async_trait]
impl Producer for RunnerTask {
    fn model_index(&self) -> usize {
        self.runner.model_index
    }

    fn model_id(&self) -> &str {
        self.runner.model_id()
    }

    async fn produce(&self, sink: EventSink) -> Result<(), AiError> {
        if self.cancel.is_cancelled() {
            return Ok(());
        }
        self.run(&sink).await
    }
}

//! Offline model that repeats the prompt back.
//!
//! Streams the latest user message word by word. A prompt of the form
//! `call:<tool> <json>` requests that tool when it is on offer, and the
//! following round echoes the tool's output.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{stream, StreamExt};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use super::{ChatModel, ModelMetadata};
use crate::error::ProviderError;
use crate::provider::{LanguageModelProvider, ProviderChunk, ProviderRequest, ProviderStream};
use crate::schema::{FieldSpec, ParameterSchema, Params};
use crate::{ChatMessage, Role, TokenUsage, ToolCall};

pub struct EchoModel {
    metadata: ModelMetadata,
    parameters: ParameterSchema,
}

impl EchoModel {
    pub const ID: &'static str = "@local/echo";

    pub fn new() -> Self {
        Self {
            metadata: ModelMetadata::new(Self::ID, "Echo", "local")
                .describe("Repeats the prompt back, word by word")
                .tagged(&["offline", "testing"]),
            parameters: ParameterSchema::new().field(
                FieldSpec::integer("delayMs")
                    .range(0.0, 5000.0)
                    .default_value(0)
                    .describe("Pause between words in milliseconds"),
            ),
        }
    }
}

impl Default for EchoModel {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatModel for EchoModel {
    fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }

    fn parameters(&self) -> &ParameterSchema {
        &self.parameters
    }

    fn provider(&self, params: &Params) -> Result<Arc<dyn LanguageModelProvider>, ProviderError> {
        let delay_ms = params.get("delayMs").and_then(Value::as_u64).unwrap_or(0);
        Ok(Arc::new(EchoProvider {
            delay: Duration::from_millis(delay_ms),
        }))
    }
}

struct EchoProvider {
    delay: Duration,
}

fn count_words(messages: &[ChatMessage]) -> u64 {
    messages
        .iter()
        .map(|m| m.content.split_whitespace().count() as u64)
        .sum()
}

/// `call:<tool> <json>` addressed to a tool in `request`.
fn requested_call(request: &ProviderRequest, prompt: &str) -> Option<ToolCall> {
    let rest = prompt.trim().strip_prefix("call:")?;
    let (name, args) = rest.split_once(' ').unwrap_or((rest, ""));
    if !request.tools.iter().any(|t| t.name == name) {
        return None;
    }
    let arguments = if args.trim().is_empty() {
        Value::Object(Default::default())
    } else {
        serde_json::from_str(args).unwrap_or(Value::Null)
    };
    Some(ToolCall {
        id: format!("call_{}", chorus_common::new_correlation_id()),
        name: name.to_string(),
        arguments,
    })
}

#[async_trait]
impl LanguageModelProvider for EchoProvider {
    async fn stream(
        &self,
        request: ProviderRequest,
        cancel: CancellationToken,
    ) -> Result<ProviderStream, ProviderError> {
        let input_tokens = count_words(&request.messages);
        let last = request.messages.last();

        // After a tool round, echo the tool output instead of the prompt.
        let reply = match last {
            Some(message) if message.role == Role::Tool => message.content.clone(),
            _ => {
                let prompt = request
                    .messages
                    .iter()
                    .rev()
                    .find(|m| m.role == Role::User)
                    .map(|m| m.content.clone())
                    .unwrap_or_default();
                if let Some(call) = requested_call(&request, &prompt) {
                    let chunks = vec![
                        Ok(ProviderChunk::ToolCalls(vec![call])),
                        Ok(ProviderChunk::Usage(TokenUsage {
                            input_tokens,
                            output_tokens: 0,
                        })),
                    ];
                    return Ok(stream::iter(chunks).boxed());
                }
                prompt
            }
        };

        let words: Vec<String> = reply
            .split_whitespace()
            .enumerate()
            .map(|(i, word)| if i == 0 { word.to_string() } else { format!(" {word}") })
            .collect();
        let usage = TokenUsage {
            input_tokens,
            output_tokens: words.len() as u64,
        };
        let delay = self.delay;

        let content = stream::iter(words).then(move |word| async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            Ok::<_, ProviderError>(ProviderChunk::Content(word))
        });
        let tail = stream::once(async move { Ok::<_, ProviderError>(ProviderChunk::Usage(usage)) });

        Ok(content
            .chain(tail)
            .take_until(async move { cancel.cancelled().await })
            .boxed())
    }
}

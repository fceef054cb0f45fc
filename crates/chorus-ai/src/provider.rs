//! Backend abstraction for streaming chat completions.

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use tokio_util::sync::CancellationToken;

use crate::error::ProviderError;
use crate::{ChatMessage, TokenUsage, ToolCall, ToolDefinition};

/// One provider round: the running history plus the tools on offer.
#[derive(Debug, Clone, Default)]
pub struct ProviderRequest {
    pub messages: Vec<ChatMessage>,
    pub tools: Vec<ToolDefinition>,
}

/// Incremental output of a provider round.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderChunk {
    Content(String),
    Usage(TokenUsage),
    /// The model wants these tools run before it continues.
    ToolCalls(Vec<ToolCall>),
}

pub type ProviderStream = BoxStream<'static, Result<ProviderChunk, ProviderError>>;

/// A chat backend bound to validated parameters.
///
/// Implementations must stop producing once `cancel` fires. Dropping the
/// returned stream must release any in-flight request.
#[async_trait]
pub trait LanguageModelProvider: Send + Sync {
    async fn stream(
        &self,
        request: ProviderRequest,
        cancel: CancellationToken,
    ) -> Result<ProviderStream, ProviderError>;
}

//! Test doubles shared by the runner and session tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{stream, StreamExt};
use tokio_util::sync::CancellationToken;

use crate::error::ProviderError;
use crate::models::{ChatModel, ModelMetadata};
use crate::provider::{LanguageModelProvider, ProviderChunk, ProviderRequest, ProviderStream};
use crate::schema::{FieldSpec, ParameterSchema, Params};

/// What the scripted provider does for one round.
pub(crate) enum Round {
    Chunks(Vec<Result<ProviderChunk, ProviderError>>),
    /// Emit each chunk after a pause.
    Slow(Vec<ProviderChunk>, Duration),
    /// Never produce anything; flags `dropped` once released.
    Hang,
}

pub(crate) struct ScriptedProvider {
    rounds: Mutex<VecDeque<Round>>,
    pub requests: Mutex<Vec<ProviderRequest>>,
    pub dropped: Arc<AtomicBool>,
}

impl ScriptedProvider {
    pub fn new(rounds: Vec<Round>) -> Arc<Self> {
        Arc::new(Self {
            rounds: Mutex::new(rounds.into()),
            requests: Mutex::new(Vec::new()),
            dropped: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl LanguageModelProvider for ScriptedProvider {
    async fn stream(
        &self,
        request: ProviderRequest,
        _cancel: CancellationToken,
    ) -> Result<ProviderStream, ProviderError> {
        self.requests.lock().unwrap().push(request);
        let round = self.rounds.lock().unwrap().pop_front();
        Ok(match round {
            Some(Round::Chunks(chunks)) => stream::iter(chunks).boxed(),
            Some(Round::Slow(chunks, delay)) => stream::iter(chunks)
                .then(move |chunk| async move {
                    tokio::time::sleep(delay).await;
                    Ok::<_, ProviderError>(chunk)
                })
                .boxed(),
            Some(Round::Hang) => {
                let flag = DropFlag(Arc::clone(&self.dropped));
                stream::unfold(flag, |flag| async move {
                    std::future::pending::<()>().await;
                    Some((Ok::<_, ProviderError>(ProviderChunk::Content(String::new())), flag))
                })
                .boxed()
            }
            None => stream::empty().boxed(),
        })
    }
}

pub(crate) struct ScriptedModel {
    metadata: ModelMetadata,
    parameters: ParameterSchema,
    provider: Arc<ScriptedProvider>,
    provider_error: Option<ProviderError>,
}

impl ScriptedModel {
    pub fn new(id: &str, provider: Arc<ScriptedProvider>) -> Self {
        Self {
            metadata: ModelMetadata::new(id, id, "test"),
            parameters: ParameterSchema::new()
                .field(FieldSpec::integer("maxTokens").min(-1.0).default_value(-1)),
            provider,
            provider_error: None,
        }
    }

    pub fn failing(id: &str, error: ProviderError) -> Self {
        Self {
            provider_error: Some(error),
            ..Self::new(id, ScriptedProvider::new(Vec::new()))
        }
    }
}

impl ChatModel for ScriptedModel {
    fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }

    fn parameters(&self) -> &ParameterSchema {
        &self.parameters
    }

    fn provider(&self, _params: &Params) -> Result<Arc<dyn LanguageModelProvider>, ProviderError> {
        match &self.provider_error {
            Some(err) => Err(err.clone()),
            None => Ok(Arc::clone(&self.provider) as Arc<dyn LanguageModelProvider>),
        }
    }
}

pub(crate) fn content(text: &str) -> Result<ProviderChunk, ProviderError> {
    Ok(ProviderChunk::Content(text.to_string()))
}

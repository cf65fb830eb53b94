use crate::error::{Error, Result};
use crate::{AnthropicProvider, OllamaProvider, OpenAiProvider, Provider};
use common::config::{ProviderConfig, ProviderKind};
use common::messages::Message;
use common::stream::ChunkStream;
use faststr::FastStr;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Fixed `created` timestamp, kept for OpenAI catalog compatibility.
const MODEL_CREATED: i64 = 1_677_610_602;

#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    pub id:       FastStr,
    pub object:   &'static str,
    pub created:  i64,
    pub owned_by: FastStr,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelsResponse {
    pub object: &'static str,
    pub data:   Vec<ModelInfo>,
}

/// Routes each requested model to the adaptor that declares it, then
/// delegates the capability call unchanged.
pub struct ModelMultiplexer {
    providers: Vec<Arc<dyn Provider>>,
}

impl ModelMultiplexer {
    /// Builds one adaptor per configured provider, preserving configuration
    /// order. Credentials are bound here and never re-read.
    pub fn new(configs: &[ProviderConfig]) -> Result<Self> {
        let mut providers: Vec<Arc<dyn Provider>> = Vec::with_capacity(configs.len());
        for config in configs {
            let provider: Arc<dyn Provider> = match config.kind {
                ProviderKind::OpenAi => Arc::new(OpenAiProvider::new(config)?),
                ProviderKind::Anthropic => Arc::new(AnthropicProvider::new(config)?),
                ProviderKind::Ollama => Arc::new(OllamaProvider::new(config)?),
            };
            providers.push(provider);
        }
        Ok(Self { providers })
    }

    /// Selects the declaring provider with the lowest priority value;
    /// configuration order breaks ties.
    pub fn provider_for(&self, model: &str) -> Result<&dyn Provider> {
        self.providers
            .iter()
            .filter(|provider| {
                provider
                    .declared_models()
                    .iter()
                    .any(|declared| declared.as_str() == model)
            })
            .min_by_key(|provider| provider.priority())
            .map(|provider| {
                debug!(model = %model, provider = %provider.name(), "resolved model");
                provider.as_ref()
            })
            .ok_or_else(|| Error::NoProviderForModel(model.to_owned().into()))
    }

    /// Aggregated catalog across all providers. The first provider to
    /// declare a model id, in configuration order, owns it; later
    /// duplicates are ignored.
    pub fn list_models(&self) -> ModelsResponse {
        let mut seen = HashSet::new();
        let mut data = Vec::new();
        for provider in &self.providers {
            for model in provider.declared_models() {
                if !seen.insert(model.clone()) {
                    continue;
                }
                data.push(ModelInfo {
                    id:       model.clone(),
                    object:   "model",
                    created:  MODEL_CREATED,
                    owned_by: provider.name().to_owned().into(),
                });
            }
        }
        ModelsResponse {
            object: "list",
            data,
        }
    }

    pub async fn chat(
        &self,
        model: &str,
        messages: &[Message],
        cancel: CancellationToken,
    ) -> Result<Value> {
        self.provider_for(model)?.chat(model, messages, cancel).await
    }

    pub async fn chat_stream(
        &self,
        model: &str,
        messages: &[Message],
        cancel: CancellationToken,
    ) -> Result<ChunkStream> {
        self.provider_for(model)?
            .chat_stream(model, messages, cancel)
            .await
    }

    pub async fn completion(
        &self,
        model: &str,
        prompt: &str,
        cancel: CancellationToken,
    ) -> Result<Value> {
        self.provider_for(model)?
            .completion(model, prompt, cancel)
            .await
    }

    pub async fn completion_stream(
        &self,
        model: &str,
        prompt: &str,
        cancel: CancellationToken,
    ) -> Result<ChunkStream> {
        self.provider_for(model)?
            .completion_stream(model, prompt, cancel)
            .await
    }
}

use crate::http::{build_http_client, get_json, post_json, project_names};
use crate::{Provider, Result};
use async_trait::async_trait;
use common::config::{ProviderConfig, resolve_credential};
use common::messages::Message;
use common::stream::{ChunkStream, Framing, StreamingRequest, streaming_request};
use faststr::FastStr;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use tracing::error;

/// Adaptor for upstreams speaking the standard OpenAI API. This is the
/// reference wire shape of the gateway, so requests and streaming chunks
/// pass through untouched.
pub struct OpenAiProvider {
    name:     FastStr,
    base_url: FastStr,
    api_key:  Option<FastStr>,
    models:   Vec<FastStr>,
    priority: i32,
    client:   reqwest::Client,
}

impl OpenAiProvider {
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let api_key = match &config.api_key {
            Some(raw) => Some(resolve_credential(raw)?),
            None => None,
        };

        Ok(Self {
            name: config.name.clone(),
            base_url: config.base_url.trim_end_matches('/').to_owned().into(),
            api_key,
            models: config.models.clone(),
            priority: config.priority,
            client: build_http_client(),
        })
    }

    fn headers(&self) -> Vec<(FastStr, FastStr)> {
        match &self.api_key {
            Some(key) => vec![("Authorization".into(), format!("Bearer {key}").into())],
            None => Vec::new(),
        }
    }

    fn stream_request(&self, endpoint: &'static str, payload: Value) -> StreamingRequest {
        StreamingRequest {
            base_url: self.base_url.clone(),
            endpoint,
            payload,
            headers: self.headers(),
            framing: Framing::Sse,
            transform: None,
        }
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn declared_models(&self) -> &[FastStr] {
        &self.models
    }

    async fn remote_models(&self) -> Vec<FastStr> {
        let url = format!("{}/models", self.base_url);
        match get_json(&self.client, url, &self.headers()).await {
            Ok(body) => project_names(&body, "data", "id"),
            Err(err) => {
                error!(provider = %self.name, "failed to list models from upstream: {err}");
                Vec::new()
            }
        }
    }

    async fn chat(
        &self,
        model: &str,
        messages: &[Message],
        cancel: CancellationToken,
    ) -> Result<Value> {
        let payload = json!({ "model": model, "messages": messages });
        let url = format!("{}/chat/completions", self.base_url);
        Ok(post_json(&self.client, url, &self.headers(), &payload, cancel).await?)
    }

    async fn chat_stream(
        &self,
        model: &str,
        messages: &[Message],
        cancel: CancellationToken,
    ) -> Result<ChunkStream> {
        let payload = json!({ "model": model, "messages": messages, "stream": true });
        let request = self.stream_request("/chat/completions", payload);
        Ok(streaming_request(&self.client, request, cancel).await?)
    }

    async fn completion(
        &self,
        model: &str,
        prompt: &str,
        cancel: CancellationToken,
    ) -> Result<Value> {
        let payload = json!({ "model": model, "prompt": prompt });
        let url = format!("{}/completions", self.base_url);
        Ok(post_json(&self.client, url, &self.headers(), &payload, cancel).await?)
    }

    async fn completion_stream(
        &self,
        model: &str,
        prompt: &str,
        cancel: CancellationToken,
    ) -> Result<ChunkStream> {
        let payload = json!({ "model": model, "prompt": prompt, "stream": true });
        let request = self.stream_request("/completions", payload);
        Ok(streaming_request(&self.client, request, cancel).await?)
    }
}

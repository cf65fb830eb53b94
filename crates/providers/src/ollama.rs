use crate::http::{build_http_client, get_json, post_json, project_names};
use crate::{Provider, Result};
use async_trait::async_trait;
use common::config::ProviderConfig;
use common::messages::Message;
use common::stream::{Chunk, ChunkStream, Framing, StreamingRequest, streaming_request};
use faststr::FastStr;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use tracing::error;

/// Adaptor for a local Ollama server. No credential, `/api/*` endpoints,
/// an explicit `stream` flag on every body, and newline-delimited JSON
/// instead of SSE when streaming.
pub struct OllamaProvider {
    name:     FastStr,
    base_url: FastStr,
    models:   Vec<FastStr>,
    priority: i32,
    client:   reqwest::Client,
}

impl OllamaProvider {
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        Ok(Self {
            name:     config.name.clone(),
            base_url: config.base_url.trim_end_matches('/').to_owned().into(),
            models:   config.models.clone(),
            priority: config.priority,
            client:   build_http_client(),
        })
    }

    fn stream_request(&self, endpoint: &'static str, payload: Value) -> StreamingRequest {
        StreamingRequest {
            base_url: self.base_url.clone(),
            endpoint,
            payload,
            headers: Vec::new(),
            framing: Framing::Ndjson,
            transform: Some(transform_chunk),
        }
    }
}

/// Ollama streams its own response shape; translation into OpenAI-style
/// chunks is still pending, so frames pass through unchanged.
fn transform_chunk(chunk: Chunk) -> Option<Chunk> {
    Some(chunk)
}

#[async_trait]
impl Provider for OllamaProvider {
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
        let url = format!("{}/api/tags", self.base_url);
        match get_json(&self.client, url, &[]).await {
            Ok(body) => project_names(&body, "models", "name"),
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
        let payload = json!({ "model": model, "messages": messages, "stream": false });
        let url = format!("{}/api/chat", self.base_url);
        Ok(post_json(&self.client, url, &[], &payload, cancel).await?)
    }

    async fn chat_stream(
        &self,
        model: &str,
        messages: &[Message],
        cancel: CancellationToken,
    ) -> Result<ChunkStream> {
        let payload = json!({ "model": model, "messages": messages, "stream": true });
        let request = self.stream_request("/api/chat", payload);
        Ok(streaming_request(&self.client, request, cancel).await?)
    }

    async fn completion(
        &self,
        model: &str,
        prompt: &str,
        cancel: CancellationToken,
    ) -> Result<Value> {
        let payload = json!({ "model": model, "prompt": prompt, "stream": false });
        let url = format!("{}/api/generate", self.base_url);
        Ok(post_json(&self.client, url, &[], &payload, cancel).await?)
    }

    async fn completion_stream(
        &self,
        model: &str,
        prompt: &str,
        cancel: CancellationToken,
    ) -> Result<ChunkStream> {
        let payload = json!({ "model": model, "prompt": prompt, "stream": true });
        let request = self.stream_request("/api/generate", payload);
        Ok(streaming_request(&self.client, request, cancel).await?)
    }
}

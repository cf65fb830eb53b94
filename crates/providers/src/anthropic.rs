use crate::http::{build_http_client, get_json, post_json, project_names};
use crate::{Provider, Result};
use async_trait::async_trait;
use common::config::{ProviderConfig, resolve_credential};
use common::messages::Message;
use common::stream::{Chunk, ChunkStream, Framing, StreamingRequest, streaming_request};
use faststr::FastStr;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use tracing::error;

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// The messages API requires an explicit output ceiling.
const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Adaptor for the Anthropic messages API. Differences from the OpenAI
/// reference shape handled here: `x-api-key` + `anthropic-version` headers
/// instead of bearer auth, system messages hoisted into a top-level `system`
/// field, a mandatory `max_tokens`, and a single `/messages` endpoint that
/// also serves prompt-only completions.
pub struct AnthropicProvider {
    name:     FastStr,
    base_url: FastStr,
    api_key:  Option<FastStr>,
    models:   Vec<FastStr>,
    priority: i32,
    client:   reqwest::Client,
}

impl AnthropicProvider {
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
        let mut headers: Vec<(FastStr, FastStr)> =
            vec![("anthropic-version".into(), ANTHROPIC_VERSION.into())];
        if let Some(key) = &self.api_key {
            headers.push(("x-api-key".into(), key.clone()));
        }
        headers
    }

    /// Builds the messages payload, pulling system-role content out of the
    /// conversation into the top-level `system` field.
    fn messages_payload(model: &str, messages: &[Message], stream: bool) -> Value {
        let mut system_parts: Vec<&str> = Vec::new();
        let mut forwarded = Vec::new();
        for message in messages {
            if message.role.is_system() {
                system_parts.push(message.content.as_str());
            } else {
                forwarded.push(json!({
                    "role": message.role,
                    "content": message.content,
                }));
            }
        }

        let mut payload = json!({
            "model": model,
            "messages": forwarded,
            "max_tokens": DEFAULT_MAX_TOKENS,
        });
        if !system_parts.is_empty() {
            payload["system"] = json!(system_parts.join("\n"));
        }
        if stream {
            payload["stream"] = json!(true);
        }
        payload
    }
}

/// Anthropic streams its own event shapes; translation into OpenAI-style
/// chunks is still pending, so frames pass through unchanged.
fn transform_chunk(chunk: Chunk) -> Option<Chunk> {
    Some(chunk)
}

#[async_trait]
impl Provider for AnthropicProvider {
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
        let url = format!("{}/v1/models", self.base_url);
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
        let payload = Self::messages_payload(model, messages, false);
        let url = format!("{}/messages", self.base_url);
        Ok(post_json(&self.client, url, &self.headers(), &payload, cancel).await?)
    }

    async fn chat_stream(
        &self,
        model: &str,
        messages: &[Message],
        cancel: CancellationToken,
    ) -> Result<ChunkStream> {
        let request = StreamingRequest {
            base_url:  self.base_url.clone(),
            endpoint:  "/messages",
            payload:   Self::messages_payload(model, messages, true),
            headers:   self.headers(),
            framing:   Framing::Sse,
            transform: Some(transform_chunk),
        };
        Ok(streaming_request(&self.client, request, cancel).await?)
    }

    async fn completion(
        &self,
        model: &str,
        prompt: &str,
        cancel: CancellationToken,
    ) -> Result<Value> {
        let messages = [Message::user(prompt.to_string())];
        self.chat(model, &messages, cancel).await
    }

    async fn completion_stream(
        &self,
        model: &str,
        prompt: &str,
        cancel: CancellationToken,
    ) -> Result<ChunkStream> {
        let messages = [Message::user(prompt.to_string())];
        self.chat_stream(model, &messages, cancel).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::config::ProviderKind;
    use common::messages::MessageRole;
    use futures_util::StreamExt;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(base_url: String) -> ProviderConfig {
        ProviderConfig {
            name:     "anthropic-test".into(),
            kind:     ProviderKind::Anthropic,
            base_url: base_url.into(),
            api_key:  Some("k".into()),
            models:   vec!["claude-3-sonnet".into()],
            priority: 1,
        }
    }

    #[tokio::test]
    async fn test_chat_extracts_system_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/messages"))
            .and(header("x-api-key", "k"))
            .and(header("anthropic-version", "2023-06-01"))
            .and(body_json(serde_json::json!({
                "model": "claude-3-sonnet",
                "messages": [{ "role": "user", "content": "hi" }],
                "max_tokens": 4096,
                "system": "be terse",
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "m"})))
            .expect(1)
            .mount(&server)
            .await;

        let provider = AnthropicProvider::new(&test_config(server.uri())).unwrap();
        let messages = [
            Message::new(MessageRole::System, "be terse"),
            Message::user("hi"),
        ];
        let response = provider
            .chat("claude-3-sonnet", &messages, CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(response, serde_json::json!({"id": "m"}));
    }

    #[test]
    fn test_payload_omits_system_when_absent() {
        let payload = AnthropicProvider::messages_payload("claude-3-sonnet", &[Message::user("hi")], false);
        assert_eq!(
            payload,
            serde_json::json!({
                "model": "claude-3-sonnet",
                "messages": [{ "role": "user", "content": "hi" }],
                "max_tokens": 4096,
            })
        );
    }

    #[test]
    fn test_payload_joins_multiple_system_messages() {
        let messages = [
            Message::new(MessageRole::System, "be terse"),
            Message::user("hi"),
            Message::new(MessageRole::System, "answer in french"),
        ];
        let payload = AnthropicProvider::messages_payload("claude-3-sonnet", &messages, false);
        assert_eq!(payload["system"], "be terse\nanswer in french");
        assert_eq!(payload["messages"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_payload_adds_stream_flag() {
        let payload = AnthropicProvider::messages_payload("claude-3-sonnet", &[Message::user("hi")], true);
        assert_eq!(payload["stream"], true);
    }

    #[tokio::test]
    async fn test_completion_converts_to_single_user_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/messages"))
            .and(body_json(serde_json::json!({
                "model": "claude-3-sonnet",
                "messages": [{ "role": "user", "content": "say hi" }],
                "max_tokens": 4096,
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "m"})))
            .expect(1)
            .mount(&server)
            .await;

        let provider = AnthropicProvider::new(&test_config(server.uri())).unwrap();
        provider
            .completion("claude-3-sonnet", "say hi", CancellationToken::new())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_chat_stream_uses_sse_framing() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                "data: {\"type\":\"content_block_delta\"}\n\ndata: [DONE]\n\n".to_owned(),
                "text/event-stream",
            ))
            .mount(&server)
            .await;

        let provider = AnthropicProvider::new(&test_config(server.uri())).unwrap();
        let chunks: Vec<_> = provider
            .chat_stream("claude-3-sonnet", &[Message::user("hi")], CancellationToken::new())
            .await
            .unwrap()
            .collect()
            .await;
        assert_eq!(chunks, [serde_json::json!({"type": "content_block_delta"})]);
    }

    #[tokio::test]
    async fn test_remote_models_uses_v1_models_with_auth_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/models"))
            .and(header("x-api-key", "k"))
            .and(header("anthropic-version", "2023-06-01"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{ "id": "claude-2" }, { "id": "claude-instant-1" }],
            })))
            .mount(&server)
            .await;

        let provider = AnthropicProvider::new(&test_config(server.uri())).unwrap();
        assert_eq!(
            provider.remote_models().await,
            ["claude-2", "claude-instant-1"]
        );
    }
}

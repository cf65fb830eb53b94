mod anthropic;
mod error;
mod http;
mod multiplexer;
mod ollama;
mod openai;

pub use anthropic::AnthropicProvider;
pub use error::{Error, Result};
pub use multiplexer::{ModelInfo, ModelMultiplexer, ModelsResponse};
pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;

use async_trait::async_trait;
use common::messages::Message;
use common::stream::ChunkStream;
use faststr::FastStr;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

/// One upstream behind the gateway.
///
/// Adaptors translate the common request shape to the upstream's wire format
/// and normalize the responses back. Every request-shaped operation carries
/// the caller's cancellation handle.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Provider name from the configuration.
    fn name(&self) -> &str;

    /// Routing priority; lower values win.
    fn priority(&self) -> i32;

    /// Models this provider is configured to serve. Routing decisions are
    /// made against this list, never against the upstream catalog.
    fn declared_models(&self) -> &[FastStr];

    /// Advisory model listing fetched from the upstream itself. Failures
    /// degrade to an empty list.
    async fn remote_models(&self) -> Vec<FastStr>;

    async fn chat(
        &self,
        model: &str,
        messages: &[Message],
        cancel: CancellationToken,
    ) -> Result<Value>;

    async fn chat_stream(
        &self,
        model: &str,
        messages: &[Message],
        cancel: CancellationToken,
    ) -> Result<ChunkStream>;

    async fn completion(
        &self,
        model: &str,
        prompt: &str,
        cancel: CancellationToken,
    ) -> Result<Value>;

    async fn completion_stream(
        &self,
        model: &str,
        prompt: &str,
        cancel: CancellationToken,
    ) -> Result<ChunkStream>;
}

// Compile-time check: Provider must be object-safe
const _: () = {
    fn _assert_object_safe(_: &dyn Provider) {}
};

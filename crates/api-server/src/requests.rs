use common::messages::Message;
use faststr::FastStr;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionRequest {
    pub model:    FastStr,
    pub messages: Vec<Message>,
    #[serde(default)]
    pub stream:   bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompletionRequest {
    pub model:  FastStr,
    pub prompt: FastStr,
    #[serde(default)]
    pub stream: bool,
}

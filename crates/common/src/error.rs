use faststr::FastStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("upstream request failed with status {status}: {body}")]
    Upstream { status: u16, body: FastStr },

    #[error("failed to decode upstream response: {0}")]
    UpstreamDecode(#[from] serde_json::Error),

    #[error("Reqwest error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("request cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, Error>;

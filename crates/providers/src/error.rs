use faststr::FastStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("no provider found for model: {0}")]
    NoProviderForModel(FastStr),

    #[error(transparent)]
    Config(#[from] common::config::ConfigError),

    #[error(transparent)]
    Upstream(#[from] common::error::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

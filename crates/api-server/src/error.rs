use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Io Error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Provider(#[from] providers::Error),

    #[error("server is already running")]
    AlreadyRunning,

    #[error("socket file already exists: {}", .0.display())]
    SocketExists(PathBuf),

    #[error("timeout waiting for server to be ready")]
    ReadyTimeout,
}

pub type Result<T> = std::result::Result<T, Error>;

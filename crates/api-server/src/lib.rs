pub use common::logging_stdout;

pub mod error;
pub mod handlers;
pub mod requests;
pub mod server;

pub use error::{Error, Result};
pub use server::{Server, ServerTransport};

use providers::ModelMultiplexer;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Shared handler state: the routing core plus the server-wide shutdown
/// token that request-scoped cancellation handles derive from.
#[derive(Clone)]
pub struct AppState {
    pub mux:      Arc<ModelMultiplexer>,
    pub shutdown: CancellationToken,
}

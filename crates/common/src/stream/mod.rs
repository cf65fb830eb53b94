use crate::error::{Error, Result};
use bytes::BytesMut;
use faststr::FastStr;
use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// One unit of a streaming response payload. Chunks are passed through as
/// opaque JSON; provider-specific rewrites happen via [`ChunkTransform`].
pub type Chunk = Value;

/// Per-provider chunk rewrite hook. Returning `None` discards the frame.
pub type ChunkTransform = fn(Chunk) -> Option<Chunk>;

pub type ChunkStream = BoxStream<'static, Chunk>;

/// How the upstream frames its streaming body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    /// `data: <json>` frames terminated by a `[DONE]` sentinel.
    Sse,
    /// One complete JSON value per line.
    Ndjson,
}

pub struct StreamingRequest {
    pub base_url:  FastStr,
    pub endpoint:  &'static str,
    pub payload:   Value,
    pub headers:   Vec<(FastStr, FastStr)>,
    pub framing:   Framing,
    pub transform: Option<ChunkTransform>,
}

/// How much of a failed response body is kept for the error value.
pub const ERROR_BODY_LIMIT: usize = 16 * 1024;

/// Issues a streaming POST and exposes the body as a lazy chunk sequence.
///
/// Frames arrive in upstream order with malformed ones dropped; the sequence
/// ends on upstream EOF, the `[DONE]` sentinel, or cancellation, and the body
/// handle is released with it.
pub async fn streaming_request(
    client: &reqwest::Client,
    request: StreamingRequest,
    cancel: CancellationToken,
) -> Result<ChunkStream> {
    let url = format!("{}{}", request.base_url, request.endpoint);
    let mut builder = client.post(url).header("Content-Type", "application/json");
    for (key, value) in &request.headers {
        builder = builder.header(key.as_str(), value.as_str());
    }
    let builder = builder.json(&request.payload);

    let response = tokio::select! {
        response = builder.send() => response?,
        _ = cancel.cancelled() => return Err(Error::Cancelled),
    };

    let status = response.status();
    if !status.is_success() {
        let body = read_body_prefix(response, ERROR_BODY_LIMIT).await;
        return Err(Error::Upstream {
            status: status.as_u16(),
            body,
        });
    }

    let framing = request.framing;
    let transform = request.transform;
    let mut body = response.bytes_stream();

    let chunks = async_stream::stream! {
        let mut buf = BytesMut::new();
        loop {
            let bytes = tokio::select! {
                bytes = body.next() => bytes,
                _ = cancel.cancelled() => break,
            };
            let Some(bytes) = bytes else { break };
            let Ok(bytes) = bytes else {
                // An upstream abort mid-stream just ends the sequence.
                break;
            };
            buf.extend_from_slice(&bytes);
            while let Some(pos) = buf.iter().position(|b| *b == b'\n') {
                let line = buf.split_to(pos + 1);
                match decode_line(&line, framing, transform) {
                    LineOutcome::Chunk(chunk) => yield chunk,
                    LineOutcome::Skip => {}
                    LineOutcome::End => return,
                }
            }
        }
        // A final line without a trailing newline still counts.
        if !buf.is_empty() {
            if let LineOutcome::Chunk(chunk) = decode_line(&buf, framing, transform) {
                yield chunk;
            }
        }
    };

    Ok(chunks.boxed())
}

enum LineOutcome {
    Chunk(Chunk),
    Skip,
    End,
}

fn decode_line(raw: &[u8], framing: Framing, transform: Option<ChunkTransform>) -> LineOutcome {
    let line = String::from_utf8_lossy(raw);
    let line = line.trim();
    if line.is_empty() {
        return LineOutcome::Skip;
    }

    let data = match framing {
        Framing::Sse => match line.strip_prefix("data: ") {
            Some(data) => {
                let data = data.trim();
                if data == "[DONE]" {
                    return LineOutcome::End;
                }
                data
            }
            // Comment and event lines carry nothing we forward.
            None => return LineOutcome::Skip,
        },
        Framing::Ndjson => line,
    };

    let chunk: Chunk = match serde_json::from_str(data) {
        Ok(chunk) => chunk,
        Err(err) => {
            debug!("dropping malformed stream frame: {err}");
            return LineOutcome::Skip;
        }
    };

    match transform {
        Some(transform) => match transform(chunk) {
            Some(chunk) => LineOutcome::Chunk(chunk),
            None => LineOutcome::Skip,
        },
        None => LineOutcome::Chunk(chunk),
    }
}

/// Reads at most `limit` bytes of a response body, for error reporting.
pub async fn read_body_prefix(response: reqwest::Response, limit: usize) -> FastStr {
    let mut body = response.bytes_stream();
    let mut collected = BytesMut::new();
    while let Some(Ok(bytes)) = body.next().await {
        collected.extend_from_slice(&bytes);
        if collected.len() >= limit {
            collected.truncate(limit);
            break;
        }
    }
    String::from_utf8_lossy(&collected).into_owned().into()
}

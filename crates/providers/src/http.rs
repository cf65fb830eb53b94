use common::error::{Error, Result};
use common::stream::{ERROR_BODY_LIMIT, read_body_prefix};
use faststr::FastStr;
use serde_json::Value;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

pub(crate) fn build_http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

/// Non-streaming JSON POST shared by every adaptor.
pub(crate) async fn post_json(
    client: &reqwest::Client,
    url: String,
    headers: &[(FastStr, FastStr)],
    payload: &Value,
    cancel: CancellationToken,
) -> Result<Value> {
    let mut builder = client.post(url).header("Content-Type", "application/json");
    for (key, value) in headers {
        builder = builder.header(key.as_str(), value.as_str());
    }
    let builder = builder.json(payload);

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

    let body = tokio::select! {
        body = response.bytes() => body?,
        _ = cancel.cancelled() => return Err(Error::Cancelled),
    };
    Ok(serde_json::from_slice(&body)?)
}

/// JSON GET used by the advisory model listings.
pub(crate) async fn get_json(
    client: &reqwest::Client,
    url: String,
    headers: &[(FastStr, FastStr)],
) -> Result<Value> {
    let mut builder = client.get(url);
    for (key, value) in headers {
        builder = builder.header(key.as_str(), value.as_str());
    }

    let response = builder.send().await?;
    let status = response.status();
    if !status.is_success() {
        let body = read_body_prefix(response, ERROR_BODY_LIMIT).await;
        return Err(Error::Upstream {
            status: status.as_u16(),
            body,
        });
    }

    let body = response.bytes().await?;
    Ok(serde_json::from_slice(&body)?)
}

/// Projects `{list_key: [{name_key: "..."}]}` into a list of names, the shape
/// every upstream catalog endpoint shares.
pub(crate) fn project_names(body: &Value, list_key: &str, name_key: &str) -> Vec<FastStr> {
    body.get(list_key)
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .filter_map(|entry| entry.get(name_key).and_then(Value::as_str))
                .map(|name| name.to_owned().into())
                .collect()
        })
        .unwrap_or_default()
}

pub mod chat;
pub mod nutrients;
pub mod usda;

use serde_json::Value;
use thiserror::Error;

/// Failure shapes for calls to external APIs. The three-way split between
/// timeout, upstream-reported error and malformed success body is the
/// contract the proxy handlers rely on; collapsing them would make "upstream
/// says no" indistinguishable from "upstream sent garbage".
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("{service} request timed out")]
    Timeout { service: &'static str },
    #[error("{service} returned HTTP {status}")]
    Status {
        service: &'static str,
        status: u16,
        /// Body parsed as JSON when possible, for passthrough to the client.
        body: Option<Value>,
        raw: String,
    },
    #[error("{service} returned a non-JSON response")]
    BadPayload { service: &'static str, snippet: String },
    #[error("{service} request failed: {source}")]
    Transport {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },
}

/// Send a request and normalize the outcome. The body is always read as
/// text first so a non-JSON payload on a 2xx status surfaces as
/// `BadPayload` instead of being forwarded.
pub(crate) async fn read_json(
    service: &'static str,
    req: reqwest::RequestBuilder,
) -> Result<Value, UpstreamError> {
    let resp = req.send().await.map_err(|e| wrap(service, e))?;
    let status = resp.status();
    let text = resp.text().await.map_err(|e| wrap(service, e))?;
    let parsed: Option<Value> = serde_json::from_str(&text).ok();

    if !status.is_success() {
        return Err(UpstreamError::Status {
            service,
            status: status.as_u16(),
            body: parsed,
            raw: snippet(&text),
        });
    }

    parsed.ok_or_else(|| UpstreamError::BadPayload {
        service,
        snippet: snippet(&text),
    })
}

fn wrap(service: &'static str, source: reqwest::Error) -> UpstreamError {
    if source.is_timeout() {
        UpstreamError::Timeout { service }
    } else {
        UpstreamError::Transport { service, source }
    }
}

/// First 500 chars of a body, for error details.
pub(crate) fn snippet(text: &str) -> String {
    text.chars().take(500).collect()
}

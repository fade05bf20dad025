use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};
use tracing::{error, instrument};

use crate::state::AppState;
use crate::upstream::UpstreamError;

use super::dto::{ChatRequest, SearchRequest};

const MIN_QUERY_LEN: usize = 2;
const DEFAULT_PAGE_SIZE: u32 = 12;
const MAX_PAGE_SIZE: u32 = 200;

#[instrument(skip(state, body))]
pub async fn usda_search(
    State(state): State<AppState>,
    Json(body): Json<SearchRequest>,
) -> Response {
    let query = body.query.trim();
    if query.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Missing query" })),
        )
            .into_response();
    }
    // Too short to search meaningfully; answer without going upstream.
    if query.chars().count() < MIN_QUERY_LEN {
        return Json(json!({ "foods": [] })).into_response();
    }

    let Some(usda) = state.usda.as_ref() else {
        return missing_key_response();
    };

    let page_size = body
        .page_size
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);

    match usda.search(query, page_size, body.data_type.as_deref()).await {
        Ok(payload) => Json(payload).into_response(),
        Err(err) => upstream_error_response("USDA search", err),
    }
}

#[instrument(skip(state))]
pub async fn usda_food(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let id = id.trim();
    if id.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Missing food id" })),
        )
            .into_response();
    }

    let Some(usda) = state.usda.as_ref() else {
        return missing_key_response();
    };

    match usda.food(id).await {
        Ok(payload) => Json(payload).into_response(),
        Err(err) => upstream_error_response("USDA food lookup", err),
    }
}

/// Every chat response shape carries a `text` key so the client never has
/// an unparseable payload to deal with.
#[instrument(skip(state, body))]
pub async fn chat(State(state): State<AppState>, Json(body): Json<ChatRequest>) -> Response {
    let message = body.message.trim();
    if message.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "text": "", "error": "Missing message" })),
        )
            .into_response();
    }

    let Some(chat) = state.chat.as_ref() else {
        return (StatusCode::NOT_IMPLEMENTED, Json(json!({ "text": "" }))).into_response();
    };

    match chat.complete(message).await {
        Ok(text) => Json(json!({ "text": text })).into_response(),
        Err(err) => {
            error!(error = %err, "chat relay failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "text": "", "error": "Chat failed" })),
            )
                .into_response()
        }
    }
}

fn missing_key_response() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "USDA_API_KEY is not set on the server." })),
    )
        .into_response()
}

/// Map the three-way upstream split onto the response taxonomy: timeout →
/// 504, upstream-reported error → its own status passed through, malformed
/// success body → 502, transport trouble → 500.
fn upstream_error_response(what: &str, err: UpstreamError) -> Response {
    match err {
        UpstreamError::Timeout { .. } => (
            StatusCode::GATEWAY_TIMEOUT,
            Json(json!({ "error": format!("{what} timed out.") })),
        )
            .into_response(),
        UpstreamError::Status { status, body, raw, .. } => {
            let status = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
            let details = body.unwrap_or_else(|| {
                if raw.is_empty() {
                    Value::String("No response body".into())
                } else {
                    Value::String(raw)
                }
            });
            (
                status,
                Json(json!({
                    "error": "USDA API returned error",
                    "status": status.as_u16(),
                    "details": details,
                })),
            )
                .into_response()
        }
        UpstreamError::BadPayload { snippet, .. } => {
            let details = if snippet.is_empty() {
                "Empty response".to_string()
            } else {
                snippet
            };
            (
                StatusCode::BAD_GATEWAY,
                Json(json!({
                    "error": "USDA API returned non-JSON response",
                    "details": details,
                })),
            )
                .into_response()
        }
        UpstreamError::Transport { .. } => {
            error!(error = %err, "upstream call failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": format!("{what} failed."), "details": err.to_string() })),
            )
                .into_response()
        }
    }
}

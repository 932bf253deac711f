//! services/api/src/web/chat.rs
//!
//! The chat relay: composes the prompt from the client-supplied conversation
//! and document context, opens a streamed completion, and pipes the model's
//! text back as a plain-text body.

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use futures::StreamExt;
use pdf_chat_core::{
    ports::{PortError, PortResult},
    relay::{compose_prompt, ChatRequest, CompletionRequest},
};
use std::sync::Arc;
use tokio::time::{timeout_at, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::web::state::AppState;

/// Tracing target for everything the relay logs.
pub const RELAY_LOG_TARGET: &str = "chat_relay";

pub const RELAY_ERROR_BODY: &str = "Internal Server Error";

/// POST /chat - Relay one chat turn to the model and stream the reply
#[utoipa::path(
    post,
    path = "/chat",
    request_body(
        content_type = "application/json",
        description = "`{ messages: [{role, content}], documentContext?: string }`"
    ),
    responses(
        (status = 200, description = "Assistant text, streamed as it is produced", body = String, content_type = "text/plain"),
        (status = 500, description = "Malformed request or model failure", body = String, content_type = "text/plain")
    )
)]
pub async fn chat_handler(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    match open_relay(&state, &body).await {
        Ok(stream_body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            stream_body,
        )
            .into_response(),
        Err(e) => {
            error!(target: RELAY_LOG_TARGET, "Chat error: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
                RELAY_ERROR_BODY,
            )
                .into_response()
        }
    }
}

/// Opens the upstream completion and waits for its first fragment, so that
/// every failure up to that point surfaces as a clean error response.
async fn open_relay(state: &AppState, body: &[u8]) -> PortResult<Body> {
    let request = ChatRequest::from_json(body)?;
    let deadline = Instant::now() + state.config.chat_timeout;

    let completion = CompletionRequest {
        model: state.config.chat_model.clone(),
        messages: compose_prompt(request),
        max_output_tokens: state.config.chat_max_output_tokens,
    };
    info!(
        target: RELAY_LOG_TARGET,
        "Relaying turn with {} messages to {}",
        completion.messages.len(),
        completion.model
    );

    // Cancelled when the response body is dropped, e.g. on client disconnect.
    let cancel = CancellationToken::new();
    let cancel_on_drop = cancel.clone().drop_guard();

    let mut upstream = timeout_at(
        deadline,
        state.chat_adapter.stream_completion(completion, cancel),
    )
    .await
    .map_err(|_| PortError::Timeout)??;

    let first = timeout_at(deadline, upstream.next())
        .await
        .map_err(|_| PortError::Timeout)?
        .transpose()?;

    let fragments = async_stream::stream! {
        let _cancel_on_drop = cancel_on_drop;

        if let Some(text) = first {
            yield Ok::<Bytes, PortError>(Bytes::from(text));
        }

        loop {
            match timeout_at(deadline, upstream.next()).await {
                Ok(Some(Ok(text))) => yield Ok(Bytes::from(text)),
                Ok(Some(Err(e))) => {
                    error!(target: RELAY_LOG_TARGET, "Chat stream failed mid-response: {}", e);
                    yield Err(e);
                    break;
                }
                Ok(None) => break,
                Err(_) => {
                    warn!(target: RELAY_LOG_TARGET, "Chat turn exceeded its time budget mid-response.");
                    yield Err(PortError::Timeout);
                    break;
                }
            }
        }
    };

    Ok(Body::from_stream(fragments))
}

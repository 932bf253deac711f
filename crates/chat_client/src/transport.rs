//! crates/chat_client/src/transport.rs
//!
//! The client's view of the relay: one call per turn that hands back the
//! response body as a stream of raw byte chunks.

use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use pdf_chat_core::relay::ChatRequest;
use reqwest::Client;
use std::pin::Pin;

use crate::error::ClientError;

/// Raw body chunks in arrival order. Ends cleanly only when the relay
/// finished the response.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<Bytes, ClientError>> + Send>>;

#[async_trait]
pub trait RelayTransport: Send + Sync {
    /// Issues one relay request. A non-success status is an error.
    async fn open_turn(&self, request: &ChatRequest) -> Result<ChunkStream, ClientError>;
}

/// Talks to the relay over HTTP.
#[derive(Clone)]
pub struct HttpRelayTransport {
    client: Client,
    chat_url: String,
}

impl HttpRelayTransport {
    /// `base_url` is the service root, e.g. `http://localhost:3000`.
    pub fn new(client: Client, base_url: &str) -> Result<Self, ClientError> {
        let base = base_url.trim_end_matches('/');
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(ClientError::InvalidUrl(base_url.to_string()));
        }
        Ok(Self {
            client,
            chat_url: format!("{}/chat", base),
        })
    }

    pub fn chat_url(&self) -> &str {
        &self.chat_url
    }
}

#[async_trait]
impl RelayTransport for HttpRelayTransport {
    async fn open_turn(&self, request: &ChatRequest) -> Result<ChunkStream, ClientError> {
        let response = self.client.post(&self.chat_url).json(request).send().await?;

        if !response.status().is_success() {
            return Err(ClientError::Status(response.status().as_u16()));
        }

        let chunks = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| ClientError::Stream(e.to_string())));
        Ok(Box::pin(chunks))
    }
}

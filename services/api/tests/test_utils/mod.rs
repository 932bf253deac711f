//! Test utilities for integration tests
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use api_lib::adapters::{InMemoryDb, LocalBlobStore};
use api_lib::config::Config;
use api_lib::web::{app, state::AppState};
use async_trait::async_trait;
use axum::{body::Body, Router};
use futures::stream::{self, StreamExt};
use pdf_chat_core::ports::{ChatCompletionService, PortError, PortResult, TextStream};
use pdf_chat_core::relay::CompletionRequest;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use tracing::Level;

/// How the fake model behaves for one test.
#[derive(Clone)]
pub enum Script {
    /// Yields these fragments, then ends.
    Chunks(Vec<&'static str>),
    /// Fails before producing a stream.
    FailOpen,
    /// Yields these fragments, then fails.
    FailAfter(Vec<&'static str>),
    /// Yields these fragments, then never finishes.
    HangAfter(Vec<&'static str>),
}

/// A `ChatCompletionService` that plays back a script and records what it was asked.
pub struct FakeChat {
    script: Script,
    last_request: Mutex<Option<CompletionRequest>>,
    last_token: Mutex<Option<CancellationToken>>,
}

impl FakeChat {
    pub fn new(script: Script) -> Arc<Self> {
        Arc::new(Self {
            script,
            last_request: Mutex::new(None),
            last_token: Mutex::new(None),
        })
    }

    pub fn last_request(&self) -> Option<CompletionRequest> {
        self.last_request.lock().unwrap().clone()
    }

    pub fn last_token(&self) -> Option<CancellationToken> {
        self.last_token.lock().unwrap().clone()
    }
}

fn fragments(chunks: &[&'static str]) -> impl futures::Stream<Item = PortResult<String>> {
    stream::iter(
        chunks
            .iter()
            .map(|c| Ok(c.to_string()))
            .collect::<Vec<PortResult<String>>>(),
    )
}

#[async_trait]
impl ChatCompletionService for FakeChat {
    async fn stream_completion(
        &self,
        request: CompletionRequest,
        cancel: CancellationToken,
    ) -> PortResult<TextStream> {
        *self.last_request.lock().unwrap() = Some(request);
        *self.last_token.lock().unwrap() = Some(cancel);

        match &self.script {
            Script::Chunks(chunks) => Ok(Box::pin(fragments(chunks))),
            Script::FailOpen => Err(PortError::Upstream("provider unavailable".to_string())),
            Script::FailAfter(chunks) => Ok(Box::pin(fragments(chunks).chain(stream::iter(
                vec![Err(PortError::Upstream("stream reset".to_string()))],
            )))),
            Script::HangAfter(chunks) => Ok(Box::pin(fragments(chunks).chain(stream::pending()))),
        }
    }
}

pub fn test_config(blob_root: &TempDir) -> Config {
    Config {
        bind_address: SocketAddr::from(([127, 0, 0, 1], 0)),
        database_url: None,
        log_level: Level::INFO,
        openai_api_key: "test-api-key".to_string(),
        openai_api_base: None,
        chat_model: "gpt-5-mini".to_string(),
        chat_max_output_tokens: 2000,
        chat_timeout: Duration::from_secs(30),
        chat_require_auth: false,
        blob_root: blob_root.path().to_path_buf(),
        public_base_url: "http://localhost:3000".to_string(),
        cors_origin: "http://localhost:3000".to_string(),
    }
}

/// A running router plus the pieces tests want to poke at afterwards.
pub struct TestApp {
    pub router: Router,
    pub chat: Arc<FakeChat>,
    pub blob_dir: TempDir,
}

pub fn test_app(script: Script) -> TestApp {
    test_app_with(script, |_| {})
}

/// Creates a test application router with an in-memory store, a temporary
/// blob directory and a scripted model.
pub fn test_app_with(script: Script, tweak: impl FnOnce(&mut Config)) -> TestApp {
    let blob_dir = tempfile::tempdir().expect("Failed to create blob directory");
    let mut config = test_config(&blob_dir);
    tweak(&mut config);

    let chat = FakeChat::new(script);
    let app_state = AppState {
        db: Arc::new(InMemoryDb::new()),
        config: Arc::new(config.clone()),
        chat_adapter: chat.clone(),
        blob_store: Arc::new(LocalBlobStore::new(
            config.blob_root.clone(),
            config.public_base_url.clone(),
        )),
    };

    TestApp {
        router: app(Arc::new(app_state)),
        chat,
        blob_dir,
    }
}

pub async fn body_to_string(body: Body) -> String {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Failed to read body");
    String::from_utf8(bytes.to_vec()).expect("Body was not UTF-8")
}

pub const BOUNDARY: &str = "pdfchatboundary";

/// Builds a single-part multipart body carrying one file under `file`.
pub fn multipart_body(file_name: &str, content_type: &str, data: &[u8]) -> Vec<u8> {
    let mut body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

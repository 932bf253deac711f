//! crates/chat_client/src/client.rs
//!
//! The chat session a user drives: holds the visible transcript, sends one
//! turn at a time through the relay and renders the reply as it streams in.

use futures::StreamExt;
use pdf_chat_core::domain::Message;
use pdf_chat_core::relay::ChatRequest;
use pdf_chat_core::transcript::{StreamAccumulator, Transcript};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info};

use crate::decode::Utf8ChunkDecoder;
use crate::error::ClientError;
use crate::transport::RelayTransport;

/// Shown in place of a reply whenever a turn fails.
pub const FALLBACK_REPLY: &str = "Sorry, I encountered an error. Please try again.";

/// Notified every time the transcript changes so the view can re-render and
/// scroll to the newest entry.
pub trait TranscriptObserver: Send + Sync {
    fn transcript_changed(&self, transcript: &Transcript);
}

/// Observer that ignores every change.
pub struct NoopObserver;

impl TranscriptObserver for NoopObserver {
    fn transcript_changed(&self, _transcript: &Transcript) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoredReason {
    EmptyInput,
    TurnInFlight,
}

/// How a call to [`ChatClient::send`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Nothing was sent and the transcript is unchanged.
    Ignored(IgnoredReason),
    /// The reply streamed to completion.
    Completed,
    /// The turn failed and the fallback reply was appended.
    Failed,
}

/// Where the document the conversation is about comes from.
#[derive(Debug, Clone, Default)]
pub struct DocumentSource {
    pub url: Option<String>,
    pub context: Option<String>,
}

impl DocumentSource {
    /// Explicit context wins; otherwise the URL alone describes the document.
    pub fn context_string(&self) -> Option<String> {
        match (&self.context, &self.url) {
            (Some(context), _) if !context.is_empty() => Some(context.clone()),
            (_, Some(url)) if !url.is_empty() => Some(format!("PDF URL: {}", url)),
            _ => None,
        }
    }

    pub fn is_present(&self) -> bool {
        self.context_string().is_some()
    }
}

struct SessionState {
    transcript: Transcript,
    input: String,
}

/// Clears the in-flight flag when the turn ends, including when the `send`
/// future is dropped before it finishes.
struct TurnGuard<'a>(&'a AtomicBool);

impl Drop for TurnGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct ChatClient {
    transport: Arc<dyn RelayTransport>,
    observer: Arc<dyn TranscriptObserver>,
    document_context: Option<String>,
    in_flight: AtomicBool,
    state: Mutex<SessionState>,
}

impl ChatClient {
    pub fn new(
        transport: Arc<dyn RelayTransport>,
        document: DocumentSource,
        observer: Arc<dyn TranscriptObserver>,
    ) -> Self {
        let transcript = Transcript::with_greeting(document.is_present());
        Self {
            transport,
            observer,
            document_context: document.context_string(),
            in_flight: AtomicBool::new(false),
            state: Mutex::new(SessionState {
                transcript,
                input: String::new(),
            }),
        }
    }

    pub fn document_context(&self) -> Option<&str> {
        self.document_context.as_deref()
    }

    pub async fn set_input(&self, text: impl Into<String>) {
        self.state.lock().await.input = text.into();
    }

    pub async fn input(&self) -> String {
        self.state.lock().await.input.clone()
    }

    pub async fn transcript(&self) -> Transcript {
        self.state.lock().await.transcript.clone()
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Sends whatever is in the input field.
    pub async fn send_input(&self) -> SendOutcome {
        let text = self.input().await;
        self.send(&text).await
    }

    /// Runs one turn. A second call while a turn is streaming is a no-op.
    ///
    /// `text` is sent exactly as given; surrounding whitespace only matters
    /// for deciding whether there is anything to send.
    pub async fn send(&self, text: &str) -> SendOutcome {
        if text.trim().is_empty() {
            return SendOutcome::Ignored(IgnoredReason::EmptyInput);
        }

        let (request, turn) = {
            let mut state = self.state.lock().await;
            if self.in_flight.swap(true, Ordering::AcqRel) {
                return SendOutcome::Ignored(IgnoredReason::TurnInFlight);
            }
            let turn = TurnGuard(&self.in_flight);

            state.transcript.push(Message::user(text));
            state.input.clear();
            self.observer.transcript_changed(&state.transcript);

            let request = ChatRequest {
                messages: state.transcript.to_wire(),
                document_context: self.document_context.clone(),
            };
            (request, turn)
        };

        let result = self.stream_reply(&request).await;

        let mut state = self.state.lock().await;
        let outcome = match result {
            Ok(()) => SendOutcome::Completed,
            Err(e) => {
                error!("Chat turn failed: {}", e);
                state.transcript.push(Message::assistant(FALLBACK_REPLY));
                self.observer.transcript_changed(&state.transcript);
                SendOutcome::Failed
            }
        };
        drop(turn);
        outcome
    }

    async fn stream_reply(&self, request: &ChatRequest) -> Result<(), ClientError> {
        let mut chunks = self.transport.open_turn(request).await?;
        let mut decoder = Utf8ChunkDecoder::new();
        let mut reply = StreamAccumulator::new();

        while let Some(chunk) = chunks.next().await {
            let text = decoder.decode(&chunk?);
            self.apply(&mut reply, &text).await;
        }

        let tail = decoder.finish();
        self.apply(&mut reply, &tail).await;

        info!("Reply complete ({} chars)", reply.text().len());
        Ok(())
    }

    async fn apply(&self, reply: &mut StreamAccumulator, text: &str) {
        if text.is_empty() {
            return;
        }
        let mut state = self.state.lock().await;
        reply.apply(text, &mut state.transcript);
        self.observer.transcript_changed(&state.transcript);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::ChunkStream;
    use async_trait::async_trait;
    use bytes::Bytes;
    use pdf_chat_core::domain::Role;
    use std::collections::VecDeque;
    use std::sync::Mutex as StdMutex;
    use tokio::sync::oneshot;

    enum Reply {
        Chunks(Vec<&'static [u8]>),
        Status(u16),
        BreakAfter(Vec<&'static [u8]>),
        Held(Vec<&'static [u8]>, oneshot::Receiver<()>),
    }

    struct FakeTransport {
        replies: StdMutex<VecDeque<Reply>>,
        requests: StdMutex<Vec<ChatRequest>>,
    }

    impl FakeTransport {
        fn new(reply: Reply) -> Arc<Self> {
            Self::with_replies(vec![reply])
        }

        fn with_replies(replies: Vec<Reply>) -> Arc<Self> {
            Arc::new(Self {
                replies: StdMutex::new(replies.into()),
                requests: StdMutex::new(Vec::new()),
            })
        }

        fn request_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    fn ok_chunks(chunks: Vec<&'static [u8]>) -> Vec<Result<Bytes, ClientError>> {
        chunks.into_iter().map(|c| Ok(Bytes::from_static(c))).collect()
    }

    #[async_trait]
    impl RelayTransport for FakeTransport {
        async fn open_turn(&self, request: &ChatRequest) -> Result<ChunkStream, ClientError> {
            self.requests.lock().unwrap().push(request.clone());
            let reply = self.replies.lock().unwrap().pop_front();
            match reply {
                Some(Reply::Chunks(chunks)) => Ok(Box::pin(futures::stream::iter(ok_chunks(chunks)))),
                Some(Reply::Status(code)) => Err(ClientError::Status(code)),
                Some(Reply::BreakAfter(chunks)) => {
                    let mut items = ok_chunks(chunks);
                    items.push(Err(ClientError::Stream("connection reset".to_string())));
                    Ok(Box::pin(futures::stream::iter(items)))
                }
                Some(Reply::Held(chunks, release)) => {
                    let head = futures::stream::iter(ok_chunks(chunks));
                    let tail = futures::stream::once(async move {
                        let _ = release.await;
                        Ok(Bytes::from_static(b"!"))
                    });
                    Ok(Box::pin(head.chain(tail)))
                }
                None => Err(ClientError::Status(503)),
            }
        }
    }

    #[derive(Default)]
    struct CountingObserver {
        changes: StdMutex<usize>,
    }

    impl TranscriptObserver for CountingObserver {
        fn transcript_changed(&self, _transcript: &Transcript) {
            *self.changes.lock().unwrap() += 1;
        }
    }

    fn document() -> DocumentSource {
        DocumentSource {
            url: Some("http://localhost:3000/files/pdfs/1_a.pdf".to_string()),
            context: None,
        }
    }

    fn client(transport: Arc<FakeTransport>) -> ChatClient {
        ChatClient::new(transport, document(), Arc::new(NoopObserver))
    }

    #[tokio::test]
    async fn concatenates_streamed_chunks_into_one_reply() {
        let transport = FakeTransport::new(Reply::Chunks(vec![b"Hel", b"lo", b" world"]));
        let client = client(transport.clone());

        assert_eq!(client.send("hi").await, SendOutcome::Completed);

        let transcript = client.transcript().await;
        let wire = transcript.to_wire();
        assert_eq!(wire.len(), 3);
        assert_eq!(wire[1], Message::user("hi"));
        assert_eq!(wire[2], Message::assistant("Hello world"));
        assert!(!client.is_in_flight());
    }

    #[tokio::test]
    async fn multibyte_characters_survive_chunk_splits() {
        let text = "café ✓".as_bytes();
        let (a, b) = text.split_at(4);
        let a: &'static [u8] = Box::leak(a.to_vec().into_boxed_slice());
        let b: &'static [u8] = Box::leak(b.to_vec().into_boxed_slice());
        let client = client(FakeTransport::new(Reply::Chunks(vec![a, b])));

        client.send("hi").await;

        let last = client.transcript().await.last().cloned().unwrap();
        assert_eq!(last.message, Message::assistant("café ✓"));
    }

    #[tokio::test]
    async fn request_carries_history_and_document_context() {
        let transport = FakeTransport::new(Reply::Chunks(vec![b"ok"]));
        let client = client(transport.clone());

        client.send("What is this?").await;

        let requests = transport.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.messages[0].role, Role::Assistant);
        assert_eq!(request.messages[1], Message::user("What is this?"));
        assert_eq!(
            request.document_context.as_deref(),
            Some("PDF URL: http://localhost:3000/files/pdfs/1_a.pdf")
        );
    }

    #[tokio::test]
    async fn explicit_context_wins_over_url() {
        let source = DocumentSource {
            url: Some("http://x/a.pdf".to_string()),
            context: Some("Analyzing PDF: a.pdf".to_string()),
        };
        assert_eq!(source.context_string().as_deref(), Some("Analyzing PDF: a.pdf"));
        assert_eq!(DocumentSource::default().context_string(), None);
    }

    #[tokio::test]
    async fn user_text_is_kept_exactly_as_typed() {
        let transport = FakeTransport::new(Reply::Chunks(vec![b"ok"]));
        let client = client(transport.clone());

        assert_eq!(client.send("  indented\n").await, SendOutcome::Completed);

        let wire = client.transcript().await.to_wire();
        assert_eq!(wire[1], Message::user("  indented\n"));
        let requests = transport.requests.lock().unwrap();
        assert_eq!(requests[0].messages[1], Message::user("  indented\n"));
    }

    #[tokio::test]
    async fn dropping_a_turn_mid_stream_frees_the_client() {
        let (_release, held) = oneshot::channel();
        let transport = FakeTransport::with_replies(vec![
            Reply::Held(vec![b"Hi"], held),
            Reply::Chunks(vec![b"again"]),
        ]);
        let client = Arc::new(client(transport.clone()));

        let first = tokio::spawn({
            let client = client.clone();
            async move { client.send("first").await }
        });
        while client.transcript().await.len() < 3 {
            tokio::task::yield_now().await;
        }
        assert!(client.is_in_flight());

        first.abort();
        assert!(first.await.unwrap_err().is_cancelled());
        assert!(!client.is_in_flight());

        assert_eq!(client.send("second").await, SendOutcome::Completed);
        assert_eq!(transport.request_count(), 2);
        let last = client.transcript().await.last().cloned().unwrap();
        assert_eq!(last.message, Message::assistant("again"));
    }

    #[tokio::test]
    async fn empty_input_is_ignored() {
        let transport = FakeTransport::new(Reply::Chunks(vec![b"x"]));
        let client = client(transport.clone());

        assert_eq!(
            client.send("   ").await,
            SendOutcome::Ignored(IgnoredReason::EmptyInput)
        );
        assert_eq!(client.transcript().await.len(), 1);
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn error_status_appends_exactly_one_fallback() {
        let transport = FakeTransport::new(Reply::Status(500));
        let client = client(transport.clone());

        assert_eq!(client.send("hi").await, SendOutcome::Failed);

        let wire = client.transcript().await.to_wire();
        assert_eq!(wire.len(), 3);
        assert_eq!(wire[1], Message::user("hi"));
        assert_eq!(wire[2], Message::assistant(FALLBACK_REPLY));
        assert!(!client.is_in_flight());
    }

    #[tokio::test]
    async fn broken_stream_keeps_partial_reply_and_appends_fallback() {
        let client = client(FakeTransport::new(Reply::BreakAfter(vec![b"Partial"])));

        assert_eq!(client.send("hi").await, SendOutcome::Failed);

        let wire = client.transcript().await.to_wire();
        assert_eq!(wire.len(), 4);
        assert_eq!(wire[2], Message::assistant("Partial"));
        assert_eq!(wire[3], Message::assistant(FALLBACK_REPLY));
        assert!(!client.is_in_flight());
    }

    #[tokio::test]
    async fn second_send_while_streaming_is_a_no_op() {
        let (release, held) = oneshot::channel();
        let transport = FakeTransport::new(Reply::Held(vec![b"Hi"], held));
        let client = Arc::new(client(transport.clone()));

        let first = tokio::spawn({
            let client = client.clone();
            async move { client.send("first").await }
        });

        while client.transcript().await.len() < 3 {
            tokio::task::yield_now().await;
        }
        assert!(client.is_in_flight());

        let before = client.transcript().await;
        assert_eq!(
            client.send("second").await,
            SendOutcome::Ignored(IgnoredReason::TurnInFlight)
        );
        assert_eq!(client.transcript().await, before);
        assert_eq!(transport.request_count(), 1);

        release.send(()).unwrap();
        assert_eq!(first.await.unwrap(), SendOutcome::Completed);
        let last = client.transcript().await.last().cloned().unwrap();
        assert_eq!(last.message, Message::assistant("Hi!"));
    }

    #[tokio::test]
    async fn send_clears_the_input_and_notifies_the_observer() {
        let observer = Arc::new(CountingObserver::default());
        let client = ChatClient::new(
            FakeTransport::new(Reply::Chunks(vec![b"a", b"b"])),
            document(),
            observer.clone(),
        );

        client.set_input("question").await;
        assert_eq!(client.send_input().await, SendOutcome::Completed);

        assert_eq!(client.input().await, "");
        assert_eq!(*observer.changes.lock().unwrap(), 3);
    }
}

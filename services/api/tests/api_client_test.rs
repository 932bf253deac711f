//! End-to-end tests: the chat client talking to the relay over a real socket

mod test_utils;

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;
    use std::sync::Arc;

    use axum::Router;
    use chat_client::{
        ChatClient, DocumentSource, HttpRelayTransport, NoopObserver, SendOutcome, FALLBACK_REPLY,
    };
    use pdf_chat_core::domain::{Message, Role};

    use crate::test_utils::{test_app, Script, TestApp};

    async fn serve(router: Router) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        addr
    }

    async fn client_for(app: &TestApp) -> ChatClient {
        let addr = serve(app.router.clone()).await;
        let transport =
            HttpRelayTransport::new(reqwest::Client::new(), &format!("http://{addr}")).unwrap();
        ChatClient::new(
            Arc::new(transport),
            DocumentSource {
                url: None,
                context: Some("Analyzing PDF: report.pdf".to_string()),
            },
            Arc::new(NoopObserver),
        )
    }

    /// Tests a full turn streams through the relay into the transcript
    #[tokio::test]
    async fn it_completes_a_turn_over_http() {
        let app = test_app(Script::Chunks(vec!["Page 1 ", "covers ", "revenue."]));
        let client = client_for(&app).await;

        assert_eq!(client.send("Summarize page 1").await, SendOutcome::Completed);

        let wire = client.transcript().await.to_wire();
        assert_eq!(wire.len(), 3);
        assert_eq!(wire[1], Message::user("Summarize page 1"));
        assert_eq!(wire[2], Message::assistant("Page 1 covers revenue."));

        let forwarded = app.chat.last_request().unwrap();
        assert_eq!(forwarded.messages[0].role, Role::System);
        assert!(forwarded.messages[0].content.contains("report.pdf"));
    }

    /// Tests a relay stream cut off mid-response ends the turn with the fallback
    #[tokio::test]
    async fn it_falls_back_when_the_relay_aborts_mid_stream() {
        let app = test_app(Script::FailAfter(vec!["partial"]));
        let client = client_for(&app).await;

        assert_eq!(client.send("hi").await, SendOutcome::Failed);

        let transcript = client.transcript().await;
        let wire = transcript.to_wire();
        assert_eq!(wire[1], Message::user("hi"));
        assert_eq!(wire.last().unwrap(), &Message::assistant(FALLBACK_REPLY));
        assert!(!client.is_in_flight());
    }

    /// Tests a 500 from the relay adds exactly one fallback message
    #[tokio::test]
    async fn it_falls_back_once_on_an_error_status() {
        let app = test_app(Script::FailOpen);
        let client = client_for(&app).await;

        assert_eq!(client.send("hi").await, SendOutcome::Failed);

        let wire = client.transcript().await.to_wire();
        assert_eq!(wire.len(), 3);
        assert_eq!(
            wire[1..],
            [Message::user("hi"), Message::assistant(FALLBACK_REPLY)]
        );
        assert!(!client.is_in_flight());
    }
}

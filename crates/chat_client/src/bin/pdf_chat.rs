//! crates/chat_client/src/bin/pdf_chat.rs
//!
//! Terminal chat against a running relay. Each line typed is one turn; the
//! reply is printed as it streams in.

use chat_client::{
    ChatClient, ClientError, DeltaPrinter, DocumentSource, HttpRelayTransport, IgnoredReason,
    SendOutcome, TranscriptObserver,
};
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn flush_stdout() {
    if let Err(e) = std::io::stdout().flush() {
        warn!("Failed to flush stdout: {}", e);
    }
}

#[tokio::main]
async fn main() -> Result<(), ClientError> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let relay_url =
        std::env::var("RELAY_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());
    let document = DocumentSource {
        url: std::env::var("PDF_URL").ok(),
        context: std::env::var("PDF_CONTEXT").ok(),
    };
    if !document.is_present() {
        warn!("Neither PDF_URL nor PDF_CONTEXT is set; chatting without a document.");
    }

    let transport = HttpRelayTransport::new(reqwest::Client::new(), &relay_url)?;
    info!("Relaying turns to {}", transport.chat_url());

    let printer = Arc::new(DeltaPrinter::new(std::io::stdout()));
    let client = ChatClient::new(Arc::new(transport), document, printer.clone());
    printer.transcript_changed(&client.transcript().await);
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        flush_stdout();
        let Ok(Some(line)) = lines.next_line().await else {
            break;
        };

        match client.send(&line).await {
            SendOutcome::Ignored(IgnoredReason::EmptyInput) => continue,
            SendOutcome::Ignored(IgnoredReason::TurnInFlight) => {
                warn!("A reply is still streaming.");
            }
            SendOutcome::Completed | SendOutcome::Failed => println!(),
        }
    }

    Ok(())
}

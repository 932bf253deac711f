//! crates/pdf_chat_core/src/relay.rs
//!
//! The request shape accepted by the chat relay and the prompt it forwards
//! to the model.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::domain::Message;
use crate::ports::{PortError, PortResult};

/// Upper bound on model output for a single turn.
pub const MAX_OUTPUT_TOKENS: u32 = 2000;

/// Wall-clock budget for a whole relayed turn.
pub const TURN_BUDGET: Duration = Duration::from_secs(30);

pub const DEFAULT_CHAT_MODEL: &str = "gpt-5-mini";

const SYSTEM_PROMPT_TEMPLATE: &str = "You are an AI assistant analyzing a PDF document. Here is the document context:\n\n{context}\n\nAnswer questions about this document accurately and concisely. If you don't have specific information from the document, be honest about it.";

/// The body of a relay request: the whole conversation so far plus the
/// optional document context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<Message>,
    #[serde(
        rename = "documentContext",
        alias = "pdfContext",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub document_context: Option<String>,
}

impl ChatRequest {
    /// Parses a raw request body. Anything that is not a JSON object with a
    /// `messages` array of well-formed messages is rejected.
    pub fn from_json(body: &[u8]) -> PortResult<Self> {
        serde_json::from_slice(body).map_err(|e| PortError::InvalidInput(e.to_string()))
    }
}

/// What the model port receives for one turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub max_output_tokens: u32,
}

/// Builds the system message that carries the document context.
pub fn document_system_message(context: &str) -> Message {
    Message::system(SYSTEM_PROMPT_TEMPLATE.replace("{context}", context))
}

/// Produces the message list forwarded to the model.
///
/// When a non-empty document context is present the synthetic system message
/// is always element 0, even if the client already sent a system message of
/// its own. Client messages follow untouched and in order.
pub fn compose_prompt(request: ChatRequest) -> Vec<Message> {
    let ChatRequest {
        messages,
        document_context,
    } = request;

    let mut composed = Vec::with_capacity(messages.len() + 1);
    if let Some(context) = document_context.as_deref().filter(|c| !c.is_empty()) {
        composed.push(document_system_message(context));
    }
    composed.extend(messages);
    composed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Role;

    #[test]
    fn system_message_is_first_when_context_present() {
        let request = ChatRequest {
            messages: vec![Message::user("Summarize page 1")],
            document_context: Some("Doc: report.pdf".to_string()),
        };

        let composed = compose_prompt(request);

        assert_eq!(composed.len(), 2);
        assert_eq!(composed[0].role, Role::System);
        assert!(composed[0].content.contains("Doc: report.pdf"));
        assert_eq!(composed[1], Message::user("Summarize page 1"));
    }

    #[test]
    fn synthetic_system_message_precedes_client_system_message() {
        let request = ChatRequest {
            messages: vec![Message::system("be terse"), Message::user("hi")],
            document_context: Some("Analyzing PDF: a.pdf".to_string()),
        };

        let composed = compose_prompt(request);

        assert_eq!(composed.len(), 3);
        assert!(composed[0].content.contains("Analyzing PDF: a.pdf"));
        assert_eq!(composed[1], Message::system("be terse"));
    }

    #[test]
    fn no_context_forwards_messages_unchanged() {
        let messages = vec![Message::assistant("hello"), Message::user("hi")];
        let composed = compose_prompt(ChatRequest {
            messages: messages.clone(),
            document_context: None,
        });
        assert_eq!(composed, messages);

        let composed = compose_prompt(ChatRequest {
            messages: messages.clone(),
            document_context: Some(String::new()),
        });
        assert_eq!(composed, messages);
    }

    #[test]
    fn template_embeds_context_verbatim() {
        let msg = document_system_message("PDF URL: http://x/y.pdf");
        assert!(msg
            .content
            .starts_with("You are an AI assistant analyzing a PDF document."));
        assert!(msg.content.contains("\n\nPDF URL: http://x/y.pdf\n\n"));
    }

    #[test]
    fn parses_document_context_and_legacy_alias() {
        let body = br#"{"messages":[{"role":"user","content":"hi"}],"documentContext":"ctx"}"#;
        let request = ChatRequest::from_json(body).unwrap();
        assert_eq!(request.document_context.as_deref(), Some("ctx"));

        let body = br#"{"messages":[],"pdfContext":"legacy"}"#;
        let request = ChatRequest::from_json(body).unwrap();
        assert_eq!(request.document_context.as_deref(), Some("legacy"));
    }

    #[test]
    fn rejects_malformed_bodies() {
        assert!(ChatRequest::from_json(b"not json").is_err());
        assert!(ChatRequest::from_json(br#"{"documentContext":"x"}"#).is_err());
        assert!(ChatRequest::from_json(br#"{"messages":[{"role":"bot","content":"x"}]}"#).is_err());
        assert!(ChatRequest::from_json(br#"{"messages":[{"role":"user"}]}"#).is_err());
    }

    #[test]
    fn serializes_with_camel_case_context() {
        let request = ChatRequest {
            messages: vec![Message::user("hi")],
            document_context: Some("ctx".to_string()),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["documentContext"], "ctx");
        assert_eq!(json["messages"][0]["role"], "user");
    }
}

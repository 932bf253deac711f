//! services/api/src/adapters/chat_llm.rs
//!
//! This module contains the adapter for the hosted chat model.
//! It implements the `ChatCompletionService` port from the `core` crate.

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use futures::StreamExt;
use pdf_chat_core::{
    domain::{Message, Role},
    ports::{ChatCompletionService, PortError, PortResult, TextStream},
    relay::CompletionRequest,
};
use tokio_util::sync::CancellationToken;
use tracing::debug;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `ChatCompletionService` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiChatAdapter {
    client: Client<OpenAIConfig>,
}

impl OpenAiChatAdapter {
    /// Creates a new `OpenAiChatAdapter`.
    pub fn new(client: Client<OpenAIConfig>) -> Self {
        Self { client }
    }

    fn to_request_message(message: &Message) -> PortResult<ChatCompletionRequestMessage> {
        let content = message.content.clone();
        let converted = match message.role {
            Role::System => ChatCompletionRequestSystemMessageArgs::default()
                .content(content)
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
            Role::User => ChatCompletionRequestUserMessageArgs::default()
                .content(content)
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
            Role::Assistant => ChatCompletionRequestAssistantMessageArgs::default()
                .content(content)
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
        };
        Ok(converted)
    }
}

//=========================================================================================
// `ChatCompletionService` Trait Implementation
//=========================================================================================

#[async_trait]
impl ChatCompletionService for OpenAiChatAdapter {
    /// Opens a streamed chat completion and exposes only the text deltas.
    async fn stream_completion(
        &self,
        request: CompletionRequest,
        cancel: CancellationToken,
    ) -> PortResult<TextStream> {
        let messages = request
            .messages
            .iter()
            .map(Self::to_request_message)
            .collect::<PortResult<Vec<_>>>()?;

        let completion = CreateChatCompletionRequestArgs::default()
            .model(&request.model)
            .messages(messages)
            .max_completion_tokens(request.max_output_tokens)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let chat = self.client.chat();
        let mut upstream = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(PortError::Cancelled),
            opened = chat.create_stream(completion) => {
                opened.map_err(|e: OpenAIError| PortError::Upstream(e.to_string()))?
            }
        };

        let fragments = async_stream::stream! {
            loop {
                let next = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        debug!("Completion cancelled by caller; dropping upstream stream.");
                        break;
                    }
                    next = upstream.next() => next,
                };

                match next {
                    Some(Ok(chunk)) => {
                        for choice in chunk.choices {
                            if let Some(text) = choice.delta.content.filter(|t| !t.is_empty()) {
                                yield Ok::<String, PortError>(text);
                            }
                        }
                    }
                    Some(Err(e)) => {
                        yield Err(PortError::Upstream(e.to_string()));
                        break;
                    }
                    None => break,
                }
            }
        };

        Ok(Box::pin(fragments))
    }
}

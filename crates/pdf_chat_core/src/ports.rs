//! crates/pdf_chat_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases or APIs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::Stream;
use std::pin::Pin;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::domain::{NewPdfRecord, PdfRecord, StoredBlob, User, UserCredentials};
use crate::relay::CompletionRequest;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Already exists: {0}")]
    Conflict(String),
    #[error("Upstream service failed: {0}")]
    Upstream(String),
    #[error("Timed out")]
    Timeout,
    #[error("Cancelled")]
    Cancelled,
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

/// An ordered, finite stream of text fragments produced by a model.
pub type TextStream = Pin<Box<dyn Stream<Item = PortResult<String>> + Send>>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait ChatCompletionService: Send + Sync {
    /// Opens a streaming completion for the composed message list.
    ///
    /// An `Err` means nothing was produced. Once `Ok`, the stream yields fragments
    /// in model order and stops early when `cancel` fires.
    async fn stream_completion(
        &self,
        request: CompletionRequest,
        cancel: CancellationToken,
    ) -> PortResult<TextStream>;
}

#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- User Management ---
    async fn create_user_with_email(
        &self,
        email: &str,
        hashed_password: &str,
        display_name: Option<&str>,
    ) -> PortResult<User>;

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials>;

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User>;

    async fn record_login(&self, user_id: Uuid) -> PortResult<()>;

    // --- Auth Methods ---
    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()>;

    /// Resolves a live session to its user. Expired sessions are `Unauthorized`.
    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid>;

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()>;

    // --- Document Metadata ---
    async fn save_pdf_record(&self, record: NewPdfRecord) -> PortResult<PdfRecord>;

    /// Removes the record `id` if `owner_id` owns it and returns what was removed.
    async fn delete_pdf_record(&self, owner_id: Uuid, id: Uuid) -> PortResult<PdfRecord>;

    /// Lists every record owned by `owner_id`, newest first.
    async fn list_pdf_records(&self, owner_id: Uuid) -> PortResult<Vec<PdfRecord>>;
}

#[async_trait]
pub trait BlobStorage: Send + Sync {
    /// Stores `bytes` under `path` and returns where it can be fetched from.
    async fn upload(&self, path: &str, content_type: &str, bytes: Vec<u8>)
        -> PortResult<StoredBlob>;

    async fn delete(&self, path: &str) -> PortResult<()>;
}

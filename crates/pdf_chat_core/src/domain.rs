//! crates/pdf_chat_core/src/domain.rs
//!
//! Defines the core data structures for the application.
//! `Role` and `Message` double as the shared wire shape for chat messages;
//! everything else is independent of any database or serialization format.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ports::{PortError, PortResult};

//=========================================================================================
// Chat Messages
//=========================================================================================

/// Who authored a message. Serialized in lowercase on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// A single chat message. Immutable once sent; order in a list is significant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }
}

//=========================================================================================
// Users and Sessions
//=========================================================================================

/// Represents a user - used throughout app
#[derive(Debug, Clone)]
pub struct User {
    pub user_id: Uuid,
    pub email: String,
    pub display_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

impl User {
    /// The name shown in the UI: the chosen display name, else the local part
    /// of the email address, else a generic placeholder.
    pub fn display_name_or_default(&self) -> String {
        if let Some(name) = self.display_name.as_deref().filter(|n| !n.trim().is_empty()) {
            return name.to_string();
        }
        match self.email.split('@').next() {
            Some(local) if !local.is_empty() => local.to_string(),
            _ => "User".to_string(),
        }
    }
}

// Only used internally for login - contains sensitive data
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user_id: Uuid,
    pub email: String,
    pub hashed_password: String,
}

// Represents a browser login session (auth cookie)
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub id: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

//=========================================================================================
// Uploaded Documents
//=========================================================================================

/// Metadata for an uploaded PDF, owned by exactly one user.
#[derive(Debug, Clone)]
pub struct PdfRecord {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub file_name: String,
    pub url: String,
    pub storage_path: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub created_at: DateTime<Utc>,
}

/// A PDF record that has not been stored yet.
///
/// Only constructible through [`NewPdfRecord::new`], which enforces the
/// required fields before anything reaches a store.
#[derive(Debug, Clone)]
pub struct NewPdfRecord {
    owner_id: Uuid,
    file_name: String,
    url: String,
    storage_path: String,
    content_type: String,
    size_bytes: i64,
}

impl NewPdfRecord {
    pub fn new(
        owner_id: Uuid,
        file_name: impl Into<String>,
        blob: &StoredBlob,
    ) -> PortResult<Self> {
        let file_name = file_name.into();
        if file_name.trim().is_empty() {
            return Err(PortError::InvalidInput("file name is required".to_string()));
        }
        if blob.url.trim().is_empty() {
            return Err(PortError::InvalidInput("url is required".to_string()));
        }
        if blob.path.trim().is_empty() {
            return Err(PortError::InvalidInput("storage path is required".to_string()));
        }
        if blob.size_bytes < 0 {
            return Err(PortError::InvalidInput("size must not be negative".to_string()));
        }
        Ok(Self {
            owner_id,
            file_name,
            url: blob.url.clone(),
            storage_path: blob.path.clone(),
            content_type: blob.content_type.clone(),
            size_bytes: blob.size_bytes,
        })
    }

    pub fn owner_id(&self) -> Uuid {
        self.owner_id
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn storage_path(&self) -> &str {
        &self.storage_path
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn size_bytes(&self) -> i64 {
        self.size_bytes
    }

    /// Promotes the pending record into a stored one.
    pub fn into_record(self, id: Uuid, created_at: DateTime<Utc>) -> PdfRecord {
        PdfRecord {
            id,
            owner_id: self.owner_id,
            file_name: self.file_name,
            url: self.url,
            storage_path: self.storage_path,
            content_type: self.content_type,
            size_bytes: self.size_bytes,
            created_at,
        }
    }
}

/// The result of writing bytes to blob storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    pub path: String,
    pub url: String,
    pub content_type: String,
    pub size_bytes: i64,
}

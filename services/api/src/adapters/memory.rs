//! services/api/src/adapters/memory.rs
//!
//! An in-process implementation of the `DatabaseService` port, used when no
//! `DATABASE_URL` is configured and by the integration tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pdf_chat_core::domain::{AuthSession, NewPdfRecord, PdfRecord, User, UserCredentials};
use pdf_chat_core::ports::{DatabaseService, PortError, PortResult};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

struct StoredUser {
    user: User,
    hashed_password: String,
}

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, StoredUser>,
    sessions: HashMap<String, AuthSession>,
    // Insertion order doubles as a tiebreaker for equal timestamps.
    pdfs: Vec<PdfRecord>,
}

/// A `DatabaseService` that lives and dies with the process.
#[derive(Default)]
pub struct InMemoryDb {
    tables: RwLock<Tables>,
}

impl InMemoryDb {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DatabaseService for InMemoryDb {
    async fn create_user_with_email(
        &self,
        email: &str,
        hashed_password: &str,
        display_name: Option<&str>,
    ) -> PortResult<User> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.user.email == email) {
            return Err(PortError::Conflict(format!("User {} already exists", email)));
        }

        let user = User {
            user_id: Uuid::new_v4(),
            email: email.to_string(),
            display_name: display_name.map(str::to_string),
            created_at: Utc::now(),
            last_login_at: None,
        };
        tables.users.insert(
            user.user_id,
            StoredUser {
                user: user.clone(),
                hashed_password: hashed_password.to_string(),
            },
        );
        Ok(user)
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let tables = self.tables.read().await;
        tables
            .users
            .values()
            .find(|u| u.user.email == email)
            .map(|u| UserCredentials {
                user_id: u.user.user_id,
                email: u.user.email.clone(),
                hashed_password: u.hashed_password.clone(),
            })
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", email)))
    }

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User> {
        let tables = self.tables.read().await;
        tables
            .users
            .get(&user_id)
            .map(|u| u.user.clone())
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))
    }

    async fn record_login(&self, user_id: Uuid) -> PortResult<()> {
        let mut tables = self.tables.write().await;
        let stored = tables
            .users
            .get_mut(&user_id)
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))?;
        stored.user.last_login_at = Some(Utc::now());
        Ok(())
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&user_id) {
            return Err(PortError::NotFound(format!("User {} not found", user_id)));
        }
        tables.sessions.insert(
            session_id.to_string(),
            AuthSession {
                id: session_id.to_string(),
                user_id,
                expires_at,
            },
        );
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        let mut tables = self.tables.write().await;
        let session = tables
            .sessions
            .get(session_id)
            .ok_or(PortError::Unauthorized)?;
        if session.expires_at > Utc::now() {
            return Ok(session.user_id);
        }
        tables.sessions.remove(session_id);
        Err(PortError::Unauthorized)
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        self.tables.write().await.sessions.remove(session_id);
        Ok(())
    }

    async fn save_pdf_record(&self, record: NewPdfRecord) -> PortResult<PdfRecord> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&record.owner_id()) {
            return Err(PortError::NotFound(format!(
                "User {} not found",
                record.owner_id()
            )));
        }
        let stored = record.into_record(Uuid::new_v4(), Utc::now());
        tables.pdfs.push(stored.clone());
        Ok(stored)
    }

    async fn delete_pdf_record(&self, owner_id: Uuid, id: Uuid) -> PortResult<PdfRecord> {
        let mut tables = self.tables.write().await;
        let index = tables
            .pdfs
            .iter()
            .position(|r| r.id == id && r.owner_id == owner_id)
            .ok_or_else(|| PortError::NotFound(format!("PDF {} not found", id)))?;
        Ok(tables.pdfs.remove(index))
    }

    async fn list_pdf_records(&self, owner_id: Uuid) -> PortResult<Vec<PdfRecord>> {
        let tables = self.tables.read().await;
        let mut owned: Vec<PdfRecord> = tables
            .pdfs
            .iter()
            .rev()
            .filter(|r| r.owner_id == owner_id)
            .cloned()
            .collect();
        // Stable sort keeps later inserts first among equal timestamps.
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(owned)
    }
}

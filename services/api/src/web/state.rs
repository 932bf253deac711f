//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use pdf_chat_core::ports::{BlobStorage, ChatCompletionService, DatabaseService};
use std::sync::Arc;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
///
/// Every service handle is constructed explicitly in `main` (or a test) and
/// injected here; handlers never reach for process-wide globals.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn DatabaseService>,
    pub config: Arc<Config>,
    pub chat_adapter: Arc<dyn ChatCompletionService>,
    pub blob_store: Arc<dyn BlobStorage>,
}

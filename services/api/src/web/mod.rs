pub mod auth;
pub mod chat;
pub mod middleware;
pub mod rest;
pub mod state;

pub use chat::chat_handler;
pub use middleware::require_auth;
pub use rest::{delete_pdf_handler, list_pdfs_handler, upload_handler};

use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware as axum_middleware,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, services::ServeDir};

use crate::web::{
    auth::{login_handler, logout_handler, session_handler, signup_handler},
    state::AppState,
};

const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Builds the full HTTP router for the service.
pub fn app(app_state: Arc<AppState>) -> Router {
    let config = app_state.config.clone();

    let mut cors = CorsLayer::new()
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);
    if let Ok(origin) = HeaderValue::from_str(&config.cors_origin) {
        cors = cors.allow_origin(origin);
    }

    let auth_layer =
        axum_middleware::from_fn_with_state(app_state.clone(), require_auth);

    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/auth/signup", post(signup_handler))
        .route("/auth/login", post(login_handler))
        .route("/auth/logout", post(logout_handler))
        .route("/auth/session", get(session_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/upload", post(upload_handler))
        .route("/user-pdfs", get(list_pdfs_handler))
        .route("/user-pdfs/{id}", delete(delete_pdf_handler))
        .layer(auth_layer.clone());

    let chat_route = Router::new().route("/chat", post(chat_handler));
    let chat_route = if config.chat_require_auth {
        chat_route.layer(auth_layer)
    } else {
        chat_route
    };

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .merge(chat_route)
        .nest_service("/files", ServeDir::new(&config.blob_root))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(cors)
        .with_state(app_state)
}

//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{DbAdapter, InMemoryDb, LocalBlobStore, OpenAiChatAdapter},
    config::Config,
    error::ApiError,
    web::{app, chat::RELAY_LOG_TARGET, rest::ApiDoc, state::AppState},
};
use async_openai::{config::OpenAIConfig, Client};
use pdf_chat_core::ports::DatabaseService;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    let mut pg_adapter = None;
    let db: Arc<dyn DatabaseService> = match &config.database_url {
        Some(database_url) => {
            info!("Connecting to database...");
            let db_pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(database_url)
                .await?;
            let db_adapter = Arc::new(DbAdapter::new(db_pool));
            info!("Running database migrations...");
            db_adapter.run_migrations().await?;
            info!("Database migrations complete.");
            pg_adapter = Some(db_adapter.clone());
            db_adapter
        }
        None => {
            warn!("DATABASE_URL is not set; users and PDF records are kept in memory.");
            Arc::new(InMemoryDb::new())
        }
    };

    // --- 3. Initialize Service Adapters ---
    let mut openai_config = OpenAIConfig::new().with_api_key(config.openai_api_key.clone());
    if let Some(api_base) = &config.openai_api_base {
        openai_config = openai_config.with_api_base(api_base);
    }
    let openai_client = Client::with_config(openai_config);
    let chat_adapter = Arc::new(OpenAiChatAdapter::new(openai_client));

    tokio::fs::create_dir_all(&config.blob_root).await?;
    let blob_store = Arc::new(LocalBlobStore::new(
        config.blob_root.clone(),
        config.public_base_url.clone(),
    ));

    if !config.chat_require_auth {
        warn!(
            target: RELAY_LOG_TARGET,
            "POST /chat is unauthenticated; any caller that can reach it spends model budget. \
             Set CHAT_REQUIRE_AUTH=true to require a session."
        );
    }

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        db,
        config: config.clone(),
        chat_adapter,
        blob_store,
    });

    // --- 5. Create the Web Router ---
    let router = app(app_state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // --- 7. Teardown ---
    if let Some(db_adapter) = pg_adapter {
        db_adapter.close().await;
    }
    info!("Server stopped.");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received.");
}

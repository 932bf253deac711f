//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use axum::http::HeaderValue;
use pdf_chat_core::relay::{DEFAULT_CHAT_MODEL, MAX_OUTPUT_TOKENS, TURN_BUDGET};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    /// Postgres connection string. When absent the service keeps users and
    /// document metadata in memory.
    pub database_url: Option<String>,
    pub log_level: Level,
    pub openai_api_key: String,
    pub openai_api_base: Option<String>,
    pub chat_model: String,
    pub chat_max_output_tokens: u32,
    pub chat_timeout: Duration,
    pub chat_require_auth: bool,
    pub blob_root: PathBuf,
    pub public_base_url: String,
    pub cors_origin: String,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        // --- Required Secrets ---
        let openai_api_key = required_var("OPENAI_API_KEY")?;

        // --- Server and Database Settings ---
        let bind_address = parse_var("BIND_ADDRESS", "0.0.0.0:3000".parse::<SocketAddr>())?;
        let database_url = std::env::var("DATABASE_URL")
            .ok()
            .filter(|url| !url.trim().is_empty());

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Model Provider ---
        let openai_api_base = std::env::var("OPENAI_API_BASE").ok();
        let chat_model =
            std::env::var("CHAT_MODEL").unwrap_or_else(|_| DEFAULT_CHAT_MODEL.to_string());
        let chat_max_output_tokens = parse_var("CHAT_MAX_OUTPUT_TOKENS", Ok(MAX_OUTPUT_TOKENS))?;
        let chat_timeout = Duration::from_secs(parse_var(
            "CHAT_TIMEOUT_SECS",
            Ok(TURN_BUDGET.as_secs()),
        )?);
        if chat_timeout.is_zero() {
            return Err(ConfigError::InvalidValue(
                "CHAT_TIMEOUT_SECS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }
        let chat_require_auth = parse_var("CHAT_REQUIRE_AUTH", Ok(false))?;

        // --- Uploads ---
        let blob_root = std::env::var("BLOB_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./uploads"));
        let public_base_url = std::env::var("PUBLIC_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:3000".to_string());

        let cors_origin =
            std::env::var("CORS_ORIGIN").unwrap_or_else(|_| "http://localhost:3000".to_string());
        HeaderValue::from_str(&cors_origin)
            .map_err(|e| ConfigError::InvalidValue("CORS_ORIGIN".to_string(), e.to_string()))?;

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            openai_api_key,
            openai_api_base,
            chat_model,
            chat_max_output_tokens,
            chat_timeout,
            chat_require_auth,
            blob_root,
            public_base_url,
            cors_origin,
        })
    }
}

/// Reads a variable that has no default. Blank counts as missing.
fn required_var(name: &str) -> Result<String, ConfigError> {
    std::env::var(name)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| ConfigError::MissingVar(name.to_string()))
}

/// Reads `name` and parses it, falling back to `default` when it is unset.
fn parse_var<T>(name: &str, default: Result<T, T::Err>) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let parsed = match std::env::var(name) {
        Ok(raw) => raw.trim().parse::<T>(),
        Err(_) => default,
    };
    parsed.map_err(|e| ConfigError::InvalidValue(name.to_string(), e.to_string()))
}

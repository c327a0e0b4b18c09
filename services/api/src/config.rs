//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development. Third-party credentials are only ever
//! read from here; none are compiled in.

use axum::http::HeaderValue;
use std::net::SocketAddr;
use tracing::Level;

const DEFAULT_CLOUDINARY_API_BASE: &str = "https://api.cloudinary.com/v1_1";
const DEFAULT_CORS_ORIGINS: &str = "http://localhost:5173,http://127.0.0.1:5173,https://learningstake.netlify.app,http://localhost:5174,http://127.0.0.1:5174";

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Credentials for the media host. All three values are needed to sign requests.
#[derive(Clone, Debug)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
    pub folder: String,
    pub api_base: String,
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub log_level: Level,
    pub jwt_secret: String,
    pub cors_origins: Vec<HeaderValue>,
    pub max_upload_bytes: usize,
    pub cloudinary: Option<CloudinaryConfig>,
    pub llm_api_key: Option<String>,
    pub llm_api_base: String,
    pub llm_model: String,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup.
    pub fn from_vars<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let required =
            |name: &str| var(name).ok_or_else(|| ConfigError::MissingVar(name.to_string()));

        // --- Load Server and Database Settings ---
        let bind_address_str = var("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0:3333".to_string());
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let database_url = required("DATABASE_URL")?;

        let log_level_str = var("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let jwt_secret = required("JWT_SECRET")?;

        let cors_origins = var("CORS_ORIGINS")
            .unwrap_or_else(|| DEFAULT_CORS_ORIGINS.to_string())
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(|origin| {
                origin.parse::<HeaderValue>().map_err(|_| {
                    ConfigError::InvalidValue(
                        "CORS_ORIGINS".to_string(),
                        format!("'{}' is not a valid origin", origin),
                    )
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let max_upload_bytes = match var("MAX_UPLOAD_BYTES") {
            Some(raw) => raw.parse::<usize>().map_err(|e| {
                ConfigError::InvalidValue("MAX_UPLOAD_BYTES".to_string(), e.to_string())
            })?,
            None => 500 * 1024 * 1024,
        };

        // --- Load Media Host Credentials (all or nothing) ---
        let cloudinary = match (
            var("CLOUDINARY_CLOUD_NAME"),
            var("CLOUDINARY_API_KEY"),
            var("CLOUDINARY_API_SECRET"),
        ) {
            (Some(cloud_name), Some(api_key), Some(api_secret)) => Some(CloudinaryConfig {
                cloud_name,
                api_key,
                api_secret,
                folder: var("CLOUDINARY_FOLDER").unwrap_or_else(|| "lessons_videos".to_string()),
                api_base: var("CLOUDINARY_API_BASE")
                    .unwrap_or_else(|| DEFAULT_CLOUDINARY_API_BASE.to_string()),
            }),
            (None, None, None) => None,
            _ => {
                return Err(ConfigError::InvalidValue(
                    "CLOUDINARY_*".to_string(),
                    "cloud name, API key and API secret must be set together".to_string(),
                ))
            }
        };

        // --- Load Generator Settings ---
        let llm_api_key = var("LLM_API_KEY");
        let llm_api_base =
            var("LLM_API_BASE").unwrap_or_else(|| "https://openrouter.ai/api/v1".to_string());
        let llm_model =
            var("LLM_MODEL").unwrap_or_else(|| "meta-llama/llama-4-maverick:free".to_string());

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            jwt_secret,
            cors_origins,
            max_upload_bytes,
            cloudinary,
            llm_api_key,
            llm_api_base,
            llm_model,
        })
    }
}

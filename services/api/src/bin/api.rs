//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{
        cloudinary::CloudinaryMediaAdapter, db::DbAdapter, quiz_llm::OpenAiQuizAdapter,
    },
    config::Config,
    error::ApiError,
    web::{build_router, state::AppState},
};
use async_openai::{config::OpenAIConfig, Client};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

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
    info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    let db_adapter = Arc::new(DbAdapter::new(db_pool));
    info!("Running database migrations...");
    db_adapter.run_migrations().await?;
    info!("Database migrations complete.");

    // --- 3. Initialize Service Adapters ---
    let cloudinary = config.cloudinary.clone().ok_or_else(|| {
        ApiError::Internal(
            "CLOUDINARY_CLOUD_NAME, CLOUDINARY_API_KEY and CLOUDINARY_API_SECRET are required"
                .to_string(),
        )
    })?;
    let media_adapter = Arc::new(CloudinaryMediaAdapter::new(
        reqwest::Client::new(),
        cloudinary,
    ));

    let llm_config = OpenAIConfig::new()
        .with_api_key(
            config
                .llm_api_key
                .as_ref()
                .ok_or_else(|| ApiError::Internal("LLM_API_KEY is required".to_string()))?,
        )
        .with_api_base(&config.llm_api_base);
    let quiz_adapter = Arc::new(OpenAiQuizAdapter::new(
        Client::with_config(llm_config),
        config.llm_model.clone(),
    ));

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        db: db_adapter,
        config: config.clone(),
        media: media_adapter,
        generator: quiz_adapter,
    });

    // --- 5. Create the Web Router ---
    let app = build_router(app_state);

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

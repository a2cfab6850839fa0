use crate::config::ServerConfig;
use crate::error::VisionError;
use axum::{
    extract::DefaultBodyLimit,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use tower_http::trace::TraceLayer;

/// Root liveness message
#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Processing placeholder response
#[derive(Serialize)]
pub struct ProcessResponse {
    pub result: String,
    pub status: String,
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
}

/// Build the application router
pub fn router(config: &ServerConfig) -> Router {
    Router::new()
        .route("/", get(handle_root))
        .route("/process", post(handle_process))
        .route("/health", get(handle_health))
        .layer(DefaultBodyLimit::max(config.max_body_size))
        .layer(TraceLayer::new_for_http())
}

/// Run the HTTP server
pub async fn run(config: ServerConfig) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let app = router(&config);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

async fn handle_root() -> impl IntoResponse {
    Json(MessageResponse {
        message: "API is running".to_string(),
    })
}

/// Accepts any body; no processing is wired in yet
async fn handle_process() -> Result<Json<ProcessResponse>, VisionError> {
    tracing::info!("Process request received");

    Ok(Json(ProcessResponse {
        result: "test".to_string(),
        status: "success".to_string(),
    }))
}

async fn handle_health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
    })
}

//! API server for NetPrep

use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

use netprep_tutor::TutorPipeline;

use super::routes::{explain, explain_stream, health_check, AppState};

/// Configuration for the API server
pub struct ApiServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ApiServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

/// API server
pub struct ApiServer {
    config: ApiServerConfig,
    pipeline: Option<TutorPipeline>,
}

impl ApiServer {
    /// Create a new API server with configuration
    pub fn new(config: ApiServerConfig) -> Self {
        Self {
            config,
            pipeline: None,
        }
    }

    /// Create a new API server with default configuration
    pub fn with_defaults() -> Self {
        Self::new(ApiServerConfig::default())
    }

    /// Use a pre-built pipeline instead of one read from the environment
    pub fn with_pipeline(mut self, pipeline: TutorPipeline) -> Self {
        self.pipeline = Some(pipeline);
        self
    }

    /// Build the router for a given pipeline
    pub fn router(pipeline: Arc<TutorPipeline>) -> Router {
        let app_state = Arc::new(AppState { pipeline });

        Router::new()
            .route("/health", get(health_check))
            .route("/api/tutor", post(explain))
            .route("/api/tutor/stream", post(explain_stream))
            .with_state(app_state)
            // Add CORS layer
            .layer(CorsLayer::permissive())
    }

    /// Start the API server
    pub async fn start(self) -> Result<()> {
        // Build the pipeline
        let pipeline = match self.pipeline {
            Some(pipeline) => pipeline,
            None => TutorPipeline::from_env()?,
        };

        // Build router
        let app = Self::router(Arc::new(pipeline));

        // Start server
        let addr = format!("{}:{}", self.config.host, self.config.port);
        info!("Starting API server on {}", addr);

        let listener = tokio::net::TcpListener::bind(&addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }
}

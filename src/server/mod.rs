//! Status and control surface
//!
//! A small axum server the display client polls: one read route for the
//! snapshot, one write route for config patches and one control route for
//! the engine flag. Handlers only talk to the engine through its
//! [`EngineHandle`], never to live state.

mod handlers;

use crate::config::{ConfigError, ServerConfig};
use crate::engine::EngineHandle;
use axum::{
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::future::Future;
use std::net::SocketAddr;
use thiserror::Error;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Errors returned to HTTP clients
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    InvalidBody(String),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": "bad_request",
            "message": self.to_string(),
        }));
        (StatusCode::BAD_REQUEST, body).into_response()
    }
}

/// Build the router with all routes
pub fn router(engine: EngineHandle, enable_cors: bool) -> Router {
    let cors = if enable_cors {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE])
    } else {
        CorsLayer::new()
    };

    Router::new()
        .route("/sync", get(handlers::sync))
        .route("/config", post(handlers::update_config))
        .route("/control", post(handlers::control))
        .route("/health", get(handlers::health))
        .with_state(engine)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Status server
pub struct StatusServer {
    engine: EngineHandle,
    config: ServerConfig,
}

impl StatusServer {
    pub fn new(engine: EngineHandle, config: ServerConfig) -> Self {
        Self { engine, config }
    }

    /// Serve until `shutdown` resolves
    pub async fn run(self, shutdown: impl Future<Output = ()> + Send + 'static) -> anyhow::Result<()> {
        let addr: SocketAddr = format!("{}:{}", self.config.host, self.config.port).parse()?;
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!(addr = %addr, "Status server listening");

        axum::serve(listener, router(self.engine, self.config.enable_cors))
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("Status server shut down");
        Ok(())
    }
}

//! HTTP route handlers for the status surface

use super::ApiError;
use crate::config::TradeConfig;
use crate::engine::{EngineHandle, Snapshot};
use axum::{body::Bytes, extract::State, response::IntoResponse, Json};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// Full engine snapshot as of the last tick
pub async fn sync(State(engine): State<EngineHandle>) -> Json<Arc<Snapshot>> {
    Json(engine.snapshot())
}

#[derive(Debug, Serialize)]
pub struct ConfigResponse {
    pub success: bool,
    pub config: TradeConfig,
    pub warnings: Vec<String>,
}

/// Merge a partial config object into the live config
pub async fn update_config(
    State(engine): State<EngineHandle>,
    body: Bytes,
) -> Result<Json<ConfigResponse>, ApiError> {
    let patch: Value = serde_json::from_slice(&body)
        .map_err(|e| ApiError::InvalidBody(format!("config body is not valid JSON: {e}")))?;
    let (config, warnings) = engine.update_config(&patch)?;

    tracing::info!(warnings = warnings.len(), "Config patch accepted");
    Ok(Json(ConfigResponse {
        success: true,
        config,
        warnings,
    }))
}

#[derive(Debug, Serialize)]
pub struct ControlResponse {
    pub enabled: bool,
}

/// Start/stop the engine. An empty body (or `{}`) toggles it.
pub async fn control(
    State(engine): State<EngineHandle>,
    body: Bytes,
) -> Result<Json<ControlResponse>, ApiError> {
    let requested = parse_enabled(&body)?;
    let enabled = engine.set_enabled(requested);

    tracing::info!(enabled, "Engine control request");
    Ok(Json(ControlResponse { enabled }))
}

fn parse_enabled(body: &[u8]) -> Result<Option<bool>, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| ApiError::InvalidBody(format!("control body is not valid JSON: {e}")))?;
    match value.get("enabled") {
        None | Some(Value::Null) if value.is_object() => Ok(None),
        Some(Value::Bool(enabled)) => Ok(Some(*enabled)),
        _ => Err(ApiError::InvalidBody(
            "expected {\"enabled\": true|false} or an empty body".to_string(),
        )),
    }
}

/// Health check endpoint
pub async fn health() -> impl IntoResponse {
    "ok"
}

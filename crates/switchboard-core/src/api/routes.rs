//! HTTP route handlers

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use super::AppState;
use crate::dispatch::ChatRequest;

const GENERIC_ERROR: &str = "The request could not be processed, please try again later";

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    /// Categories with at least one indexed example
    pub categories: usize,
    /// Remote agents with a configured endpoint
    pub services: usize,
    pub uptime_seconds: u64,
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let orchestrator = &state.orchestrator;

    Json(HealthResponse {
        status: "ok".to_string(),
        categories: orchestrator.intent().router().classifier().index().len(),
        services: orchestrator.registry().len(),
        uptime_seconds: state.uptime_seconds(),
    })
}

/// Reply to one chat turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    pub status: String,
    pub result: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ChatReply {
    pub fn success(result: impl Into<String>) -> Self {
        Self {
            status: "success".to_string(),
            result: result.into(),
            error: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            result: String::new(),
            error: Some(message.into()),
        }
    }
}

impl IntoResponse for ChatReply {
    fn into_response(self) -> Response {
        let status = if self.error.is_some() {
            StatusCode::INTERNAL_SERVER_ERROR
        } else {
            StatusCode::OK
        };
        (status, Json(self)).into_response()
    }
}

/// Route, dispatch and answer one chat message
pub async fn chat(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> ChatReply {
    info!(
        preview = %request.message.chars().take(50).collect::<String>(),
        session_id = ?request.session_id,
        "Received chat message"
    );

    match state.orchestrator.handle_chat(&request).await {
        Ok(result) => ChatReply::success(result),
        Err(e) => {
            error!(error = %e, code = e.code(), "Chat request failed");
            ChatReply::failure(GENERIC_ERROR)
        }
    }
}

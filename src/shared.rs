use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;

use crate::hub::Hub;
use crate::websockets::ConnectionConfig;

/// Shared application state handed to every route
#[derive(Clone)]
pub struct AppState {
    pub hub: Arc<Hub>,
    pub connection_config: ConnectionConfig,
}

impl AppState {
    pub fn new(hub: Arc<Hub>, connection_config: ConnectionConfig) -> Self {
        Self {
            hub,
            connection_config,
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
        };

        let body = Json(json!({
            "error": error_message
        }));

        (status, body).into_response()
    }
}

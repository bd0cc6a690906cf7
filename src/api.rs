use axum::{extract::State, http::Uri, routing::get, Json, Router};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::hub::RoomSummary;
use crate::shared::{AppError, AppState};
use crate::websockets::websocket_handler;

/// All HTTP routes, with request tracing and permissive CORS.
pub fn router(app_state: AppState) -> Router {
    Router::new()
        .route("/ws", get(websocket_handler))
        .route("/api/rooms", get(list_rooms))
        .route("/api/health", get(health))
        .fallback(not_found)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

/// GET /api/rooms
pub async fn list_rooms(State(app_state): State<AppState>) -> Json<Vec<RoomSummary>> {
    Json(app_state.hub.rooms().await)
}

/// GET /api/health
pub async fn health() -> Json<Value> {
    Json(json!({"status": "ok"}))
}

async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(uri.path().to_string())
}

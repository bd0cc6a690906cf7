use axum::{
    extract::{ws::WebSocket, Query, State, WebSocketUpgrade},
    response::Response,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::hub::ClientHandle;
use crate::shared::{AppError, AppState};

use super::socket::{Connection, MessageHandler};

/// Query parameters identifying who is connecting.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConnectParams {
    pub player_id: Option<String>,
    pub player_name: Option<String>,
}

impl ConnectParams {
    /// Both parameters are required and must not be blank.
    pub fn identity(self) -> Result<(String, String), AppError> {
        let required = |value: Option<String>, name: &str| {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| AppError::BadRequest(format!("missing {}", name)))
        };
        let player_id = required(self.player_id, "player_id")?;
        let player_name = required(self.player_name, "player_name")?;
        Ok((player_id, player_name))
    }
}

/// WebSocket endpoint
/// GET /ws?player_id=..&player_name=..
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<ConnectParams>,
    State(app_state): State<AppState>,
) -> Result<Response, AppError> {
    let (player_id, player_name) = params.identity().inspect_err(|e| {
        warn!(error = %e, "Rejecting WebSocket connection");
    })?;

    info!(player_id = %player_id, "WebSocket connection requested");

    let max_message_bytes = app_state.connection_config.max_message_bytes;
    Ok(ws
        .max_message_size(max_message_bytes)
        .on_upgrade(move |socket| {
            handle_websocket_connection(socket, player_id, player_name, app_state)
        }))
}

/// Handle the upgraded WebSocket connection
async fn handle_websocket_connection(
    socket: WebSocket,
    player_id: String,
    player_name: String,
    app_state: AppState,
) {
    let conn_id = Uuid::new_v4();
    info!(
        conn_id = %conn_id,
        player_id = %player_id,
        "WebSocket connection established"
    );

    let (sender, receiver) = app_state.hub.outbound_channel();
    let client = ClientHandle {
        conn_id,
        player_id: player_id.clone(),
        player_name,
        sender,
    };
    if let Err(e) = app_state.hub.register(client).await {
        warn!(conn_id = %conn_id, error = %e, "Could not register connection");
        return;
    }

    let message_handler: Arc<dyn MessageHandler> = app_state.hub.clone();
    Connection::new(
        conn_id,
        socket,
        receiver,
        message_handler,
        app_state.connection_config.clone(),
    )
    .run()
    .await;

    // Always runs, whichever half stopped first and however it stopped.
    if let Err(e) = app_state.hub.unregister(conn_id).await {
        warn!(conn_id = %conn_id, error = %e, "Could not unregister connection");
    }

    info!(
        conn_id = %conn_id,
        player_id = %player_id,
        "WebSocket connection cleaned up"
    );
}

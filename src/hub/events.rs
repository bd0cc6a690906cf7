use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{info, warn};

use super::ConnId;

/// Why the hub gave up on a connection without the client asking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// The outbound queue was full: the client is not reading fast enough.
    QueueFull,
    /// The writer side is already gone.
    QueueClosed,
}

/// Lifecycle events published by the hub for anything that wants to observe
/// it (logging, tests, metrics).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HubEvent {
    ConnectionRegistered {
        conn_id: ConnId,
        player_id: String,
    },
    ConnectionClosed {
        conn_id: ConnId,
        player_id: String,
    },
    ConnectionDropped {
        conn_id: ConnId,
        player_id: String,
        reason: DropReason,
    },
    RoomCreated {
        room_id: String,
    },
    RoomDestroyed {
        room_id: String,
    },
    GameStarted {
        room_id: String,
    },
    GameFinished {
        room_id: String,
        winning_team: u8,
    },
    GameAborted {
        room_id: String,
        player_id: String,
    },
}

/// Logs every hub event until the hub goes away.
pub async fn log_events(mut events: broadcast::Receiver<HubEvent>) {
    loop {
        match events.recv().await {
            Ok(HubEvent::ConnectionDropped {
                conn_id,
                player_id,
                reason,
            }) => {
                warn!(conn_id = %conn_id, player_id = %player_id, reason = ?reason, "Connection dropped");
            }
            Ok(event) => info!(event = ?event, "Hub event"),
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "Hub event log fell behind");
            }
            Err(RecvError::Closed) => break,
        }
    }
}

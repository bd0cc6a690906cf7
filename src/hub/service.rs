use async_trait::async_trait;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot, Mutex};
use tracing::{debug, error, info, warn};

use super::registry::{ClientHandle, HubState, RoomSummary};
use super::{ConnId, HubError, HubEvent};
use crate::game::Game;
use crate::websockets::{ClientMessage, GameAction, MessageHandler, ServerMessage};

const EVENT_CAPACITY: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HubConfig {
    /// Capacity of each connection's outbound queue.
    pub outbound_queue: usize,
    /// Delay between `game_started` and the first `game_state` push.
    pub start_delay: Duration,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            outbound_queue: 256,
            start_delay: Duration::from_millis(100),
        }
    }
}

enum HubCommand {
    Register {
        client: ClientHandle,
        done: oneshot::Sender<()>,
    },
    Unregister {
        conn_id: ConnId,
        done: oneshot::Sender<()>,
    },
    BroadcastAll {
        message: ServerMessage,
    },
}

/// Process-wide registry of connections, rooms and their games.
///
/// Registration, unregistration and broadcast-to-everyone go through the
/// serial [`HubLoop`]; room and game actions run in the calling connection's
/// reader task. Both paths take the same lock, so every change to a room is
/// linearized.
pub struct Hub {
    me: Weak<Hub>,
    state: Mutex<HubState>,
    commands: mpsc::UnboundedSender<HubCommand>,
    events: broadcast::Sender<HubEvent>,
    config: HubConfig,
}

/// The hub's serial event loop. Runs until the last `Arc<Hub>` is dropped.
pub struct HubLoop {
    hub: Weak<Hub>,
    commands: mpsc::UnboundedReceiver<HubCommand>,
}

impl Hub {
    pub fn new(config: HubConfig) -> (Arc<Hub>, HubLoop) {
        let (commands, receiver) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let hub = Arc::new_cyclic(|me| Hub {
            me: me.clone(),
            state: Mutex::new(HubState::new(events.clone())),
            commands,
            events,
            config,
        });
        let hub_loop = HubLoop {
            hub: Arc::downgrade(&hub),
            commands: receiver,
        };
        (hub, hub_loop)
    }

    /// Builds a hub and spawns its loop on the current runtime.
    pub fn spawn(config: HubConfig) -> Arc<Hub> {
        let (hub, hub_loop) = Self::new(config);
        tokio::spawn(hub_loop.run());
        hub
    }

    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    pub fn subscribe(&self) -> broadcast::Receiver<HubEvent> {
        self.events.subscribe()
    }

    /// A fresh outbound queue sized for this hub.
    pub fn outbound_channel(&self) -> (mpsc::Sender<String>, mpsc::Receiver<String>) {
        mpsc::channel(self.config.outbound_queue)
    }

    /// Adds a connection to the registry. Returns once the loop has applied it.
    pub async fn register(&self, client: ClientHandle) -> Result<(), HubError> {
        let (done, applied) = oneshot::channel();
        self.commands
            .send(HubCommand::Register { client, done })
            .map_err(|_| HubError::Closed)?;
        applied.await.map_err(|_| HubError::Closed)
    }

    /// Removes a connection, leaving its room. Returns once applied.
    pub async fn unregister(&self, conn_id: ConnId) -> Result<(), HubError> {
        let (done, applied) = oneshot::channel();
        self.commands
            .send(HubCommand::Unregister { conn_id, done })
            .map_err(|_| HubError::Closed)?;
        applied.await.map_err(|_| HubError::Closed)
    }

    pub fn broadcast_all(&self, message: ServerMessage) -> Result<(), HubError> {
        self.commands
            .send(HubCommand::BroadcastAll { message })
            .map_err(|_| HubError::Closed)
    }

    async fn apply(&self, command: HubCommand) {
        let mut state = self.state.lock().await;
        match command {
            HubCommand::Register { client, done } => {
                state.register(client);
                let _ = done.send(());
            }
            HubCommand::Unregister { conn_id, done } => {
                state.unregister(conn_id);
                let _ = done.send(());
            }
            HubCommand::BroadcastAll { message } => {
                debug!(message_type = message.type_name(), "Broadcasting to all connections");
                state.broadcast_all(&message);
            }
        }
        state.reap_dead();
    }

    /// Runs one client action. A rejected action is reported to the acting
    /// connection as an `error` message and also returned.
    pub async fn dispatch(&self, conn_id: ConnId, message: ClientMessage) -> Result<(), HubError> {
        let mut state = self.state.lock().await;
        let mut started: Option<(String, Arc<Game>)> = None;

        let result = match message {
            ClientMessage::JoinRoom { room_id } => state.join(conn_id, &room_id),
            ClientMessage::LeaveRoom => state.leave(conn_id),
            ClientMessage::CreateRoom => state.create(conn_id).map(|_| ()),
            ClientMessage::GameAction { action, card_indices } => match action {
                GameAction::Ready => state.ready(conn_id).map(|game| started = game),
                GameAction::Pass => state.pass(conn_id),
                GameAction::PlayCards => match card_indices {
                    Some(indices) => state.play(conn_id, &indices),
                    None => Err(HubError::MissingCardIndices),
                },
            },
        };

        if let Err(e) = &result {
            warn!(conn_id = %conn_id, error = %e, "Action rejected");
            state.send_to(conn_id, &ServerMessage::error(e.to_string()));
        }
        state.reap_dead();
        drop(state);

        if let Some((room_id, game)) = started {
            self.schedule_initial_state(room_id, game);
        }
        result
    }

    /// Sends each member their hand shortly after `game_started`, so the
    /// start notice reaches clients first. Skipped if the room's game was
    /// replaced in the meantime.
    fn schedule_initial_state(&self, room_id: String, game: Arc<Game>) {
        let hub = self.me.clone();
        let delay = self.config.start_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let Some(hub) = hub.upgrade() else {
                return;
            };
            let mut state = hub.state.lock().await;
            if state.is_current_game(&room_id, &game) {
                state.send_game_state(&room_id);
                state.reap_dead();
            }
        });
    }

    pub async fn rooms(&self) -> Vec<RoomSummary> {
        self.state.lock().await.room_summaries()
    }

    pub async fn connection_count(&self) -> usize {
        self.state.lock().await.client_count()
    }
}

#[async_trait]
impl MessageHandler for Hub {
    async fn handle_message(&self, conn_id: ConnId, message: String) {
        match ClientMessage::from_json(&message) {
            Ok(message) => {
                // Rejections were already reported to the client.
                let _ = self.dispatch(conn_id, message).await;
            }
            Err(e) => {
                warn!(conn_id = %conn_id, error = %e, "Failed to parse WebSocket message");
                let mut state = self.state.lock().await;
                state.send_to(conn_id, &ServerMessage::error(format!("invalid message: {}", e)));
                state.reap_dead();
            }
        }
    }
}

impl HubLoop {
    pub async fn run(mut self) {
        info!("Hub event loop started");
        while let Some(command) = self.commands.recv().await {
            let Some(hub) = self.hub.upgrade() else {
                break;
            };
            if AssertUnwindSafe(hub.apply(command))
                .catch_unwind()
                .await
                .is_err()
            {
                error!("Hub command panicked; continuing");
            }
        }
        info!("Hub event loop stopped");
    }
}

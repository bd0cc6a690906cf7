use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use uuid::Uuid;

use hong3::{
    websockets::MessageHandler, ClientHandle, ConnId, Hub, HubConfig, HubEvent, ServerMessage,
};

/// How long a test waits for a message before calling it missing.
pub const RECV_TIMEOUT: Duration = Duration::from_secs(2);

// ============================================================================
// Test Setup Infrastructure
// ============================================================================

/// One fake connection: the hub writes into `inbox` exactly as it would
/// write into a real connection's outbound queue.
pub struct TestClient {
    pub conn_id: ConnId,
    pub player_id: String,
    pub inbox: mpsc::Receiver<String>,
}

impl TestClient {
    /// Next raw frame, or `None` if the hub dropped the queue or nothing
    /// arrived in time.
    pub async fn next_raw(&mut self) -> Option<String> {
        tokio::time::timeout(RECV_TIMEOUT, self.inbox.recv())
            .await
            .ok()
            .flatten()
    }

    pub async fn next_message(&mut self) -> ServerMessage {
        let raw = self
            .next_raw()
            .await
            .unwrap_or_else(|| panic!("{} should have received a message", self.player_id));
        serde_json::from_str(&raw)
            .unwrap_or_else(|e| panic!("{} got unparseable message {}: {}", self.player_id, raw, e))
    }

    /// Skips messages until one of the given type arrives.
    pub async fn next_of_type(&mut self, type_name: &str) -> ServerMessage {
        loop {
            let message = self.next_message().await;
            if message.type_name() == type_name {
                return message;
            }
        }
    }

    /// Everything already queued, without waiting.
    pub fn drain(&mut self) -> Vec<ServerMessage> {
        let mut messages = vec![];
        while let Ok(raw) = self.inbox.try_recv() {
            if let Ok(message) = serde_json::from_str(&raw) {
                messages.push(message);
            }
        }
        messages
    }
}

pub struct TestSetup {
    pub hub: Arc<Hub>,
    pub clients: Vec<TestClient>,
    pub events: broadcast::Receiver<HubEvent>,
}

impl TestSetup {
    pub fn client(&mut self, player_id: &str) -> &mut TestClient {
        self.clients
            .iter_mut()
            .find(|c| c.player_id == player_id)
            .unwrap_or_else(|| panic!("no test client named {}", player_id))
    }

    pub fn conn_id(&self, player_id: &str) -> ConnId {
        self.clients
            .iter()
            .find(|c| c.player_id == player_id)
            .map(|c| c.conn_id)
            .unwrap_or_else(|| panic!("no test client named {}", player_id))
    }

    /// Feeds a raw text frame to the hub as if `player_id`'s socket read it.
    pub async fn send_raw(&self, player_id: &str, raw: &str) {
        self.hub.handle_message(self.conn_id(player_id), raw.to_string()).await;
    }

    pub fn drain_all(&mut self) {
        for client in &mut self.clients {
            client.drain();
        }
    }

    /// Next hub event matching the predicate, skipping the rest.
    pub async fn next_event(&mut self, matches: impl Fn(&HubEvent) -> bool) -> HubEvent {
        loop {
            let event = tokio::time::timeout(RECV_TIMEOUT, self.events.recv())
                .await
                .expect("timed out waiting for hub event")
                .expect("hub event stream closed");
            if matches(&event) {
                return event;
            }
        }
    }
}

pub struct TestSetupBuilder {
    players: Vec<String>,
    slow_players: Vec<String>,
    start_delay: Duration,
}

impl TestSetupBuilder {
    pub fn new() -> Self {
        Self {
            players: vec![],
            slow_players: vec![],
            start_delay: Duration::from_millis(5),
        }
    }

    pub fn with_players(mut self, players: Vec<&str>) -> Self {
        self.players = players.into_iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_four_players(self) -> Self {
        self.with_players(vec!["alice", "bob", "charlie", "david"])
    }

    pub fn with_five_players(self) -> Self {
        self.with_players(vec!["alice", "bob", "charlie", "david", "eve"])
    }

    /// Gives this player an outbound queue with room for a single message.
    pub fn with_slow_player(mut self, player: &str) -> Self {
        self.slow_players.push(player.to_string());
        self
    }

    pub async fn build(self) -> TestSetup {
        let hub = Hub::spawn(HubConfig {
            start_delay: self.start_delay,
            ..HubConfig::default()
        });
        let events = hub.subscribe();

        let mut clients = Vec::with_capacity(self.players.len());
        for player in &self.players {
            let (sender, inbox) = if self.slow_players.contains(player) {
                mpsc::channel(1)
            } else {
                hub.outbound_channel()
            };
            let conn_id = Uuid::new_v4();
            hub.register(ClientHandle {
                conn_id,
                player_id: player.clone(),
                player_name: capitalize(player),
                sender,
            })
            .await
            .expect("register test client");
            clients.push(TestClient {
                conn_id,
                player_id: player.clone(),
                inbox,
            });
        }

        TestSetup {
            hub,
            clients,
            events,
        }
    }
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

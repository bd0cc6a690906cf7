use serde_json::json;

use hong3::{GameStateView, ServerMessage};

use super::setup::TestSetup;

// ============================================================================
// Player Actions
// ============================================================================

impl TestSetup {
    pub async fn join_room(&self, player_id: &str, room_id: &str) {
        self.send_raw(
            player_id,
            &json!({"type": "join_room", "room_id": room_id}).to_string(),
        )
        .await;
    }

    pub async fn leave_room(&self, player_id: &str) {
        self.send_raw(player_id, &json!({"type": "leave_room"}).to_string())
            .await;
    }

    pub async fn create_room(&self, player_id: &str) {
        self.send_raw(player_id, &json!({"type": "create_room"}).to_string())
            .await;
    }

    pub async fn ready(&self, player_id: &str) {
        self.send_raw(
            player_id,
            &json!({"type": "game_action", "action": "ready"}).to_string(),
        )
        .await;
    }

    pub async fn play_cards(&self, player_id: &str, card_indices: &[usize]) {
        self.send_raw(
            player_id,
            &json!({"type": "game_action", "action": "play_cards", "card_indices": card_indices})
                .to_string(),
        )
        .await;
    }

    pub async fn pass(&self, player_id: &str) {
        self.send_raw(
            player_id,
            &json!({"type": "game_action", "action": "pass"}).to_string(),
        )
        .await;
    }

    /// Joins the first four clients into `room_id` and clears their inboxes.
    pub async fn seat_four(&mut self, room_id: &str) {
        let players: Vec<String> = self
            .clients
            .iter()
            .take(4)
            .map(|c| c.player_id.clone())
            .collect();
        for player in &players {
            self.join_room(player, room_id).await;
        }
        for player in &players {
            self.client(player).next_of_type("room_state").await;
        }
        self.drain_all();
    }

    /// Seats four players, readies them all and waits for the first
    /// `game_state` each receives. Returns the views in client order.
    pub async fn start_game(&mut self, room_id: &str) -> Vec<GameStateView> {
        self.seat_four(room_id).await;
        let players: Vec<String> = self
            .clients
            .iter()
            .take(4)
            .map(|c| c.player_id.clone())
            .collect();
        for player in &players {
            self.ready(player).await;
        }

        let mut views = Vec::with_capacity(players.len());
        for player in &players {
            let client = self.client(player);
            client.next_of_type("game_started").await;
            match client.next_of_type("game_state").await {
                ServerMessage::GameState(view) => views.push(view),
                other => panic!("expected game_state, got {:?}", other),
            }
        }
        views
    }

    /// Waits for every listed player's next `game_state`.
    pub async fn next_views(&mut self, players: &[String]) -> Vec<GameStateView> {
        let mut views = Vec::with_capacity(players.len());
        for player in players {
            match self.client(player).next_of_type("game_state").await {
                ServerMessage::GameState(view) => views.push(view),
                other => panic!("expected game_state, got {:?}", other),
            }
        }
        views
    }
}

/// The player seated at `position`, according to anyone's view.
pub fn player_at(views: &[GameStateView], position: usize) -> String {
    views
        .iter()
        .find(|v| v.player.position == position)
        .map(|v| v.player.id.clone())
        .unwrap_or_else(|| panic!("nobody at position {}", position))
}

pub fn view_of<'a>(views: &'a [GameStateView], player_id: &str) -> &'a GameStateView {
    views
        .iter()
        .find(|v| v.player.id == player_id)
        .unwrap_or_else(|| panic!("no view for {}", player_id))
}

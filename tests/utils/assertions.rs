//! Test assertion helpers
use hong3::{GameStateView, ServerMessage};

use super::setup::TestClient;

// ============================================================================
// Message Assertions
// ============================================================================

impl TestClient {
    /// Asserts the next message has the given type and returns it.
    pub async fn expect_type(&mut self, expected: &str) -> ServerMessage {
        let message = self.next_message().await;
        assert_eq!(
            message.type_name(),
            expected,
            "{} received wrong message type: {:?}",
            self.player_id,
            message
        );
        message
    }

    /// Asserts the next message is an `error` whose text contains `needle`.
    pub async fn expect_error_containing(&mut self, needle: &str) {
        match self.next_message().await {
            ServerMessage::Error { error } => assert!(
                error.contains(needle),
                "{} got error {:?}, expected it to mention {:?}",
                self.player_id,
                error,
                needle
            ),
            other => panic!("{} expected an error, got {:?}", self.player_id, other),
        }
    }

    /// Asserts nothing is waiting in the inbox right now.
    pub fn expect_nothing(&mut self) {
        let pending = self.drain();
        assert!(
            pending.is_empty(),
            "{} should not have received any messages, got {:?}",
            self.player_id,
            pending
        );
    }
}

// ============================================================================
// View Assertions
// ============================================================================

/// A view shows the owner's hand and only counts for everyone else.
pub fn assert_private_view(view: &GameStateView, hand_size: usize) {
    assert_eq!(view.player.cards.len(), hand_size);
    assert_eq!(view.player.card_count, hand_size);
    assert_eq!(view.other_players.len(), 3);
    for other in &view.other_players {
        assert_ne!(other.id, view.player.id);
    }
}

/// The view serialized to the wire must not carry other players' cards.
pub fn assert_no_foreign_cards_on_wire(view: &GameStateView) {
    let wire = serde_json::to_value(ServerMessage::GameState(view.clone())).unwrap();
    for other in wire["other_players"].as_array().unwrap() {
        assert!(other.get("cards").is_none(), "leaked cards: {}", other);
    }
}

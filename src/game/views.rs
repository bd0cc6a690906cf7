use serde::{Deserialize, Serialize};

use crate::game::cards::{Card, CardGroup};
use crate::game::logic::{GameStatus, PlayerStatus, TeamMode};

/// The requesting player's own seat, hand included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelfView {
    pub id: String,
    pub name: String,
    pub status: PlayerStatus,
    pub cards: Vec<Card>,
    pub position: usize,
    pub card_count: usize,
    pub collected_cards: usize,
}

/// Another seat as the requesting player may see it. No cards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtherPlayerView {
    pub id: String,
    pub name: String,
    pub position: usize,
    pub status: PlayerStatus,
    pub card_count: usize,
    pub collected_cards: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameStateView {
    pub status: GameStatus,
    pub current_player: Option<usize>,
    pub last_player: Option<usize>,
    pub player: SelfView,
    pub other_players: Vec<OtherPlayerView>,
    pub table_cards: Option<CardGroup>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerResult {
    pub id: String,
    pub name: String,
    pub position: usize,
    pub team: Option<u8>,
    pub collected_cards: usize,
    pub rounds_won: usize,
    pub is_winner: bool,
}

/// Final standings. Partnerships are only revealed here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameResult {
    pub winning_team: u8,
    pub team_mode: TeamMode,
    pub finished_order: Vec<usize>,
    pub players: Vec<PlayerResult>,
}

// Public API
pub use cards::{Card, CardGroup, ComboError, ComboType, Deck, Rank, Suit, DECK_SIZE, PLAYER_COUNT};
pub use logic::{Game, GameError, GameStatus, Player, PlayerStatus, TeamMode, TurnOutcome};
pub use views::{GameResult, GameStateView, OtherPlayerView, PlayerResult, SelfView};

pub mod cards;
mod logic;
mod views;

pub mod basic;
pub mod combos;

pub use basic::{Card, Deck, Rank, Suit, DECK_SIZE, PLAYER_COUNT};
pub use combos::{CardGroup, ComboError, ComboType};

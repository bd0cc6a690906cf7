// Library crate for the Hong San game server
// This file exposes the public API for integration tests

pub mod api;
pub mod config;
pub mod game;
pub mod hub;
pub mod shared;
pub mod websockets;

// Re-export commonly used types for easier access in tests
pub use config::Settings;
pub use game::{Card, CardGroup, Game, GameError, GameResult, GameStateView, Rank, Suit};
pub use hub::{ClientHandle, ConnId, Hub, HubConfig, HubError, HubEvent};
pub use shared::{AppError, AppState};
pub use websockets::{ClientMessage, GameAction, MessageHandler, ServerMessage};

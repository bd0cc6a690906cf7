use thiserror::Error;

use crate::game::GameError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HubError {
    #[error("Connection is not registered")]
    NotRegistered,
    #[error("Not in a room")]
    NotInRoom,
    #[error("Room id must not be blank")]
    BlankRoomId,
    #[error("Room not found: {0}")]
    RoomNotFound(String),
    #[error("Room is full")]
    RoomFull,
    #[error("Player {0} is already in this room")]
    DuplicatePlayer(String),
    #[error("play_cards requires card_indices")]
    MissingCardIndices,
    #[error("Hub is shut down")]
    Closed,
    #[error(transparent)]
    Game(#[from] GameError),
}

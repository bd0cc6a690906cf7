use serde::{Deserialize, Serialize};

use crate::game::{GameResult, GameStateView};

/// The `action` field of a `game_action` message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameAction {
    Ready,
    PlayCards,
    Pass,
}

/// Client -> Server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    JoinRoom {
        room_id: String,
    },
    LeaveRoom,
    CreateRoom,
    GameAction {
        action: GameAction,
        /// Positions in the sender's current hand. Only read for `play_cards`.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        card_indices: Option<Vec<usize>>,
    },
}

impl ClientMessage {
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}

/// One member as listed in `room_state`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomPlayer {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ready: Option<bool>,
}

/// Server -> Client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    RoomCreated {
        room_id: String,
    },
    RoomState {
        room_id: String,
        players: Vec<RoomPlayer>,
    },
    PlayerJoined {
        #[serde(rename = "playerID")]
        player_id: String,
        name: String,
    },
    PlayerLeft {
        #[serde(rename = "playerID")]
        player_id: String,
    },
    PlayerReady {
        #[serde(rename = "playerID")]
        player_id: String,
    },
    GameStarted {
        #[serde(rename = "currentPlayer")]
        current_player: Option<usize>,
    },
    GameState(GameStateView),
    PlayerPass {
        #[serde(rename = "playerID")]
        player_id: String,
        #[serde(rename = "currentPlayer")]
        current_player: Option<usize>,
    },
    RoundEnd {
        #[serde(rename = "currentPlayer")]
        current_player: Option<usize>,
    },
    GameEnd {
        result: GameResult,
    },
    /// A seated player left mid-hand and the hand was abandoned.
    GameAborted {
        #[serde(rename = "playerID")]
        player_id: String,
    },
    Notice {
        message: String,
    },
    Error {
        error: String,
    },
}

impl ServerMessage {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            error: message.into(),
        }
    }

    pub fn notice(message: impl Into<String>) -> Self {
        Self::Notice {
            message: message.into(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            ServerMessage::RoomCreated { .. } => "room_created",
            ServerMessage::RoomState { .. } => "room_state",
            ServerMessage::PlayerJoined { .. } => "player_joined",
            ServerMessage::PlayerLeft { .. } => "player_left",
            ServerMessage::PlayerReady { .. } => "player_ready",
            ServerMessage::GameStarted { .. } => "game_started",
            ServerMessage::GameState(_) => "game_state",
            ServerMessage::PlayerPass { .. } => "player_pass",
            ServerMessage::RoundEnd { .. } => "round_end",
            ServerMessage::GameEnd { .. } => "game_end",
            ServerMessage::GameAborted { .. } => "game_aborted",
            ServerMessage::Notice { .. } => "notice",
            ServerMessage::Error { .. } => "error",
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

// Public API
pub use handler::{websocket_handler, ConnectParams};
pub use messages::{ClientMessage, GameAction, RoomPlayer, ServerMessage};
pub use socket::{
    read_loop, write_loop, Connection, ConnectionConfig, MessageHandler, SocketError,
};

// Internal modules
mod handler;
mod messages;
mod socket;

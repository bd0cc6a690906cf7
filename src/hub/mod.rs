// Public API
pub use error::HubError;
pub use events::{log_events, DropReason, HubEvent};
pub use registry::{ClientHandle, RoomSummary};
pub use service::{Hub, HubConfig, HubLoop};

/// Identity of one live connection. A player may hold several.
pub type ConnId = uuid::Uuid;

// Internal modules
mod error;
mod events;
mod registry;
mod service;

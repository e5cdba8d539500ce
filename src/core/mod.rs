pub mod evi;
pub mod rest;

// Re-export commonly used types for convenience
pub use evi::{
    ConnectionState, DisconnectReason, EviError, EviResponse, EviResult, EviSession,
    EviSessionConfig, OutboundFrame, SessionHandler, StreamTarget,
};
pub use rest::{ChatsPage, ConfigsPage, RestClient};

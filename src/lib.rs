pub mod client;
pub mod config;
pub mod core;
pub mod utils;

// Re-export commonly used items for convenience
pub use client::HumeClient;
pub use config::{ClientConfig, ConfigError};
pub use core::*;
pub use utils::{Payload, WebsocketMessage, create_message, pcm_to_wav};

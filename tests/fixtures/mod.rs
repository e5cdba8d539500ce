//! Test fixtures shared by the integration tests:
//! - PCM audio (programmatically generated)
//! - Inbound EVI frames

#![allow(dead_code)]

pub mod audio_fixtures;
pub mod frames;

pub use audio_fixtures::*;
pub use frames::*;

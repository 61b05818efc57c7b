//! Sideline Core - Backend logic for the Sideline recording app
//!
//! This crate contains all business logic with zero UI dependencies:
//! the video catalog, recording session state machine, editor/reel
//! sessions, and the FFmpeg-backed processing pipelines.

pub mod catalog;
pub mod clock;
pub mod config;
pub mod engine;
pub mod logging;
pub mod models;
pub mod pipeline;
pub mod recording;
pub mod session;
pub mod storage;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_returns_value() {
        assert!(!version().is_empty());
    }
}

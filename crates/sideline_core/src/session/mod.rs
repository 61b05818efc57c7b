//! Transient editing and reel-assembly sessions.
//!
//! Sessions are explicit context objects created by the application and
//! handed to the coordinators; there is no ambient global state. Each
//! guards progress updates with an epoch counter so late callbacks from
//! a cancelled engine invocation cannot touch a reset session.

mod editor;
mod reel;

pub use editor::{EditParams, EditorSession, DEFAULT_MUSIC_VOLUME};
pub use reel::ReelSession;

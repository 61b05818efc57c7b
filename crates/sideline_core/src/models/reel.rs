//! Reel clip model.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::video::VideoId;

/// One clip queued for reel concatenation.
///
/// `order` is maintained by the reel session as a dense 0..N-1 sequence
/// matching list position; it is re-normalized on every removal or
/// reorder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReelClip {
    /// Clip identifier (unique within the reel session).
    pub id: String,
    /// Source video in the catalog.
    pub video_id: VideoId,
    /// Path to the source file.
    pub video_uri: PathBuf,
    /// Optional thumbnail for the picker UI.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_uri: Option<PathBuf>,
    /// Known clip duration in seconds (probed lazily when missing).
    pub duration: f64,
    /// Position in the reel, 0-based and contiguous.
    pub order: usize,
}

//! Data models for the video library and reel assembly.

mod reel;
mod video;

pub use reel::ReelClip;
pub use video::{
    HighlightId, HighlightMark, HighlightRecord, VideoId, VideoRecord,
    DEFAULT_HIGHLIGHT_DURATION_SECS, MAX_CLIP_DURATION_SECS, MIN_CLIP_DURATION_SECS,
    SPEED_OPTIONS,
};

//! Video and highlight records.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque unique video identifier (`vid_<millis>_<suffix>`).
pub type VideoId = String;

/// Unique highlight identifier within a video (`hl_<videoId>_<index>`).
pub type HighlightId = String;

/// Display window length for a highlight when none is given (seconds).
pub const DEFAULT_HIGHLIGHT_DURATION_SECS: f64 = 5.0;

/// Longest clip accepted into a reel (seconds).
pub const MAX_CLIP_DURATION_SECS: f64 = 60.0;

/// Shortest clip accepted into a reel (seconds).
pub const MIN_CLIP_DURATION_SECS: f64 = 1.0;

/// Playback speeds the editor offers.
pub const SPEED_OPTIONS: [f64; 6] = [0.5, 0.75, 1.0, 1.25, 1.5, 2.0];

/// One stored video asset in the catalog.
///
/// The catalog owns the backing file: removing the record removes the
/// file. `duration` is fixed at creation time (elapsed recording time or
/// the computed post-processing duration), never re-probed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoRecord {
    /// Unique identifier, immutable after creation.
    pub id: VideoId,
    /// Location of the backing file.
    pub uri: PathBuf,
    /// Duration in seconds, fixed at creation.
    pub duration: f64,
    /// Creation timestamp, set once.
    pub created_at: DateTime<Utc>,
    /// Optional thumbnail image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_uri: Option<PathBuf>,
    /// Highlights in tagging order.
    #[serde(default)]
    pub highlights: Vec<HighlightRecord>,
}

impl VideoRecord {
    /// Build a record from raw highlight marks.
    ///
    /// Each mark gets a sequence-derived id (`hl_<videoId>_<index>`) and
    /// the default highlight duration.
    pub fn new(
        id: impl Into<VideoId>,
        uri: impl Into<PathBuf>,
        duration: f64,
        created_at: DateTime<Utc>,
        marks: &[HighlightMark],
    ) -> Self {
        let id = id.into();
        let highlights = marks
            .iter()
            .enumerate()
            .map(|(i, mark)| HighlightRecord {
                id: format!("hl_{}_{}", id, i),
                video_id: id.clone(),
                timestamp: mark.timestamp,
                duration: DEFAULT_HIGHLIGHT_DURATION_SECS,
                label: None,
            })
            .collect();

        Self {
            id,
            uri: uri.into(),
            duration,
            created_at,
            thumbnail_uri: None,
            highlights,
        }
    }

    /// Set the thumbnail path.
    pub fn with_thumbnail(mut self, uri: impl Into<PathBuf>) -> Self {
        self.thumbnail_uri = Some(uri.into());
        self
    }
}

/// A point-in-time marker inside a video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighlightRecord {
    /// Unique within the parent video.
    pub id: HighlightId,
    /// Back-reference to the parent video.
    pub video_id: VideoId,
    /// Seconds from the start of the video (>= 0).
    pub timestamp: f64,
    /// Display window length in seconds.
    pub duration: f64,
    /// Optional user label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// A raw highlight tag captured during a recording session, before it is
/// assigned an id and attached to a video.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HighlightMark {
    /// Seconds from the start of the recording.
    pub timestamp: f64,
}

//! Recording session state machine.
//!
//! One [`Recorder`] lives per app context and tracks at most one active
//! capture session. While recording, highlight taps accumulate as
//! elapsed-time marks; stopping finalizes the capture into durable
//! storage and registers it in the catalog. Session state resets on
//! stop even when finalization fails, so a broken device never leaves
//! the recorder stuck mid-session.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::catalog::{CatalogError, VideoCatalog};
use crate::clock::Clock;
use crate::engine::extract_thumbnail;
use crate::models::{HighlightMark, VideoRecord};
use crate::storage::{generate_video_id, StorageError, VideoStorage};

/// Capture hardware boundary.
///
/// The core never talks to a camera directly; platform glue implements
/// this trait. `stop_capture` hands back the finished media file.
pub trait CaptureDevice: Send + Sync {
    fn start_capture(&self) -> io::Result<()>;
    fn stop_capture(&self) -> io::Result<PathBuf>;
}

/// Errors from finalizing a recording.
#[derive(Error, Debug)]
pub enum RecordingError {
    #[error("capture device error: {0}")]
    Device(#[source] io::Error),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Result type for recording operations.
pub type RecordingResult<T> = Result<T, RecordingError>;

#[derive(Default)]
struct RecordingState {
    is_recording: bool,
    /// Wall-clock start, epoch millis.
    started_at: i64,
    marks: Vec<HighlightMark>,
}

/// Single-session recorder.
pub struct Recorder {
    catalog: Arc<VideoCatalog>,
    storage: VideoStorage,
    clock: Arc<dyn Clock>,
    device: Option<Arc<dyn CaptureDevice>>,
    state: Mutex<RecordingState>,
}

impl Recorder {
    pub fn new(
        catalog: Arc<VideoCatalog>,
        storage: VideoStorage,
        clock: Arc<dyn Clock>,
        device: Option<Arc<dyn CaptureDevice>>,
    ) -> Self {
        Self {
            catalog,
            storage,
            clock,
            device,
            state: Mutex::new(RecordingState::default()),
        }
    }

    pub fn is_recording(&self) -> bool {
        self.state.lock().is_recording
    }

    /// Highlight marks tagged so far in the current session.
    pub fn marks(&self) -> Vec<HighlightMark> {
        self.state.lock().marks.clone()
    }

    /// Begin a capture session.
    ///
    /// Silent no-op when a session is already running or no device is
    /// bound. Marks and the start timestamp reset on every fresh start.
    pub fn start(&self) -> RecordingResult<()> {
        let mut state = self.state.lock();
        if state.is_recording {
            debug!("start ignored, already recording");
            return Ok(());
        }
        let device = match &self.device {
            Some(d) => Arc::clone(d),
            None => {
                warn!("start ignored, no capture device bound");
                return Ok(());
            }
        };

        device.start_capture().map_err(RecordingError::Device)?;
        state.is_recording = true;
        state.started_at = self.clock.now_millis();
        state.marks.clear();
        info!("recording started");
        Ok(())
    }

    /// Tag a highlight at the current elapsed time.
    ///
    /// No-op outside a recording session.
    pub fn tag_highlight(&self) {
        let mut state = self.state.lock();
        if !state.is_recording {
            return;
        }
        let elapsed = (self.clock.now_millis() - state.started_at) as f64 / 1000.0;
        debug!(timestamp = elapsed, "highlight tagged");
        state.marks.push(HighlightMark { timestamp: elapsed });
    }

    /// Stop the session and register the captured video.
    ///
    /// Returns the new catalog record, or `None` when no session was
    /// running. The recorded duration is the wall-clock elapsed time.
    pub fn stop(&self) -> RecordingResult<Option<VideoRecord>> {
        // Take the session data and reset before any fallible work so a
        // finalization error cannot strand the recorder mid-session.
        let (started_at, marks) = {
            let mut state = self.state.lock();
            if !state.is_recording {
                return Ok(None);
            }
            state.is_recording = false;
            (state.started_at, std::mem::take(&mut state.marks))
        };
        let elapsed_secs = (self.clock.now_millis() - started_at) as f64 / 1000.0;

        let device = match &self.device {
            Some(d) => Arc::clone(d),
            None => return Ok(None),
        };
        let captured = device.stop_capture().map_err(RecordingError::Device)?;

        let id = generate_video_id();
        let uri = self.storage.commit_video(&captured, &id)?;
        let mut record = VideoRecord::new(id, uri, elapsed_secs, self.clock.now(), &marks);

        // Thumbnail generation is best-effort; a record without one is
        // still valid.
        let thumb = self.storage.thumbnail_path(&record.id);
        match extract_thumbnail(&record.uri, 1.0, &thumb) {
            Ok(()) => record = record.with_thumbnail(thumb),
            Err(e) => warn!("thumbnail generation failed for {}: {}", record.id, e),
        }
        self.catalog.add(record.clone())?;
        info!(
            id = %record.id,
            duration = elapsed_secs,
            highlights = record.highlights.len(),
            "recording saved"
        );
        Ok(Some(record))
    }
}

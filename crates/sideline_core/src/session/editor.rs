//! Editor session state.

use std::path::PathBuf;

use parking_lot::Mutex;

use crate::models::VideoId;

/// Default volume for an overlaid music track.
pub const DEFAULT_MUSIC_VOLUME: f64 = 0.3;

/// Edit parameters captured for one export run.
#[derive(Debug, Clone, PartialEq)]
pub struct EditParams {
    pub video_id: Option<VideoId>,
    pub video_uri: Option<PathBuf>,
    pub duration: f64,
    pub trim_start: f64,
    pub trim_end: f64,
    pub speed: f64,
    pub music_uri: Option<PathBuf>,
    pub music_volume: f64,
}

#[derive(Debug, Clone)]
struct EditorState {
    params: EditParams,
    is_processing: bool,
    progress: f64,
    step: String,
    /// Bumped on every processing start and cancel; progress updates
    /// carrying a stale epoch are dropped.
    epoch: u64,
}

impl EditorState {
    fn initial() -> Self {
        Self {
            params: EditParams {
                video_id: None,
                video_uri: None,
                duration: 0.0,
                trim_start: 0.0,
                trim_end: 0.0,
                speed: 1.0,
                music_uri: None,
                music_volume: DEFAULT_MUSIC_VOLUME,
            },
            is_processing: false,
            progress: 0.0,
            step: String::new(),
            epoch: 0,
        }
    }
}

/// Transient editing session bound to at most one video at a time.
///
/// Opening a different video resets every edit parameter.
pub struct EditorSession {
    inner: Mutex<EditorState>,
}

impl EditorSession {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(EditorState::initial()),
        }
    }

    /// Bind the session to a video, resetting all edit parameters.
    pub fn init(&self, video_id: impl Into<VideoId>, uri: impl Into<PathBuf>, duration: f64) {
        let mut state = self.inner.lock();
        let epoch = state.epoch;
        *state = EditorState::initial();
        state.epoch = epoch;
        state.params.video_id = Some(video_id.into());
        state.params.video_uri = Some(uri.into());
        state.params.duration = duration;
        state.params.trim_end = duration;
    }

    pub fn set_trim_start(&self, time: f64) {
        self.inner.lock().params.trim_start = time;
    }

    pub fn set_trim_end(&self, time: f64) {
        self.inner.lock().params.trim_end = time;
    }

    pub fn set_speed(&self, speed: f64) {
        self.inner.lock().params.speed = speed;
    }

    pub fn set_music(&self, uri: Option<PathBuf>) {
        self.inner.lock().params.music_uri = uri;
    }

    pub fn set_music_volume(&self, volume: f64) {
        self.inner.lock().params.music_volume = volume.clamp(0.0, 1.0);
    }

    /// Snapshot of the current edit parameters.
    pub fn params(&self) -> EditParams {
        self.inner.lock().params.clone()
    }

    pub fn is_processing(&self) -> bool {
        self.inner.lock().is_processing
    }

    pub fn progress(&self) -> f64 {
        self.inner.lock().progress
    }

    pub fn step(&self) -> String {
        self.inner.lock().step.clone()
    }

    /// Flip into processing state and return the epoch guarding this run.
    pub fn begin_processing(&self, step: impl Into<String>) -> u64 {
        let mut state = self.inner.lock();
        state.epoch += 1;
        state.is_processing = true;
        state.progress = 0.0;
        state.step = step.into();
        state.epoch
    }

    /// Update the step label, ignored when the epoch is stale.
    pub fn set_step(&self, epoch: u64, step: impl Into<String>) {
        let mut state = self.inner.lock();
        if state.epoch == epoch && state.is_processing {
            state.step = step.into();
        }
    }

    /// Update progress, ignored when the epoch is stale.
    pub fn set_progress(&self, epoch: u64, progress: f64) {
        let mut state = self.inner.lock();
        if state.epoch == epoch && state.is_processing {
            state.progress = progress.clamp(0.0, 100.0);
        }
    }

    /// Whether the given run is still the live one (not cancelled or
    /// superseded).
    pub fn is_current(&self, epoch: u64) -> bool {
        let state = self.inner.lock();
        state.epoch == epoch && state.is_processing
    }

    /// Leave processing state for the given run.
    pub fn finish_processing(&self, epoch: u64) {
        let mut state = self.inner.lock();
        if state.epoch == epoch {
            state.is_processing = false;
            state.progress = 0.0;
            state.step.clear();
        }
    }

    /// Cancel: bump the epoch so in-flight callbacks are orphaned, then
    /// clear the processing flags.
    pub fn cancel_processing(&self) {
        let mut state = self.inner.lock();
        state.epoch += 1;
        state.is_processing = false;
        state.progress = 0.0;
        state.step.clear();
    }

    /// Reset the whole session to its unbound initial state.
    pub fn reset(&self) {
        let mut state = self.inner.lock();
        let epoch = state.epoch + 1;
        *state = EditorState::initial();
        state.epoch = epoch;
    }
}

impl Default for EditorSession {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_binds_video_and_resets_edits() {
        let session = EditorSession::new();
        session.init("vid_a", "/videos/vid_a.mp4", 30.0);
        session.set_speed(2.0);
        session.set_trim_start(5.0);

        session.init("vid_b", "/videos/vid_b.mp4", 12.0);
        let params = session.params();
        assert_eq!(params.video_id.as_deref(), Some("vid_b"));
        assert_eq!(params.trim_start, 0.0);
        assert_eq!(params.trim_end, 12.0);
        assert_eq!(params.speed, 1.0);
        assert_eq!(params.music_volume, DEFAULT_MUSIC_VOLUME);
    }

    #[test]
    fn stale_epoch_progress_is_dropped() {
        let session = EditorSession::new();
        let old = session.begin_processing("Trimming video...");
        session.cancel_processing();

        session.set_progress(old, 55.0);
        assert_eq!(session.progress(), 0.0);
        assert!(!session.is_processing());
    }

    #[test]
    fn progress_is_clamped_to_percentage_range() {
        let session = EditorSession::new();
        let epoch = session.begin_processing("step");
        session.set_progress(epoch, 150.0);
        assert_eq!(session.progress(), 100.0);
        session.set_progress(epoch, -3.0);
        assert_eq!(session.progress(), 0.0);
    }

    #[test]
    fn music_volume_is_clamped() {
        let session = EditorSession::new();
        session.set_music_volume(1.7);
        assert_eq!(session.params().music_volume, 1.0);
    }
}

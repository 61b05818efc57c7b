//! Reel assembly session state.

use std::path::PathBuf;

use parking_lot::Mutex;

use crate::models::ReelClip;

#[derive(Debug, Default)]
struct ReelState {
    clips: Vec<ReelClip>,
    is_processing: bool,
    progress: f64,
    exported_uri: Option<PathBuf>,
    epoch: u64,
}

/// Transient reel session: an ordered clip list plus processing state.
///
/// `order` fields always form a dense 0..N-1 sequence matching list
/// position; every removal or reorder re-normalizes them.
pub struct ReelSession {
    inner: Mutex<ReelState>,
}

impl ReelSession {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(ReelState::default()),
        }
    }

    /// Append a clip at the end of the reel. The clip's `order` field is
    /// assigned from its list position.
    pub fn add_clip(&self, mut clip: ReelClip) {
        let mut state = self.inner.lock();
        clip.order = state.clips.len();
        state.clips.push(clip);
    }

    /// Remove a clip by id and re-normalize the remaining orders.
    pub fn remove_clip(&self, id: &str) {
        let mut state = self.inner.lock();
        state.clips.retain(|c| c.id != id);
        renumber(&mut state.clips);
    }

    /// Move a clip from one list position to another.
    pub fn reorder_clips(&self, from: usize, to: usize) {
        let mut state = self.inner.lock();
        if from >= state.clips.len() || to >= state.clips.len() {
            return;
        }
        let clip = state.clips.remove(from);
        state.clips.insert(to, clip);
        renumber(&mut state.clips);
    }

    /// Drop all clips, keeping processing state untouched.
    pub fn clear_clips(&self) {
        self.inner.lock().clips.clear();
    }

    /// Snapshot of the clip list in list order.
    pub fn clips(&self) -> Vec<ReelClip> {
        self.inner.lock().clips.clone()
    }

    pub fn is_processing(&self) -> bool {
        self.inner.lock().is_processing
    }

    pub fn progress(&self) -> f64 {
        self.inner.lock().progress
    }

    pub fn exported_uri(&self) -> Option<PathBuf> {
        self.inner.lock().exported_uri.clone()
    }

    /// Flip into processing state and return the epoch guarding this run.
    pub fn begin_processing(&self) -> u64 {
        let mut state = self.inner.lock();
        state.epoch += 1;
        state.is_processing = true;
        state.progress = 0.0;
        state.epoch
    }

    /// Update progress, ignored when the epoch is stale.
    pub fn set_progress(&self, epoch: u64, progress: f64) {
        let mut state = self.inner.lock();
        if state.epoch == epoch && state.is_processing {
            state.progress = progress.clamp(0.0, 100.0);
        }
    }

    /// Record a successful export and leave processing state.
    pub fn complete_export(&self, epoch: u64, uri: PathBuf) {
        let mut state = self.inner.lock();
        if state.epoch == epoch {
            state.exported_uri = Some(uri);
            state.is_processing = false;
            state.progress = 0.0;
        }
    }

    /// Leave processing state without touching `exported_uri`.
    pub fn finish_processing(&self, epoch: u64) {
        let mut state = self.inner.lock();
        if state.epoch == epoch {
            state.is_processing = false;
            state.progress = 0.0;
        }
    }

    /// Cancel: orphan in-flight callbacks and clear processing flags.
    pub fn cancel_processing(&self) {
        let mut state = self.inner.lock();
        state.epoch += 1;
        state.is_processing = false;
        state.progress = 0.0;
    }

    /// Reset the whole session, including the exported uri.
    pub fn reset(&self) {
        let mut state = self.inner.lock();
        let epoch = state.epoch + 1;
        *state = ReelState::default();
        state.epoch = epoch;
    }
}

impl Default for ReelSession {
    fn default() -> Self {
        Self::new()
    }
}

fn renumber(clips: &mut [ReelClip]) {
    for (i, clip) in clips.iter_mut().enumerate() {
        clip.order = i;
    }
}

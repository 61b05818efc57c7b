//! Reel assembly pipeline.
//!
//! Concatenates the reel session's ordered clips into one output file.
//! Progress is a single 0-100 percentage over the duration-weighted
//! total. On success the output path lands on the session as
//! `exported_uri`; registering it in the catalog is a separate,
//! explicit save flow.

use std::path::PathBuf;
use std::sync::Arc;

use crate::engine::{probe_duration, ConcatMode, TransformEngine, TransformKind, TransformRequest};
use crate::logging::{JobLogger, LogConfig};
use crate::session::ReelSession;
use crate::storage::VideoStorage;

use super::errors::{PipelineError, PipelineResult};
use super::step::{run_transform_step, StepRun};

/// Minimum number of clips a reel needs.
const MIN_REEL_CLIPS: usize = 2;

/// Terminal outcome of a reel run.
#[derive(Debug, Clone, PartialEq)]
pub enum ReelOutcome {
    /// Concatenation finished; the path is also stored on the session.
    Completed(PathBuf),
    /// The run was cancelled; `exported_uri` is untouched.
    Cancelled,
}

/// Coordinates N-ary clip concatenation.
pub struct ReelPipeline {
    storage: VideoStorage,
    engine: Arc<dyn TransformEngine>,
    log_dir: Option<PathBuf>,
}

impl ReelPipeline {
    pub fn new(storage: VideoStorage, engine: Arc<dyn TransformEngine>) -> Self {
        Self {
            storage,
            engine,
            log_dir: None,
        }
    }

    /// Write a per-job log file under this directory for every run.
    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = Some(dir.into());
        self
    }

    /// Concatenate the session's clips in `order` into a single reel.
    ///
    /// `mode` selects stream-copy (compatible encodings) or the
    /// re-encoding fallback for mixed codecs; the policy choosing
    /// between them belongs to the caller.
    pub fn create_reel(
        &self,
        session: &ReelSession,
        mode: ConcatMode,
    ) -> PipelineResult<ReelOutcome> {
        let mut clips = session.clips();
        if clips.len() < MIN_REEL_CLIPS {
            return Err(PipelineError::InsufficientClips { count: clips.len() });
        }
        clips.sort_by_key(|c| c.order);

        let epoch = session.begin_processing();
        let logger = JobLogger::new("reel", self.log_dir.as_deref(), LogConfig::default(), None);
        logger.phase("Concatenate");
        logger.info(&format!("{} clips, mode {:?}", clips.len(), mode));

        // Sum of known durations, probing only when a clip's duration
        // was never recorded.
        let mut total_duration = 0.0;
        for clip in &clips {
            total_duration += if clip.duration > 0.0 {
                clip.duration
            } else {
                probe_duration(&clip.video_uri).unwrap_or(0.0)
            };
        }

        let request = TransformRequest {
            kind: TransformKind::Concat { mode },
            inputs: clips.iter().map(|c| c.video_uri.clone()).collect(),
            output: self.storage.scratch_output("reel"),
        };

        let result = run_transform_step(self.engine.as_ref(), &request, total_duration, &|p| {
            session.set_progress(epoch, p);
            logger.progress(p as u32);
        })
        .map_err(|e| PipelineError::step_failed("concat", e));

        match result {
            Ok(StepRun::Completed(path)) => {
                session.complete_export(epoch, path.clone());
                logger.success(&format!("reel written to {}", path.display()));
                Ok(ReelOutcome::Completed(path))
            }
            Ok(StepRun::Cancelled) => {
                session.finish_processing(epoch);
                logger.info("reel creation cancelled");
                Ok(ReelOutcome::Cancelled)
            }
            Err(e) => {
                session.finish_processing(epoch);
                logger.error(&e.to_string());
                Err(e)
            }
        }
    }

    /// Cancel whatever this pipeline currently has in flight.
    pub fn cancel(&self, session: &ReelSession) {
        self.engine.cancel_all();
        session.cancel_processing();
    }
}

//! Single-video export pipeline.
//!
//! Sequences the conditional trim → speed → music-overlay steps, maps
//! each step's progress into its fixed share of the 0-100 range, and on
//! success registers the output as a new catalog entry. Failure at any
//! step aborts the rest and registers nothing; cancellation is a
//! distinct, silent outcome.

use std::path::PathBuf;
use std::sync::Arc;

use crate::catalog::VideoCatalog;
use crate::clock::Clock;
use crate::engine::{TransformEngine, TransformKind, TransformRequest};
use crate::logging::{JobLogger, LogConfig};
use crate::models::{VideoRecord, SPEED_OPTIONS};
use crate::session::{EditParams, EditorSession};
use crate::storage::{generate_video_id, VideoStorage};

use super::errors::{PipelineError, PipelineResult};
use super::step::{run_transform_step, StepRun};

/// Tolerance for float comparisons on speeds and durations.
const EPSILON: f64 = 1e-9;

/// Fixed progress bands per step, in declared step order. Bands do not
/// renormalize when steps are skipped; a skipped step's share is simply
/// never reported.
const TRIM_BAND: (f64, f64) = (0.0, 0.33);
const SPEED_BAND: (f64, f64) = (33.0, 0.33);
const MUSIC_BAND: (f64, f64) = (66.0, 0.34);

/// Terminal outcome of an export run.
#[derive(Debug, Clone, PartialEq)]
pub enum ExportOutcome {
    /// Export finished and this record was registered in the catalog.
    Completed(VideoRecord),
    /// The run was cancelled; nothing was registered.
    Cancelled,
}

/// Coordinates single-video editing exports.
pub struct ExportPipeline {
    catalog: Arc<VideoCatalog>,
    storage: VideoStorage,
    engine: Arc<dyn TransformEngine>,
    clock: Arc<dyn Clock>,
    log_dir: Option<PathBuf>,
}

impl ExportPipeline {
    pub fn new(
        catalog: Arc<VideoCatalog>,
        storage: VideoStorage,
        engine: Arc<dyn TransformEngine>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            catalog,
            storage,
            engine,
            clock,
            log_dir: None,
        }
    }

    /// Write a per-job log file under this directory for every run.
    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = Some(dir.into());
        self
    }

    /// Export the video with the session's current edit parameters.
    ///
    /// Validates inputs up front, runs the included steps in order, and
    /// registers the result. The session's processing state is reset on
    /// every exit path.
    pub fn export(
        &self,
        video_id: &str,
        session: &EditorSession,
    ) -> PipelineResult<ExportOutcome> {
        let video = self
            .catalog
            .get(video_id)
            .ok_or_else(|| PipelineError::VideoNotFound {
                id: video_id.to_string(),
            })?;
        let params = session.params();
        validate(&params, video.duration)?;

        let epoch = session.begin_processing("Preparing...");
        let logger = JobLogger::new(
            format!("export_{video_id}"),
            self.log_dir.as_deref(),
            LogConfig::default(),
            None,
        );
        logger.info(&format!(
            "export {}: trim [{:.3}, {:.3}], speed {}, music {}",
            video_id,
            params.trim_start,
            params.trim_end,
            params.speed,
            params.music_uri.is_some(),
        ));

        let result = self.run_steps(&video, &params, session, epoch, &logger);
        session.finish_processing(epoch);

        match &result {
            Ok(ExportOutcome::Completed(record)) => {
                logger.success(&format!("registered {}", record.id));
            }
            Ok(ExportOutcome::Cancelled) => logger.info("export cancelled"),
            Err(e) => logger.error(&e.to_string()),
        }
        result
    }

    /// Cancel whatever this pipeline currently has in flight.
    ///
    /// The engine only supports cancelling everything; the session epoch
    /// bump orphans any late callbacks from the killed invocation.
    pub fn cancel(&self, session: &EditorSession) {
        self.engine.cancel_all();
        session.cancel_processing();
    }

    fn run_steps(
        &self,
        video: &VideoRecord,
        params: &EditParams,
        session: &EditorSession,
        epoch: u64,
        logger: &JobLogger,
    ) -> PipelineResult<ExportOutcome> {
        let trimmed_duration = params.trim_end - params.trim_start;
        let final_duration = trimmed_duration / params.speed;
        let mut current = video.uri.clone();
        let mut steps_ran = 0usize;

        // Step 1: trim, when the bounds cut anything off.
        if params.trim_start > 0.0 || params.trim_end < video.duration - EPSILON {
            logger.phase("Trim");
            session.set_step(epoch, "Trimming video...");
            let request = TransformRequest::single(
                TransformKind::Trim {
                    start: params.trim_start,
                    end: params.trim_end,
                },
                current.clone(),
                self.storage.scratch_output("trimmed"),
            );
            match self.run_one(&request, trimmed_duration, session, epoch, TRIM_BAND, logger)? {
                StepRun::Completed(path) => current = path,
                StepRun::Cancelled => return Ok(ExportOutcome::Cancelled),
            }
            steps_ran += 1;
        }

        // Step 2: speed change.
        if (params.speed - 1.0).abs() > EPSILON {
            logger.phase("Speed");
            session.set_step(epoch, "Adjusting speed...");
            let request = TransformRequest::single(
                TransformKind::ChangeSpeed {
                    speed: params.speed,
                },
                current.clone(),
                self.storage.scratch_output("speed"),
            );
            match self.run_one(&request, final_duration, session, epoch, SPEED_BAND, logger)? {
                StepRun::Completed(path) => current = path,
                StepRun::Cancelled => return Ok(ExportOutcome::Cancelled),
            }
            steps_ran += 1;
        }

        // Step 3: music overlay, duration-preserving.
        if let Some(music_uri) = &params.music_uri {
            logger.phase("Music");
            session.set_step(epoch, "Adding music...");
            let request = TransformRequest::single(
                TransformKind::MusicOverlay {
                    music_uri: music_uri.clone(),
                    music_volume: params.music_volume,
                    original_volume: 1.0,
                },
                current.clone(),
                self.storage.scratch_output("music"),
            );
            match self.run_one(&request, final_duration, session, epoch, MUSIC_BAND, logger)? {
                StepRun::Completed(path) => current = path,
                StepRun::Cancelled => return Ok(ExportOutcome::Cancelled),
            }
            steps_ran += 1;
        }

        if !session.is_current(epoch) {
            return Ok(ExportOutcome::Cancelled);
        }

        // Commit the final artifact under a fresh id and register it
        // with zero highlights. A zero-step export still copies, so the
        // source file stays in place.
        let new_id = generate_video_id();
        let saved = if steps_ran > 0 {
            self.storage.commit_video(&current, &new_id)?
        } else {
            self.storage.copy_video(&current, &new_id)?
        };
        let record = VideoRecord::new(new_id, saved, final_duration, self.clock.now(), &[]);
        self.catalog.add(record.clone())?;
        session.set_progress(epoch, 100.0);

        Ok(ExportOutcome::Completed(record))
    }

    fn run_one(
        &self,
        request: &TransformRequest,
        expected_duration: f64,
        session: &EditorSession,
        epoch: u64,
        (base, share): (f64, f64),
        logger: &JobLogger,
    ) -> PipelineResult<StepRun> {
        if !session.is_current(epoch) {
            return Ok(StepRun::Cancelled);
        }
        let stage = request.kind.stage();
        let run = run_transform_step(self.engine.as_ref(), request, expected_duration, &|p| {
            session.set_progress(epoch, base + p * share);
            logger.progress((base + p * share) as u32);
        })
        .map_err(|e| PipelineError::step_failed(stage, e))?;
        Ok(run)
    }
}

fn validate(params: &EditParams, video_duration: f64) -> PipelineResult<()> {
    if params.trim_start < 0.0
        || params.trim_end <= params.trim_start
        || params.trim_end > video_duration + EPSILON
    {
        return Err(PipelineError::InvalidTrimRange {
            start: params.trim_start,
            end: params.trim_end,
            duration: video_duration,
        });
    }
    if !SPEED_OPTIONS
        .iter()
        .any(|s| (s - params.speed).abs() < EPSILON)
    {
        return Err(PipelineError::UnsupportedSpeed {
            speed: params.speed,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::engine::{EngineResult, EngineRun, ProgressFn, ProgressTick};
    use crate::models::HighlightMark;
    use chrono::Utc;
    use parking_lot::Mutex;
    use std::fs;

    /// Engine double that emits a short tick ramp per invocation and
    /// writes the requested output file.
    struct RampEngine {
        requests: Mutex<Vec<TransformRequest>>,
        fail_on_stage: Option<&'static str>,
        cancel_on_stage: Option<&'static str>,
    }

    impl RampEngine {
        fn new() -> Self {
            Self {
                requests: Mutex::new(Vec::new()),
                fail_on_stage: None,
                cancel_on_stage: None,
            }
        }

        fn expected_seconds(request: &TransformRequest) -> f64 {
            match &request.kind {
                TransformKind::Trim { start, end } => end - start,
                _ => 10.0,
            }
        }
    }

    impl TransformEngine for RampEngine {
        fn execute(
            &self,
            request: &TransformRequest,
            on_progress: ProgressFn<'_>,
        ) -> EngineResult<EngineRun> {
            self.requests.lock().push(request.clone());
            let stage = request.kind.stage();
            if self.cancel_on_stage == Some(stage) {
                return Ok(EngineRun::Cancelled);
            }
            if self.fail_on_stage == Some(stage) {
                return Err(crate::engine::EngineError::TransformFailed {
                    diagnostic: format!("{stage} exploded"),
                });
            }
            let total = Self::expected_seconds(request);
            for i in 1..=4 {
                on_progress(ProgressTick {
                    time_secs: total * (i as f64) / 4.0,
                });
            }
            fs::write(&request.output, b"processed").unwrap();
            Ok(EngineRun::Completed)
        }

        fn cancel_all(&self) {}
    }

    struct Fixture {
        _dir: tempfile::TempDir,
        catalog: Arc<VideoCatalog>,
        storage: VideoStorage,
        session: Arc<EditorSession>,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let storage = VideoStorage::new(dir.path().join("videos"), dir.path().join("scratch"));
        storage.ensure_dirs().unwrap();
        let catalog = Arc::new(VideoCatalog::open(dir.path(), storage.clone()));
        Fixture {
            _dir: dir,
            catalog,
            storage,
            session: Arc::new(EditorSession::new()),
        }
    }

    fn seed_video(fx: &Fixture, id: &str, duration: f64) -> VideoRecord {
        let uri = fx.storage.video_path(id);
        fs::write(&uri, b"source").unwrap();
        let record = VideoRecord::new(id, uri, duration, Utc::now(), &[HighlightMark {
            timestamp: 1.0,
        }]);
        fx.catalog.add(record.clone()).unwrap();
        record
    }

    fn pipeline(fx: &Fixture, engine: Arc<dyn TransformEngine>) -> ExportPipeline {
        ExportPipeline::new(
            Arc::clone(&fx.catalog),
            fx.storage.clone(),
            engine,
            Arc::new(ManualClock::new(1_700_000_000_000)),
        )
    }

    #[test]
    fn trim_only_export_registers_trimmed_duration() {
        let fx = fixture();
        seed_video(&fx, "vid_src", 60.0);
        fx.session.init("vid_src", fx.storage.video_path("vid_src"), 60.0);
        fx.session.set_trim_start(10.0);
        fx.session.set_trim_end(25.0);

        let engine = Arc::new(RampEngine::new());
        let outcome = pipeline(&fx, engine.clone())
            .export("vid_src", &fx.session)
            .unwrap();

        let record = match outcome {
            ExportOutcome::Completed(r) => r,
            other => panic!("unexpected outcome: {other:?}"),
        };
        assert!((record.duration - 15.0).abs() < 1e-6);
        assert!(record.highlights.is_empty());
        assert!(record.uri.exists());
        assert_eq!(fx.catalog.videos()[0].id, record.id);

        // Only one step should have run.
        assert_eq!(engine.requests.lock().len(), 1);
        assert!(!fx.session.is_processing());
    }

    #[test]
    fn speed_only_export_divides_duration() {
        let fx = fixture();
        seed_video(&fx, "vid_fast", 30.0);
        fx.session.init("vid_fast", fx.storage.video_path("vid_fast"), 30.0);
        fx.session.set_speed(2.0);

        let outcome = pipeline(&fx, Arc::new(RampEngine::new()))
            .export("vid_fast", &fx.session)
            .unwrap();

        match outcome {
            ExportOutcome::Completed(r) => assert!((r.duration - 15.0).abs() < 1e-6),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn all_steps_run_in_declared_order() {
        let fx = fixture();
        seed_video(&fx, "vid_all", 20.0);
        fx.session.init("vid_all", fx.storage.video_path("vid_all"), 20.0);
        fx.session.set_trim_end(10.0);
        fx.session.set_speed(2.0);
        fx.session.set_music(Some("/music/track.mp3".into()));

        let engine = Arc::new(RampEngine::new());
        pipeline(&fx, engine.clone())
            .export("vid_all", &fx.session)
            .unwrap();

        let stages: Vec<_> = engine
            .requests
            .lock()
            .iter()
            .map(|r| r.kind.stage())
            .collect();
        assert_eq!(stages, vec!["trim", "speed", "music"]);
    }

    /// Wraps RampEngine and samples the session's progress value after
    /// every tick, so the fixed-band mapping can be observed.
    struct RecordingEngine {
        inner: RampEngine,
        session: Arc<EditorSession>,
        seen: Arc<Mutex<Vec<f64>>>,
    }

    impl TransformEngine for RecordingEngine {
        fn execute(
            &self,
            request: &TransformRequest,
            on_progress: ProgressFn<'_>,
        ) -> EngineResult<EngineRun> {
            self.inner.execute(request, &|tick| {
                on_progress(tick);
                self.seen.lock().push(self.session.progress());
            })
        }

        fn cancel_all(&self) {}
    }

    #[test]
    fn progress_is_monotonic_and_uses_fixed_bands() {
        let fx = fixture();
        seed_video(&fx, "vid_p", 20.0);
        fx.session.init("vid_p", fx.storage.video_path("vid_p"), 20.0);
        fx.session.set_trim_end(10.0);
        fx.session.set_speed(2.0);
        fx.session.set_music(Some("/music/track.mp3".into()));

        let seen = Arc::new(Mutex::new(Vec::new()));
        let engine = Arc::new(RecordingEngine {
            inner: RampEngine::new(),
            session: Arc::clone(&fx.session),
            seen: Arc::clone(&seen),
        });

        pipeline(&fx, engine).export("vid_p", &fx.session).unwrap();

        let values = seen.lock().clone();
        // 4 ticks per step, 3 steps.
        assert_eq!(values.len(), 12);
        assert!(values.windows(2).all(|w| w[1] >= w[0] - 1e-9));
        assert!(values.iter().all(|&v| (0.0..=100.0).contains(&v)));
        // Trim band tops out at 33, speed at 66, music at 100.
        assert!((values[3] - 33.0).abs() < 1e-6);
        assert!((values[7] - 66.0).abs() < 1e-6);
        assert!((values[11] - 100.0).abs() < 1e-6);
    }

    #[test]
    fn failure_registers_nothing_and_resets_state() {
        let fx = fixture();
        seed_video(&fx, "vid_bad", 20.0);
        fx.session.init("vid_bad", fx.storage.video_path("vid_bad"), 20.0);
        fx.session.set_trim_end(10.0);
        fx.session.set_speed(2.0);

        let mut engine = RampEngine::new();
        engine.fail_on_stage = Some("speed");
        let before = fx.catalog.len();

        let err = pipeline(&fx, Arc::new(engine))
            .export("vid_bad", &fx.session)
            .unwrap_err();

        assert!(matches!(err, PipelineError::StepFailed { stage: "speed", .. }));
        assert_eq!(fx.catalog.len(), before);
        assert!(!fx.session.is_processing());
    }

    #[test]
    fn cancellation_is_silent_and_registers_nothing() {
        let fx = fixture();
        seed_video(&fx, "vid_c", 20.0);
        fx.session.init("vid_c", fx.storage.video_path("vid_c"), 20.0);
        fx.session.set_trim_end(10.0);

        let mut engine = RampEngine::new();
        engine.cancel_on_stage = Some("trim");
        let before = fx.catalog.len();

        let outcome = pipeline(&fx, Arc::new(engine))
            .export("vid_c", &fx.session)
            .unwrap();

        assert_eq!(outcome, ExportOutcome::Cancelled);
        assert_eq!(fx.catalog.len(), before);
        assert!(!fx.session.is_processing());
    }

    #[test]
    fn unknown_video_fails_before_any_work() {
        let fx = fixture();
        fx.session.init("vid_ghost", "/nowhere.mp4", 10.0);
        let engine = Arc::new(RampEngine::new());
        let err = pipeline(&fx, engine.clone())
            .export("vid_ghost", &fx.session)
            .unwrap_err();
        assert!(matches!(err, PipelineError::VideoNotFound { .. }));
        assert!(engine.requests.lock().is_empty());
    }

    #[test]
    fn invalid_trim_range_is_rejected() {
        let fx = fixture();
        seed_video(&fx, "vid_t", 10.0);
        fx.session.init("vid_t", fx.storage.video_path("vid_t"), 10.0);
        fx.session.set_trim_start(8.0);
        fx.session.set_trim_end(5.0);

        let err = pipeline(&fx, Arc::new(RampEngine::new()))
            .export("vid_t", &fx.session)
            .unwrap_err();
        assert!(matches!(err, PipelineError::InvalidTrimRange { .. }));

        fx.session.set_trim_start(0.0);
        fx.session.set_trim_end(15.0);
        let err = pipeline(&fx, Arc::new(RampEngine::new()))
            .export("vid_t", &fx.session)
            .unwrap_err();
        assert!(matches!(err, PipelineError::InvalidTrimRange { .. }));
    }

    #[test]
    fn unsupported_speed_is_rejected() {
        let fx = fixture();
        seed_video(&fx, "vid_s", 10.0);
        fx.session.init("vid_s", fx.storage.video_path("vid_s"), 10.0);
        fx.session.set_speed(3.0);

        let err = pipeline(&fx, Arc::new(RampEngine::new()))
            .export("vid_s", &fx.session)
            .unwrap_err();
        assert!(matches!(err, PipelineError::UnsupportedSpeed { .. }));
    }

    #[test]
    fn zero_step_export_copies_the_source() {
        let fx = fixture();
        let source = seed_video(&fx, "vid_id", 10.0);
        fx.session.init("vid_id", fx.storage.video_path("vid_id"), 10.0);

        let outcome = pipeline(&fx, Arc::new(RampEngine::new()))
            .export("vid_id", &fx.session)
            .unwrap();

        match outcome {
            ExportOutcome::Completed(r) => {
                assert_ne!(r.id, source.id);
                assert!(r.uri.exists());
                // The original file must still be there.
                assert!(source.uri.exists());
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
}

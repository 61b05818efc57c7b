//! Single transform step execution.
//!
//! Wraps one engine invocation: subscribes a progress listener that
//! normalizes elapsed media time against the expected output duration,
//! awaits the terminal status, and maps failure into a typed error.

use std::path::PathBuf;

use crate::engine::{EngineError, EngineRun, ProgressTick, TransformEngine, TransformRequest};

use super::errors::{StepError, StepResult};

/// Terminal result of one step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepRun {
    /// The step finished and left its output at the given path.
    Completed(PathBuf),
    /// The engine invocation was cancelled; no output is guaranteed.
    Cancelled,
}

/// Execute one transform through the engine.
///
/// Progress ticks are normalized to `min(elapsed / expected * 100, 100)`
/// and forwarded to `on_progress` as a 0-100 percentage. On failure the
/// caller is responsible for ignoring or deleting any partial output.
pub fn run_transform_step(
    engine: &dyn TransformEngine,
    request: &TransformRequest,
    expected_duration: f64,
    on_progress: &(dyn Fn(f64) + Send + Sync),
) -> StepResult<StepRun> {
    let stage = request.kind.stage();
    let expected = expected_duration.max(f64::EPSILON);

    let forward = move |tick: ProgressTick| {
        let percentage = (tick.time_secs / expected * 100.0).min(100.0);
        on_progress(percentage);
    };

    match engine.execute(request, &forward) {
        Ok(EngineRun::Completed) => {
            if request.output.exists() {
                Ok(StepRun::Completed(request.output.clone()))
            } else {
                Err(StepError::MissingOutput {
                    stage,
                    path: request.output.display().to_string(),
                })
            }
        }
        Ok(EngineRun::Cancelled) => Ok(StepRun::Cancelled),
        Err(EngineError::TransformFailed { diagnostic }) => {
            Err(StepError::TransformFailed { stage, diagnostic })
        }
        Err(source) => Err(StepError::Engine { stage, source }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{ConcatMode, EngineResult, ProgressFn, TransformKind};
    use parking_lot::Mutex;
    use std::fs;

    /// Engine double that emits fixed ticks, then succeeds, fails, or
    /// reports cancellation.
    struct ScriptedEngine {
        ticks: Vec<f64>,
        outcome: ScriptedOutcome,
    }

    enum ScriptedOutcome {
        Succeed,
        Cancel,
        Fail(&'static str),
    }

    impl TransformEngine for ScriptedEngine {
        fn execute(
            &self,
            request: &TransformRequest,
            on_progress: ProgressFn<'_>,
        ) -> EngineResult<EngineRun> {
            for &t in &self.ticks {
                on_progress(ProgressTick { time_secs: t });
            }
            match self.outcome {
                ScriptedOutcome::Succeed => {
                    fs::write(&request.output, b"out").unwrap();
                    Ok(EngineRun::Completed)
                }
                ScriptedOutcome::Cancel => Ok(EngineRun::Cancelled),
                ScriptedOutcome::Fail(diag) => Err(EngineError::TransformFailed {
                    diagnostic: diag.to_string(),
                }),
            }
        }

        fn cancel_all(&self) {}
    }

    fn trim_request(output: PathBuf) -> TransformRequest {
        TransformRequest::single(
            TransformKind::Trim {
                start: 0.0,
                end: 10.0,
            },
            "/in.mp4",
            output,
        )
    }

    #[test]
    fn progress_is_normalized_and_capped() {
        let dir = tempfile::tempdir().unwrap();
        let engine = ScriptedEngine {
            ticks: vec![2.5, 5.0, 10.0, 40.0],
            outcome: ScriptedOutcome::Succeed,
        };
        let seen = Mutex::new(Vec::new());

        let run = run_transform_step(
            &engine,
            &trim_request(dir.path().join("out.mp4")),
            10.0,
            &|p| seen.lock().push(p),
        )
        .unwrap();

        assert!(matches!(run, StepRun::Completed(_)));
        assert_eq!(*seen.lock(), vec![25.0, 50.0, 100.0, 100.0]);
    }

    #[test]
    fn failure_carries_stage_and_diagnostic() {
        let dir = tempfile::tempdir().unwrap();
        let engine = ScriptedEngine {
            ticks: vec![],
            outcome: ScriptedOutcome::Fail("broken filter graph"),
        };

        let err = run_transform_step(
            &engine,
            &trim_request(dir.path().join("out.mp4")),
            10.0,
            &|_| {},
        )
        .unwrap_err();

        match err {
            StepError::TransformFailed { stage, diagnostic } => {
                assert_eq!(stage, "trim");
                assert!(diagnostic.contains("broken filter graph"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn cancellation_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let engine = ScriptedEngine {
            ticks: vec![1.0],
            outcome: ScriptedOutcome::Cancel,
        };
        let run = run_transform_step(
            &engine,
            &trim_request(dir.path().join("out.mp4")),
            10.0,
            &|_| {},
        )
        .unwrap();
        assert_eq!(run, StepRun::Cancelled);
    }

    #[test]
    fn success_without_output_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        struct LyingEngine;
        impl TransformEngine for LyingEngine {
            fn execute(
                &self,
                _request: &TransformRequest,
                _on_progress: ProgressFn<'_>,
            ) -> EngineResult<EngineRun> {
                Ok(EngineRun::Completed)
            }
            fn cancel_all(&self) {}
        }

        let req = TransformRequest {
            kind: TransformKind::Concat {
                mode: ConcatMode::StreamCopy,
            },
            inputs: vec!["/a.mp4".into(), "/b.mp4".into()],
            output: dir.path().join("missing.mp4"),
        };
        let err = run_transform_step(&LyingEngine, &req, 10.0, &|_| {}).unwrap_err();
        assert!(matches!(err, StepError::MissingOutput { stage: "concat", .. }));
    }
}

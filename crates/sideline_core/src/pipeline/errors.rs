//! Error types for the processing pipelines.
//!
//! Errors carry context that chains through layers:
//! Pipeline → Step → Engine.

use thiserror::Error;

use crate::catalog::CatalogError;
use crate::engine::EngineError;
use crate::storage::StorageError;

/// Top-level pipeline error surfaced to callers.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A transform step failed; remaining steps were aborted and nothing
    /// was registered in the catalog.
    #[error("pipeline failed at step '{stage}': {source}")]
    StepFailed {
        stage: &'static str,
        #[source]
        source: StepError,
    },

    /// The referenced video id does not exist in the catalog.
    #[error("video not found: {id}")]
    VideoNotFound { id: String },

    /// Trim bounds were invalid for the source video.
    #[error("invalid trim range [{start}, {end}] for duration {duration}")]
    InvalidTrimRange {
        start: f64,
        end: f64,
        duration: f64,
    },

    /// The requested speed is not one of the supported options.
    #[error("unsupported playback speed: {speed}")]
    UnsupportedSpeed { speed: f64 },

    /// Reel creation needs at least two clips.
    #[error("reel creation requires at least 2 clips, got {count}")]
    InsufficientClips { count: usize },

    /// Catalog mutation or persistence failed.
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// Library filesystem operation failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl PipelineError {
    /// Wrap a step failure with its stage name.
    pub fn step_failed(stage: &'static str, source: StepError) -> Self {
        Self::StepFailed { stage, source }
    }
}

/// Error from a single transform step.
#[derive(Error, Debug)]
pub enum StepError {
    /// The engine invocation returned non-success. `diagnostic` is the
    /// raw engine log output, preserved for display and logging.
    #[error("transform '{stage}' failed: {diagnostic}")]
    TransformFailed {
        stage: &'static str,
        diagnostic: String,
    },

    /// The engine could not run the transform at all (spawn, I/O,
    /// missing input).
    #[error("engine error in '{stage}': {source}")]
    Engine {
        stage: &'static str,
        #[source]
        source: EngineError,
    },

    /// The engine reported success but left no output file.
    #[error("transform '{stage}' produced no output at {path}")]
    MissingOutput { stage: &'static str, path: String },
}

/// Result type for step operations.
pub type StepResult<T> = Result<T, StepError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

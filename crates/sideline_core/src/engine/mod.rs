//! Media transform engine boundary.
//!
//! The engine executes one declarative transform (trim, speed change,
//! music overlay, concatenation) against file-backed input, reporting
//! elapsed media time while it runs. Coordinators depend only on this
//! trait; the FFmpeg subprocess implementation lives in
//! [`FfmpegEngine`].

mod command;
mod ffmpeg;

pub use command::build_args;
pub use ffmpeg::{extract_thumbnail, probe_duration, FfmpegEngine};

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// How multiple clips are joined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConcatMode {
    /// Concat demuxer with stream copy. Fast, but only safe when every
    /// clip shares a compatible encoding.
    StreamCopy,
    /// Full re-encode through the concat filter. Works for mixed codecs.
    Reencode,
}

/// A single declarative transform.
#[derive(Debug, Clone, PartialEq)]
pub enum TransformKind {
    /// Cut `[start, end)` out of the input (seconds).
    Trim { start: f64, end: f64 },
    /// Change playback speed. Video timestamps scale by `1/speed`; the
    /// audio tempo filter is chained outside its native [0.5, 2.0] range.
    ChangeSpeed { speed: f64 },
    /// Mix a music track under the original audio. Does not change
    /// duration (`duration=first`).
    MusicOverlay {
        music_uri: PathBuf,
        music_volume: f64,
        original_volume: f64,
    },
    /// Join all inputs in order into a single output.
    Concat { mode: ConcatMode },
}

impl TransformKind {
    /// Short stage name used in errors and logs.
    pub fn stage(&self) -> &'static str {
        match self {
            TransformKind::Trim { .. } => "trim",
            TransformKind::ChangeSpeed { .. } => "speed",
            TransformKind::MusicOverlay { .. } => "music",
            TransformKind::Concat { .. } => "concat",
        }
    }

    /// Prefix for scratch output files produced by this transform.
    pub fn scratch_prefix(&self) -> &'static str {
        match self {
            TransformKind::Trim { .. } => "trimmed",
            TransformKind::ChangeSpeed { .. } => "speed",
            TransformKind::MusicOverlay { .. } => "music",
            TransformKind::Concat { .. } => "reel",
        }
    }
}

/// One engine invocation: inputs, the transform, and where the result
/// goes.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformRequest {
    pub kind: TransformKind,
    /// Input file(s); more than one only for `Concat`.
    pub inputs: Vec<PathBuf>,
    /// Output path in scratch space. The engine leaves a file here on
    /// success and guarantees nothing about it on failure.
    pub output: PathBuf,
}

impl TransformRequest {
    /// Single-input request.
    pub fn single(kind: TransformKind, input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            inputs: vec![input.into()],
            output: output.into(),
        }
    }
}

/// One progress tick from a running transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressTick {
    /// Elapsed media time in seconds.
    pub time_secs: f64,
}

/// Progress observer for a running transform.
pub type ProgressFn<'a> = &'a (dyn Fn(ProgressTick) + Send + Sync);

/// Terminal outcome of a successful engine call.
///
/// Cancellation is a distinct outcome, not an error: a cancelled run
/// resets coordinator state silently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineRun {
    Completed,
    Cancelled,
}

/// Errors from the engine boundary.
#[derive(Error, Debug)]
pub enum EngineError {
    /// An input file was missing before the transform started.
    #[error("input file not found: {path}")]
    InputNotFound { path: String },

    /// Failed to spawn the external tool.
    #[error("failed to spawn {tool}: {source}")]
    SpawnFailed {
        tool: String,
        #[source]
        source: io::Error,
    },

    /// The transform ran and returned non-success; `diagnostic` carries
    /// the tool's raw log output.
    #[error("transform failed: {diagnostic}")]
    TransformFailed { diagnostic: String },

    /// I/O error around the invocation (list files, pipes).
    #[error("I/O error in {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: io::Error,
    },
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Black-box capability executing declarative media transforms.
pub trait TransformEngine: Send + Sync {
    /// Execute one transform, reporting progress ticks until a terminal
    /// state is reached.
    fn execute(&self, request: &TransformRequest, on_progress: ProgressFn<'_>)
        -> EngineResult<EngineRun>;

    /// Cancel every invocation currently running on this engine.
    ///
    /// The engine has no per-job handles; callers track which logical
    /// operation the cancellation was meant for.
    fn cancel_all(&self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_names_are_stable() {
        assert_eq!(TransformKind::Trim { start: 0.0, end: 1.0 }.stage(), "trim");
        assert_eq!(
            TransformKind::Concat {
                mode: ConcatMode::StreamCopy
            }
            .scratch_prefix(),
            "reel"
        );
    }
}

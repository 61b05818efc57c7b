//! FFmpeg subprocess engine.
//!
//! Spawns `ffmpeg` per transform with `-progress pipe:1`, parses elapsed
//! media time ticks from stdout, and collects stderr as the failure
//! diagnostic. Cancellation is engine-wide: every in-flight invocation
//! registers a flag, and `cancel_all` trips all of them.

use std::fs;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;

use super::command::build_args;
use super::{
    ConcatMode, EngineError, EngineResult, EngineRun, ProgressFn, ProgressTick, TransformEngine,
    TransformKind, TransformRequest,
};

/// Transform engine backed by the `ffmpeg` binary.
pub struct FfmpegEngine {
    /// Cancel flags of every invocation currently running.
    active: Mutex<Vec<Arc<AtomicBool>>>,
}

impl FfmpegEngine {
    pub fn new() -> Self {
        Self {
            active: Mutex::new(Vec::new()),
        }
    }

    fn register(&self) -> Arc<AtomicBool> {
        let flag = Arc::new(AtomicBool::new(false));
        self.active.lock().push(Arc::clone(&flag));
        flag
    }

    fn unregister(&self, flag: &Arc<AtomicBool>) {
        self.active.lock().retain(|f| !Arc::ptr_eq(f, flag));
    }

    fn run(
        &self,
        request: &TransformRequest,
        concat_list: Option<&Path>,
        on_progress: ProgressFn<'_>,
        cancelled: &Arc<AtomicBool>,
    ) -> EngineResult<EngineRun> {
        let mut cmd = Command::new("ffmpeg");
        cmd.arg("-hide_banner")
            .arg("-y")
            .arg("-nostdin")
            .arg("-nostats")
            .arg("-progress")
            .arg("pipe:1")
            .args(build_args(request, concat_list))
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        tracing::debug!("running ffmpeg: {:?}", cmd);

        let mut child = cmd.spawn().map_err(|e| EngineError::SpawnFailed {
            tool: "ffmpeg".to_string(),
            source: e,
        })?;

        // Drain stderr on its own thread so a chatty ffmpeg never blocks
        // on a full pipe while we read progress from stdout.
        let mut stderr = child.stderr.take().ok_or_else(|| EngineError::Io {
            operation: "capture ffmpeg stderr".to_string(),
            source: std::io::Error::other("stderr not piped"),
        })?;
        let stderr_thread = thread::spawn(move || {
            let mut buf = String::new();
            let _ = stderr.read_to_string(&mut buf);
            buf
        });

        let stdout = child.stdout.take().ok_or_else(|| EngineError::Io {
            operation: "capture ffmpeg stdout".to_string(),
            source: std::io::Error::other("stdout not piped"),
        })?;

        let mut was_cancelled = false;
        for line in BufReader::new(stdout).lines() {
            if cancelled.load(Ordering::SeqCst) {
                was_cancelled = true;
                kill_quietly(&mut child);
                break;
            }
            let line = match line {
                Ok(line) => line,
                Err(_) => break,
            };
            if let Some(time_secs) = parse_progress_line(&line) {
                on_progress(ProgressTick { time_secs });
            }
        }

        let status = child.wait().map_err(|e| EngineError::Io {
            operation: "wait for ffmpeg".to_string(),
            source: e,
        })?;
        let diagnostic = stderr_thread.join().unwrap_or_default();

        // Cancellation intent wins over whatever exit code the killed
        // process reports.
        if was_cancelled || cancelled.load(Ordering::SeqCst) {
            tracing::info!("ffmpeg invocation cancelled");
            return Ok(EngineRun::Cancelled);
        }

        if status.success() {
            Ok(EngineRun::Completed)
        } else {
            Err(EngineError::TransformFailed {
                diagnostic: if diagnostic.trim().is_empty() {
                    format!("ffmpeg exited with code {:?}", status.code())
                } else {
                    diagnostic
                },
            })
        }
    }
}

impl Default for FfmpegEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TransformEngine for FfmpegEngine {
    fn execute(
        &self,
        request: &TransformRequest,
        on_progress: ProgressFn<'_>,
    ) -> EngineResult<EngineRun> {
        for input in &request.inputs {
            if !input.exists() {
                return Err(EngineError::InputNotFound {
                    path: input.display().to_string(),
                });
            }
        }

        // Stream-copy concat goes through the demuxer and needs a list
        // file next to the output; it is removed on every exit path.
        let concat_list = match &request.kind {
            TransformKind::Concat {
                mode: ConcatMode::StreamCopy,
            } => Some(write_concat_list(request)?),
            _ => None,
        };

        let cancelled = self.register();
        let result = self.run(request, concat_list.as_deref(), on_progress, &cancelled);
        self.unregister(&cancelled);

        if let Some(list) = concat_list {
            let _ = fs::remove_file(list);
        }
        result
    }

    fn cancel_all(&self) {
        let active = self.active.lock();
        tracing::info!("cancelling {} active ffmpeg invocation(s)", active.len());
        for flag in active.iter() {
            flag.store(true, Ordering::SeqCst);
        }
    }
}

fn kill_quietly(child: &mut Child) {
    let _ = child.kill();
}

/// Write the concat demuxer list file for a request.
fn write_concat_list(request: &TransformRequest) -> EngineResult<PathBuf> {
    let list_path = request.output.with_extension("list.txt");
    let content: String = request
        .inputs
        .iter()
        .map(|p| format!("file '{}'\n", p.display()))
        .collect();
    fs::write(&list_path, content).map_err(|e| EngineError::Io {
        operation: "write concat list".to_string(),
        source: e,
    })?;
    Ok(list_path)
}

/// Parse one `-progress` key=value line into elapsed seconds.
///
/// `out_time_ms` carries microseconds despite its name; `out_time_us`
/// is the newer spelling of the same value.
fn parse_progress_line(line: &str) -> Option<f64> {
    let value = line
        .strip_prefix("out_time_us=")
        .or_else(|| line.strip_prefix("out_time_ms="))?;
    let micros: i64 = value.trim().parse().ok()?;
    Some((micros.max(0) as f64) / 1_000_000.0)
}

/// Get the duration of a media file in seconds using ffprobe.
pub fn probe_duration(input_path: &Path) -> EngineResult<f64> {
    if !input_path.exists() {
        return Err(EngineError::InputNotFound {
            path: input_path.display().to_string(),
        });
    }

    let output = Command::new("ffprobe")
        .arg("-v")
        .arg("error")
        .arg("-show_entries")
        .arg("format=duration")
        .arg("-of")
        .arg("default=noprint_wrappers=1:nokey=1")
        .arg(input_path)
        .output()
        .map_err(|e| EngineError::SpawnFailed {
            tool: "ffprobe".to_string(),
            source: e,
        })?;

    if !output.status.success() {
        return Err(EngineError::TransformFailed {
            diagnostic: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }

    let text = String::from_utf8_lossy(&output.stdout);
    text.trim()
        .parse::<f64>()
        .map_err(|e| EngineError::TransformFailed {
            diagnostic: format!("failed to parse ffprobe duration: {e}"),
        })
}

/// Extract a single frame as a JPEG thumbnail.
pub fn extract_thumbnail(video: &Path, at_secs: f64, output: &Path) -> EngineResult<()> {
    if !video.exists() {
        return Err(EngineError::InputNotFound {
            path: video.display().to_string(),
        });
    }

    let result = Command::new("ffmpeg")
        .arg("-hide_banner")
        .arg("-y")
        .arg("-nostdin")
        .arg("-ss")
        .arg(format!("{at_secs:.3}"))
        .arg("-i")
        .arg(video)
        .arg("-vframes")
        .arg("1")
        .arg("-q:v")
        .arg("2")
        .arg(output)
        .output()
        .map_err(|e| EngineError::SpawnFailed {
            tool: "ffmpeg".to_string(),
            source: e,
        })?;

    if result.status.success() {
        Ok(())
    } else {
        Err(EngineError::TransformFailed {
            diagnostic: String::from_utf8_lossy(&result.stderr).into_owned(),
        })
    }
}

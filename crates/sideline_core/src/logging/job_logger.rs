//! Per-job logger with file and callback output.
//!
//! Each pipeline run gets its own logger that writes to a dedicated log
//! file, forwards lines to an optional callback, filters noisy progress
//! updates, and keeps a tail buffer for failure diagnosis.

use std::collections::VecDeque;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use parking_lot::Mutex;

use super::types::{LogCallback, LogConfig, LogLevel};

/// Per-job logger with dual output (file + callback).
///
/// File creation is best-effort: when the log directory cannot be
/// created the logger still forwards to the callback and tracing.
pub struct JobLogger {
    job_name: String,
    log_path: Option<PathBuf>,
    file_writer: Mutex<Option<BufWriter<File>>>,
    callback: Mutex<Option<LogCallback>>,
    config: LogConfig,
    tail_buffer: Mutex<VecDeque<String>>,
    last_progress: Mutex<u32>,
}

impl JobLogger {
    /// Create a logger for a job, writing to `<log_dir>/<job>.log`.
    pub fn new(
        job_name: impl Into<String>,
        log_dir: Option<&Path>,
        config: LogConfig,
        callback: Option<LogCallback>,
    ) -> Self {
        let job_name = job_name.into();
        let (log_path, file_writer) = match log_dir {
            Some(dir) => match open_log_file(dir, &job_name) {
                Ok((path, writer)) => (Some(path), Some(writer)),
                Err(e) => {
                    tracing::warn!("failed to open log file for '{}': {}", job_name, e);
                    (None, None)
                }
            },
            None => (None, None),
        };

        Self {
            job_name,
            log_path,
            file_writer: Mutex::new(file_writer),
            callback: Mutex::new(callback),
            config,
            tail_buffer: Mutex::new(VecDeque::with_capacity(32)),
            last_progress: Mutex::new(0),
        }
    }

    pub fn job_name(&self) -> &str {
        &self.job_name
    }

    pub fn log_path(&self) -> Option<&Path> {
        self.log_path.as_deref()
    }

    pub fn log(&self, level: LogLevel, message: &str) {
        if level < self.config.level {
            return;
        }
        let formatted = self.format_message(message);
        self.output(&formatted);
    }

    pub fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, &format!("[DEBUG] {message}"));
    }

    pub fn info(&self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    pub fn warn(&self, message: &str) {
        self.log(LogLevel::Warn, &format!("[WARNING] {message}"));
    }

    pub fn error(&self, message: &str) {
        self.log(LogLevel::Error, &format!("[ERROR] {message}"));
    }

    /// Log a phase marker: `=== Phase ===`.
    pub fn phase(&self, phase_name: &str) {
        self.log(LogLevel::Info, &format!("=== {phase_name} ==="));
    }

    pub fn success(&self, message: &str) {
        self.log(LogLevel::Info, &format!("[SUCCESS] {message}"));
    }

    /// Log a progress update, filtered to configured step intervals.
    ///
    /// Returns true if the line was logged.
    pub fn progress(&self, percent: u32) -> bool {
        {
            let mut last = self.last_progress.lock();
            let step = self.config.progress_step.max(1);
            if percent / step <= *last / step && percent < 100 && percent != 0 {
                return false;
            }
            *last = percent;
        }
        self.log(LogLevel::Info, &format!("Progress: {percent}%"));
        true
    }

    /// Record an external tool's output line in the tail buffer.
    pub fn output_line(&self, line: &str) {
        let mut buffer = self.tail_buffer.lock();
        if buffer.len() >= self.config.error_tail {
            buffer.pop_front();
        }
        buffer.push_back(line.to_string());
    }

    /// Recent external output, for error diagnosis.
    pub fn tail(&self) -> Vec<String> {
        self.tail_buffer.lock().iter().cloned().collect()
    }

    pub fn flush(&self) {
        if let Some(ref mut writer) = *self.file_writer.lock() {
            let _ = writer.flush();
        }
    }

    fn format_message(&self, message: &str) -> String {
        if self.config.show_timestamps {
            format!("[{}] {}", Local::now().format("%H:%M:%S"), message)
        } else {
            message.to_string()
        }
    }

    fn output(&self, formatted: &str) {
        if let Some(ref mut writer) = *self.file_writer.lock() {
            let _ = writeln!(writer, "{formatted}");
        }
        if let Some(ref callback) = *self.callback.lock() {
            callback(formatted);
        }
        tracing::debug!(job = %self.job_name, "{}", formatted);
    }
}

impl Drop for JobLogger {
    fn drop(&mut self) {
        self.flush();
    }
}

fn open_log_file(dir: &Path, job_name: &str) -> std::io::Result<(PathBuf, BufWriter<File>)> {
    fs::create_dir_all(dir)?;
    let path = dir.join(format!("{}.log", sanitize_filename(job_name)));
    let file = File::create(&path)?;
    Ok((path, BufWriter::new(file)))
}

fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
        .collect()
}

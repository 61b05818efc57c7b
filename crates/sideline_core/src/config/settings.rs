//! Settings struct with TOML-based sections.

use serde::{Deserialize, Serialize};

use crate::logging::LogLevel;
use crate::session::DEFAULT_MUSIC_VOLUME;

/// Root settings structure containing all configuration sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Path-related settings.
    #[serde(default)]
    pub paths: PathSettings,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingSettings,

    /// Export defaults.
    #[serde(default)]
    pub export: ExportSettings,
}

/// Storage locations for the video library.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathSettings {
    /// Durable video library root.
    #[serde(default = "default_video_root")]
    pub video_root: String,

    /// Root folder for intermediate outputs. Safe to wipe between runs.
    #[serde(default = "default_scratch_root")]
    pub scratch_root: String,

    /// Folder for per-job log files.
    #[serde(default = "default_logs_folder")]
    pub logs_folder: String,
}

fn default_video_root() -> String {
    "videos".to_string()
}

fn default_scratch_root() -> String {
    ".scratch".to_string()
}

fn default_logs_folder() -> String {
    ".logs".to_string()
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            video_root: default_video_root(),
            scratch_root: default_scratch_root(),
            logs_folder: default_logs_folder(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Minimum level written to job logs.
    #[serde(default)]
    pub level: LogLevel,

    /// Progress update step percentage.
    #[serde(default = "default_progress_step")]
    pub progress_step: u32,

    /// Number of recent output lines kept for error diagnosis.
    #[serde(default = "default_error_tail")]
    pub error_tail: u32,

    /// Prefix job log lines with a timestamp.
    #[serde(default = "default_true")]
    pub show_timestamps: bool,
}

fn default_progress_step() -> u32 {
    10
}

fn default_error_tail() -> u32 {
    20
}

fn default_true() -> bool {
    true
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: LogLevel::default(),
            progress_step: default_progress_step(),
            error_tail: default_error_tail(),
            show_timestamps: true,
        }
    }
}

/// Defaults applied when a new edit session starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportSettings {
    /// Music track volume mixed under the original audio, 0.0 to 1.0.
    #[serde(default = "default_music_volume")]
    pub music_volume: f64,
}

fn default_music_volume() -> f64 {
    DEFAULT_MUSIC_VOLUME
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            music_volume: default_music_volume(),
        }
    }
}

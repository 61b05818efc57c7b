//! Video library filesystem layer.
//!
//! Owns the durable per-id layout (`<videoRoot>/<id>.mp4`, thumbnail at
//! `<videoRoot>/<id>_thumb.jpg`) and the scratch area where pipeline
//! steps write intermediate output. Ids are opaque strings to everything
//! else in the crate.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::Utc;
use rand::Rng;
use thiserror::Error;

use crate::models::VideoId;

/// Characters for the random id suffix (base36).
const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Length of the random id suffix.
const ID_SUFFIX_LEN: usize = 9;

/// Errors from library filesystem operations.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error in {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: io::Error,
    },
}

impl StorageError {
    fn io(operation: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
        }
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Generate a fresh video id: `vid_<millis>_<9-char base36 suffix>`.
///
/// Unique per process with overwhelming probability; treated as an
/// opaque string by every other component.
pub fn generate_video_id() -> VideoId {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..ID_SUFFIX_LEN)
        .map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char)
        .collect();
    format!("vid_{}_{}", Utc::now().timestamp_millis(), suffix)
}

/// Paths for the durable video library and the scratch output area.
#[derive(Debug, Clone)]
pub struct VideoStorage {
    video_root: PathBuf,
    scratch_root: PathBuf,
}

impl VideoStorage {
    /// Create a storage layout rooted at the given directories.
    ///
    /// Directories are not created until [`ensure_dirs`](Self::ensure_dirs)
    /// or the first commit.
    pub fn new(video_root: impl Into<PathBuf>, scratch_root: impl Into<PathBuf>) -> Self {
        Self {
            video_root: video_root.into(),
            scratch_root: scratch_root.into(),
        }
    }

    /// Root directory of the durable library.
    pub fn video_root(&self) -> &Path {
        &self.video_root
    }

    /// Root directory for intermediate pipeline output.
    pub fn scratch_root(&self) -> &Path {
        &self.scratch_root
    }

    /// Create both roots if missing. Idempotent.
    pub fn ensure_dirs(&self) -> StorageResult<()> {
        fs::create_dir_all(&self.video_root)
            .map_err(|e| StorageError::io("create video directory", e))?;
        fs::create_dir_all(&self.scratch_root)
            .map_err(|e| StorageError::io("create scratch directory", e))?;
        Ok(())
    }

    /// Canonical path of a stored video.
    pub fn video_path(&self, id: &str) -> PathBuf {
        self.video_root.join(format!("{id}.mp4"))
    }

    /// Canonical path of a stored video's thumbnail.
    pub fn thumbnail_path(&self, id: &str) -> PathBuf {
        self.video_root.join(format!("{id}_thumb.jpg"))
    }

    /// Fresh scratch output path: `<scratchRoot>/<prefix>_<timestamp>.mp4`.
    ///
    /// The microsecond timestamp keeps names from colliding across
    /// concurrently running pipelines.
    pub fn scratch_output(&self, prefix: &str) -> PathBuf {
        self.scratch_root
            .join(format!("{prefix}_{}.mp4", Utc::now().timestamp_micros()))
    }

    /// Move a finished file from scratch space into the durable library.
    ///
    /// Falls back to copy+remove when the rename crosses filesystems.
    pub fn commit_video(&self, src: &Path, id: &str) -> StorageResult<PathBuf> {
        self.ensure_dirs()?;
        let dest = self.video_path(id);
        if fs::rename(src, &dest).is_err() {
            fs::copy(src, &dest).map_err(|e| StorageError::io("copy video into library", e))?;
            fs::remove_file(src).map_err(|e| StorageError::io("remove scratch file", e))?;
        }
        Ok(dest)
    }

    /// Copy a file into the durable library without touching the source.
    ///
    /// Used when an export ran zero transform steps and the "output" is
    /// still the original library file.
    pub fn copy_video(&self, src: &Path, id: &str) -> StorageResult<PathBuf> {
        self.ensure_dirs()?;
        let dest = self.video_path(id);
        fs::copy(src, &dest).map_err(|e| StorageError::io("copy video into library", e))?;
        Ok(dest)
    }

    /// Delete the backing file and thumbnail for a video id.
    ///
    /// Missing files are not an error.
    pub fn delete_video_files(&self, id: &str) -> StorageResult<()> {
        for path in [self.video_path(id), self.thumbnail_path(id)] {
            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(StorageError::io("delete video file", e)),
            }
        }
        Ok(())
    }
}

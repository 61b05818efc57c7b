//! Persisted video catalog.
//!
//! Single source of truth for the video library. Mutations hold a write
//! lock so readers never observe a half-updated collection, and every
//! successful mutation is persisted before it returns. Write failures
//! propagate to the caller; read failures degrade to an empty catalog.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{HighlightRecord, VideoRecord};
use crate::storage::{StorageError, VideoStorage};

/// Fixed store file name under the catalog directory.
const STORE_NAME: &str = "catalog.json";

/// Errors from catalog operations.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// Persisting the catalog to disk failed. The in-memory state is
    /// already updated; callers decide whether to retry or surface.
    #[error("failed to persist catalog: {source}")]
    PersistenceWriteFailed {
        #[source]
        source: io::Error,
    },

    /// Serializing the catalog failed.
    #[error("failed to serialize catalog: {source}")]
    Serialize {
        #[source]
        source: serde_json::Error,
    },

    /// Library filesystem operation failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Result type for catalog operations.
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Persistent catalog state (saved to catalog.json).
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CatalogState {
    /// Store format version.
    version: u32,
    /// Videos, newest first.
    videos: Vec<VideoRecord>,
}

impl Default for CatalogState {
    fn default() -> Self {
        Self {
            version: 1,
            videos: Vec::new(),
        }
    }
}

/// Durable, ordered collection of video records.
///
/// Owns the backing files: removing a record also removes its file and
/// thumbnail from the library.
pub struct VideoCatalog {
    videos: RwLock<Vec<VideoRecord>>,
    store_file: PathBuf,
    storage: VideoStorage,
}

impl VideoCatalog {
    /// Open the catalog stored under `store_dir`, loading any persisted
    /// state.
    ///
    /// A missing store file yields an empty catalog. Corrupted stored
    /// data is discarded with a warning rather than surfacing a parse
    /// error.
    pub fn open(store_dir: &Path, storage: VideoStorage) -> Self {
        let store_file = store_dir.join(STORE_NAME);
        let videos = Self::load(&store_file);
        Self {
            videos: RwLock::new(videos),
            store_file,
            storage,
        }
    }

    fn load(store_file: &Path) -> Vec<VideoRecord> {
        if !store_file.exists() {
            return Vec::new();
        }
        match fs::read_to_string(store_file) {
            Ok(content) => match serde_json::from_str::<CatalogState>(&content) {
                Ok(state) => {
                    tracing::info!("loaded {} videos from {}", state.videos.len(), STORE_NAME);
                    state.videos
                }
                Err(e) => {
                    tracing::warn!("discarding corrupted {}: {}", STORE_NAME, e);
                    Vec::new()
                }
            },
            Err(e) => {
                tracing::warn!("failed to read {}: {}", STORE_NAME, e);
                Vec::new()
            }
        }
    }

    /// Snapshot of all videos, newest first.
    pub fn videos(&self) -> Vec<VideoRecord> {
        self.videos.read().clone()
    }

    /// Look up a video by id.
    pub fn get(&self, id: &str) -> Option<VideoRecord> {
        self.videos.read().iter().find(|v| v.id == id).cloned()
    }

    /// Whether a video with this id exists.
    pub fn contains(&self, id: &str) -> bool {
        self.videos.read().iter().any(|v| v.id == id)
    }

    /// Number of videos in the catalog.
    pub fn len(&self) -> usize {
        self.videos.read().len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.videos.read().is_empty()
    }

    /// Register a new video at the front of the catalog (newest first).
    pub fn add(&self, video: VideoRecord) -> CatalogResult<()> {
        {
            let mut videos = self.videos.write();
            videos.insert(0, video);
        }
        self.persist()
    }

    /// Remove a video and its backing files. Removing an absent id is a
    /// no-op, not an error.
    pub fn remove(&self, id: &str) -> CatalogResult<()> {
        let removed = {
            let mut videos = self.videos.write();
            let before = videos.len();
            videos.retain(|v| v.id != id);
            videos.len() != before
        };
        if !removed {
            return Ok(());
        }
        self.persist()?;
        if let Err(e) = self.storage.delete_video_files(id) {
            tracing::warn!("failed to delete files for removed video {}: {}", id, e);
        }
        Ok(())
    }

    /// Append a highlight to a video. No-op if the video id is absent.
    pub fn add_highlight(&self, video_id: &str, highlight: HighlightRecord) -> CatalogResult<()> {
        let changed = {
            let mut videos = self.videos.write();
            match videos.iter_mut().find(|v| v.id == video_id) {
                Some(video) => {
                    video.highlights.push(highlight);
                    true
                }
                None => false,
            }
        };
        if changed {
            self.persist()?;
        }
        Ok(())
    }

    /// Remove one highlight from a video. No-op if either id is absent.
    pub fn remove_highlight(&self, video_id: &str, highlight_id: &str) -> CatalogResult<()> {
        let changed = {
            let mut videos = self.videos.write();
            match videos.iter_mut().find(|v| v.id == video_id) {
                Some(video) => {
                    let before = video.highlights.len();
                    video.highlights.retain(|h| h.id != highlight_id);
                    video.highlights.len() != before
                }
                None => false,
            }
        };
        if changed {
            self.persist()?;
        }
        Ok(())
    }

    /// Write the full catalog (including nested highlights) to disk.
    ///
    /// Atomic: serialized to a temp file, then renamed over the store.
    fn persist(&self) -> CatalogResult<()> {
        let state = CatalogState {
            version: 1,
            videos: self.videos.read().clone(),
        };
        let json = serde_json::to_string_pretty(&state)
            .map_err(|e| CatalogError::Serialize { source: e })?;

        if let Some(parent) = self.store_file.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| CatalogError::PersistenceWriteFailed { source: e })?;
        }
        let tmp = self.store_file.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|e| CatalogError::PersistenceWriteFailed { source: e })?;
        fs::rename(&tmp, &self.store_file)
            .map_err(|e| CatalogError::PersistenceWriteFailed { source: e })?;
        Ok(())
    }
}

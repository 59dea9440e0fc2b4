//! Local library persisted to disk
//!
//! `LibraryStore` keeps bookmarks, reading history and per-series reading
//! progress as JSON files in an XDG-compliant data directory
//! (`~/.local/share/clara/` on Linux). Missing or unreadable files are treated
//! as empty so a damaged library never blocks browsing.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::data::{BookmarkLookup, Chapter, MangaSummary};

/// Maximum number of entries kept in the reading history
pub const HISTORY_LIMIT: usize = 30;

const BOOKMARKS_FILE: &str = "bookmarks.json";
const HISTORY_FILE: &str = "history.json";
const PROGRESS_FILE: &str = "progress.json";

/// Errors that can occur while writing the library
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize {path}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// A bookmarked series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bookmark {
    pub manga: MangaSummary,
    pub added_at: DateTime<Utc>,
}

/// A chapter the reader opened
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub manga: MangaSummary,
    pub chapter: Chapter,
    pub read_at: DateTime<Utc>,
}

/// Where the reader stopped in a series
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadingProgress {
    pub chapter_id: String,
    pub page: u32,
    pub updated_at: DateTime<Utc>,
}

/// Reads and writes the local library
#[derive(Debug, Clone)]
pub struct LibraryStore {
    data_dir: PathBuf,
}

impl LibraryStore {
    /// Creates a store in the XDG data directory
    ///
    /// Returns `None` if the directory cannot be determined (e.g., no home directory).
    pub fn new() -> Option<Self> {
        let project_dirs = ProjectDirs::from("", "", "clara")?;
        Some(Self {
            data_dir: project_dirs.data_dir().to_path_buf(),
        })
    }

    /// Creates a store in a custom directory
    pub fn with_dir(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    // ========================================================================
    // Bookmarks
    // ========================================================================

    /// Bookmarks, most recently added first
    pub fn bookmarks(&self) -> Vec<Bookmark> {
        self.read(BOOKMARKS_FILE)
    }

    /// Adds a bookmark; returns `false` if the series was already bookmarked
    pub fn add_bookmark(&self, manga: MangaSummary) -> Result<bool, StoreError> {
        let mut bookmarks = self.bookmarks();
        if bookmarks.iter().any(|b| b.manga.id == manga.id) {
            return Ok(false);
        }

        bookmarks.insert(
            0,
            Bookmark {
                manga,
                added_at: Utc::now(),
            },
        );
        self.write(BOOKMARKS_FILE, &bookmarks)?;
        Ok(true)
    }

    /// Removes a bookmark; returns `false` if there was none
    pub fn remove_bookmark(&self, manga_id: &str) -> Result<bool, StoreError> {
        let mut bookmarks = self.bookmarks();
        let before = bookmarks.len();
        bookmarks.retain(|b| b.manga.id != manga_id);

        if bookmarks.len() == before {
            return Ok(false);
        }
        self.write(BOOKMARKS_FILE, &bookmarks)?;
        Ok(true)
    }

    pub fn is_bookmarked(&self, manga_id: &str) -> bool {
        self.bookmarks().iter().any(|b| b.manga.id == manga_id)
    }

    /// Ids of every bookmarked series, from a single read of the bookmarks file
    pub fn bookmarked_ids(&self) -> HashSet<String> {
        self.bookmarks().into_iter().map(|b| b.manga.id).collect()
    }

    // ========================================================================
    // History
    // ========================================================================

    /// Reading history, newest first
    pub fn history(&self) -> Vec<HistoryEntry> {
        self.read(HISTORY_FILE)
    }

    /// Records that `chapter` of `manga` was opened
    ///
    /// Any earlier entry for the same series is replaced and the history is
    /// trimmed to [`HISTORY_LIMIT`] entries.
    pub fn add_to_history(&self, manga: MangaSummary, chapter: Chapter) -> Result<(), StoreError> {
        let mut history = self.history();
        history.retain(|entry| entry.manga.id != manga.id);
        history.insert(
            0,
            HistoryEntry {
                manga,
                chapter,
                read_at: Utc::now(),
            },
        );
        history.truncate(HISTORY_LIMIT);
        self.write(HISTORY_FILE, &history)
    }

    // ========================================================================
    // Progress
    // ========================================================================

    pub fn save_progress(
        &self,
        manga_id: &str,
        chapter_id: &str,
        page: u32,
    ) -> Result<(), StoreError> {
        let mut progress: BTreeMap<String, ReadingProgress> = self.read(PROGRESS_FILE);
        progress.insert(
            manga_id.to_string(),
            ReadingProgress {
                chapter_id: chapter_id.to_string(),
                page,
                updated_at: Utc::now(),
            },
        );
        self.write(PROGRESS_FILE, &progress)
    }

    pub fn progress(&self, manga_id: &str) -> Option<ReadingProgress> {
        let mut progress: BTreeMap<String, ReadingProgress> = self.read(PROGRESS_FILE);
        progress.remove(manga_id)
    }

    /// Deletes bookmarks, history and progress
    pub fn clear_all(&self) -> Result<(), StoreError> {
        for file in [BOOKMARKS_FILE, HISTORY_FILE, PROGRESS_FILE] {
            let path = self.data_dir.join(file);
            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(source) => return Err(StoreError::Io { path, source }),
            }
        }
        Ok(())
    }

    fn read<T: DeserializeOwned + Default>(&self, file: &str) -> T {
        let path = self.data_dir.join(file);
        let Ok(content) = fs::read_to_string(&path) else {
            return T::default();
        };

        serde_json::from_str(&content).unwrap_or_else(|err| {
            warn!(path = %path.display(), error = %err, "ignoring unreadable library file");
            T::default()
        })
    }

    fn write<T: Serialize>(&self, file: &str, data: &T) -> Result<(), StoreError> {
        let path = self.data_dir.join(file);

        fs::create_dir_all(&self.data_dir).map_err(|source| StoreError::Io {
            path: self.data_dir.clone(),
            source,
        })?;

        let json = serde_json::to_string_pretty(data).map_err(|source| StoreError::Serialize {
            path: path.clone(),
            source,
        })?;

        fs::write(&path, json).map_err(|source| StoreError::Io { path, source })
    }
}

impl BookmarkLookup for LibraryStore {
    fn is_bookmarked(&self, manga_id: &str) -> bool {
        LibraryStore::is_bookmarked(self, manga_id)
    }
}

//! On-disk user library: bookmarks, reading history and progress

mod library;

pub use library::{Bookmark, HistoryEntry, LibraryStore, ReadingProgress, StoreError, HISTORY_LIMIT};

//! Runs CLI commands against the client and renders their output

use std::collections::HashSet;
use std::fmt::Write as _;

use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::cli::Command;
use crate::data::{
    Chapter, ChapterImage, HealthStatus, HomeFeed, MangaClient, MangaDetailView, MangaPage,
    MangaSummary,
};
use crate::store::{Bookmark, HistoryEntry, LibraryStore, ReadingProgress, StoreError};

/// Errors a command can fail with
///
/// Catalog queries never fail; only library access and output can.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("No data directory available for the local library")]
    NoLibrary,

    #[error("Could not load series '{0}' from MangaDex; nothing was bookmarked")]
    SeriesUnavailable(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Failed to render JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Output format selected with `--json`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Text,
    Json,
}

/// Executes `command` and returns what should be printed
pub async fn run(
    command: &Command,
    client: &MangaClient,
    library: Option<&LibraryStore>,
    format: Format,
) -> Result<String, CommandError> {
    match command {
        Command::Latest { page } => {
            let result = client.latest(*page).await;
            render(&result, format, |p| page_text(&marks(library), p))
        }
        Command::Search { query, page } => {
            let result = client.search(query, *page).await;
            render(&result, format, |p| page_text(&marks(library), p))
        }
        Command::List { page, .. } => {
            let filters = command.filters().unwrap_or_default();
            let result = client.manga_list(*page, &filters).await;
            render(&result, format, |p| page_text(&marks(library), p))
        }
        Command::Detail { id } => render(&client.manga_detail(id).await, format, detail_text),
        Command::Chapter { id, manga } => {
            let images = client.chapter_images(id).await;
            if let Some(manga_id) = manga {
                record_reading(client, library, manga_id, id).await?;
            }
            render(&images, format, |images| images_text(images))
        }
        Command::Trending => {
            let manga = client.trending().await;
            render(&manga, format, |m| summaries_text(&marks(library), m))
        }
        Command::Popular => {
            let manga = client.popular().await;
            render(&manga, format, |m| summaries_text(&marks(library), m))
        }
        Command::Home => {
            let home = client.home().await;
            render(&home, format, |h| home_text(&marks(library), h))
        }
        Command::Health => render(&client.check_health().await, format, health_text),
        Command::Bookmarks => {
            let bookmarks = require(library)?.bookmarks();
            render(&bookmarks, format, |b| bookmarks_text(b))
        }
        Command::Bookmark { id } => {
            let library = require(library)?;
            let view = client.manga_detail(id).await;
            if view.is_fallback {
                return Err(CommandError::SeriesUnavailable(id.clone()));
            }
            let added = library.add_bookmark(view.manga.summary())?;
            let message = if added {
                format!("Bookmarked {}", view.manga.title)
            } else {
                format!("{} is already bookmarked", view.manga.title)
            };
            render(&added, format, |_| message.clone())
        }
        Command::Unbookmark { id } => {
            let removed = require(library)?.remove_bookmark(id)?;
            let message = if removed {
                format!("Removed bookmark {}", id)
            } else {
                format!("{} was not bookmarked", id)
            };
            render(&removed, format, |_| message.clone())
        }
        Command::History => {
            let history = require(library)?.history();
            render(&history, format, |h| history_text(h))
        }
        Command::Progress {
            manga_id,
            chapter,
            page,
        } => {
            let library = require(library)?;
            if let (Some(chapter), Some(page)) = (chapter, page) {
                library.save_progress(manga_id, chapter, *page)?;
            }
            let progress = library.progress(manga_id);
            render(&progress, format, |p| progress_text(manga_id, p))
        }
    }
}

fn require(library: Option<&LibraryStore>) -> Result<&LibraryStore, CommandError> {
    library.ok_or(CommandError::NoLibrary)
}

/// Bookmarked ids, read once per rendered listing
fn marks(library: Option<&LibraryStore>) -> HashSet<String> {
    library.map(LibraryStore::bookmarked_ids).unwrap_or_default()
}

fn render<T: Serialize + ?Sized>(
    value: &T,
    format: Format,
    text: impl FnOnce(&T) -> String,
) -> Result<String, CommandError> {
    match format {
        Format::Json => Ok(serde_json::to_string_pretty(value)?),
        Format::Text => Ok(text(value)),
    }
}

/// Adds the chapter to the reading history when it belongs to the series' live feed
async fn record_reading(
    client: &MangaClient,
    library: Option<&LibraryStore>,
    manga_id: &str,
    chapter_id: &str,
) -> Result<(), CommandError> {
    let library = require(library)?;
    let view = client.manga_detail(manga_id).await;
    if view.is_fallback {
        return Ok(());
    }

    if let Some(chapter) = view.chapters.iter().find(|c| c.id == chapter_id) {
        library.add_to_history(view.manga.summary(), chapter.clone())?;
        library.save_progress(manga_id, chapter_id, 1)?;
        info!(manga_id, chapter_id, "recorded reading history");
    }
    Ok(())
}

// ============================================================================
// Text rendering
// ============================================================================

fn summary_line(marks: &HashSet<String>, manga: &MangaSummary) -> String {
    let marker = if marks.contains(&manga.id) { "*" } else { " " };
    let year = manga.year.map(|y| y.to_string()).unwrap_or_else(|| "----".to_string());
    format!(
        "{} {:<40} {} {:<9} ★ {}  {}",
        marker,
        manga.title,
        year,
        manga.status.as_str(),
        manga.rating,
        manga.id
    )
}

fn summaries_text(marks: &HashSet<String>, manga: &[MangaSummary]) -> String {
    manga
        .iter()
        .map(|m| summary_line(marks, m))
        .collect::<Vec<_>>()
        .join("\n")
}

fn page_text(marks: &HashSet<String>, page: &MangaPage) -> String {
    let mut out = String::new();
    if page.is_fallback {
        out.push_str("(offline: showing sample data)\n");
    }
    out.push_str(&summaries_text(marks, &page.manga));
    let _ = write!(
        out,
        "\n\nPage {} · {} results{}",
        page.pagination.page,
        page.pagination.total,
        if page.pagination.has_next { " · more with --page" } else { "" }
    );
    out
}

fn chapter_line(chapter: &Chapter) -> String {
    format!(
        "{:>7}  {:<40} {:>3}p  {}  {}  {}",
        chapter.chapter_number,
        chapter.title,
        chapter.page_count,
        chapter.published_at.format("%Y-%m-%d"),
        chapter.scan_group,
        chapter.id
    )
}

fn detail_text(view: &MangaDetailView) -> String {
    let manga = &view.manga;
    let mut out = String::new();
    if view.is_fallback {
        out.push_str("(offline: showing sample data)\n");
    }
    let _ = writeln!(out, "{}", manga.title);
    let _ = writeln!(out, "Status: {}  Rating: {}", manga.status, manga.rating);
    if !manga.authors.is_empty() {
        let _ = writeln!(out, "Author: {}", manga.authors.join(", "));
    }
    if !manga.artists.is_empty() {
        let _ = writeln!(out, "Artist: {}", manga.artists.join(", "));
    }
    if !manga.tags.is_empty() {
        let _ = writeln!(out, "Tags: {}", manga.tags.join(", "));
    }
    let _ = writeln!(out, "Cover: {}", manga.cover_url);
    let _ = writeln!(out, "\n{}\n", manga.description);
    let _ = write!(out, "Chapters ({}):", view.chapters.len());
    for chapter in &view.chapters {
        out.push('\n');
        out.push_str(&chapter_line(chapter));
    }
    out
}

fn images_text(images: &[ChapterImage]) -> String {
    images
        .iter()
        .map(|image| format!("{:>3}  {}", image.page_number, image.page_url))
        .collect::<Vec<_>>()
        .join("\n")
}

fn home_text(marks: &HashSet<String>, home: &HomeFeed) -> String {
    format!(
        "Latest updates\n{}\n\nTrending\n{}",
        page_text(marks, &home.latest),
        summaries_text(marks, &home.trending)
    )
}

fn health_text(status: &HealthStatus) -> String {
    match status {
        HealthStatus::Ok { body } => format!("ok: {}", body),
        HealthStatus::Error { message } => format!("error: {}", message),
    }
}

fn bookmarks_text(bookmarks: &[Bookmark]) -> String {
    if bookmarks.is_empty() {
        return "No bookmarks yet".to_string();
    }
    bookmarks
        .iter()
        .map(|b| format!("{:<40} {}  {}", b.manga.title, b.added_at.format("%Y-%m-%d"), b.manga.id))
        .collect::<Vec<_>>()
        .join("\n")
}

fn history_text(history: &[HistoryEntry]) -> String {
    if history.is_empty() {
        return "Nothing read yet".to_string();
    }
    history
        .iter()
        .map(|entry| {
            format!(
                "{}  {:<40} {}",
                entry.read_at.format("%Y-%m-%d %H:%M"),
                entry.manga.title,
                entry.chapter.title
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn progress_text(manga_id: &str, progress: &Option<ReadingProgress>) -> String {
    match progress {
        Some(p) => format!(
            "{}: chapter {} page {} ({})",
            manga_id,
            p.chapter_id,
            p.page,
            p.updated_at.format("%Y-%m-%d %H:%M")
        ),
        None => format!("No progress saved for {}", manga_id),
    }
}

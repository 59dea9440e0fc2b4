//! Core data models and the MangaDex access layer
//!
//! This module contains the stable, normalized types handed to the presentation
//! layer, along with the client that fetches, caches, and normalizes them.

pub mod client;
pub mod endpoint;
pub mod error;
pub mod fallback;
pub mod limiter;
pub mod normalize;
pub mod retry;
pub mod transport;
pub mod upstream;

pub use client::{BookmarkLookup, MangaClient};
pub use endpoint::Endpoint;
pub use error::ApiError;
pub use limiter::RateLimiter;
pub use retry::RetryPolicy;
pub use transport::{HttpTransport, Transport};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Publication status of a series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublicationStatus {
    Ongoing,
    Completed,
    Hiatus,
    Cancelled,
    Unknown,
}

impl PublicationStatus {
    /// Maps an upstream status string, treating anything unrecognized as `Unknown`
    pub fn from_upstream(value: Option<&str>) -> Self {
        value
            .and_then(|s| s.parse().ok())
            .unwrap_or(PublicationStatus::Unknown)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PublicationStatus::Ongoing => "ongoing",
            PublicationStatus::Completed => "completed",
            PublicationStatus::Hiatus => "hiatus",
            PublicationStatus::Cancelled => "cancelled",
            PublicationStatus::Unknown => "unknown",
        }
    }
}

impl FromStr for PublicationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ongoing" => Ok(PublicationStatus::Ongoing),
            "completed" => Ok(PublicationStatus::Completed),
            "hiatus" => Ok(PublicationStatus::Hiatus),
            "cancelled" => Ok(PublicationStatus::Cancelled),
            "unknown" => Ok(PublicationStatus::Unknown),
            other => Err(format!("unknown publication status: '{}'", other)),
        }
    }
}

impl fmt::Display for PublicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A series as shown in list views
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MangaSummary {
    pub id: String,
    pub title: String,
    pub description: String,
    pub cover_url: String,
    pub status: PublicationStatus,
    /// Year of first publication, if upstream reports one
    pub year: Option<i32>,
    pub tags: Vec<String>,
    /// Rating formatted with one decimal (e.g. "4.2")
    pub rating: String,
    /// Id of the most recently uploaded chapter
    pub latest_chapter: Option<String>,
}

/// Full series details
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MangaDetail {
    pub id: String,
    pub title: String,
    pub description: String,
    pub cover_url: String,
    pub status: PublicationStatus,
    pub year: Option<i32>,
    pub tags: Vec<String>,
    pub rating: String,
    pub latest_chapter: Option<String>,
    /// Author names from relationship expansion
    pub authors: Vec<String>,
    /// Artist names from relationship expansion
    pub artists: Vec<String>,
    pub content_rating: Option<String>,
}

impl MangaDetail {
    /// Projects the detail down to the fields used in list views
    pub fn summary(&self) -> MangaSummary {
        MangaSummary {
            id: self.id.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            cover_url: self.cover_url.clone(),
            status: self.status,
            year: self.year,
            tags: self.tags.clone(),
            rating: self.rating.clone(),
            latest_chapter: self.latest_chapter.clone(),
        }
    }
}

/// A chapter in a series feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chapter {
    pub id: String,
    pub title: String,
    /// Chapter number; 0.0 when upstream has none or it does not parse
    pub chapter_number: f64,
    pub volume: Option<String>,
    pub page_count: u32,
    pub published_at: DateTime<Utc>,
    pub scan_group: String,
    pub language: String,
}

/// One page of a chapter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterImage {
    /// Full quality image URL
    pub page_url: String,
    /// Compressed image URL for slow connections
    pub low_bandwidth_url: String,
    /// 1-based page number
    pub page_number: u32,
    pub filename: String,
}

/// Offset arithmetic for a paged listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub page_size: u32,
    pub offset: u64,
    pub total: u64,
    pub has_next: bool,
}

impl Pagination {
    /// Computes offset and `has_next` for a 1-based page; page 0 is treated as page 1
    pub fn new(page: u32, page_size: u32, total: u64) -> Self {
        let page = page.max(1);
        let offset = Self::offset_for(page, page_size);
        Self {
            page,
            page_size,
            offset,
            total,
            has_next: offset + u64::from(page_size) < total,
        }
    }

    /// Offset of the first item on `page`
    pub fn offset_for(page: u32, page_size: u32) -> u64 {
        u64::from(page.max(1) - 1) * u64::from(page_size)
    }
}

/// A page of list results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MangaPage {
    pub manga: Vec<MangaSummary>,
    pub pagination: Pagination,
    /// Whether this page is canned fallback content
    pub is_fallback: bool,
}

/// Series details together with its chapter feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MangaDetailView {
    pub manga: MangaDetail,
    pub chapters: Vec<Chapter>,
    pub is_fallback: bool,
}

/// Sections shown on the landing view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HomeFeed {
    pub latest: MangaPage,
    pub trending: Vec<MangaSummary>,
}

/// Result of pinging the upstream API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum HealthStatus {
    Ok { body: String },
    Error { message: String },
}

impl HealthStatus {
    pub fn is_ok(&self) -> bool {
        matches!(self, HealthStatus::Ok { .. })
    }
}

/// Filters for the series listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MangaFilters {
    /// Tag ids that must all be present
    pub tags: Vec<String>,
    pub status: Option<PublicationStatus>,
    /// Free-text title search
    pub search: Option<String>,
}

impl MangaFilters {
    /// Filters for a title search
    pub fn search(query: impl Into<String>) -> Self {
        Self {
            search: Some(query.into()),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_second_page_has_next() {
        let p = Pagination::new(2, 20, 45);
        assert_eq!(p.offset, 20);
        assert!(p.has_next);
    }

    #[test]
    fn test_pagination_last_page_has_no_next() {
        let p = Pagination::new(3, 20, 45);
        assert_eq!(p.offset, 40);
        assert!(!p.has_next);
    }

    #[test]
    fn test_pagination_exact_boundary() {
        // 20 + 20 == 40 is not strictly less than 40
        let p = Pagination::new(2, 20, 40);
        assert!(!p.has_next);
        let p = Pagination::new(2, 20, 41);
        assert!(p.has_next);
    }

    #[test]
    fn test_pagination_page_zero_is_first_page() {
        let p = Pagination::new(0, 20, 100);
        assert_eq!(p.page, 1);
        assert_eq!(p.offset, 0);
        assert!(p.has_next);
    }

    #[test]
    fn test_publication_status_from_upstream() {
        assert_eq!(
            PublicationStatus::from_upstream(Some("ongoing")),
            PublicationStatus::Ongoing
        );
        assert_eq!(
            PublicationStatus::from_upstream(Some("Completed")),
            PublicationStatus::Completed
        );
        assert_eq!(
            PublicationStatus::from_upstream(Some("abandoned")),
            PublicationStatus::Unknown
        );
        assert_eq!(
            PublicationStatus::from_upstream(None),
            PublicationStatus::Unknown
        );
    }

    #[test]
    fn test_publication_status_serializes_lowercase() {
        let json = serde_json::to_string(&PublicationStatus::Hiatus).unwrap();
        assert_eq!(json, "\"hiatus\"");
    }

    #[test]
    fn test_detail_summary_projection() {
        let detail = MangaDetail {
            id: "abc".to_string(),
            title: "Title".to_string(),
            description: "Desc".to_string(),
            cover_url: "https://example.com/c.jpg".to_string(),
            status: PublicationStatus::Ongoing,
            year: Some(2020),
            tags: vec!["Action".to_string()],
            rating: "4.1".to_string(),
            latest_chapter: None,
            authors: vec!["Someone".to_string()],
            artists: vec![],
            content_rating: Some("safe".to_string()),
        };

        let summary = detail.summary();
        assert_eq!(summary.id, "abc");
        assert_eq!(summary.title, "Title");
        assert_eq!(summary.tags, vec!["Action".to_string()]);
        assert_eq!(summary.year, Some(2020));
    }

    #[test]
    fn test_health_status_serialization() {
        let ok = HealthStatus::Ok {
            body: "pong".to_string(),
        };
        let json = serde_json::to_value(&ok).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["body"], "pong");
        assert!(ok.is_ok());
    }
}

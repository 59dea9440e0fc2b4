//! Conversion of upstream payloads into the stable domain types
//!
//! All fallback rules for missing upstream data live here: title and
//! description language order, placeholder covers, and placeholder ratings.

use chrono::{DateTime, Utc};

use super::upstream::{
    find_relationship, ApiAtHomeServer, ApiChapter, ApiManga, ApiRelationship, ApiTag,
    LocalizedText,
};
use super::{Chapter, ChapterImage, MangaDetail, MangaSummary, PublicationStatus};

/// Title used when upstream has no title in any language
pub const UNTITLED: &str = "Untitled";

/// Description used when upstream has none in a preferred language
pub const NO_DESCRIPTION: &str = "No description available";

/// Cover shown when a series has no cover art relationship
pub const PLACEHOLDER_COVER_URL: &str =
    "https://via.placeholder.com/300x400/1a1a1a/ec4899?text=No+Cover";

/// Scanlation group name when none is attached
pub const UNKNOWN_GROUP: &str = "Unknown";

/// Thumbnail width requested from the cover CDN
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoverSize {
    /// 256px, for list views
    Thumbnail,
    /// 512px, for the detail view
    Large,
}

impl CoverSize {
    fn suffix(&self) -> &'static str {
        match self {
            CoverSize::Thumbnail => "256",
            CoverSize::Large => "512",
        }
    }
}

/// Normalization settings taken from the client configuration
#[derive(Debug, Clone)]
pub struct Normalizer {
    /// Preferred languages, most preferred first
    pub languages: Vec<String>,
    /// Base URL of the cover CDN, without trailing slash
    pub cover_base_url: String,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self {
            languages: vec!["en".to_string(), "ja-ro".to_string(), "ja".to_string()],
            cover_base_url: "https://uploads.mangadex.org/covers".to_string(),
        }
    }
}

impl Normalizer {
    /// Title in the first preferred language, else the first upstream value, else "Untitled"
    pub fn title(&self, title: &LocalizedText) -> String {
        title
            .preferred(&self.languages)
            .or_else(|| title.first())
            .unwrap_or(UNTITLED)
            .to_string()
    }

    /// Description in the first preferred language that has one
    pub fn description(&self, description: &LocalizedText) -> String {
        description
            .preferred(&self.languages)
            .unwrap_or(NO_DESCRIPTION)
            .to_string()
    }

    /// Tag display names, skipping tags without a name in a preferred language
    pub fn tags(&self, tags: &[ApiTag]) -> Vec<String> {
        tags.iter()
            .filter_map(|tag| tag.attributes.as_ref())
            .filter_map(|attrs| attrs.name.preferred(&self.languages))
            .map(str::to_string)
            .collect()
    }

    /// Cover URL built from the expanded `cover_art` relationship
    pub fn cover_url(
        &self,
        manga_id: &str,
        relationships: &[ApiRelationship],
        size: CoverSize,
    ) -> String {
        find_relationship(relationships, "cover_art")
            .and_then(|cover| cover.attribute("fileName"))
            .map(|file_name| {
                format!(
                    "{}/{}/{}.{}.jpg",
                    self.cover_base_url,
                    manga_id,
                    file_name,
                    size.suffix()
                )
            })
            .unwrap_or_else(|| PLACEHOLDER_COVER_URL.to_string())
    }

    pub fn manga_summary(&self, manga: &ApiManga) -> MangaSummary {
        let attrs = &manga.attributes;
        MangaSummary {
            id: manga.id.clone(),
            title: self.title(&attrs.title),
            description: self.description(&attrs.description),
            cover_url: self.cover_url(&manga.id, &manga.relationships, CoverSize::Thumbnail),
            status: PublicationStatus::from_upstream(attrs.status.as_deref()),
            year: attrs.year,
            tags: self.tags(&attrs.tags),
            rating: placeholder_rating(&manga.id),
            latest_chapter: attrs.latest_uploaded_chapter.clone(),
        }
    }

    pub fn manga_detail(&self, manga: &ApiManga) -> MangaDetail {
        let attrs = &manga.attributes;
        MangaDetail {
            id: manga.id.clone(),
            title: self.title(&attrs.title),
            description: self.description(&attrs.description),
            cover_url: self.cover_url(&manga.id, &manga.relationships, CoverSize::Large),
            status: PublicationStatus::from_upstream(attrs.status.as_deref()),
            year: attrs.year,
            tags: self.tags(&attrs.tags),
            rating: placeholder_rating(&manga.id),
            latest_chapter: attrs.latest_uploaded_chapter.clone(),
            authors: relationship_names(&manga.relationships, "author"),
            artists: relationship_names(&manga.relationships, "artist"),
            content_rating: attrs.content_rating.clone(),
        }
    }
}

/// Names of every expanded relationship of `rel_type`
fn relationship_names(relationships: &[ApiRelationship], rel_type: &str) -> Vec<String> {
    relationships
        .iter()
        .filter(|r| r.rel_type == rel_type)
        .filter_map(|r| r.attribute("name"))
        .map(str::to_string)
        .collect()
}

/// Rating shown until upstream statistics are wired in
///
/// Derived from the id so the same series always shows the same value; always in `[3.0, 5.0)`.
pub fn placeholder_rating(id: &str) -> String {
    let sum: u32 = id.bytes().map(u32::from).sum();
    format!("{:.1}", 3.0 + f64::from(sum % 20) / 10.0)
}

pub fn chapter(chapter: &ApiChapter) -> Chapter {
    let attrs = &chapter.attributes;
    let number = attrs.chapter.as_deref().filter(|c| !c.is_empty());

    let title = attrs
        .title
        .clone()
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| match number {
            Some(n) => format!("Chapter {}", n),
            None => "Oneshot".to_string(),
        });

    Chapter {
        id: chapter.id.clone(),
        title,
        chapter_number: number.and_then(|n| n.parse().ok()).unwrap_or(0.0),
        volume: attrs.volume.clone(),
        page_count: attrs.pages.unwrap_or(0),
        published_at: attrs
            .publish_at
            .as_deref()
            .and_then(parse_timestamp)
            .unwrap_or_else(Utc::now),
        scan_group: find_relationship(&chapter.relationships, "scanlation_group")
            .and_then(|group| group.attribute("name"))
            .unwrap_or(UNKNOWN_GROUP)
            .to_string(),
        language: attrs
            .translated_language
            .clone()
            .unwrap_or_else(|| "en".to_string()),
    }
}

/// Page URLs for both quality tiers, numbered from 1
///
/// Data-saver filenames come from the `dataSaver` list when upstream provides
/// one for the same page, otherwise the full-quality filename is reused.
pub fn chapter_images(server: &ApiAtHomeServer) -> Vec<ChapterImage> {
    let base = server.base_url.trim_end_matches('/');
    let hash = &server.chapter.hash;

    server
        .chapter
        .data
        .iter()
        .enumerate()
        .map(|(index, filename)| {
            let saver_name = server
                .chapter
                .data_saver
                .get(index)
                .unwrap_or(filename);
            ChapterImage {
                page_url: format!("{}/data/{}/{}", base, hash, filename),
                low_bandwidth_url: format!("{}/data-saver/{}/{}", base, hash, saver_name),
                page_number: index as u32 + 1,
                filename: filename.clone(),
            }
        })
        .collect()
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

//! Canned content returned when live data cannot be fetched
//!
//! Everything here is deterministic: the same call always yields the same data.

use chrono::{DateTime, Duration, Utc};

use super::{Chapter, ChapterImage, MangaDetail, MangaSummary, PublicationStatus};

/// Well-known titles used for fallback listings
pub const FALLBACK_TITLES: [&str; 10] = [
    "One Piece",
    "Naruto",
    "Jujutsu Kaisen",
    "Demon Slayer",
    "Attack on Titan",
    "My Hero Academia",
    "Chainsaw Man",
    "Spy x Family",
    "Blue Lock",
    "Kaiju No. 8",
];

/// Number of stub chapters in a fallback feed
pub const FALLBACK_CHAPTER_COUNT: usize = 20;

/// Number of placeholder pages in a fallback chapter
pub const FALLBACK_PAGE_COUNT: u32 = 20;

const FALLBACK_DESCRIPTION: &str =
    "This is fallback data. Please check your internet connection.";

/// Up to ten canned series
pub fn manga(count: usize) -> Vec<MangaSummary> {
    FALLBACK_TITLES
        .iter()
        .take(count)
        .enumerate()
        .map(|(i, title)| MangaSummary {
            id: format!("fallback-{}", i),
            title: title.to_string(),
            description: FALLBACK_DESCRIPTION.to_string(),
            cover_url: format!(
                "https://via.placeholder.com/300x400/1a1a1a/ec4899?text={}",
                title.replace(' ', "+")
            ),
            status: PublicationStatus::Ongoing,
            year: Some(2024),
            tags: vec!["Action".to_string(), "Adventure".to_string()],
            rating: format!("{:.1}", 4.0 + (i as f64) / 10.0),
            latest_chapter: None,
        })
        .collect()
}

/// A canned detail view that keeps the requested id
pub fn manga_detail(id: &str) -> MangaDetail {
    let base = &manga(1)[0];
    MangaDetail {
        id: id.to_string(),
        title: base.title.clone(),
        description: base.description.clone(),
        cover_url: base.cover_url.clone(),
        status: base.status,
        year: base.year,
        tags: base.tags.clone(),
        rating: base.rating.clone(),
        latest_chapter: None,
        authors: Vec::new(),
        artists: Vec::new(),
        content_rating: None,
    }
}

/// Publication date of the first stub chapter; later stubs are one day older each
fn fallback_epoch() -> DateTime<Utc> {
    // 2024-01-01T00:00:00Z
    DateTime::from_timestamp(1_704_067_200, 0).unwrap_or_default()
}

/// Twenty stub chapters numbered 1..=20
pub fn chapters() -> Vec<Chapter> {
    let epoch = fallback_epoch();
    (0..FALLBACK_CHAPTER_COUNT)
        .map(|i| {
            let number = i + 1;
            Chapter {
                id: format!("fallback-ch-{}", number),
                title: format!("Chapter {}", number),
                chapter_number: number as f64,
                volume: Some("1".to_string()),
                page_count: 30 + (i as u32 * 7) % 20,
                published_at: epoch - Duration::days(i as i64),
                scan_group: "Fallback Group".to_string(),
                language: "en".to_string(),
            }
        })
        .collect()
}

/// Twenty placeholder pages numbered 1..=20
pub fn chapter_images() -> Vec<ChapterImage> {
    (1..=FALLBACK_PAGE_COUNT)
        .map(|page| {
            let url = format!(
                "https://via.placeholder.com/800x1200/2a2a2a/ec4899?text=Page+{}",
                page
            );
            ChapterImage {
                page_url: url.clone(),
                low_bandwidth_url: url,
                page_number: page,
                filename: format!("page-{}.jpg", page),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manga_is_capped_at_title_count() {
        assert_eq!(manga(3).len(), 3);
        assert_eq!(manga(100).len(), FALLBACK_TITLES.len());
        assert_eq!(manga(10)[9].title, "Kaiju No. 8");
    }

    #[test]
    fn test_fallback_is_deterministic() {
        assert_eq!(manga(10), manga(10));
        assert_eq!(chapters(), chapters());
        assert_eq!(chapter_images(), chapter_images());
    }

    #[test]
    fn test_manga_detail_keeps_id() {
        let detail = manga_detail("requested-id");
        assert_eq!(detail.id, "requested-id");
        assert_eq!(detail.title, "One Piece");
    }

    #[test]
    fn test_chapters_are_numbered_from_one() {
        let chapters = chapters();
        assert_eq!(chapters.len(), FALLBACK_CHAPTER_COUNT);
        assert_eq!(chapters[0].chapter_number, 1.0);
        assert_eq!(chapters[19].id, "fallback-ch-20");
        assert!(chapters.iter().all(|c| (30..50).contains(&c.page_count)));
        assert!(chapters[0].published_at > chapters[1].published_at);
        assert_eq!(chapters[0].published_at.to_rfc3339(), "2024-01-01T00:00:00+00:00");
    }

    #[test]
    fn test_chapter_images_are_numbered_one_to_twenty() {
        let images = chapter_images();
        assert_eq!(images.len(), 20);
        for (i, image) in images.iter().enumerate() {
            assert_eq!(image.page_number, i as u32 + 1);
            assert_eq!(image.filename, format!("page-{}.jpg", i + 1));
        }
        assert!(images[4].page_url.ends_with("Page+5"));
    }
}

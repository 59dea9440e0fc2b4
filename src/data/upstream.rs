//! Serde-deserializable types matching MangaDex API responses
//!
//! These types are kept separate from the domain types so upstream quirks
//! (missing fields, empty arrays in place of objects) stay out of the rest of
//! the crate. Only the fields marked required make a payload malformed when
//! absent; everything else defaults.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// A map of language code to text, in upstream order
///
/// MangaDex sends `[]` instead of `{}` for an empty map, so anything that is
/// not an object reads as empty. Empty strings are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalizedText(Vec<(String, String)>);

impl LocalizedText {
    pub fn from_value(value: &Value) -> Self {
        let entries = value
            .as_object()
            .map(|map| {
                map.iter()
                    .filter_map(|(lang, text)| {
                        text.as_str()
                            .filter(|t| !t.is_empty())
                            .map(|t| (lang.clone(), t.to_string()))
                    })
                    .collect()
            })
            .unwrap_or_default();
        Self(entries)
    }

    /// Text for an exact language code
    pub fn get(&self, lang: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(l, _)| l == lang)
            .map(|(_, text)| text.as_str())
    }

    /// First entry in upstream order
    pub fn first(&self) -> Option<&str> {
        self.0.first().map(|(_, text)| text.as_str())
    }

    /// Text for the first language in `langs` that is present
    pub fn preferred<S: AsRef<str>>(&self, langs: &[S]) -> Option<&str> {
        langs.iter().find_map(|lang| self.get(lang.as_ref()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'de> Deserialize<'de> for LocalizedText {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(Self::from_value(&value))
    }
}

// ============================================================================
// Relationships
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct ApiRelationship {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub rel_type: String,
    /// Present only when the relationship was expanded with `includes[]`
    #[serde(default)]
    pub attributes: Option<Value>,
}

impl ApiRelationship {
    /// A string attribute of an expanded relationship
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .as_ref()?
            .get(name)?
            .as_str()
            .filter(|s| !s.is_empty())
    }
}

/// First relationship of the given type
pub fn find_relationship<'a>(
    relationships: &'a [ApiRelationship],
    rel_type: &str,
) -> Option<&'a ApiRelationship> {
    relationships.iter().find(|r| r.rel_type == rel_type)
}

// ============================================================================
// Manga
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct ApiTagAttributes {
    #[serde(default)]
    pub name: LocalizedText,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiTag {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    pub attributes: Option<ApiTagAttributes>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiMangaAttributes {
    #[serde(default)]
    pub title: LocalizedText,
    #[serde(default)]
    pub description: LocalizedText,
    pub status: Option<String>,
    pub year: Option<i32>,
    pub content_rating: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<ApiTag>,
    pub latest_uploaded_chapter: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiManga {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub attributes: ApiMangaAttributes,
    #[serde(default, deserialize_with = "null_as_default")]
    pub relationships: Vec<ApiRelationship>,
}

/// Response of `/manga`
#[derive(Debug, Deserialize)]
pub struct ApiMangaCollection {
    pub data: Vec<ApiManga>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub total: u64,
}

/// Response of `/manga/{id}`
#[derive(Debug, Deserialize)]
pub struct ApiMangaEntity {
    pub data: ApiManga,
}

// ============================================================================
// Chapters
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiChapterAttributes {
    pub title: Option<String>,
    pub chapter: Option<String>,
    pub volume: Option<String>,
    pub pages: Option<u32>,
    pub publish_at: Option<String>,
    pub translated_language: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiChapter {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub attributes: ApiChapterAttributes,
    #[serde(default, deserialize_with = "null_as_default")]
    pub relationships: Vec<ApiRelationship>,
}

/// Response of `/manga/{id}/feed`
#[derive(Debug, Deserialize)]
pub struct ApiChapterFeed {
    pub data: Vec<ApiChapter>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub total: u64,
}

// ============================================================================
// Image delivery
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiAtHomeChapter {
    pub hash: String,
    pub data: Vec<String>,
    #[serde(rename = "dataSaver", default, deserialize_with = "null_as_default")]
    pub data_saver: Vec<String>,
}

/// Response of `/at-home/server/{chapter_id}`
#[derive(Debug, Deserialize)]
pub struct ApiAtHomeServer {
    #[serde(rename = "baseUrl")]
    pub base_url: String,
    pub chapter: ApiAtHomeChapter,
}

/// Reads an explicit `null` the same as a missing field
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Deserializes a cached or fetched payload into an upstream type
pub fn parse<T: serde::de::DeserializeOwned>(payload: Value) -> serde_json::Result<T> {
    serde_json::from_value(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_localized_text_keeps_upstream_order() {
        let text =
            LocalizedText::from_value(&json!({"ko": "책", "ja": "ブック", "en": "Book"}));
        assert_eq!(text.first(), Some("책"));
        assert_eq!(text.get("en"), Some("Book"));
    }

    #[test]
    fn test_localized_text_from_empty_array() {
        let text = LocalizedText::from_value(&json!([]));
        assert!(text.is_empty());
        assert_eq!(text.first(), None);
    }

    #[test]
    fn test_localized_text_skips_empty_strings() {
        let text = LocalizedText::from_value(&json!({"en": "", "ja": "ブック"}));
        assert_eq!(text.get("en"), None);
        assert_eq!(text.preferred(&["en", "ja"]), Some("ブック"));
    }

    #[test]
    fn test_manga_tolerates_missing_optional_fields() {
        let manga: ApiManga = parse(json!({"id": "m1"})).unwrap();
        assert_eq!(manga.id, "m1");
        assert!(manga.attributes.title.is_empty());
        assert!(manga.relationships.is_empty());
        assert!(manga.attributes.year.is_none());
    }

    #[test]
    fn test_manga_description_as_array() {
        let manga: ApiManga = parse(json!({
            "id": "m1",
            "attributes": {"title": {"en": "Book"}, "description": []}
        }))
        .unwrap();
        assert!(manga.attributes.description.is_empty());
    }

    #[test]
    fn test_collection_tolerates_null_lists() {
        let collection: ApiMangaCollection = parse(json!({
            "data": [
                {
                    "id": "ok",
                    "attributes": {"title": {"en": "A"}, "tags": []},
                    "relationships": []
                },
                {"id": "null-tags", "attributes": {"title": {"en": "B"}, "tags": null}},
                {"id": "null-rels", "attributes": {"title": {"en": "C"}}, "relationships": null},
                {"id": "null-attrs", "attributes": null}
            ],
            "total": null
        }))
        .unwrap();

        assert_eq!(collection.data.len(), 4);
        assert!(collection.data[1].attributes.tags.is_empty());
        assert!(collection.data[2].relationships.is_empty());
        assert!(collection.data[3].attributes.title.is_empty());
        assert_eq!(collection.total, 0);
    }

    #[test]
    fn test_chapter_tolerates_null_attributes_and_relationships() {
        let feed: ApiChapterFeed = parse(json!({
            "data": [{"id": "c1", "attributes": null, "relationships": null}]
        }))
        .unwrap();
        assert_eq!(feed.data[0].id, "c1");
        assert!(feed.data[0].relationships.is_empty());
        assert!(feed.data[0].attributes.chapter.is_none());
    }

    #[test]
    fn test_collection_requires_data() {
        let result: serde_json::Result<ApiMangaCollection> = parse(json!({"total": 3}));
        assert!(result.is_err());
    }

    #[test]
    fn test_at_home_requires_chapter_data() {
        let result: serde_json::Result<ApiAtHomeServer> = parse(json!({
            "baseUrl": "https://node.example",
            "chapter": {"hash": "abc"}
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_relationship_attribute_lookup() {
        let rels: Vec<ApiRelationship> = parse(json!([
            {"id": "a1", "type": "author", "attributes": {"name": "Oda"}},
            {"id": "c1", "type": "cover_art", "attributes": {"fileName": "cover.png"}},
            {"id": "g1", "type": "scanlation_group"}
        ]))
        .unwrap();

        let cover = find_relationship(&rels, "cover_art").unwrap();
        assert_eq!(cover.attribute("fileName"), Some("cover.png"));

        let group = find_relationship(&rels, "scanlation_group").unwrap();
        assert_eq!(group.attribute("name"), None);

        assert!(find_relationship(&rels, "artist").is_none());
    }
}

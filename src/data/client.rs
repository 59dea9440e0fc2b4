//! MangaDex API client
//!
//! `MangaClient` owns the whole request pipeline: response cache, rate
//! limiter, retry policy and normalization. Query operations never fail; when
//! live data cannot be obtained they log the error and return the canned
//! content from [`super::fallback`].

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::cache::{lock_cache, ResponseCache, SharedCache, SweeperHandle};
use crate::config::ClientConfig;

use super::endpoint::{encode, Endpoint};
use super::normalize::{self, Normalizer};
use super::upstream::{self, ApiAtHomeServer, ApiChapterFeed, ApiMangaCollection, ApiMangaEntity};
use super::{
    fallback, ApiError, ChapterImage, HealthStatus, HomeFeed, HttpTransport, MangaDetailView,
    MangaFilters, MangaPage, MangaSummary, Pagination, RateLimiter, RetryPolicy, Transport,
};

/// Chapters requested per feed call
const FEED_LIMIT: u32 = 100;

/// Series in the trending and popular sections
const SECTION_LIMIT: u32 = 10;

/// Queries shorter than this (in characters, after trimming) show the latest list instead
const MIN_SEARCH_LEN: usize = 2;

/// Reports whether a series is bookmarked, for list badges
pub trait BookmarkLookup: Send + Sync {
    fn is_bookmarked(&self, manga_id: &str) -> bool;
}

/// Client for the MangaDex REST API
///
/// Construct one per process and share it by reference or `Arc`.
pub struct MangaClient {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
    cache: SharedCache,
    limiter: RateLimiter,
    retry: RetryPolicy,
    normalizer: Normalizer,
    bookmarks: Option<Arc<dyn BookmarkLookup>>,
    sweeper: Option<SweeperHandle>,
}

impl MangaClient {
    /// Creates a client that talks to the network over HTTPS
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        let transport = HttpTransport::new(&config.user_agent)?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Creates a client on top of a custom transport
    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        let cache = ResponseCache::new(config.cache_capacity, config.cache_ttl());
        Self {
            limiter: RateLimiter::new(config.min_request_interval()),
            retry: config.retry_policy(),
            normalizer: config.normalizer(),
            cache: Arc::new(std::sync::Mutex::new(cache)),
            transport,
            bookmarks: None,
            sweeper: None,
            config,
        }
    }

    /// Attaches the store used to answer [`MangaClient::is_bookmarked`]
    pub fn with_bookmarks(mut self, bookmarks: Arc<dyn BookmarkLookup>) -> Self {
        self.bookmarks = Some(bookmarks);
        self
    }

    /// Starts the background cache sweeper if the config enables one
    ///
    /// Must be called from within a tokio runtime. The sweeper stops when the client is dropped.
    pub fn with_sweeper(mut self) -> Self {
        if let Some(interval) = self.config.sweep_interval() {
            self.sweeper = Some(SweeperHandle::spawn(Arc::clone(&self.cache), interval));
        }
        self
    }

    /// Stops the background sweeper, if one is running
    pub async fn shutdown(mut self) {
        if let Some(sweeper) = self.sweeper.take() {
            sweeper.shutdown().await;
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Number of responses currently cached
    pub fn cache_len(&self) -> usize {
        lock_cache(&self.cache).len()
    }

    /// Drops every cached response
    pub fn clear_cache(&self) {
        lock_cache(&self.cache).clear();
        info!("cache cleared");
    }

    pub fn is_bookmarked(&self, manga_id: &str) -> bool {
        self.bookmarks
            .as_ref()
            .map(|b| b.is_bookmarked(manga_id))
            .unwrap_or(false)
    }

    /// Fetches `endpoint` and decodes it as `T`, serving it from the cache when fresh
    ///
    /// On a miss the request goes through the rate limiter and retry policy.
    /// Only payloads that decode are cached, so a malformed response is
    /// requested again next time.
    pub async fn fetch<T: DeserializeOwned>(&self, endpoint: &Endpoint) -> Result<T, ApiError> {
        let key = endpoint.cache_key();

        let cached = lock_cache(&self.cache).get(&key);
        if let Some(payload) = cached {
            debug!(key = %key, "cache hit");
            return Ok(upstream::parse(payload)?);
        }
        debug!(key = %key, "cache miss");

        let payload = self.fetch_uncached(&key).await?;
        let decoded = upstream::parse(payload.clone())?;

        lock_cache(&self.cache).put(key, payload);
        Ok(decoded)
    }

    async fn fetch_uncached(&self, path_and_query: &str) -> Result<Value, ApiError> {
        let url = format!("{}{}", self.config.base_url, path_and_query);
        let transport = &self.transport;
        let url_ref = url.as_str();

        self.retry
            .execute(&self.limiter, move |attempt| async move {
                debug!(url = url_ref, attempt, "fetching");
                let body = transport.get(url_ref).await?;
                Ok::<_, ApiError>(serde_json::from_str::<Value>(&body)?)
            })
            .await
    }

    // ========================================================================
    // Listings
    // ========================================================================

    /// One page of series matching `filters`, most recently updated first
    pub async fn manga_list(&self, page: u32, filters: &MangaFilters) -> MangaPage {
        match self.try_manga_list(page, filters).await {
            Ok(result) => result,
            Err(err) => {
                warn!(page, error = %err, "manga list unavailable, serving fallback");
                if filters.search.is_some() {
                    self.fallback_page(page, 10, false)
                } else {
                    self.fallback_page(page, 30, true)
                }
            }
        }
    }

    /// Latest updated series
    pub async fn latest(&self, page: u32) -> MangaPage {
        self.manga_list(page, &MangaFilters::default()).await
    }

    /// Title search; queries under two characters show the latest list
    pub async fn search(&self, query: &str, page: u32) -> MangaPage {
        let query = query.trim();
        if query.chars().count() < MIN_SEARCH_LEN {
            return self.latest(page).await;
        }
        self.manga_list(page, &MangaFilters::search(query)).await
    }

    /// Top series by rating
    pub async fn trending(&self) -> Vec<MangaSummary> {
        self.section("rating").await
    }

    /// Top series by follow count
    pub async fn popular(&self) -> Vec<MangaSummary> {
        self.section("followedCount").await
    }

    /// Latest page and trending section, fetched concurrently
    pub async fn home(&self) -> HomeFeed {
        let (latest, trending) = futures::join!(self.latest(1), self.trending());
        HomeFeed { latest, trending }
    }

    async fn try_manga_list(
        &self,
        page: u32,
        filters: &MangaFilters,
    ) -> Result<MangaPage, ApiError> {
        let page_size = self.config.page_size;
        let endpoint = self.list_endpoint(page, filters);

        let collection: ApiMangaCollection = self.fetch(&endpoint).await?;

        let manga = collection
            .data
            .iter()
            .map(|m| self.normalizer.manga_summary(m))
            .collect();

        Ok(MangaPage {
            manga,
            pagination: Pagination::new(page, page_size, collection.total),
            is_fallback: false,
        })
    }

    fn list_endpoint(&self, page: u32, filters: &MangaFilters) -> Endpoint {
        let page_size = self.config.page_size;

        let mut tags = filters.tags.clone();
        tags.sort();
        tags.dedup();

        let mut endpoint = Endpoint::new("/manga")
            .param("limit", page_size)
            .param("offset", Pagination::offset_for(page, page_size))
            .param("includes[]", "cover_art")
            .param("order[updatedAt]", "desc")
            .param("availableTranslatedLanguage[]", self.config.chapter_language())
            .param("hasAvailableChapters", "true")
            .params("contentRating[]", &self.config.content_ratings)
            .params("includedTags[]", &tags);

        if let Some(status) = filters.status {
            endpoint = endpoint.param("status[]", status);
        }
        if let Some(search) = filters.search.as_deref().map(str::trim) {
            if !search.is_empty() {
                endpoint = endpoint.param("title", search);
            }
        }

        endpoint
    }

    async fn section(&self, order: &str) -> Vec<MangaSummary> {
        let endpoint = Endpoint::new("/manga")
            .param("limit", SECTION_LIMIT)
            .param("includes[]", "cover_art")
            .param(&format!("order[{}]", order), "desc")
            .param("hasAvailableChapters", "true")
            .params("contentRating[]", &self.config.content_ratings);

        let result = async {
            let collection: ApiMangaCollection = self.fetch(&endpoint).await?;
            Ok::<_, ApiError>(
                collection
                    .data
                    .iter()
                    .map(|m| self.normalizer.manga_summary(m))
                    .collect(),
            )
        }
        .await;

        result.unwrap_or_else(|err| {
            warn!(order, error = %err, "section unavailable, serving fallback");
            fallback::manga(SECTION_LIMIT as usize)
        })
    }

    fn fallback_page(&self, page: u32, total: u64, has_next: bool) -> MangaPage {
        MangaPage {
            manga: fallback::manga(10),
            pagination: Pagination {
                has_next,
                ..Pagination::new(page, self.config.page_size, total)
            },
            is_fallback: true,
        }
    }

    // ========================================================================
    // Series and chapters
    // ========================================================================

    /// Series details with its chapter feed in the preferred language
    ///
    /// Both requests run concurrently; if either fails the whole view falls back.
    pub async fn manga_detail(&self, id: &str) -> MangaDetailView {
        match self.try_manga_detail(id).await {
            Ok(view) => view,
            Err(err) => {
                warn!(id, error = %err, "manga detail unavailable, serving fallback");
                MangaDetailView {
                    manga: fallback::manga_detail(id),
                    chapters: fallback::chapters(),
                    is_fallback: true,
                }
            }
        }
    }

    async fn try_manga_detail(&self, id: &str) -> Result<MangaDetailView, ApiError> {
        let language = self.config.chapter_language();

        let detail_endpoint = Endpoint::new(format!("/manga/{}", encode(id)))
            .params("includes[]", ["cover_art", "author", "artist"]);
        let feed_endpoint = Endpoint::new(format!("/manga/{}/feed", encode(id)))
            .param("limit", FEED_LIMIT)
            .param("translatedLanguage[]", language)
            .param("order[chapter]", "desc")
            .param("includes[]", "scanlation_group")
            .param("includeFuturePublishAt", 0)
            .param("includeEmptyPages", 0)
            .params("contentRating[]", &self.config.content_ratings);

        let (entity, feed) = futures::try_join!(
            self.fetch::<ApiMangaEntity>(&detail_endpoint),
            self.fetch::<ApiChapterFeed>(&feed_endpoint),
        )?;

        let chapters = feed
            .data
            .iter()
            .map(normalize::chapter)
            .filter(|chapter| chapter.language == language)
            .collect();

        Ok(MangaDetailView {
            manga: self.normalizer.manga_detail(&entity.data),
            chapters,
            is_fallback: false,
        })
    }

    /// Page images of a chapter
    ///
    /// A payload missing the delivery node or page list is treated like a
    /// network failure and yields twenty placeholder pages.
    pub async fn chapter_images(&self, chapter_id: &str) -> Vec<ChapterImage> {
        let endpoint = Endpoint::new(format!("/at-home/server/{}", encode(chapter_id)));

        let result = async {
            let server: ApiAtHomeServer = self.fetch(&endpoint).await?;
            Ok::<_, ApiError>(normalize::chapter_images(&server))
        }
        .await;

        result.unwrap_or_else(|err| {
            warn!(chapter_id, error = %err, "chapter images unavailable, serving placeholders");
            fallback::chapter_images()
        })
    }

    // ========================================================================
    // Health
    // ========================================================================

    /// Pings the API once, bypassing the cache
    pub async fn check_health(&self) -> HealthStatus {
        let url = format!("{}/ping", self.config.base_url);
        let transport = &self.transport;
        let url_ref = url.as_str();

        let result = RetryPolicy::single(self.config.health_timeout())
            .execute(&self.limiter, move |_| async move { transport.get(url_ref).await })
            .await;

        match result {
            Ok(body) => HealthStatus::Ok {
                body: body.trim().to_string(),
            },
            Err(err) => {
                warn!(error = %err, "health check failed");
                HealthStatus::Error {
                    message: err.to_string(),
                }
            }
        }
    }
}

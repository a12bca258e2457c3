/// Feed aggregation engine
///
/// Every public method assembles one feed: fetch from the catalog,
/// normalize, resolve genres, optionally fan out to per-title sub-fetches,
/// shuffle, truncate, and cache the result for the feed's TTL. Requests
/// inside the TTL window are served from cache, sliced down to the caller's
/// limit; the stored list never grows until it expires.
///
/// Feeds degrade instead of failing: a missing credential or an upstream
/// error at any scope produces a smaller (possibly empty) feed, never an
/// error response.
use std::collections::HashSet;
use std::sync::Arc;

use chrono::NaiveDate;
use rand::seq::SliceRandom;
use tokio::sync::Semaphore;

use crate::cache::{Cache, CacheKey};
use crate::cached;
use crate::error::{AppError, AppResult};
use crate::models::upstream::RawTrendingEntry;
use crate::models::{GenreTable, MediaItem, MediaKind, Person, Review, TrendingScope, TrendingWindow};
use crate::services::providers::CatalogProvider;

/// Seconds a fully assembled feed stays cached
const FEED_CACHE_TTL: u64 = 300;
/// Seconds a per-title recommendation list stays cached
const RECS_CACHE_TTL: u64 = 600;
/// Seconds a raw trending page stays cached
const TRENDING_CACHE_TTL: u64 = 60;

/// Upper bound on concurrent per-title sub-fetches
const FANOUT_PERMITS: usize = 8;
/// Recommendations attached to each feed item
const RECS_PER_ITEM: usize = 5;
/// Discover pages scanned for upcoming trailers before giving up
const UPCOMING_PAGE_CAP: u32 = 3;
/// Trending pages mined for reviews
const REVIEW_TRENDING_PAGES: u32 = 2;
/// Review pages fetched per title
const REVIEW_PAGES_PER_TITLE: u32 = 2;

#[derive(Clone)]
pub struct FeedService {
    provider: Arc<dyn CatalogProvider>,
    genres: Arc<GenreTable>,
    cache: Cache,
    fanout: Arc<Semaphore>,
}

impl FeedService {
    pub fn new(provider: Arc<dyn CatalogProvider>, genres: Arc<GenreTable>, cache: Cache) -> Self {
        Self {
            provider,
            genres,
            cache,
            fanout: Arc::new(Semaphore::new(FANOUT_PERMITS)),
        }
    }

    /// Trending movies and shows for the hero carousel
    pub async fn featured(&self, limit: usize) -> AppResult<Vec<MediaItem>> {
        self.all_trending_feed("featured", limit, false).await
    }

    /// Trending movies and shows, each with a short recommendation list
    pub async fn trending(&self, limit: usize) -> AppResult<Vec<MediaItem>> {
        self.all_trending_feed("trending", limit, true).await
    }

    /// Crowd favorites rail, currently sourced from the same trending list
    pub async fn favorites(&self, limit: usize) -> AppResult<Vec<MediaItem>> {
        self.all_trending_feed("favorites", limit, false).await
    }

    /// Popular Korean shows, each with a short recommendation list
    pub async fn korea_trending(&self, limit: usize) -> AppResult<Vec<MediaItem>> {
        if !self.ensure_configured("korea-trending") {
            return Ok(Vec::new());
        }

        let result = cached!(
            self.cache,
            CacheKey::Feed("korea-trending"),
            FEED_CACHE_TTL,
            async move {
                let shows = self.provider.discover_korean_tv(1).await?;
                let items = self.dedupe(
                    shows
                        .into_iter()
                        .map(|tv| tv.into_media_item(&self.genres))
                        .collect(),
                );
                let mut items = self.attach_recommendations(items).await;
                shuffle(&mut items);
                items.truncate(limit);

                tracing::info!(feed = "korea-trending", items = items.len(), "Feed assembled");
                Ok(items)
            }
        );

        Self::degrade("korea-trending", result).map(|items| clip(items, limit))
    }

    /// Korean shows with their YouTube trailer keys
    ///
    /// Shows without a qualifying trailer are kept with a null key, so the
    /// rail stays full even when lookups fail.
    pub async fn trailers(&self, limit: usize) -> AppResult<Vec<MediaItem>> {
        if !self.ensure_configured("trailers") {
            return Ok(Vec::new());
        }

        let result = cached!(
            self.cache,
            CacheKey::Feed("trailers"),
            FEED_CACHE_TTL,
            async move {
                let shows = self.provider.discover_korean_tv(1).await?;
                let mut candidates = self.dedupe(
                    shows
                        .into_iter()
                        .map(|tv| tv.into_media_item(&self.genres))
                        .collect(),
                );
                candidates.truncate(limit);

                let mut items = self.attach_trailer_keys(candidates, true).await;
                shuffle(&mut items);

                tracing::info!(feed = "trailers", items = items.len(), "Feed assembled");
                Ok(items)
            }
        );

        Self::degrade("trailers", result).map(|items| clip(items, limit))
    }

    /// Soon-to-release movies and shows that already have a trailer
    ///
    /// Walks date-filtered discover pages for both kinds until enough
    /// titles with trailers are collected or the page cap is reached.
    /// Unlike [`FeedService::trailers`], titles without a qualifying
    /// trailer are dropped. The result is ordered by release date, not
    /// shuffled.
    pub async fn upcoming_trailers(&self, limit: usize) -> AppResult<Vec<MediaItem>> {
        if !self.ensure_configured("upcoming-trailers") {
            return Ok(Vec::new());
        }

        let result = cached!(
            self.cache,
            CacheKey::Feed("upcoming-trailers"),
            FEED_CACHE_TTL,
            async move {
                let today = chrono::Utc::now().date_naive();
                let mut seen = HashSet::new();
                let mut collected: Vec<MediaItem> = Vec::new();

                for page in 1..=UPCOMING_PAGE_CAP {
                    let (movies, shows) = tokio::join!(
                        self.provider.upcoming_movies(today, page),
                        self.provider.upcoming_tv(today, page),
                    );

                    let mut candidates: Vec<MediaItem> = Vec::new();
                    match movies {
                        Ok(batch) => candidates.extend(
                            batch.into_iter().map(|m| m.into_media_item(&self.genres)),
                        ),
                        Err(e) => {
                            tracing::warn!(page, error = %e, "Upcoming movie page failed")
                        }
                    }
                    match shows {
                        Ok(batch) => candidates.extend(
                            batch.into_iter().map(|tv| tv.into_media_item(&self.genres)),
                        ),
                        Err(e) => tracing::warn!(page, error = %e, "Upcoming tv page failed"),
                    }

                    // The upstream date filter is re-checked locally; entries
                    // without a parseable future date are discarded
                    candidates.retain(|item| {
                        releases_on_or_after(item, today) && seen.insert((item.kind, item.id))
                    });

                    collected.extend(self.attach_trailer_keys(candidates, false).await);
                    if collected.len() >= limit {
                        break;
                    }
                }

                collected.sort_by(|a, b| a.release_date.cmp(&b.release_date));
                collected.truncate(limit);

                tracing::info!(
                    feed = "upcoming-trailers",
                    items = collected.len(),
                    "Feed assembled"
                );
                Ok(collected)
            }
        );

        Self::degrade("upcoming-trailers", result).map(|items| clip(items, limit))
    }

    /// Reviews pulled from trending titles, avatar'd authors only
    pub async fn trending_reviews(&self, limit: usize) -> AppResult<Vec<Review>> {
        if !self.ensure_configured("trending-reviews") {
            return Ok(Vec::new());
        }

        let result = cached!(
            self.cache,
            CacheKey::Feed("trending-reviews"),
            FEED_CACHE_TTL,
            async move {
                let mut reviews: Vec<Review> = Vec::new();

                'pages: for page in 1..=REVIEW_TRENDING_PAGES {
                    let entries = match self
                        .provider
                        .trending(TrendingScope::All, TrendingWindow::Day, page)
                        .await
                    {
                        Ok(entries) => entries,
                        Err(e) => {
                            tracing::warn!(page, error = %e, "Trending page failed, skipping");
                            continue;
                        }
                    };

                    let titles = self.normalize_entries(entries);
                    for review in self.collect_reviews(&titles).await {
                        reviews.push(review);
                        if reviews.len() >= limit {
                            break 'pages;
                        }
                    }
                }

                shuffle(&mut reviews);

                tracing::info!(
                    feed = "trending-reviews",
                    reviews = reviews.len(),
                    "Feed assembled"
                );
                Ok(reviews)
            }
        );

        Self::degrade("trending-reviews", result).map(|reviews| clip(reviews, limit))
    }

    /// Popular people with their known-for titles
    pub async fn people(&self, limit: usize) -> AppResult<Vec<Person>> {
        if !self.ensure_configured("people") {
            return Ok(Vec::new());
        }

        let result = cached!(
            self.cache,
            CacheKey::Feed("people"),
            FEED_CACHE_TTL,
            async move {
                let raw = self.provider.popular_people(1).await?;
                let mut people: Vec<Person> = raw.into_iter().map(Person::from).collect();
                shuffle(&mut people);
                people.truncate(limit);

                tracing::info!(feed = "people", people = people.len(), "Feed assembled");
                Ok(people)
            }
        );

        Self::degrade("people", result).map(|people| clip(people, limit))
    }

    /// One normalized trending page, briefly cached
    ///
    /// The thin passthrough behind `/trending/{scope}/{window}`: no
    /// shuffling, no sub-fetches, persons dropped.
    pub async fn media_trending(
        &self,
        scope: TrendingScope,
        window: TrendingWindow,
    ) -> AppResult<Vec<MediaItem>> {
        if !self.ensure_configured("trending page") {
            return Ok(Vec::new());
        }

        let result = cached!(
            self.cache,
            CacheKey::Trending(scope, window),
            TRENDING_CACHE_TTL,
            async move {
                let entries = self.provider.trending(scope, window, 1).await?;
                Ok(self.normalize_entries(entries))
            }
        );

        Self::degrade("trending page", result)
    }

    /// Shared assembly for the feeds built from `trending/all/day`
    async fn all_trending_feed(
        &self,
        name: &'static str,
        limit: usize,
        with_recommendations: bool,
    ) -> AppResult<Vec<MediaItem>> {
        if !self.ensure_configured(name) {
            return Ok(Vec::new());
        }

        let result = cached!(self.cache, CacheKey::Feed(name), FEED_CACHE_TTL, async move {
            let entries = self
                .provider
                .trending(TrendingScope::All, TrendingWindow::Day, 1)
                .await?;
            let mut items = self.normalize_entries(entries);
            if with_recommendations {
                items = self.attach_recommendations(items).await;
            }
            shuffle(&mut items);
            items.truncate(limit);

            tracing::info!(feed = name, items = items.len(), "Feed assembled");
            Ok(items)
        });

        Self::degrade(name, result).map(|items| clip(items, limit))
    }

    /// Drops person entries, resolves genres, and collapses duplicates
    fn normalize_entries(&self, entries: Vec<RawTrendingEntry>) -> Vec<MediaItem> {
        self.dedupe(
            entries
                .into_iter()
                .filter_map(|entry| entry.into_media_item(&self.genres))
                .collect(),
        )
    }

    /// Keeps the first occurrence of every `(kind, id)` pair
    fn dedupe(&self, items: Vec<MediaItem>) -> Vec<MediaItem> {
        let mut seen = HashSet::new();
        items
            .into_iter()
            .filter(|item| seen.insert((item.kind, item.id)))
            .collect()
    }

    /// Fans out one recommendation lookup per item
    ///
    /// Lookups run as bounded concurrent tasks; a failed lookup leaves its
    /// item with an empty recommendation list.
    async fn attach_recommendations(&self, items: Vec<MediaItem>) -> Vec<MediaItem> {
        let mut tasks = Vec::with_capacity(items.len());
        for item in items {
            let service = self.clone();
            tasks.push(tokio::spawn(async move {
                let recommendations = match service.recommendations_for(item.kind, item.id).await {
                    Ok(recommendations) => recommendations,
                    Err(e) => {
                        tracing::warn!(
                            kind = %item.kind,
                            id = item.id,
                            error = %e,
                            "Recommendation fetch failed"
                        );
                        Vec::new()
                    }
                };
                MediaItem {
                    recommendations,
                    ..item
                }
            }));
        }

        let mut out = Vec::with_capacity(tasks.len());
        for task in tasks {
            match task.await {
                Ok(item) => out.push(item),
                Err(e) => tracing::error!(error = %e, "Recommendation task join error"),
            }
        }
        out
    }

    /// Cached recommendation list for one title
    ///
    /// Recommended items never carry recommendations of their own, which
    /// caps the tree at depth one.
    async fn recommendations_for(&self, kind: MediaKind, id: u64) -> AppResult<Vec<MediaItem>> {
        cached!(
            self.cache,
            CacheKey::Recommendations(kind, id),
            RECS_CACHE_TTL,
            async move {
                let _permit = self.acquire_fanout_permit().await?;
                let entries = self.provider.recommendations(kind, id).await?;
                let mut recommendations: Vec<MediaItem> = entries
                    .into_iter()
                    .filter_map(|entry| entry.into_media_item(&self.genres))
                    .collect();
                recommendations.truncate(RECS_PER_ITEM);
                Ok(recommendations)
            }
        )
    }

    /// Fans out one trailer lookup per item
    ///
    /// With `keep_missing`, items without a qualifying trailer stay in the
    /// list with a null key; otherwise they are dropped. A failed lookup
    /// counts as missing.
    async fn attach_trailer_keys(
        &self,
        items: Vec<MediaItem>,
        keep_missing: bool,
    ) -> Vec<MediaItem> {
        let mut tasks = Vec::with_capacity(items.len());
        for item in items {
            let service = self.clone();
            tasks.push(tokio::spawn(async move {
                let trailer_key = service.trailer_key_for(item.kind, item.id).await;
                (item, trailer_key)
            }));
        }

        let mut out = Vec::new();
        for task in tasks {
            let (item, trailer_key) = match task.await {
                Ok(pair) => pair,
                Err(e) => {
                    tracing::error!(error = %e, "Trailer task join error");
                    continue;
                }
            };
            if trailer_key.is_some() || keep_missing {
                out.push(MediaItem {
                    trailer_key,
                    ..item
                });
            }
        }
        out
    }

    /// Key of the title's first YouTube trailer, if any
    async fn trailer_key_for(&self, kind: MediaKind, id: u64) -> Option<String> {
        let _permit = self.acquire_fanout_permit().await.ok()?;

        match self.provider.videos(kind, id).await {
            Ok(videos) => videos
                .into_iter()
                .find(|video| video.is_trailer())
                .map(|video| video.key),
            Err(e) => {
                tracing::warn!(kind = %kind, id, error = %e, "Video lookup failed");
                None
            }
        }
    }

    /// Review lookups for a batch of titles, a few pages per title
    async fn collect_reviews(&self, titles: &[MediaItem]) -> Vec<Review> {
        let mut tasks = Vec::new();
        for title in titles {
            for page in 1..=REVIEW_PAGES_PER_TITLE {
                let service = self.clone();
                let kind = title.kind;
                let id = title.id;
                let name = title.title.clone();
                tasks.push(tokio::spawn(async move {
                    let _permit = service.acquire_fanout_permit().await.ok()?;
                    match service.provider.reviews(kind, id, page).await {
                        Ok(raw) => Some(
                            raw.into_iter()
                                .filter_map(|review| review.into_review(&name))
                                .collect::<Vec<_>>(),
                        ),
                        Err(e) => {
                            tracing::warn!(kind = %kind, id, page, error = %e, "Review fetch failed");
                            None
                        }
                    }
                }));
            }
        }

        let mut reviews = Vec::new();
        for task in tasks {
            if let Ok(Some(batch)) = task.await {
                reviews.extend(batch);
            }
        }
        reviews
    }

    async fn acquire_fanout_permit(&self) -> AppResult<tokio::sync::OwnedSemaphorePermit> {
        self.fanout
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| AppError::Internal(format!("Fanout semaphore closed: {}", e)))
    }

    /// False when no upstream credential is present; the feed is then
    /// served empty without touching the upstream
    fn ensure_configured(&self, feed: &str) -> bool {
        if self.provider.is_configured() {
            true
        } else {
            tracing::warn!(feed, "TMDB API key not set; serving empty feed");
            false
        }
    }

    /// Maps upstream failures to an empty feed; anything else propagates
    fn degrade<T>(feed: &'static str, result: AppResult<Vec<T>>) -> AppResult<Vec<T>> {
        match result {
            Ok(items) => Ok(items),
            Err(e @ (AppError::Upstream(_) | AppError::HttpClient(_))) => {
                tracing::warn!(feed, error = %e, "Upstream failure, serving empty feed");
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }
}

/// Uniform in-place shuffle
///
/// Feeds shuffle before caching, so the ordering rotates once per TTL
/// window rather than per request.
fn shuffle<T>(items: &mut [T]) {
    let mut rng = rand::thread_rng();
    items.shuffle(&mut rng);
}

fn clip<T>(mut items: Vec<T>, limit: usize) -> Vec<T> {
    items.truncate(limit);
    items
}

/// Whether the item carries a parseable release date of `today` or later
fn releases_on_or_after(item: &MediaItem, today: NaiveDate) -> bool {
    item.release_date
        .as_deref()
        .and_then(|date| NaiveDate::parse_from_str(date, "%Y-%m-%d").ok())
        .is_some_and(|date| date >= today)
}

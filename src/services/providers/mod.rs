/// Upstream media catalog abstraction
///
/// The aggregation engine talks to the catalog exclusively through this
/// trait, which keeps the HTTP details in one place and lets tests swap in
/// scripted catalogs. Every list method is lenient at the element level:
/// entries that do not decode as the expected shape are skipped, never
/// fatal.
use chrono::NaiveDate;

use crate::{
    error::AppResult,
    models::upstream::{RawGenre, RawMovie, RawPerson, RawReview, RawTrendingEntry, RawTv, RawVideo},
    models::{MediaKind, TrendingScope, TrendingWindow},
};

pub mod tmdb;

pub use tmdb::TmdbCatalog;

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CatalogProvider: Send + Sync {
    /// Whether an upstream credential is configured
    ///
    /// When this is false the service runs degraded: feeds are served empty
    /// and no upstream request is ever attempted.
    fn is_configured(&self) -> bool;

    /// One page of the trending list for a scope and time window
    async fn trending(
        &self,
        scope: TrendingScope,
        window: TrendingWindow,
        page: u32,
    ) -> AppResult<Vec<RawTrendingEntry>>;

    /// One page of popular Korean-language shows
    async fn discover_korean_tv(&self, page: u32) -> AppResult<Vec<RawTv>>;

    /// One page of movies releasing on `from` or later, earliest first
    async fn upcoming_movies(&self, from: NaiveDate, page: u32) -> AppResult<Vec<RawMovie>>;

    /// One page of shows first airing on `from` or later, earliest first
    async fn upcoming_tv(&self, from: NaiveDate, page: u32) -> AppResult<Vec<RawTv>>;

    /// One page of popular people
    async fn popular_people(&self, page: u32) -> AppResult<Vec<RawPerson>>;

    /// The full genre list for one kind
    async fn genres(&self, kind: MediaKind) -> AppResult<Vec<RawGenre>>;

    /// Videos attached to a title
    async fn videos(&self, kind: MediaKind, id: u64) -> AppResult<Vec<RawVideo>>;

    /// Titles recommended for a title
    async fn recommendations(&self, kind: MediaKind, id: u64) -> AppResult<Vec<RawTrendingEntry>>;

    /// One page of reviews for a title
    async fn reviews(&self, kind: MediaKind, id: u64, page: u32) -> AppResult<Vec<RawReview>>;
}

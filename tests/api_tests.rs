use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::NaiveDate;
use tower::ServiceExt;

use moodies_api::cache::{Cache, MemoryStore};
use moodies_api::error::{AppError, AppResult};
use moodies_api::models::upstream::{
    RawGenre, RawMovie, RawPerson, RawReview, RawReviewAuthor, RawTrendingEntry, RawTv, RawVideo,
};
use moodies_api::models::{GenreTable, MediaKind, TrendingScope, TrendingWindow};
use moodies_api::routes::{create_router, AppState};
use moodies_api::services::providers::CatalogProvider;
use moodies_api::services::FeedService;

/// Scripted catalog with call counters, used to observe caching and
/// request-coalescing behavior through the real service stack.
#[derive(Default)]
struct StubCatalog {
    trending_calls: AtomicUsize,
    recommendation_calls: AtomicUsize,
    video_calls: AtomicUsize,
    people_calls: AtomicUsize,
    /// Per-call latency, to widen the window for concurrent misses
    delay: Option<Duration>,
    fail_trending: AtomicBool,
}

impl StubCatalog {
    fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Default::default()
        }
    }

    async fn pause(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

fn movie(id: u64, title: &str) -> RawTrendingEntry {
    RawTrendingEntry::Movie(RawMovie {
        id,
        title: Some(title.to_string()),
        genre_ids: vec![18],
        ..Default::default()
    })
}

#[async_trait::async_trait]
impl CatalogProvider for StubCatalog {
    fn is_configured(&self) -> bool {
        true
    }

    async fn trending(
        &self,
        _scope: TrendingScope,
        _window: TrendingWindow,
        _page: u32,
    ) -> AppResult<Vec<RawTrendingEntry>> {
        self.trending_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        if self.fail_trending.load(Ordering::SeqCst) {
            return Err(AppError::Upstream("scripted failure".to_string()));
        }
        Ok((1..=10).map(|id| movie(id, "Trending movie")).collect())
    }

    async fn discover_korean_tv(&self, _page: u32) -> AppResult<Vec<RawTv>> {
        self.pause().await;
        Ok((1..=4)
            .map(|id| RawTv {
                id,
                name: Some("Korean show".to_string()),
                origin_country: vec!["KR".to_string()],
                ..Default::default()
            })
            .collect())
    }

    async fn upcoming_movies(&self, _from: NaiveDate, _page: u32) -> AppResult<Vec<RawMovie>> {
        Ok(Vec::new())
    }

    async fn upcoming_tv(&self, _from: NaiveDate, _page: u32) -> AppResult<Vec<RawTv>> {
        Ok(Vec::new())
    }

    async fn popular_people(&self, _page: u32) -> AppResult<Vec<RawPerson>> {
        self.people_calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![RawPerson {
            id: 1,
            name: "Popular person".to_string(),
            known_for_department: Some("Acting".to_string()),
            known_for: vec![serde_json::json!({
                "media_type": "movie",
                "id": 7,
                "title": "Known for this"
            })],
            ..Default::default()
        }])
    }

    async fn genres(&self, _kind: MediaKind) -> AppResult<Vec<RawGenre>> {
        Ok(vec![RawGenre {
            id: 18,
            name: "Drama".to_string(),
        }])
    }

    async fn videos(&self, _kind: MediaKind, _id: u64) -> AppResult<Vec<RawVideo>> {
        self.video_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        Ok(vec![RawVideo {
            key: "yt-key".to_string(),
            site: "YouTube".to_string(),
            video_type: "Trailer".to_string(),
        }])
    }

    async fn recommendations(
        &self,
        _kind: MediaKind,
        _id: u64,
    ) -> AppResult<Vec<RawTrendingEntry>> {
        self.recommendation_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        Ok((100..=108).map(|id| movie(id, "Recommended")).collect())
    }

    async fn reviews(&self, _kind: MediaKind, _id: u64, page: u32) -> AppResult<Vec<RawReview>> {
        if page > 1 {
            return Ok(Vec::new());
        }
        Ok(vec![RawReview {
            author: "reviewer".to_string(),
            content: "A review with some substance to it".to_string(),
            author_details: Some(RawReviewAuthor {
                avatar_path: Some("/reviewer.jpg".to_string()),
                rating: Some(9.0),
            }),
        }])
    }
}

fn feed_service(catalog: Arc<StubCatalog>) -> FeedService {
    let genres: GenreTable = [(18, "Drama".to_string())].into_iter().collect();
    FeedService::new(
        catalog,
        Arc::new(genres),
        Cache::new(Arc::new(MemoryStore::new())),
    )
}

fn test_app(catalog: Arc<StubCatalog>) -> Router {
    let state = AppState {
        feeds: feed_service(catalog),
    };
    create_router(state)
}

async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, value)
}

// Service-level behavior

#[tokio::test]
async fn test_concurrent_cold_requests_fetch_upstream_once() {
    let catalog = Arc::new(StubCatalog::with_delay(Duration::from_millis(50)));
    let feed = feed_service(catalog.clone());

    let (a, b, c) = tokio::join!(feed.featured(10), feed.featured(10), feed.featured(10));
    let (a, b, c) = (a.unwrap(), b.unwrap(), c.unwrap());

    assert_eq!(catalog.trending_calls.load(Ordering::SeqCst), 1);
    assert_eq!(a, b);
    assert_eq!(b, c);
    assert_eq!(a.len(), 10);
}

#[tokio::test]
async fn test_cached_feed_is_sliced_not_refetched() {
    let catalog = Arc::new(StubCatalog::default());
    let feed = feed_service(catalog.clone());

    let full = feed.featured(10).await.unwrap();
    let prefix = feed.featured(3).await.unwrap();

    assert_eq!(catalog.trending_calls.load(Ordering::SeqCst), 1);
    assert_eq!(prefix.len(), 3);
    assert_eq!(&full[..3], &prefix[..]);
}

#[tokio::test]
async fn test_trending_fans_out_once_per_unique_title() {
    let catalog = Arc::new(StubCatalog::default());
    let feed = feed_service(catalog.clone());

    let items = feed.trending(10).await.unwrap();
    assert_eq!(items.len(), 10);
    assert_eq!(catalog.recommendation_calls.load(Ordering::SeqCst), 10);
    for item in &items {
        assert_eq!(item.recommendations.len(), 5);
        assert!(item
            .recommendations
            .iter()
            .all(|rec| rec.recommendations.is_empty()));
    }

    // A second serve comes entirely from cache
    feed.trending(10).await.unwrap();
    assert_eq!(catalog.trending_calls.load(Ordering::SeqCst), 1);
    assert_eq!(catalog.recommendation_calls.load(Ordering::SeqCst), 10);
}

#[tokio::test]
async fn test_failed_assembly_is_not_cached() {
    let catalog = Arc::new(StubCatalog::default());
    catalog.fail_trending.store(true, Ordering::SeqCst);
    let feed = feed_service(catalog.clone());

    assert!(feed.featured(10).await.unwrap().is_empty());
    assert_eq!(catalog.trending_calls.load(Ordering::SeqCst), 1);

    // Upstream recovers; the next request recomputes instead of hitting
    // a cached empty list
    catalog.fail_trending.store(false, Ordering::SeqCst);
    let items = feed.featured(10).await.unwrap();
    assert_eq!(items.len(), 10);
    assert_eq!(catalog.trending_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_trailers_feed_carries_youtube_keys() {
    let catalog = Arc::new(StubCatalog::default());
    let feed = feed_service(catalog.clone());

    let items = feed.trailers(10).await.unwrap();
    assert_eq!(items.len(), 4);
    assert!(items
        .iter()
        .all(|item| item.trailer_key.as_deref() == Some("yt-key")));
    assert_eq!(catalog.video_calls.load(Ordering::SeqCst), 4);
}

// HTTP surface

#[tokio::test]
async fn test_health_check() {
    let app = test_app(Arc::new(StubCatalog::default()));
    let (status, body) = get_json(app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_featured_endpoint_returns_normalized_items() {
    let app = test_app(Arc::new(StubCatalog::default()));
    let (status, body) = get_json(app, "/api/v1/feeds/featured").await;

    assert_eq!(status, StatusCode::OK);
    let items = body.as_array().unwrap();
    assert_eq!(items.len(), 10);
    for item in items {
        assert_eq!(item["type"], "movie");
        assert_eq!(item["genres"][0], "Drama");
        assert!(item["title"].is_string());
    }
}

#[tokio::test]
async fn test_limit_query_caps_the_response() {
    let app = test_app(Arc::new(StubCatalog::default()));
    let (status, body) = get_json(app, "/api/v1/feeds/featured?limit=2").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_limit_validation_rejects_zero_and_oversized() {
    let app = test_app(Arc::new(StubCatalog::default()));

    let (status, body) = get_json(app.clone(), "/api/v1/feeds/trending?limit=0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, _) = get_json(app, "/api/v1/feeds/trending?limit=51").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_trending_path_segments_are_validated() {
    let app = test_app(Arc::new(StubCatalog::default()));

    let (status, body) = get_json(app.clone(), "/api/v1/trending/movie/week").await;
    assert_eq!(status, StatusCode::OK);
    assert!(!body.as_array().unwrap().is_empty());

    let (status, body) = get_json(app.clone(), "/api/v1/trending/actor/week").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("unknown trending scope"));

    let (status, _) = get_json(app, "/api/v1/trending/movie/month").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_upstream_failure_yields_empty_feed_not_error() {
    let catalog = Arc::new(StubCatalog::default());
    catalog.fail_trending.store(true, Ordering::SeqCst);
    let app = test_app(catalog);

    let (status, body) = get_json(app, "/api/v1/feeds/trending").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_people_endpoint_includes_known_for() {
    let app = test_app(Arc::new(StubCatalog::default()));
    let (status, body) = get_json(app, "/api/v1/feeds/people").await;

    assert_eq!(status, StatusCode::OK);
    let people = body.as_array().unwrap();
    assert_eq!(people.len(), 1);
    assert_eq!(people[0]["name"], "Popular person");
    assert_eq!(people[0]["known_for"][0]["title"], "Known for this");
}

#[tokio::test]
async fn test_reviews_endpoint_carries_source_title() {
    let app = test_app(Arc::new(StubCatalog::default()));
    let (status, body) = get_json(app, "/api/v1/feeds/trending-reviews").await;

    assert_eq!(status, StatusCode::OK);
    let reviews = body.as_array().unwrap();
    assert!(!reviews.is_empty());
    assert_eq!(reviews[0]["name"], "reviewer");
    assert_eq!(reviews[0]["title"], "Trending movie");
    assert_eq!(reviews[0]["avatar"], "/reviewer.jpg");
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let app = test_app(Arc::new(StubCatalog::default()));
    let (status, _) = get_json(app, "/api/v1/feeds/unknown").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_client_request_id_is_echoed() {
    let app = test_app(Arc::new(StubCatalog::default()));
    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("x-request-id", "proxy-abc-123")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(
        response.headers().get("x-request-id").unwrap(),
        "proxy-abc-123"
    );
}

#[tokio::test]
async fn test_missing_request_id_is_generated() {
    let app = test_app(Arc::new(StubCatalog::default()));
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    let header = response.headers().get("x-request-id").unwrap();
    assert!(!header.to_str().unwrap().is_empty());
}

use axum::{http::StatusCode, routing::get, Json, Router};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::{make_span_with_request_id, request_id_middleware};
use crate::services::FeedService;

pub mod feeds;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub feeds: FeedService,
}

/// Creates the application router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api_routes())
        .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// API routes under /api/v1
fn api_routes() -> Router<AppState> {
    Router::new()
        // Home page rails
        .route("/feeds/featured", get(feeds::featured))
        .route("/feeds/trending", get(feeds::trending))
        .route("/feeds/favorites", get(feeds::favorites))
        .route("/feeds/korea-trending", get(feeds::korea_trending))
        // Trailer rails
        .route("/feeds/trailers", get(feeds::trailers))
        .route("/feeds/upcoming-trailers", get(feeds::upcoming_trailers))
        // Community
        .route("/feeds/trending-reviews", get(feeds::trending_reviews))
        .route("/feeds/people", get(feeds::people))
        // Raw trending pages
        .route("/trending/:scope/:window", get(feeds::media_trending))
}

/// Health check endpoint
async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

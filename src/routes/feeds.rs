use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::models::{MediaItem, Person, Review, TrendingScope, TrendingWindow};

use super::AppState;

/// Largest accepted `?limit=` value
pub const MAX_LIMIT: usize = 50;
/// Items returned when no limit is given
pub const DEFAULT_LIMIT: usize = 25;
/// Default size of the hero carousel
pub const FEATURED_DEFAULT_LIMIT: usize = 20;

#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    limit: Option<usize>,
}

impl FeedQuery {
    /// Validated limit, falling back to the feed's default
    fn limit_or(&self, default: usize) -> AppResult<usize> {
        let limit = self.limit.unwrap_or(default);
        if limit == 0 || limit > MAX_LIMIT {
            return Err(AppError::InvalidInput(format!(
                "limit must be between 1 and {}",
                MAX_LIMIT
            )));
        }
        Ok(limit)
    }
}

/// Handler for the hero carousel feed
pub async fn featured(
    State(state): State<AppState>,
    Query(params): Query<FeedQuery>,
) -> AppResult<Json<Vec<MediaItem>>> {
    let limit = params.limit_or(FEATURED_DEFAULT_LIMIT)?;
    let items = state.feeds.featured(limit).await?;
    Ok(Json(items))
}

/// Handler for the trending feed
pub async fn trending(
    State(state): State<AppState>,
    Query(params): Query<FeedQuery>,
) -> AppResult<Json<Vec<MediaItem>>> {
    let limit = params.limit_or(DEFAULT_LIMIT)?;
    let items = state.feeds.trending(limit).await?;
    Ok(Json(items))
}

/// Handler for the crowd favorites feed
pub async fn favorites(
    State(state): State<AppState>,
    Query(params): Query<FeedQuery>,
) -> AppResult<Json<Vec<MediaItem>>> {
    let limit = params.limit_or(DEFAULT_LIMIT)?;
    let items = state.feeds.favorites(limit).await?;
    Ok(Json(items))
}

/// Handler for the Korean shows feed
pub async fn korea_trending(
    State(state): State<AppState>,
    Query(params): Query<FeedQuery>,
) -> AppResult<Json<Vec<MediaItem>>> {
    let limit = params.limit_or(DEFAULT_LIMIT)?;
    let items = state.feeds.korea_trending(limit).await?;
    Ok(Json(items))
}

/// Handler for the Korean trailer rail
pub async fn trailers(
    State(state): State<AppState>,
    Query(params): Query<FeedQuery>,
) -> AppResult<Json<Vec<MediaItem>>> {
    let limit = params.limit_or(DEFAULT_LIMIT)?;
    let items = state.feeds.trailers(limit).await?;
    Ok(Json(items))
}

/// Handler for the upcoming releases trailer rail
pub async fn upcoming_trailers(
    State(state): State<AppState>,
    Query(params): Query<FeedQuery>,
) -> AppResult<Json<Vec<MediaItem>>> {
    let limit = params.limit_or(DEFAULT_LIMIT)?;
    let items = state.feeds.upcoming_trailers(limit).await?;
    Ok(Json(items))
}

/// Handler for the community reviews rail
pub async fn trending_reviews(
    State(state): State<AppState>,
    Query(params): Query<FeedQuery>,
) -> AppResult<Json<Vec<Review>>> {
    let limit = params.limit_or(DEFAULT_LIMIT)?;
    let reviews = state.feeds.trending_reviews(limit).await?;
    Ok(Json(reviews))
}

/// Handler for the popular people rail
pub async fn people(
    State(state): State<AppState>,
    Query(params): Query<FeedQuery>,
) -> AppResult<Json<Vec<Person>>> {
    let limit = params.limit_or(DEFAULT_LIMIT)?;
    let people = state.feeds.people(limit).await?;
    Ok(Json(people))
}

/// Handler for raw trending pages, e.g. `/trending/movie/week`
pub async fn media_trending(
    State(state): State<AppState>,
    Path((scope, window)): Path<(String, String)>,
) -> AppResult<Json<Vec<MediaItem>>> {
    let scope = TrendingScope::from_path(&scope)
        .ok_or_else(|| AppError::InvalidInput(format!("unknown trending scope: {}", scope)))?;
    let window = TrendingWindow::from_path(&window)
        .ok_or_else(|| AppError::InvalidInput(format!("unknown trending window: {}", window)))?;
    let items = state.feeds.media_trending(scope, window).await?;
    Ok(Json(items))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_defaults_per_feed() {
        let query = FeedQuery { limit: None };
        assert_eq!(query.limit_or(DEFAULT_LIMIT).unwrap(), 25);
        assert_eq!(query.limit_or(FEATURED_DEFAULT_LIMIT).unwrap(), 20);
    }

    #[test]
    fn test_limit_accepts_the_full_range() {
        assert_eq!(FeedQuery { limit: Some(1) }.limit_or(25).unwrap(), 1);
        assert_eq!(FeedQuery { limit: Some(50) }.limit_or(25).unwrap(), 50);
    }

    #[test]
    fn test_limit_rejects_zero_and_oversized() {
        assert!(matches!(
            FeedQuery { limit: Some(0) }.limit_or(25),
            Err(AppError::InvalidInput(_))
        ));
        assert!(matches!(
            FeedQuery { limit: Some(51) }.limit_or(25),
            Err(AppError::InvalidInput(_))
        ));
    }
}

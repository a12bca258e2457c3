use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use moodies_api::cache::{Cache, CacheStore, MemoryStore, RedisStore};
use moodies_api::config::Config;
use moodies_api::routes::{create_router, AppState};
use moodies_api::services::providers::TmdbCatalog;
use moodies_api::services::{load_genre_table, FeedService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "moodies_api=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;

    // The URL may carry credentials, so it is not logged
    let store: Arc<dyn CacheStore> = match config.redis_url.as_deref() {
        Some(url) => {
            tracing::info!("Using Redis cache store");
            Arc::new(RedisStore::new(url)?)
        }
        None => {
            tracing::info!("REDIS_URL not set; using in-memory cache store");
            Arc::new(MemoryStore::new())
        }
    };
    let cache = Cache::new(store);

    let catalog = Arc::new(TmdbCatalog::new(
        config.tmdb_base_url.clone(),
        config.tmdb_api_key.clone(),
    )?);
    let genres = Arc::new(load_genre_table(catalog.as_ref()).await);

    let state = AppState {
        feeds: FeedService::new(catalog, genres, cache),
    };
    let app = create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "Server listening");
    axum::serve(listener, app).await?;

    Ok(())
}

/// TMDB catalog provider
///
/// Issues bearer-authenticated GETs against the TMDB v3 API. All list
/// payloads arrive as `{ "results": [...] }` (genre lists use a `genres`
/// array instead); a missing array is treated as an empty list, and
/// elements that fail to decode are skipped individually.
use chrono::NaiveDate;
use reqwest::Client as HttpClient;
use std::time::Duration;

use crate::{
    error::{AppError, AppResult},
    models::upstream::{RawGenre, RawMovie, RawPerson, RawReview, RawTrendingEntry, RawTv, RawVideo},
    models::{MediaKind, TrendingScope, TrendingWindow},
    services::providers::CatalogProvider,
};

/// Per-request upstream timeout; a slow TMDB call fails like any other
const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct TmdbCatalog {
    http_client: HttpClient,
    base_url: String,
    api_key: Option<String>,
}

impl TmdbCatalog {
    pub fn new(base_url: String, api_key: Option<String>) -> AppResult<Self> {
        let http_client = HttpClient::builder().timeout(UPSTREAM_TIMEOUT).build()?;

        Ok(Self {
            http_client,
            base_url,
            api_key,
        })
    }

    /// GETs an endpoint and returns its raw JSON payload
    async fn fetch_value(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> AppResult<serde_json::Value> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| AppError::Upstream("TMDB API key not configured".to_string()))?;

        let url = format!("{}/{}", self.base_url, path);
        let response = self
            .http_client
            .get(&url)
            .bearer_auth(api_key)
            .query(query)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream(format!(
                "TMDB returned status {}: {}",
                status, body
            )));
        }

        Ok(response.json().await?)
    }

    /// Decodes the elements of `payload[field]`, skipping those that do not
    /// match `T`. A missing or non-array field yields an empty list.
    fn decode_elements<T: serde::de::DeserializeOwned>(
        payload: &serde_json::Value,
        field: &str,
    ) -> Vec<T> {
        let Some(elements) = payload[field].as_array() else {
            return Vec::new();
        };

        elements
            .iter()
            .filter_map(|element| serde_json::from_value::<T>(element.clone()).ok())
            .collect()
    }

    /// GETs a list endpoint and decodes its `results` array
    async fn fetch_results<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> AppResult<Vec<T>> {
        let payload = self.fetch_value(path, query).await?;
        Ok(Self::decode_elements(&payload, "results"))
    }
}

#[async_trait::async_trait]
impl CatalogProvider for TmdbCatalog {
    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn trending(
        &self,
        scope: TrendingScope,
        window: TrendingWindow,
        page: u32,
    ) -> AppResult<Vec<RawTrendingEntry>> {
        let entries = self
            .fetch_results(
                &format!("trending/{}/{}", scope, window),
                &[("page", page.to_string())],
            )
            .await?;

        tracing::debug!(
            scope = %scope,
            window = %window,
            page,
            results = entries.len(),
            "Trending page fetched"
        );

        Ok(entries)
    }

    async fn discover_korean_tv(&self, page: u32) -> AppResult<Vec<RawTv>> {
        self.fetch_results(
            "discover/tv",
            &[
                ("with_original_language", "ko".to_string()),
                ("include_adult", "false".to_string()),
                ("sort_by", "popularity.desc".to_string()),
                ("page", page.to_string()),
            ],
        )
        .await
    }

    async fn upcoming_movies(&self, from: NaiveDate, page: u32) -> AppResult<Vec<RawMovie>> {
        self.fetch_results(
            "discover/movie",
            &[
                ("language", "en-US".to_string()),
                ("sort_by", "primary_release_date.asc".to_string()),
                (
                    "primary_release_date.gte",
                    from.format("%Y-%m-%d").to_string(),
                ),
                ("page", page.to_string()),
            ],
        )
        .await
    }

    async fn upcoming_tv(&self, from: NaiveDate, page: u32) -> AppResult<Vec<RawTv>> {
        self.fetch_results(
            "discover/tv",
            &[
                ("language", "en-US".to_string()),
                ("sort_by", "first_air_date.asc".to_string()),
                ("first_air_date.gte", from.format("%Y-%m-%d").to_string()),
                ("page", page.to_string()),
            ],
        )
        .await
    }

    async fn popular_people(&self, page: u32) -> AppResult<Vec<RawPerson>> {
        let people: Vec<RawPerson> = self
            .fetch_results(
                "person/popular",
                &[
                    ("language", "en-US".to_string()),
                    ("page", page.to_string()),
                ],
            )
            .await?;

        tracing::debug!(page, results = people.len(), "Popular people fetched");

        Ok(people)
    }

    async fn genres(&self, kind: MediaKind) -> AppResult<Vec<RawGenre>> {
        let payload = self
            .fetch_value(&format!("genre/{}/list", kind), &[])
            .await?;
        Ok(Self::decode_elements(&payload, "genres"))
    }

    async fn videos(&self, kind: MediaKind, id: u64) -> AppResult<Vec<RawVideo>> {
        self.fetch_results(
            &format!("{}/{}/videos", kind, id),
            &[("language", "en-US".to_string())],
        )
        .await
    }

    async fn recommendations(&self, kind: MediaKind, id: u64) -> AppResult<Vec<RawTrendingEntry>> {
        self.fetch_results(
            &format!("{}/{}/recommendations", kind, id),
            &[
                ("language", "en-US".to_string()),
                ("page", "1".to_string()),
            ],
        )
        .await
    }

    async fn reviews(&self, kind: MediaKind, id: u64, page: u32) -> AppResult<Vec<RawReview>> {
        self.fetch_results(
            &format!("{}/{}/reviews", kind, id),
            &[
                ("language", "en-US".to_string()),
                ("page", page.to_string()),
            ],
        )
        .await
    }
}

/// Wraps a computation in coalesced read-through caching.
///
/// Expands to a [`crate::cache::Cache::get_or_compute`] call: a cache hit
/// short-circuits the block, a miss runs it behind the key's single-flight
/// lock and stores the result for `$ttl` seconds.
///
/// # Arguments
/// * `$cache`: The [`crate::cache::Cache`] handle.
/// * `$key`: The [`crate::cache::CacheKey`] to cache under.
/// * `$ttl`: The time-to-live for the cached value, in seconds.
/// * `$block`: The async block computing the value on a miss.
///
/// # Example
/// ```rust,ignore
/// let feed = cached!(self.cache, CacheKey::Feed("trending"), FEED_CACHE_TTL, async move {
///     self.assemble_trending().await
/// });
/// ```
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $ttl:expr, $block:expr) => {
        $cache.get_or_compute(&$key, $ttl, || $block).await
    };
}

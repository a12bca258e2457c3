use std::collections::HashMap;

use crate::models::{GenreTable, MediaKind};
use crate::services::providers::CatalogProvider;

/// Builds the genre lookup table from the upstream movie and tv genre lists
///
/// The two lists are merged into one table; when an id appears in both, the
/// tv name wins since it is loaded second. Failures degrade instead of
/// aborting: a failed list is skipped, and without a credential the table is
/// empty, so every lookup resolves to "Unknown".
pub async fn load_genre_table(provider: &dyn CatalogProvider) -> GenreTable {
    if !provider.is_configured() {
        tracing::warn!("TMDB API key not set; genre table will be empty");
        return GenreTable::default();
    }

    let mut names = HashMap::new();
    for kind in [MediaKind::Movie, MediaKind::Tv] {
        match provider.genres(kind).await {
            Ok(genres) => {
                for genre in genres {
                    names.insert(genre.id, genre.name);
                }
            }
            Err(e) => {
                tracing::warn!(kind = %kind, error = %e, "Failed to load genre list");
            }
        }
    }

    tracing::info!(genres = names.len(), "Genre table loaded");
    GenreTable::new(names)
}

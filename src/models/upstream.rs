//! Raw record shapes returned by the upstream catalog API.
//!
//! Every list endpoint wraps its payload in a `results` array whose elements
//! are decoded individually; an element that does not match the expected
//! shape is skipped rather than failing the whole response. Trending and
//! recommendation entries are discriminated by their `media_type` tag,
//! discover endpoints return untagged records of a known kind.

use serde::Deserialize;

use crate::models::{GenreTable, KnownForRef, MediaItem, MediaKind, Person, Review};

/// Characters kept from a review body
const REVIEW_QUOTE_CHARS: usize = 200;

/// An entry of a `media_type`-tagged list (trending, recommendations)
///
/// Entries tagged with anything other than these three variants fail to
/// decode and are dropped at the provider boundary.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "media_type", rename_all = "lowercase")]
pub enum RawTrendingEntry {
    Movie(RawMovie),
    Tv(RawTv),
    Person(RawPerson),
}

impl RawTrendingEntry {
    /// Normalizes the entry, dropping person entries
    pub fn into_media_item(self, genres: &GenreTable) -> Option<MediaItem> {
        match self {
            RawTrendingEntry::Movie(movie) => Some(movie.into_media_item(genres)),
            RawTrendingEntry::Tv(tv) => Some(tv.into_media_item(genres)),
            RawTrendingEntry::Person(_) => None,
        }
    }
}

/// A movie-shaped upstream record
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawMovie {
    pub id: u64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub genre_ids: Vec<u64>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub backdrop_path: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub vote_average: Option<f32>,
    #[serde(default)]
    pub vote_count: Option<u64>,
    #[serde(default)]
    pub popularity: Option<f32>,
}

impl RawMovie {
    pub fn into_media_item(self, genres: &GenreTable) -> MediaItem {
        MediaItem {
            id: self.id,
            kind: MediaKind::Movie,
            title: self.title.unwrap_or_else(|| "Untitled".to_string()),
            overview: self.overview.unwrap_or_default(),
            genres: genres.resolve(&self.genre_ids),
            poster_path: self.poster_path,
            backdrop_path: self.backdrop_path,
            release_date: normalize_date(self.release_date),
            vote_average: self.vote_average,
            vote_count: self.vote_count,
            popularity: self.popularity,
            origin_country: Vec::new(),
            trailer_key: None,
            recommendations: Vec::new(),
        }
    }
}

/// A show-shaped upstream record
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawTv {
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub genre_ids: Vec<u64>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub backdrop_path: Option<String>,
    #[serde(default)]
    pub first_air_date: Option<String>,
    #[serde(default)]
    pub vote_average: Option<f32>,
    #[serde(default)]
    pub vote_count: Option<u64>,
    #[serde(default)]
    pub popularity: Option<f32>,
    #[serde(default)]
    pub origin_country: Vec<String>,
}

impl RawTv {
    pub fn into_media_item(self, genres: &GenreTable) -> MediaItem {
        MediaItem {
            id: self.id,
            kind: MediaKind::Tv,
            title: self.name.unwrap_or_else(|| "Untitled".to_string()),
            overview: self.overview.unwrap_or_default(),
            genres: genres.resolve(&self.genre_ids),
            poster_path: self.poster_path,
            backdrop_path: self.backdrop_path,
            release_date: normalize_date(self.first_air_date),
            vote_average: self.vote_average,
            vote_count: self.vote_count,
            popularity: self.popularity,
            origin_country: self.origin_country,
            trailer_key: None,
            recommendations: Vec::new(),
        }
    }
}

/// A person-shaped upstream record
///
/// `known_for` elements are decoded individually in the conversion to
/// [`Person`], so one malformed entry does not discard the person.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawPerson {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub known_for_department: Option<String>,
    #[serde(default)]
    pub popularity: Option<f32>,
    #[serde(default)]
    pub profile_path: Option<String>,
    #[serde(default)]
    pub known_for: Vec<serde_json::Value>,
}

impl From<RawPerson> for Person {
    fn from(raw: RawPerson) -> Self {
        let known_for = raw
            .known_for
            .iter()
            .filter_map(|value| serde_json::from_value::<RawTrendingEntry>(value.clone()).ok())
            .filter_map(KnownForRef::from_entry)
            .collect();

        Person {
            id: raw.id,
            name: raw.name,
            known_for_department: raw.known_for_department.unwrap_or_default(),
            popularity: raw.popularity,
            profile_path: raw.profile_path,
            known_for,
        }
    }
}

impl KnownForRef {
    fn from_entry(entry: RawTrendingEntry) -> Option<Self> {
        match entry {
            RawTrendingEntry::Movie(movie) => Some(KnownForRef {
                id: movie.id,
                kind: MediaKind::Movie,
                title: movie.title.unwrap_or_else(|| "Untitled".to_string()),
                poster_path: movie.poster_path,
            }),
            RawTrendingEntry::Tv(tv) => Some(KnownForRef {
                id: tv.id,
                kind: MediaKind::Tv,
                title: tv.name.unwrap_or_else(|| "Untitled".to_string()),
                poster_path: tv.poster_path,
            }),
            RawTrendingEntry::Person(_) => None,
        }
    }
}

/// A video attached to a title
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawVideo {
    pub key: String,
    #[serde(default)]
    pub site: String,
    #[serde(rename = "type", default)]
    pub video_type: String,
}

impl RawVideo {
    /// Whether this video qualifies as the title's trailer
    pub fn is_trailer(&self) -> bool {
        self.video_type == "Trailer" && self.site == "YouTube"
    }
}

/// A genre list element
#[derive(Debug, Clone, Deserialize)]
pub struct RawGenre {
    pub id: u64,
    pub name: String,
}

/// A review of a title
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawReview {
    pub author: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub author_details: Option<RawReviewAuthor>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawReviewAuthor {
    #[serde(default)]
    pub avatar_path: Option<String>,
    #[serde(default)]
    pub rating: Option<f32>,
}

impl RawReview {
    /// Builds the served review shape for the given title
    ///
    /// Reviews whose author has no avatar are discarded. The body is clipped
    /// to a fixed number of characters, never splitting a character.
    pub fn into_review(self, title: &str) -> Option<Review> {
        let details = self.author_details?;
        let avatar = details.avatar_path?;

        Some(Review {
            quote: self.content.chars().take(REVIEW_QUOTE_CHARS).collect(),
            name: self.author,
            title: title.to_string(),
            avatar,
            rating: details.rating,
        })
    }
}

/// Turns absent or empty upstream date strings into `None`
fn normalize_date(date: Option<String>) -> Option<String> {
    date.filter(|d| !d.is_empty())
}

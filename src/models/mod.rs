use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fmt::Display};

pub mod upstream;

/// Whether a catalog entry is a movie or a TV show
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Movie,
    Tv,
}

impl Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaKind::Movie => write!(f, "movie"),
            MediaKind::Tv => write!(f, "tv"),
        }
    }
}

/// Scope of a trending lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendingScope {
    All,
    Movie,
    Tv,
}

impl TrendingScope {
    /// Parses the form used in request paths and upstream URLs
    pub fn from_path(value: &str) -> Option<Self> {
        match value {
            "all" => Some(TrendingScope::All),
            "movie" => Some(TrendingScope::Movie),
            "tv" => Some(TrendingScope::Tv),
            _ => None,
        }
    }
}

impl Display for TrendingScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrendingScope::All => write!(f, "all"),
            TrendingScope::Movie => write!(f, "movie"),
            TrendingScope::Tv => write!(f, "tv"),
        }
    }
}

/// Time window of a trending lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendingWindow {
    Day,
    Week,
}

impl TrendingWindow {
    /// Parses the form used in request paths and upstream URLs
    pub fn from_path(value: &str) -> Option<Self> {
        match value {
            "day" => Some(TrendingWindow::Day),
            "week" => Some(TrendingWindow::Week),
            _ => None,
        }
    }
}

impl Display for TrendingWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrendingWindow::Day => write!(f, "day"),
            TrendingWindow::Week => write!(f, "week"),
        }
    }
}

/// A normalized movie or TV show as served to clients
///
/// Upstream movie and show records differ in field names; both collapse into
/// this shape. `recommendations` is at most one level deep: items attached as
/// recommendations never carry recommendations of their own.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MediaItem {
    pub id: u64,
    #[serde(rename = "type")]
    pub kind: MediaKind,
    pub title: String,
    pub overview: String,
    /// Resolved genre names, in upstream order
    pub genres: Vec<String>,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    /// Release date (movies) or first air date (shows), `YYYY-MM-DD`
    pub release_date: Option<String>,
    pub vote_average: Option<f32>,
    pub vote_count: Option<u64>,
    pub popularity: Option<f32>,
    pub origin_country: Vec<String>,
    /// YouTube video key of the title's trailer, when one was looked up
    pub trailer_key: Option<String>,
    pub recommendations: Vec<MediaItem>,
}

/// A popular cast or crew member
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Person {
    pub id: u64,
    pub name: String,
    pub known_for_department: String,
    pub popularity: Option<f32>,
    pub profile_path: Option<String>,
    pub known_for: Vec<KnownForRef>,
}

/// Shallow reference to a title a person is known for
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KnownForRef {
    pub id: u64,
    #[serde(rename = "type")]
    pub kind: MediaKind,
    pub title: String,
    pub poster_path: Option<String>,
}

/// A viewer review lifted from a trending title
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Review {
    /// Review body, truncated to a fixed length
    pub quote: String,
    /// Review author
    pub name: String,
    /// Title of the reviewed movie or show
    pub title: String,
    /// Author avatar path
    pub avatar: String,
    /// Author rating on the 0-10 scale, when given
    pub rating: Option<f32>,
}

/// Immutable genre id to name lookup table
///
/// Built once at startup from the upstream genre lists and shared read-only
/// after that. Ids missing from the table resolve to "Unknown".
#[derive(Debug, Clone, Default)]
pub struct GenreTable {
    names: HashMap<u64, String>,
}

impl GenreTable {
    pub fn new(names: HashMap<u64, String>) -> Self {
        Self { names }
    }

    /// Resolves a single genre id
    pub fn name(&self, id: u64) -> String {
        self.names
            .get(&id)
            .cloned()
            .unwrap_or_else(|| "Unknown".to_string())
    }

    /// Resolves a list of genre ids, preserving order
    pub fn resolve(&self, ids: &[u64]) -> Vec<String> {
        ids.iter().map(|id| self.name(*id)).collect()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl FromIterator<(u64, String)> for GenreTable {
    fn from_iter<I: IntoIterator<Item = (u64, String)>>(iter: I) -> Self {
        Self {
            names: iter.into_iter().collect(),
        }
    }
}

pub mod feeds;
pub mod genres;
pub mod providers;

pub use feeds::FeedService;
pub use genres::load_genre_table;

//! Catalog aggregation and playback state for the podcast daemon.
//!
//! Shows are fetched from the remote index, enriched with per-show detail
//! records, and projected for browsing. Favorite episodes are persisted as
//! a single snapshot, and a single-slot player tracks what is playing.

pub mod catalog;
pub mod config;
pub mod enrich;
pub mod error;
pub mod favorites;
pub mod platform;
pub mod playback;
pub mod protocol;
pub mod source;
pub mod state;
pub mod view;

pub use catalog::{Episode, EpisodeId, GenreId, Season, Show, ShowDetail, ShowSummary, UpdatedAt};
pub use error::{CatalogError, PersistenceError};
pub use favorites::{FavoriteEntry, FavoriteSort, Favorites, FavoritesStore};
pub use playback::{MediaCommand, PlayableEpisode, PlaybackController, PlaybackState, PlaybackStatus};
pub use source::{CatalogSource, HttpSource};
pub use state::{AppState, CatalogSnapshot, CatalogStatus};
pub use view::SortKey;

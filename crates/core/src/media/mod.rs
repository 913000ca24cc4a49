//! The wanted-content tree: movies, shows, seasons and episodes.
//!
//! A [`MediaItem`] is built per scheduling cycle from the watchlist, enriched
//! by catalog merges and mutated in place while acquisition runs. Identity,
//! query construction and release-title matching all live here.

mod anime;
mod collection;
mod deviation;
mod identity;
mod merge;
mod query;
mod types;

pub use anime::{assign_anime_numbering, is_anime, roman_numeral};
pub use collection::{collected, find_in_library, local_episode_count, released, set_file_names};
pub use deviation::{compile_deviation, deviation, deviation_for_year, matches_deviation};
pub use merge::{match_item, MergeOptions};
pub use query::{alternate_titles, rename};
pub use types::{
    AnimeNumbering, CycleFlags, ExistingFile, Lineage, MediaItem, MediaKind, ScrapingAdjustment,
};

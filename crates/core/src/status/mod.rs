//! Show airing status used to decide when a finished show leaves the
//! watchlist.

mod tmdb;
mod types;

pub use tmdb::{cache_keys, TmdbStatusClient};
pub use types::{is_ended_status, is_show_complete, ShowStatus, StatusError, StatusService};

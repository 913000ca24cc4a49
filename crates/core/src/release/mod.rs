//! Candidate releases and the quality facts derived from their titles.

mod quality;
mod types;

pub use quality::{
    has_1080_plus, is_1080, is_4k, is_low_quality, is_multi_season_pack, is_season_pack,
    normalize_title, parse_resolution, season_range,
};
pub use types::{Protocol, Release};

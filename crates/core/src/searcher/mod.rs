//! Indexer search: querying Prowlarr, filtering hits and resolving them
//! into magnet-bearing releases.

mod pipeline;
mod prowlarr;
mod resolver;
mod torrent_parser;
mod types;

pub use pipeline::{allowed_category, cross_check_ids, filter_hits, resolution_budget, title_guard};
pub use prowlarr::ProwlarrSearcher;
pub use resolver::{find_magnet, unescape_html, MagnetResolver, ResolverSettings};
pub use torrent_parser::{magnet_from_torrent, parse_torrent_info_hash, TorrentParseError};
pub use types::{RawHit, ReleaseSource, SearchError, TargetIds};

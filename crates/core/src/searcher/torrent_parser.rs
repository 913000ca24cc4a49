//! Torrent file parsing.
//!
//! Uses librqbit-core to decode bencoded .torrent data so a downloaded
//! torrent can be turned into an equivalent magnet link.

use librqbit_core::torrent_metainfo::{torrent_from_bytes, TorrentMetaV1Owned};
use thiserror::Error;

/// Errors that can occur when parsing torrent files.
#[derive(Debug, Error)]
pub enum TorrentParseError {
    #[error("Failed to parse torrent: {0}")]
    ParseError(String),
}

/// Build a magnet link from the raw bytes of a .torrent file.
///
/// The link carries the info hash, the display name when the torrent has
/// one, and the primary announce URL.
pub fn magnet_from_torrent(bytes: &[u8]) -> Result<String, TorrentParseError> {
    let torrent: TorrentMetaV1Owned =
        torrent_from_bytes(bytes).map_err(|e| TorrentParseError::ParseError(e.to_string()))?;

    let mut magnet = format!("magnet:?xt=urn:btih:{}", torrent.info_hash.as_string());
    if let Some(name) = torrent.info.name.as_ref().map(|b| bytes_to_string(b.as_ref())) {
        magnet.push_str("&dn=");
        magnet.push_str(&urlencoding::encode(&name));
    }
    if let Some(tracker) = torrent.announce.as_ref().map(|b| bytes_to_string(b.as_ref())) {
        magnet.push_str("&tr=");
        magnet.push_str(&urlencoding::encode(&tracker));
    }
    Ok(magnet)
}

/// Extract the info_hash from a .torrent file as lowercase hex.
pub fn parse_torrent_info_hash(bytes: &[u8]) -> Result<String, TorrentParseError> {
    let torrent: TorrentMetaV1Owned =
        torrent_from_bytes(bytes).map_err(|e| TorrentParseError::ParseError(e.to_string()))?;

    Ok(torrent.info_hash.as_string())
}

/// UTF-8 with a lossy fallback.
fn bytes_to_string(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => String::from_utf8_lossy(bytes).into_owned(),
    }
}

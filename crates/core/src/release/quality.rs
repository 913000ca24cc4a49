//! Title heuristics shared by the indexer pipeline, the rule engine and the
//! release policy.

use once_cell::sync::Lazy;
use regex_lite::Regex;

use super::Release;

static RESOLUTION: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)(2160|1080|720|480)p").unwrap());
static UHD_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\b(4k|uhd)\b").unwrap());
static HIGH_RES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(1080p|2160p|4k|uhd)\b").unwrap());
static SUB_720: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\b(480|360|240)p\b").unwrap());
static LOW_SOURCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(DVDRip|DVDScr|HDTV|PDTV|TVRip|CAM|HDCAM|TS|TELESYNC|TC|R5)\b").unwrap()
});
static SEASON_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(^|[^A-Za-z0-9])(S[0-9]{1,2}([^A-Za-z0-9]|$)|S[0-9]{1,2}-S?[0-9]{1,2}|seasons?[^A-Za-z0-9]?[0-9]{1,2}|complete)")
        .unwrap()
});
static SEASON_RANGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:^|[^A-Za-z0-9])(?:S|seasons?[^A-Za-z0-9]?)0*([0-9]{1,2})[^A-Za-z0-9]{0,3}(?:-|to)[^A-Za-z0-9]{0,3}S?0*([0-9]{1,2})(?:[^0-9]|$)").unwrap()
});
static WHOLE_SHOW: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(^|[^A-Za-z0-9])(complete[^A-Za-z0-9]+series|seasons|all[^A-Za-z0-9]+seasons)([^A-Za-z0-9]|$)").unwrap()
});
static SINGLE_SEASON: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(^|[^A-Za-z0-9])(S[0-9]{1,2}|season[^A-Za-z0-9]?[0-9]{1,2})([^A-Za-z0-9]|$)").unwrap()
});
static EPISODE_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(S[0-9]{1,2}E[0-9]{1,3}|[^0-9][0-9]{1,2}x[0-9]{2}[^0-9])").unwrap());

/// Vertical resolution named in a release title, 0 when none is found.
pub fn parse_resolution(title: &str) -> u32 {
    if let Some(caps) = RESOLUTION.captures(title) {
        return caps[1].parse().unwrap_or(0);
    }
    if UHD_TOKEN.is_match(title) {
        return 2160;
    }
    0
}

pub fn is_4k(release: &Release) -> bool {
    release.resolution >= 2160 || UHD_TOKEN.is_match(&release.title)
}

/// Exactly 1080p, not better.
pub fn is_1080(release: &Release) -> bool {
    !is_4k(release)
        && (release.resolution == 1080 || release.title.to_ascii_lowercase().contains("1080p"))
}

pub fn has_1080_plus(release: &Release) -> bool {
    release.resolution >= 1080 || HIGH_RES.is_match(&release.title)
}

/// Sub-720p, or a low-quality source tag on a title that is not already HD.
pub fn is_low_quality(title: &str) -> bool {
    if HIGH_RES.is_match(title) {
        return false;
    }
    SUB_720.is_match(title) || LOW_SOURCE.is_match(title)
}

/// A title carrying a season, multi-season or "complete" marker and no
/// specific episode marker.
pub fn is_season_pack(title: &str) -> bool {
    SEASON_MARKER.is_match(title) && !EPISODE_MARKER.is_match(title)
}

/// Seasons covered by a multi-season pack (`S01-S05`, `Seasons 1 to 3`),
/// when the title names a range.
pub fn season_range(title: &str) -> Option<(u32, u32)> {
    let caps = SEASON_RANGE.captures(title)?;
    let first: u32 = caps[1].parse().ok()?;
    let last: u32 = caps[2].parse().ok()?;
    (first < last).then_some((first, last))
}

/// A pack spanning several seasons: a season range, or a whole-show marker
/// without a single season number.
pub fn is_multi_season_pack(title: &str) -> bool {
    if EPISODE_MARKER.is_match(title) {
        return false;
    }
    season_range(title).is_some()
        || (WHOLE_SHOW.is_match(title) && !SINGLE_SEASON.is_match(title))
        || (title.to_ascii_lowercase().contains("complete") && !SINGLE_SEASON.is_match(title))
}

/// Spaces to dots, quote-like punctuation removed, repeated dots collapsed.
pub fn normalize_title(title: &str) -> String {
    let mut out = String::with_capacity(title.len());
    for c in title.trim().chars() {
        match c {
            ' ' | '\t' => out.push('.'),
            ':' | '\'' | '"' | ',' | '!' | '?' => {}
            _ => out.push(c),
        }
    }
    let mut collapsed = String::with_capacity(out.len());
    for c in out.chars() {
        if c == '.' && collapsed.ends_with('.') {
            continue;
        }
        collapsed.push(c);
    }
    collapsed.trim_matches('.').to_string()
}

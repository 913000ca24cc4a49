//! Hit filtering between the indexer response and magnet resolution.
//!
//! Everything here is pure: the indexer client fetches hits, runs them
//! through [`filter_hits`], then spends its resolution budget via
//! [`resolution_budget`].

use once_cell::sync::Lazy;
use regex_lite::Regex;
use tracing::debug;

use super::{RawHit, TargetIds};
use crate::release::{is_low_quality, is_season_pack, normalize_title};

static IMDB_QUERY: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^tt[0-9]+$").unwrap());
static YEAR_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(19|20)[0-9]{2}$").unwrap());
static SEASON_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(s[0-9]{1,2}(e[0-9]{1,3})?|s[0-9]{1,2}-s?[0-9]{1,2}|[0-9]{1,2}x[0-9]{2}|e[0-9]{1,3})$")
        .unwrap()
});

const ARTICLES: &[&str] = &["the", "a", "an"];

const TRAILER_WORDS: &[&str] = &[
    "2160p", "1080p", "720p", "480p", "4k", "uhd", "hdr", "hdr10", "dv", "web", "webrip", "webdl",
    "bluray", "blu", "bdrip", "brrip", "remux", "hdtv", "dvdrip", "x264", "x265", "h264", "h265",
    "hevc", "avc", "10bit", "proper", "repack", "extended", "unrated", "imax", "remastered",
    "multi", "dual", "dubbed", "subbed", "complete", "season", "seasons", "series", "vostfr",
    "french", "truefrench", "german", "italian", "spanish", "ita", "eng", "ger", "fre", "spa",
    "nf", "amzn", "dsnp", "hmax", "atvp",
];

/// Movie and TV categories (2000-2999 and 5000-5999).
pub fn allowed_category(category: u32) -> bool {
    (2000..3000).contains(&category) || (5000..6000).contains(&category)
}

fn tokens(text: &str) -> Vec<String> {
    text.split(|c: char| matches!(c, '.' | ' ' | '-' | '_' | '[' | ']' | '(' | ')'))
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

fn strip_article(tokens: &[String]) -> &[String] {
    match tokens.first() {
        Some(first) if tokens.len() > 1 && ARTICLES.contains(&first.as_str()) => &tokens[1..],
        _ => tokens,
    }
}

fn is_trailer_token(token: &str) -> bool {
    YEAR_TOKEN.is_match(token) || SEASON_TOKEN.is_match(token) || TRAILER_WORDS.contains(&token)
}

/// Whether a normalized `title` starts with the tokens of `query`, allowing
/// a leading article on either side, and what follows is a year, quality,
/// codec, language or season token, or nothing.
///
/// IMDb id queries are not title searches and always pass.
pub fn title_guard(title: &str, query: &str) -> bool {
    let query = query.trim();
    if IMDB_QUERY.is_match(query) {
        return true;
    }
    let query_tokens = tokens(&normalize_title(query));
    if query_tokens.is_empty() {
        return true;
    }
    let title_tokens = tokens(title);
    let want = strip_article(&query_tokens);
    let have = strip_article(&title_tokens);
    if have.len() < want.len() || have[..want.len()] != *want {
        return false;
    }
    match have.get(want.len()) {
        None => true,
        Some(next) => is_trailer_token(next),
    }
}

/// When any hit carries ids, keep the hits matching `target`; without a
/// match fall back to the hits carrying no ids at all.
pub fn cross_check_ids(hits: Vec<RawHit>, target: &TargetIds) -> Vec<RawHit> {
    if !hits.iter().any(RawHit::has_ids) {
        return hits;
    }
    let (with_ids, without_ids): (Vec<RawHit>, Vec<RawHit>) =
        hits.into_iter().partition(RawHit::has_ids);
    let matched: Vec<RawHit> = with_ids
        .into_iter()
        .filter(|hit| hit.matches_ids(target))
        .collect();
    if matched.is_empty() {
        without_ids
    } else {
        matched
    }
}

/// Filter raw indexer hits down to resolution candidates.
///
/// In order: category allow-list, external id cross-check, title
/// normalization with the title guard for hits without ids, deviation
/// match, quality floor. Season packs are then moved ahead of the rest,
/// keeping indexer order within each group.
pub fn filter_hits(
    hits: Vec<RawHit>,
    query: &str,
    deviation: &Regex,
    ids: Option<&TargetIds>,
) -> Vec<RawHit> {
    let total = hits.len();

    let hits: Vec<RawHit> = hits
        .into_iter()
        .filter(|hit| hit.categories.iter().any(|&c| allowed_category(c)))
        .collect();
    let hits = match ids.filter(|ids| !ids.is_empty()) {
        Some(target) => cross_check_ids(hits, target),
        None => hits,
    };

    let mut kept: Vec<RawHit> = hits
        .into_iter()
        .map(|mut hit| {
            hit.title = normalize_title(&hit.title);
            hit
        })
        .filter(|hit| hit.has_ids() || title_guard(&hit.title, query))
        .filter(|hit| deviation.is_match(&hit.title))
        .filter(|hit| !is_low_quality(&hit.title))
        .collect();

    kept.sort_by_key(|hit| !is_season_pack(&hit.title));

    debug!(query = query, total = total, kept = kept.len(), "Filtered indexer hits");
    kept
}

/// Limit hits that still need resolving.
///
/// With season packs present, all packs plus at most `fallback_episodes`
/// single-episode hits are kept. The total never exceeds `max_resolve`.
/// Expects packs-first ordering.
pub fn resolution_budget(
    mut hits: Vec<RawHit>,
    max_resolve: usize,
    fallback_episodes: usize,
) -> Vec<RawHit> {
    let packs = hits.iter().filter(|h| is_season_pack(&h.title)).count();
    let budget = if packs > 0 {
        let episodes = hits.len() - packs;
        packs + fallback_episodes.min(episodes)
    } else {
        hits.len()
    };
    hits.truncate(budget.min(max_resolve));
    hits
}

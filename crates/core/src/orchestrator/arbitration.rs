//! Season-pack-vs-episode arbitration.
//!
//! A pack is taken when no individually available unit (episode, or season
//! at the show level) beats the pack's resolution. A unit without any
//! qualifying individual release counts as unbeatable, so the pack wins.

use regex_lite::Regex;

use crate::release::Release;

/// Best resolution among releases with a cached copy.
pub fn best_cached_resolution<'a, I>(releases: I) -> Option<u32>
where
    I: IntoIterator<Item = &'a Release>,
{
    releases
        .into_iter()
        .filter(|r| r.has_cached_copy())
        .map(|r| r.resolution)
        .max()
}

/// Best resolution a single unit can get on its own: cached releases at or
/// above `floor` that match the unit's deviation.
pub fn unit_best(releases: &[Release], floor: u32, deviation: &Regex) -> Option<u32> {
    best_cached_resolution(
        releases
            .iter()
            .filter(|r| r.resolution >= floor && deviation.is_match(&r.title)),
    )
}

/// Whether to take the pack.
///
/// `pack` is the pack's best cached resolution, `bests` the per-unit bests
/// from [`unit_best`]. With no cached pack there is nothing to take.
pub fn prefer_pack(pack: Option<u32>, bests: &[Option<u32>]) -> bool {
    let Some(pack) = pack else {
        return false;
    };
    // A missing unit best is larger than any real resolution.
    match bests.iter().copied().collect::<Option<Vec<u32>>>() {
        None => true,
        Some(bests) => bests.into_iter().min().is_none_or(|lowest| lowest <= pack),
    }
}

//! Deviation patterns: case-insensitive regexes matching release titles to
//! an item from its alternate titles plus a kind-specific tail.

use chrono::Datelike;
use regex_lite::Regex;
use tracing::warn;

use super::{roman_numeral, MediaItem, MediaKind, ScrapingAdjustment};

fn title_group(item: &MediaItem) -> String {
    let titles: Vec<String> = item
        .search_titles()
        .iter()
        .map(|t| regex_lite::escape(t).replace("\\.", "."))
        .collect();
    format!("({})", titles.join("|"))
}

fn year_group(year: Option<i32>) -> Option<String> {
    year.map(|y| format!("({}|{}|{})", y, y - 1, y + 1))
}

fn air_date_pattern(item: &MediaItem) -> Option<String> {
    let date = item.release_date()?;
    Some(format!(
        "({}|{}).*(0?{}|{}).*0?{}",
        date.format("%y"),
        date.year(),
        date.month(),
        date.format("%b"),
        date.day()
    ))
}

/// Deviation pattern for the item's own year.
pub fn deviation(item: &MediaItem) -> String {
    deviation_for_year(item, item.year)
}

/// Deviation pattern for the item, using `year` for movies.
pub fn deviation_for_year(item: &MediaItem, year: Option<i32>) -> String {
    let title = title_group(item);
    if item.anime.is_some() {
        return anime_deviation(item, &title, year);
    }
    match item.kind {
        MediaKind::Movie => match year_group(year) {
            Some(years) => format!(r"(.*?)({}:?.*)\(?\[?{}?", title, years),
            None => format!("(.*?)({})", title),
        },
        MediaKind::Show => {
            let year = item
                .year
                .map(|y| format!(r"(\(?{}\)?.)|", y))
                .unwrap_or_default();
            format!(
                r"(.*?)({}:?.)(series.|[^A-Za-z0-9]+)?({}(complete.)|(seasons?.[0-9]+.[0-9]?[0-9]?.?)|(S[0-9]+.S?[0-9]?[0-9]?.?)|(S[0-9]+E[0-9]+))",
                title, year
            )
        }
        MediaKind::Season => {
            let n = item.index.unwrap_or(0);
            let show_year = item
                .show_year()
                .map(|y| format!(r"(\(?{}\)?.)?", y))
                .unwrap_or_default();
            format!(
                r"(.*?)({}:?.)(series.|[^A-Za-z0-9]+)?{}(season.{n}([^0-9]|$)|season.{n:02}([^0-9]|$)|S{n:02}([^0-9]|$)|S{n:02}E[0-9]+|{n}x[0-9]+)",
                title,
                show_year,
                n = n
            )
        }
        MediaKind::Episode => {
            let show_year = item
                .show_year()
                .map(|y| format!(r"(\(?{}\)?.)?", y))
                .unwrap_or_default();
            let mut tail = format!(
                "S{:02}E{:02}([^0-9]|$)",
                item.parent_index().unwrap_or(0),
                item.index.unwrap_or(0)
            );
            if item.has_adjustment(&ScrapingAdjustment::AirDate) {
                if let Some(date) = air_date_pattern(item) {
                    tail = format!("{}|{}", tail, date);
                }
            }
            format!(r"(.*?)({}:?.)(series.)?{}({})", title, show_year, tail)
        }
    }
}

fn anime_deviation(item: &MediaItem, title: &str, year: Option<i32>) -> String {
    let numbering = item.anime.clone().unwrap_or_default();
    match item.kind {
        MediaKind::Movie => match year_group(year) {
            Some(years) => format!("(.*?)({})(.*?){}?", title, years),
            None => format!("(.*?)({})", title),
        },
        MediaKind::Show => {
            let total = numbering.total.unwrap_or(0);
            format!(
                r"(.*?)({})(.*?)(([^0-9]0*1[^0-9]?-[^0-9]?0*{}([^0-9]|$))|(complete)|(seasons?[^0-9]?[0-9]+[^A-Za-z0-9]+S?[0-9]+)|(S[0-9]+[^A-Za-z0-9]+S?[0-9]+))",
                title, total
            )
        }
        MediaKind::Season => {
            let n = item.index.unwrap_or(0);
            let range = match (numbering.first, numbering.last) {
                (Some(first), Some(last)) => {
                    format!(r"|[^0-9]0*{}[^0-9]?-[^0-9]?0*{}([^0-9]|$)", first, last)
                }
                _ => String::new(),
            };
            format!(
                r"(.*?)({})(.*?)(season[^0-9]?0*{n}([^0-9]|$)|S0*{n}([^Ee0-9]|$){range}|[^A-Za-z0-9]{roman}([^A-Za-z0-9]|$))",
                title,
                n = n,
                range = range,
                roman = roman_numeral(n)
            )
        }
        MediaKind::Episode => {
            let season = item.parent_index().unwrap_or(0);
            let episode = item.index.unwrap_or(0);
            let absolute = match numbering.absolute {
                Some(a) => format!(r"|[^0-9A-Za-z\[]0*{}([^A-Za-z0-9\]]|$)", a),
                None => String::new(),
            };
            format!(
                r"(.*?)({})(.*?)([^0-9A-Za-z]S?0*{}E0*{}([^0-9]|$){})",
                title, season, episode, absolute
            )
        }
    }
}

/// Compile a deviation pattern for matching from the start of a title.
pub fn compile_deviation(pattern: &str) -> Result<Regex, regex_lite::Error> {
    Regex::new(&format!("(?i)^(?:{})", pattern))
}

/// Whether `title` matches `pattern`; invalid patterns match nothing.
pub fn matches_deviation(pattern: &str, title: &str) -> bool {
    match compile_deviation(pattern) {
        Ok(re) => re.is_match(title),
        Err(e) => {
            warn!(pattern = pattern, error = %e, "Invalid deviation pattern");
            false
        }
    }
}

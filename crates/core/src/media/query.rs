//! Search query and alternate title construction.

use once_cell::sync::Lazy;
use regex_lite::Regex;

use super::{is_anime, MediaItem, MediaKind, ScrapingAdjustment};

static EMBEDDED_DIGIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Za-z][0-9]+[A-Za-z]").unwrap());

/// Turn a display title into the dotted form release names use.
pub fn rename(title: &str) -> String {
    let replaced = title.replace('&', "and");
    let mut dotted = String::with_capacity(replaced.len());
    for c in replaced.chars() {
        if c.is_alphanumeric() || c == '-' {
            dotted.push(c);
        } else if !matches!(c, '\'' | '"' | ':' | ',' | '!' | '?' | '(' | ')' | '[' | ']') {
            dotted.push('.');
        }
    }
    let mut out = String::with_capacity(dotted.len());
    for c in dotted.chars() {
        if c == '.' && (out.is_empty() || out.ends_with('.')) {
            continue;
        }
        out.push(c);
    }
    out.trim_end_matches('.').to_string()
}

/// Alternate titles for an item: the renamed title, a digit-stripped variant
/// for stylized titles like `PLUR1BUS`, latin-script aliases, and the
/// prefix/suffix scraping adjustments applied to each of them.
pub fn alternate_titles(item: &MediaItem, aliases: &[String]) -> Vec<String> {
    let title = item.show_title();
    let mut base = vec![rename(title)];
    if EMBEDDED_DIGIT.is_match(title) {
        let stripped: String = title.chars().filter(|c| !c.is_ascii_digit()).collect();
        base.push(rename(&stripped));
    }
    for alias in aliases {
        if alias.chars().any(|c| c > '\u{024F}') {
            continue;
        }
        base.push(rename(alias));
    }

    let mut titles = Vec::new();
    for t in base {
        if t.is_empty() {
            continue;
        }
        for adjustment in &item.scraping_adjustments {
            match adjustment {
                ScrapingAdjustment::Prefix { text } => titles.push(format!("{}.{}", rename(text), t)),
                ScrapingAdjustment::Suffix { text } => titles.push(format!("{}.{}", t, rename(text))),
                ScrapingAdjustment::AirDate => {}
            }
        }
        titles.push(t);
    }

    let mut seen = std::collections::HashSet::new();
    titles.retain(|t| seen.insert(t.to_lowercase()));
    titles
}

impl MediaItem {
    /// Query for this item using `title` as the show or movie title.
    pub fn query_for(&self, title: &str) -> String {
        let base = rename(title);
        match self.kind {
            MediaKind::Movie => match self.year {
                Some(year) => format!("{}.{}", base, year),
                None => base,
            },
            MediaKind::Show => base,
            MediaKind::Season => format!("{}.S{:02}.", base, self.index.unwrap_or(0)),
            MediaKind::Episode => {
                if self.has_adjustment(&ScrapingAdjustment::AirDate) {
                    if let Some(date) = self.release_date() {
                        return format!("{}.{}", base, date.format("%Y.%m.%d"));
                    }
                }
                format!(
                    "{}.S{:02}E{:02}.",
                    base,
                    self.parent_index().unwrap_or(0),
                    self.index.unwrap_or(0)
                )
            }
        }
    }

    /// Query for this item under its primary title.
    pub fn query(&self) -> String {
        self.query_for(self.show_title())
    }

    /// Space separated query used by anime indexers.
    pub fn anime_query(&self) -> String {
        let base = rename(self.show_title()).replace('.', " ");
        match self.kind {
            MediaKind::Movie => match self.year {
                Some(year) => format!("{} {}", base, year),
                None => base,
            },
            MediaKind::Show | MediaKind::Season => base,
            MediaKind::Episode => match self.anime.as_ref().and_then(|a| a.absolute) {
                Some(absolute) => format!("{} {:02}", base, absolute),
                None => self.query(),
            },
        }
    }

    /// Query an upgrade check repeats later: the anime query for anime,
    /// the regular query for everything else.
    pub fn primary_query(&self) -> String {
        if self.anime.is_some() || is_anime(self) {
            self.anime_query()
        } else {
            self.query()
        }
    }

    /// Store alternate titles on this item and all of its descendants.
    pub fn set_alternate_titles(&mut self, titles: &[String]) {
        self.alternate_titles = titles.to_vec();
        for child in &mut self.children {
            child.set_alternate_titles(titles);
        }
    }

    /// Alternate titles, falling back to the renamed primary title.
    pub fn search_titles(&self) -> Vec<String> {
        if self.alternate_titles.is_empty() {
            vec![rename(self.show_title())]
        } else {
            self.alternate_titles.clone()
        }
    }
}

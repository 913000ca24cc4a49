use super::{AnimeNumbering, MediaItem, MediaKind};

pub fn is_anime(item: &MediaItem) -> bool {
    item.genres.iter().any(|g| g.eq_ignore_ascii_case("anime"))
}

/// Assign absolute episode numbers across the regular seasons of an anime
/// show. Season 0 (specials) is not numbered.
pub fn assign_anime_numbering(show: &mut MediaItem) {
    if show.kind != MediaKind::Show || !is_anime(show) {
        return;
    }

    let mut order: Vec<usize> = (0..show.children.len())
        .filter(|&i| show.children[i].index.unwrap_or(0) > 0)
        .collect();
    order.sort_by_key(|&i| show.children[i].index);

    let mut offset = 0;
    for i in order {
        let season = &mut show.children[i];
        let mut size = season.leaf_count.unwrap_or(0) as usize;
        size = size.max(season.children.len());
        for episode in &mut season.children {
            let index = episode.index.unwrap_or(0);
            size = size.max(index as usize);
            episode.anime = Some(AnimeNumbering {
                absolute: Some(offset + index),
                ..Default::default()
            });
        }
        let size = size as u32;
        season.anime = Some(AnimeNumbering {
            first: Some(offset + 1),
            last: Some(offset + size.max(1)),
            ..Default::default()
        });
        offset += size;
    }

    show.anime = Some(AnimeNumbering {
        total: Some(offset),
        ..Default::default()
    });
}

pub fn roman_numeral(mut n: u32) -> String {
    const TABLE: [(u32, &str); 13] = [
        (1000, "M"),
        (900, "CM"),
        (500, "D"),
        (400, "CD"),
        (100, "C"),
        (90, "XC"),
        (50, "L"),
        (40, "XL"),
        (10, "X"),
        (9, "IX"),
        (5, "V"),
        (4, "IV"),
        (1, "I"),
    ];
    let mut out = String::new();
    for (value, symbol) in TABLE {
        while n >= value {
            out.push_str(symbol);
            n -= value;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn season(index: u32, episodes: u32) -> MediaItem {
        let mut season = MediaItem::new(MediaKind::Season, format!("Season {}", index));
        season.index = Some(index);
        for e in 1..=episodes {
            let mut episode = MediaItem::new(MediaKind::Episode, format!("Episode {}", e));
            episode.index = Some(e);
            season.children.push(episode);
        }
        season
    }

    #[test]
    fn test_numbering_skips_specials() {
        let mut show = MediaItem::new(MediaKind::Show, "Frieren");
        show.genres = vec!["Anime".to_string()];
        show.children = vec![season(0, 2), season(2, 3), season(1, 4)];

        assign_anime_numbering(&mut show);

        assert!(show.children[0].anime.is_none());
        let s1 = show.children[2].anime.as_ref().unwrap();
        assert_eq!((s1.first, s1.last), (Some(1), Some(4)));
        let s2 = show.children[1].anime.as_ref().unwrap();
        assert_eq!((s2.first, s2.last), (Some(5), Some(7)));
        assert_eq!(show.children[1].children[0].anime.as_ref().unwrap().absolute, Some(5));
        assert_eq!(show.anime.as_ref().unwrap().total, Some(7));
    }

    #[test]
    fn test_non_anime_untouched() {
        let mut show = MediaItem::new(MediaKind::Show, "The Wire");
        show.children = vec![season(1, 2)];
        assign_anime_numbering(&mut show);
        assert!(show.anime.is_none());
    }

    #[test]
    fn test_roman_numeral() {
        assert_eq!(roman_numeral(1), "I");
        assert_eq!(roman_numeral(4), "IV");
        assert_eq!(roman_numeral(14), "XIV");
    }
}

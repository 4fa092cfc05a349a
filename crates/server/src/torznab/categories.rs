//! Mapping between Torznab category codes and tracker categories.

/// Tracker's top-level "Film/Vidéo" category.
const VIDEO: u32 = 2145;

const FILMS: u32 = 2183;
const ANIMATION: u32 = 2178;
const SERIES: u32 = 2184;
const ANIMATED_SERIES: u32 = 2179;

/// Torznab category reported when a sub-category is not mapped.
pub const DEFAULT_CATEGORY: u32 = 2000;

/// Torznab code to tracker (category, sub_category).
const TORZNAB_TO_TRACKER: &[(u32, (u32, u32))] = &[
    (2000, (VIDEO, FILMS)),
    (2010, (VIDEO, ANIMATION)),
    (2020, (VIDEO, FILMS)),
    (2030, (VIDEO, FILMS)),
    (2040, (VIDEO, FILMS)),
    (2045, (VIDEO, FILMS)),
    (2050, (VIDEO, FILMS)),
    (2060, (VIDEO, ANIMATION)),
    (2070, (VIDEO, FILMS)),
    (2080, (VIDEO, FILMS)),
    (5000, (VIDEO, SERIES)),
    (5010, (VIDEO, SERIES)),
    (5020, (VIDEO, SERIES)),
    (5030, (VIDEO, SERIES)),
    (5040, (VIDEO, SERIES)),
    (5045, (VIDEO, SERIES)),
    (5050, (VIDEO, SERIES)),
    (5060, (VIDEO, SERIES)),
    (5070, (VIDEO, ANIMATED_SERIES)),
    (5080, (VIDEO, SERIES)),
];

/// Tracker sub-category to the Torznab code reported in results.
const TRACKER_TO_TORZNAB: &[(u32, u32)] = &[
    (FILMS, 2000),
    (ANIMATION, 2010),
    (SERIES, 5000),
    (ANIMATED_SERIES, 5070),
];

/// Torznab categories advertised in the caps document, as
/// (id, name, subcategories).
pub const ADVERTISED: &[(u32, &str, &[(u32, &str)])] = &[
    (
        2000,
        "Movies",
        &[
            (2010, "Movies/Foreign"),
            (2020, "Movies/Other"),
            (2030, "Movies/SD"),
            (2040, "Movies/HD"),
            (2045, "Movies/UHD"),
            (2050, "Movies/BluRay"),
            (2060, "Movies/3D"),
            (2070, "Movies/DVD"),
            (2080, "Movies/WEB-DL"),
        ],
    ),
    (
        5000,
        "TV",
        &[
            (5010, "TV/WEB-DL"),
            (5020, "TV/Foreign"),
            (5030, "TV/SD"),
            (5040, "TV/HD"),
            (5045, "TV/UHD"),
            (5050, "TV/Other"),
            (5060, "TV/Sport"),
            (5070, "TV/Anime"),
            (5080, "TV/Documentary"),
        ],
    ),
];

/// Resolve a comma-separated `cat` parameter into distinct tracker
/// (category, sub_category) pairs, in first-seen order.
///
/// Unparseable and unmapped codes are skipped.
pub fn tracker_categories(cat: &str) -> Vec<(u32, u32)> {
    let mut pairs = Vec::new();
    for code in cat.split(',').filter_map(|c| c.trim().parse::<u32>().ok()) {
        let Some((_, pair)) = TORZNAB_TO_TRACKER.iter().find(|(t, _)| *t == code) else {
            continue;
        };
        if !pairs.contains(pair) {
            pairs.push(*pair);
        }
    }
    pairs
}

/// Torznab code for a tracker sub-category as scraped from a results row.
pub fn torznab_category(sub_category: &str) -> u32 {
    sub_category
        .trim()
        .parse::<u32>()
        .ok()
        .and_then(|sub| {
            TRACKER_TO_TORZNAB
                .iter()
                .find(|(s, _)| *s == sub)
                .map(|(_, code)| *code)
        })
        .unwrap_or(DEFAULT_CATEGORY)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_cat_maps_to_nothing() {
        assert!(tracker_categories("").is_empty());
    }

    #[test]
    fn test_codes_collapse_to_distinct_pairs() {
        let pairs = tracker_categories("2000,2040,5000,5070");
        assert_eq!(pairs, vec![(2145, 2183), (2145, 2184), (2145, 2179)]);
    }

    #[test]
    fn test_garbage_and_unknown_codes_skipped() {
        let pairs = tracker_categories("abc, 9999 ,2010");
        assert_eq!(pairs, vec![(2145, 2178)]);
    }

    #[test]
    fn test_torznab_category_for_rows() {
        assert_eq!(torznab_category("2183"), 2000);
        assert_eq!(torznab_category("2179"), 5070);
        assert_eq!(torznab_category("2184"), 5000);
        assert_eq!(torznab_category(""), DEFAULT_CATEGORY);
        assert_eq!(torznab_category("1234"), DEFAULT_CATEGORY);
    }

    #[test]
    fn test_every_advertised_code_is_searchable() {
        for (id, _, subcats) in ADVERTISED {
            assert_eq!(tracker_categories(&id.to_string()).len(), 1);
            for (sub, _) in *subcats {
                assert_eq!(tracker_categories(&sub.to_string()).len(), 1, "{}", sub);
            }
        }
    }
}

use once_cell::sync::Lazy;
use regex_lite::Regex;
use sha2::{Digest, Sha256};

static TORRENT_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"/(\d+)-").unwrap());

static FILENAME_WITH_EXT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/(\d+-[^/?]+\.torrent)").unwrap());

static FILENAME_STEM: Lazy<Regex> = Lazy::new(|| Regex::new(r"/(\d+-[^/?]+)").unwrap());

const DEFAULT_FILENAME: &str = "download.torrent";

/// Tracker id embedded in an artifact link, if any.
pub fn torrent_id(link: &str) -> Option<&str> {
    TORRENT_ID
        .captures(link)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Cache key for an artifact link.
///
/// Uses the tracker id when the link has one, so different slugs for the same
/// torrent share an entry. Otherwise the SHA-256 of the whole link.
pub fn cache_key(link: &str) -> String {
    match torrent_id(link) {
        Some(id) => id.to_string(),
        None => Sha256::digest(link.as_bytes())
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect(),
    }
}

/// Best-effort filename for an artifact link.
pub fn filename_from_link(link: &str) -> String {
    if let Some(m) = FILENAME_WITH_EXT.captures(link).and_then(|c| c.get(1)) {
        return m.as_str().to_string();
    }
    if let Some(m) = FILENAME_STEM.captures(link).and_then(|c| c.get(1)) {
        return format!("{}.torrent", m.as_str());
    }
    DEFAULT_FILENAME.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_uses_torrent_id() {
        assert_eq!(cache_key("https://site/123-some-name.torrent"), "123");
        assert_eq!(
            cache_key("https://www.yggtorrent.org/torrent/film/2183/987654-movie-2024-1080p"),
            "987654"
        );
    }

    #[test]
    fn test_cache_key_is_deterministic() {
        let link = "https://site/torrent/other-slug";
        assert_eq!(cache_key(link), cache_key(link));
    }

    #[test]
    fn test_cache_key_falls_back_to_sha256() {
        let key = cache_key("https://site/no-id-here");
        assert_eq!(key.len(), 64);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_ne!(key, cache_key("https://site/other"));
        // sha256("abc")
        assert_eq!(
            cache_key("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_same_id_different_slug_share_key() {
        assert_eq!(
            cache_key("https://site/torrent/a/42-first-slug"),
            cache_key("https://mirror/torrent/b/42-second-slug")
        );
    }

    #[test]
    fn test_filename_from_link() {
        assert_eq!(
            filename_from_link("https://site/123-some-name.torrent"),
            "123-some-name.torrent"
        );
        assert_eq!(
            filename_from_link("https://site/torrent/film/123-some-name?x=1"),
            "123-some-name.torrent"
        );
        assert_eq!(filename_from_link("https://site/torrent/film"), "download.torrent");
    }
}

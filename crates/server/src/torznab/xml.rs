//! Torznab XML documents.

use std::fmt::Write;

use chrono::{DateTime, Utc};
use yggzn_core::SearchResult;

use super::categories::{torznab_category, ADVERTISED};

pub const TORZNAB_NS: &str = "http://torznab.com/schemas/2015/feed";

const TITLE: &str = "YGGTorznab";
const XML_DECL: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

/// Escape text for use in element content and attribute values.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

/// The `t=caps` document.
pub fn caps_xml() -> String {
    let mut xml = String::from(XML_DECL);
    xml.push_str("<caps>");
    let _ = write!(xml, r#"<server version="1.0" title="{}"/>"#, TITLE);
    xml.push_str(r#"<limits max="100" default="50"/>"#);
    xml.push_str("<searching>");
    xml.push_str(r#"<search available="yes" supportedParams="q,cat"/>"#);
    xml.push_str(
        r#"<tv-search available="yes" supportedParams="q,season,ep,cat,imdbid,tvdbid,tmdbid"/>"#,
    );
    xml.push_str(r#"<movie-search available="yes" supportedParams="q,cat,imdbid,tmdbid"/>"#);
    xml.push_str("</searching>");

    xml.push_str("<categories>");
    for (id, name, subcats) in ADVERTISED {
        let _ = write!(xml, r#"<category id="{}" name="{}">"#, id, escape(name));
        for (sub_id, sub_name) in *subcats {
            let _ = write!(xml, r#"<subcat id="{}" name="{}"/>"#, sub_id, escape(sub_name));
        }
        xml.push_str("</category>");
    }
    xml.push_str("</categories>");
    xml.push_str("</caps>");
    xml
}

/// Download URL handed to indexer clients for a result.
///
/// Points back at this server's `/download` endpoint when a base is known,
/// otherwise at the tracker page itself.
pub fn enclosure_url(link: &str, download_base: &str, apikey: &str) -> String {
    if download_base.is_empty() || link.is_empty() {
        return link.to_string();
    }
    format!(
        "{}/download?url={}&apikey={}",
        download_base.trim_end_matches('/'),
        urlencoding::encode(link),
        urlencoding::encode(apikey)
    )
}

/// An RSS feed of search results with Torznab attributes.
pub fn search_xml(
    results: &[SearchResult],
    download_base: &str,
    apikey: &str,
    now: DateTime<Utc>,
) -> String {
    let pub_date = now.format("%a, %d %b %Y %H:%M:%S +0000").to_string();

    let mut xml = String::from(XML_DECL);
    let _ = write!(
        xml,
        r#"<rss version="2.0" xmlns:torznab="{}"><channel><title>{}</title>"#,
        TORZNAB_NS, TITLE
    );

    for result in results {
        xml.push_str("<item>");
        let _ = write!(xml, "<title>{}</title>", escape(&result.title));
        let _ = write!(xml, "<link>{}</link>", escape(&result.link));
        let _ = write!(xml, "<guid>{}</guid>", escape(&result.link));
        let _ = write!(xml, "<pubDate>{}</pubDate>", pub_date);
        let _ = write!(
            xml,
            r#"<enclosure url="{}" length="{}" type="application/x-bittorrent"/>"#,
            escape(&enclosure_url(&result.link, download_base, apikey)),
            result.size_bytes
        );

        let category = torznab_category(&result.sub_category);
        push_attr(&mut xml, "category", category);
        push_attr(&mut xml, "size", result.size_bytes);
        push_attr(&mut xml, "seeders", result.seeders);
        push_attr(&mut xml, "leechers", result.leechers);
        push_attr(&mut xml, "downloadvolumefactor", 1);
        push_attr(&mut xml, "uploadvolumefactor", 1);
        xml.push_str("</item>");
    }

    xml.push_str("</channel></rss>");
    xml
}

fn push_attr(xml: &mut String, name: &str, value: impl std::fmt::Display) {
    let _ = write!(
        xml,
        r#"<torznab:attr name="{}" value="{}"/>"#,
        name,
        escape(&value.to_string())
    );
}

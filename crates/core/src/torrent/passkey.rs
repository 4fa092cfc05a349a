//! Passkey rewriting for tracker announce URLs.
//!
//! Cached artifacts never carry a real passkey: `strip_passkey` swaps it for
//! [`PASSKEY_PLACEHOLDER`] and `inject_passkey` puts the requesting account's
//! passkey back before the bytes are served.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex_lite::Regex;
use thiserror::Error;

use super::bencode::{decode, encode, BencodeError, Value};

/// Sentinel stored in place of the passkey.
pub const PASSKEY_PLACEHOLDER: &str = "{PASSKEY}";

const ANNOUNCE: &[u8] = b"announce";
const ANNOUNCE_LIST: &[u8] = b"announce-list";

/// Passkey embedded as a path segment right before `/announce`.
static PATH_PASSKEY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/([a-zA-Z0-9]{20,})/announce").unwrap());

#[derive(Debug, Error)]
pub enum PasskeyError {
    #[error("Invalid torrent metadata: {0}")]
    Decode(#[from] BencodeError),

    #[error("Torrent metadata is not a dictionary")]
    NotADict,

    #[error("No passkey placeholder found in announce URL: {0}")]
    CredentialMissing(String),
}

/// Replace the passkey in every announce URL with the placeholder.
pub fn strip_passkey(torrent: &[u8]) -> Result<Vec<u8>, PasskeyError> {
    rewrite(torrent, |url| Ok(strip_url(url)))
}

/// Replace the placeholder in every announce URL with `passkey`.
///
/// Fails when an announce URL has no placeholder, which means the data was
/// never stripped.
pub fn inject_passkey(torrent: &[u8], passkey: &str) -> Result<Vec<u8>, PasskeyError> {
    rewrite(torrent, |url| inject_url(url, passkey))
}

fn rewrite<F>(torrent: &[u8], rewrite_url: F) -> Result<Vec<u8>, PasskeyError>
where
    F: Fn(&[u8]) -> Result<Vec<u8>, PasskeyError>,
{
    let mut meta = decode(torrent)?;
    let Value::Dict(map) = &mut meta else {
        return Err(PasskeyError::NotADict);
    };
    rewrite_announces(map, &rewrite_url)?;
    Ok(encode(&meta))
}

fn rewrite_announces<F>(map: &mut BTreeMap<Vec<u8>, Value>, rewrite_url: &F) -> Result<(), PasskeyError>
where
    F: Fn(&[u8]) -> Result<Vec<u8>, PasskeyError>,
{
    if let Some(Value::Bytes(url)) = map.get_mut(ANNOUNCE) {
        *url = rewrite_url(url)?;
    }

    if let Some(Value::List(tiers)) = map.get_mut(ANNOUNCE_LIST) {
        let mut rewritten = Vec::with_capacity(tiers.len());
        for tier in tiers.iter() {
            match tier {
                Value::List(urls) => {
                    let urls = urls
                        .iter()
                        .filter_map(Value::as_bytes)
                        .map(|url| rewrite_url(url).map(Value::Bytes))
                        .collect::<Result<Vec<_>, _>>()?;
                    rewritten.push(Value::List(urls));
                }
                // Some encoders flatten single-URL tiers
                Value::Bytes(url) => {
                    rewritten.push(Value::List(vec![Value::Bytes(rewrite_url(url)?)]));
                }
                _ => {}
            }
        }
        *tiers = rewritten;
    }

    Ok(())
}

/// Strip a passkey from a single URL, leaving unrelated bytes untouched.
fn strip_url(url: &[u8]) -> Vec<u8> {
    let Ok(url_str) = std::str::from_utf8(url) else {
        return url.to_vec();
    };

    let (before_fragment, fragment) = match url_str.find('#') {
        Some(idx) => url_str.split_at(idx),
        None => (url_str, ""),
    };
    let (path, query) = match before_fragment.find('?') {
        Some(idx) => (&before_fragment[..idx], Some(&before_fragment[idx + 1..])),
        None => (before_fragment, None),
    };

    if let Some(query) = query {
        let mut found = false;
        let params: Vec<String> = query
            .split('&')
            .map(|param| {
                let name = param.split_once('=').map_or(param, |(name, _)| name);
                if name == "passkey" {
                    found = true;
                    format!("passkey={}", PASSKEY_PLACEHOLDER)
                } else {
                    param.to_string()
                }
            })
            .collect();
        if found {
            return format!("{}?{}{}", path, params.join("&"), fragment).into_bytes();
        }
    }

    let replacement = format!("/{}/announce", PASSKEY_PLACEHOLDER);
    let new_path = PATH_PASSKEY.replace_all(path, replacement.as_str());
    if new_path != path {
        let query = query.map(|q| format!("?{}", q)).unwrap_or_default();
        return format!("{}{}{}", new_path, query, fragment).into_bytes();
    }

    url.to_vec()
}

fn inject_url(url: &[u8], passkey: &str) -> Result<Vec<u8>, PasskeyError> {
    let url_str = String::from_utf8_lossy(url);
    if !url_str.contains(PASSKEY_PLACEHOLDER) {
        return Err(PasskeyError::CredentialMissing(url_str.into_owned()));
    }
    Ok(url_str.replace(PASSKEY_PLACEHOLDER, passkey).into_bytes())
}

//! Torznab endpoints: `/api` and `/download`.

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, error, info};
use yggzn_core::{SearchQuery, SearchResult};

use super::middleware::AuthClient;
use crate::metrics::TORZNAB_REQUESTS;
use crate::state::AppState;
use crate::torznab::{caps_xml, placeholder_results, search_xml, tracker_categories};

const XML_CONTENT_TYPE: &str = "application/xml";
const TORRENT_CONTENT_TYPE: &str = "application/x-bittorrent";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TorznabParams {
    pub t: String,
    pub q: String,
    pub cat: String,
    pub imdbid: String,
    pub tmdbid: String,
    pub tvdbid: String,
    pub season: String,
    pub ep: String,
    pub apikey: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DownloadParams {
    pub url: String,
}

/// `GET /api`
pub async fn api(
    State(state): State<Arc<AppState>>,
    AuthClient(client): AuthClient,
    headers: HeaderMap,
    Query(params): Query<TorznabParams>,
) -> Response {
    match params.t.as_str() {
        "caps" => {
            TORZNAB_REQUESTS.with_label_values(&["caps"]).inc();
            xml_response(caps_xml())
        }
        function @ ("search" | "tvsearch" | "movie") => {
            TORZNAB_REQUESTS.with_label_values(&[function]).inc();
            debug!(
                client = %client,
                t = %function,
                q = %params.q,
                cat = %params.cat,
                imdbid = %params.imdbid,
                tmdbid = %params.tmdbid,
                tvdbid = %params.tvdbid,
                season = %params.season,
                ep = %params.ep,
                "Search request"
            );
            search(&state, &headers, &params).await
        }
        other => {
            TORZNAB_REQUESTS.with_label_values(&["unknown"]).inc();
            (StatusCode::BAD_REQUEST, format!("Unknown t={}", other)).into_response()
        }
    }
}

async fn search(state: &AppState, headers: &HeaderMap, params: &TorznabParams) -> Response {
    let base = download_base(state, headers);
    let query = params.q.trim();

    if query.is_empty() {
        debug!("No search query, returning placeholder items");
        let placeholders = placeholder_results(state.session().site().origin());
        return xml_response(search_xml(&placeholders, &base, &params.apikey, chrono::Utc::now()));
    }

    let pairs = tracker_categories(&params.cat);
    debug!(categories = ?pairs, "Tracker categories");

    let results = if pairs.is_empty() {
        state.scraper().search(&SearchQuery::new(query)).await
    } else {
        search_categories(state, query, &pairs).await
    };

    match results {
        Ok(results) => {
            debug!(count = results.len(), "Search returned results");
            xml_response(search_xml(&results, &base, &params.apikey, chrono::Utc::now()))
        }
        Err(e) => {
            error!(query = %query, error = %e, "Search failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "Search failed").into_response()
        }
    }
}

/// Search each category pair in turn, keeping the first result per link.
async fn search_categories(
    state: &AppState,
    query: &str,
    pairs: &[(u32, u32)],
) -> Result<Vec<SearchResult>, yggzn_core::ScrapeError> {
    let mut seen = HashSet::new();
    let mut results = Vec::new();
    for (category, sub_category) in pairs {
        let search = SearchQuery::new(query).with_category(*category, *sub_category);
        for result in state.scraper().search(&search).await? {
            if seen.insert(result.link.clone()) {
                results.push(result);
            }
        }
    }
    Ok(results)
}

/// `GET /download`
pub async fn download(
    State(state): State<Arc<AppState>>,
    AuthClient(client): AuthClient,
    Query(params): Query<DownloadParams>,
) -> Response {
    let link = params.url.trim();
    if link.is_empty() {
        return (StatusCode::BAD_REQUEST, "Missing url").into_response();
    }

    info!(client = %client, link = %link, "Download requested");
    match state.gateway().fetch(link).await {
        Ok(Some(outcome)) => (
            [
                (header::CONTENT_TYPE, TORRENT_CONTENT_TYPE.to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    content_disposition(&outcome.artifact.filename),
                ),
            ],
            outcome.artifact.bytes,
        )
            .into_response(),
        Ok(None) => {
            error!(link = %link, "Download produced no file");
            (StatusCode::INTERNAL_SERVER_ERROR, "Download failed").into_response()
        }
        Err(e) => {
            error!(link = %link, error = %e, "Download failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "Download failed").into_response()
        }
    }
}

fn xml_response(body: String) -> Response {
    ([(header::CONTENT_TYPE, XML_CONTENT_TYPE)], body).into_response()
}

/// `attachment` disposition with characters unsafe in a quoted header
/// value dropped.
fn content_disposition(filename: &str) -> String {
    let clean: String = filename
        .chars()
        .filter(|c| *c != '"' && *c != '\\' && !c.is_control())
        .collect();
    format!("attachment; filename=\"{}\"", clean)
}

/// Base URL indexer clients reach this server on, for enclosure links.
fn download_base(state: &AppState, headers: &HeaderMap) -> String {
    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("http");
    match headers.get(header::HOST).and_then(|v| v.to_str().ok()) {
        Some(host) => format!("{}://{}", scheme, host),
        None => {
            let server = &state.config().server;
            format!("{}://{}:{}", scheme, server.host, server.port)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_disposition_strips_quotes() {
        assert_eq!(
            content_disposition("1001-a \"b\".torrent"),
            "attachment; filename=\"1001-a b.torrent\""
        );
        assert_eq!(
            content_disposition("x\r\ny.torrent"),
            "attachment; filename=\"xy.torrent\""
        );
    }
}

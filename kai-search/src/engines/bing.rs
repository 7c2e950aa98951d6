//! Bing, tried when DuckDuckGo fails.
//!
//! Result links may go through a `bing.com/ck/a?...&u=a1<base64url>` click
//! tracker whose `u` parameter encodes the target.

use super::{PageLayout, scrape};
use crate::config::SearchConfig;
use crate::engine::SearchEngineTrait;
use crate::error::SearchError;
use crate::http;
use crate::types::{SearchEngine, SearchResult};
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use url::Url;

const ENDPOINT: &str = "https://www.bing.com/search";

const LAYOUT: PageLayout = PageLayout {
    item: "li.b_algo",
    title: "h2",
    link: Some("a"),
    snippet: ".b_caption p, .b_lineclamp2",
};

/// Bing HTML scraper.
pub struct BingEngine;

fn is_click_tracker(url: &Url) -> bool {
    url.host_str().is_some_and(|h| h.ends_with("bing.com")) && url.path().starts_with("/ck/")
}

fn decode_tracker(url: &Url) -> Option<String> {
    let (_, encoded) = url.query_pairs().find(|(key, _)| key == "u")?;
    let payload = encoded.strip_prefix("a1").unwrap_or(&encoded);
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    String::from_utf8(bytes).ok()
}

/// Resolve a result href, decoding click trackers. Hrefs that are not
/// absolute URLs pass through as-is.
fn unwrap_tracker(href: &str) -> Option<String> {
    if href.is_empty() {
        return None;
    }
    match Url::parse(href) {
        Ok(url) if is_click_tracker(&url) => decode_tracker(&url),
        _ => Some(href.to_owned()),
    }
}

fn parse_page(html: &str, max_results: usize) -> Result<Vec<SearchResult>, SearchError> {
    scrape(html, &LAYOUT, SearchEngine::Bing, max_results, unwrap_tracker)
}

impl SearchEngineTrait for BingEngine {
    async fn search(
        &self,
        query: &str,
        config: &SearchConfig,
    ) -> Result<Vec<SearchResult>, SearchError> {
        tracing::trace!(query, "querying Bing");
        let client = http::build_client(config)?;
        let safe = if config.safe_search { "Strict" } else { "Off" };
        let request = client.get(ENDPOINT).query(&[("q", query), ("safeSearch", safe)]);
        let html = http::fetch_html("Bing", request).await?;
        parse_page(&html, config.max_results)
    }

    fn engine_type(&self) -> SearchEngine {
        SearchEngine::Bing
    }
}

//! DuckDuckGo, the first engine in the default fallback order.
//!
//! Queries go to the JavaScript-free page at
//! `https://html.duckduckgo.com/html/`. Its result links point at a
//! `duckduckgo.com/l/?uddg=<target>` redirect.

use super::{PageLayout, scrape};
use crate::config::SearchConfig;
use crate::engine::SearchEngineTrait;
use crate::error::SearchError;
use crate::http;
use crate::types::{SearchEngine, SearchResult};
use url::Url;

const ENDPOINT: &str = "https://html.duckduckgo.com/html/";

/// Organic results only; ad blocks carry `result--ad`.
const LAYOUT: PageLayout = PageLayout {
    item: ".result.results_links.results_links_deep:not(.result--ad), .web-result:not(.result--ad)",
    title: ".result__a",
    link: None,
    snippet: ".result__snippet",
};

/// DuckDuckGo HTML scraper.
pub struct DuckDuckGoEngine;

/// Resolve a result href to its target.
///
/// Protocol-relative hrefs get `https:`. Redirect links yield their `uddg`
/// parameter. Anything that does not parse as a URL is dropped.
fn unwrap_redirect(href: &str) -> Option<String> {
    let absolute = match href.strip_prefix("//") {
        Some(rest) => format!("https://{rest}"),
        None => href.to_owned(),
    };
    let url = Url::parse(&absolute).ok()?;
    let is_redirect = url.host_str() == Some("duckduckgo.com") && url.path().starts_with("/l/");
    if !is_redirect {
        return Some(absolute);
    }
    url.query_pairs()
        .find_map(|(key, value)| (key == "uddg").then(|| value.into_owned()))
}

fn parse_page(html: &str, max_results: usize) -> Result<Vec<SearchResult>, SearchError> {
    scrape(html, &LAYOUT, SearchEngine::DuckDuckGo, max_results, unwrap_redirect)
}

impl SearchEngineTrait for DuckDuckGoEngine {
    async fn search(
        &self,
        query: &str,
        config: &SearchConfig,
    ) -> Result<Vec<SearchResult>, SearchError> {
        tracing::trace!(query, "querying DuckDuckGo");
        let client = http::build_client(config)?;
        // kp=1 is strict filtering; omitting it leaves the engine default.
        let form: &[(&str, &str)] = if config.safe_search {
            &[("q", query), ("kp", "1")]
        } else {
            &[("q", query)]
        };
        let html = http::fetch_html("DuckDuckGo", client.post(ENDPOINT).form(form)).await?;
        parse_page(&html, config.max_results)
    }

    fn engine_type(&self) -> SearchEngine {
        SearchEngine::DuckDuckGo
    }
}

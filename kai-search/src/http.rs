//! The scraping client shared by all engines.

use crate::config::SearchConfig;
use crate::error::SearchError;
use rand::seq::SliceRandom;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue};
use std::time::Duration;

const BROWSER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:133.0) Gecko/20100101 Firefox/133.0",
];

const MAX_REDIRECTS: usize = 10;

/// Client for one search call. Cookies persist across the engine's
/// requests; headers look like an ordinary browser.
///
/// # Errors
///
/// [`SearchError::Http`] for an unusable header value or a failed build.
pub fn build_client(config: &SearchConfig) -> Result<reqwest::Client, SearchError> {
    let agent = config
        .user_agent
        .clone()
        .unwrap_or_else(|| random_user_agent().to_owned());

    reqwest::Client::builder()
        .user_agent(agent)
        .default_headers(browser_headers(&config.accept_language)?)
        .timeout(Duration::from_secs(config.timeout_seconds))
        .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
        .cookie_store(true)
        .build()
        .map_err(|e| SearchError::Http(format!("cannot build search client: {e}")))
}

fn browser_headers(accept_language: &str) -> Result<HeaderMap, SearchError> {
    let language = HeaderValue::from_str(accept_language)
        .map_err(|e| SearchError::Http(format!("bad Accept-Language {accept_language:?}: {e}")))?;
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml;q=0.9,*/*;q=0.8"),
    );
    headers.insert(ACCEPT_LANGUAGE, language);
    Ok(headers)
}

/// Send `request` and return the page body.
///
/// # Errors
///
/// [`SearchError::Http`] prefixed with `engine` for transport failures and
/// non-success statuses.
pub async fn fetch_html(engine: &str, request: reqwest::RequestBuilder) -> Result<String, SearchError> {
    let response = request
        .send()
        .await
        .map_err(|e| SearchError::Http(format!("{engine} request failed: {e}")))?;
    let status = response.status();
    if !status.is_success() {
        return Err(SearchError::Http(format!("{engine} returned {status}")));
    }
    let body = response
        .text()
        .await
        .map_err(|e| SearchError::Http(format!("{engine} body unreadable: {e}")))?;
    tracing::trace!(engine, bytes = body.len(), "page fetched");
    Ok(body)
}

/// One of the built-in browser User-Agents.
pub fn random_user_agent() -> &'static str {
    BROWSER_AGENTS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(BROWSER_AGENTS[0])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agents_come_from_the_builtin_list() {
        for _ in 0..8 {
            assert!(BROWSER_AGENTS.contains(&random_user_agent()));
        }
    }

    #[test]
    fn headers_carry_language_preference() {
        let headers = browser_headers("zh-CN,en;q=0.5").expect("valid header");
        assert_eq!(headers[ACCEPT_LANGUAGE], "zh-CN,en;q=0.5");
        assert!(headers.contains_key(ACCEPT));
    }

    #[test]
    fn control_characters_in_language_are_rejected() {
        let config = SearchConfig {
            accept_language: "zh\nCN".into(),
            ..Default::default()
        };
        assert!(matches!(build_client(&config), Err(SearchError::Http(_))));
    }

    #[test]
    fn fixed_agent_builds() {
        let config = SearchConfig {
            user_agent: Some("KaiTest/1.0".into()),
            ..Default::default()
        };
        assert!(build_client(&config).is_ok());
    }
}

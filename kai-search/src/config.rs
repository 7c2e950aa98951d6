//! Knobs for a single search call.

use crate::error::SearchError;
use crate::types::SearchEngine;

/// Language preference sent to engines. Kai converses in Chinese first.
pub const DEFAULT_ACCEPT_LANGUAGE: &str = "zh-CN,zh;q=0.9,en;q=0.8";

/// How a search is run: which engines, how many hits, how long to wait.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Fallback order. The first engine that answers wins.
    pub engines: Vec<SearchEngine>,
    /// Upper bound on returned hits.
    pub max_results: usize,
    /// Timeout applied to each engine request, in seconds.
    pub timeout_seconds: u64,
    pub safe_search: bool,
    /// Cache lifetime in seconds; 0 turns the cache off.
    pub cache_ttl_seconds: u64,
    /// Fixed User-Agent. When unset a browser string is picked at random.
    pub user_agent: Option<String>,
    /// `Accept-Language` header value.
    pub accept_language: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            engines: SearchEngine::all().to_vec(),
            max_results: 5,
            timeout_seconds: 8,
            safe_search: true,
            cache_ttl_seconds: 600,
            user_agent: None,
            accept_language: DEFAULT_ACCEPT_LANGUAGE.to_owned(),
        }
    }
}

impl SearchConfig {
    /// Reject settings that would make every search fail or hang.
    ///
    /// # Errors
    ///
    /// [`SearchError::Config`] naming the first offending field.
    pub fn validate(&self) -> Result<(), SearchError> {
        let problem = if self.engines.is_empty() {
            Some("engines: at least one engine must be enabled")
        } else if self.max_results == 0 {
            Some("max_results must be at least 1")
        } else if self.timeout_seconds == 0 {
            Some("timeout_seconds must be at least 1")
        } else if self.accept_language.trim().is_empty() {
            Some("accept_language must not be blank")
        } else {
            None
        };
        match problem {
            Some(msg) => Err(SearchError::Config(msg.to_owned())),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rejected_for(config: SearchConfig) -> String {
        match config.validate() {
            Err(SearchError::Config(msg)) => msg,
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn defaults_try_duckduckgo_then_bing() {
        let config = SearchConfig::default();
        assert_eq!(config.engines, [SearchEngine::DuckDuckGo, SearchEngine::Bing]);
        assert_eq!(config.max_results, 5);
        assert!(config.accept_language.starts_with("zh-CN"));
        config.validate().expect("defaults are valid");
    }

    #[test]
    fn each_bad_field_is_named() {
        let base = SearchConfig::default;
        assert!(rejected_for(SearchConfig { engines: vec![], ..base() }).contains("engines"));
        assert!(rejected_for(SearchConfig { max_results: 0, ..base() }).contains("max_results"));
        assert!(
            rejected_for(SearchConfig { timeout_seconds: 0, ..base() }).contains("timeout_seconds")
        );
        assert!(
            rejected_for(SearchConfig { accept_language: " ".into(), ..base() })
                .contains("accept_language")
        );
    }

    #[test]
    fn bing_alone_is_enough() {
        let config = SearchConfig {
            engines: vec![SearchEngine::Bing],
            cache_ttl_seconds: 0,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }
}

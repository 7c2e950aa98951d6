//! Trait for pluggable search engine scrapers.

use crate::config::SearchConfig;
use crate::error::SearchError;
use crate::types::{SearchEngine, SearchResult};

/// A search engine backend.
///
/// Implementors build the request, fetch the HTML and parse it into
/// [`SearchResult`] values in the engine's own ranking order.
pub trait SearchEngineTrait: Send + Sync {
    /// Perform a search and return parsed results.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError`] if the request fails, the engine blocks the
    /// request, or the response cannot be parsed.
    fn search(
        &self,
        query: &str,
        config: &SearchConfig,
    ) -> impl std::future::Future<Output = Result<Vec<SearchResult>, SearchError>> + Send;

    /// Which [`SearchEngine`] this implementation represents.
    fn engine_type(&self) -> SearchEngine;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MockEngine {
        results: Vec<SearchResult>,
    }

    impl SearchEngineTrait for MockEngine {
        async fn search(
            &self,
            _query: &str,
            _config: &SearchConfig,
        ) -> Result<Vec<SearchResult>, SearchError> {
            if self.results.is_empty() {
                return Err(SearchError::Parse("mock engine failure".into()));
            }
            Ok(self.results.clone())
        }

        fn engine_type(&self) -> SearchEngine {
            SearchEngine::DuckDuckGo
        }
    }

    #[tokio::test]
    async fn mock_engine_returns_results_in_order() {
        let engine = MockEngine {
            results: vec![
                SearchResult {
                    title: "One".into(),
                    url: "https://one.example".into(),
                    snippet: "first".into(),
                    engine: "DuckDuckGo".into(),
                },
                SearchResult {
                    title: "Two".into(),
                    url: "https://two.example".into(),
                    snippet: "second".into(),
                    engine: "DuckDuckGo".into(),
                },
            ],
        };
        let results = engine
            .search("test", &SearchConfig::default())
            .await
            .expect("should succeed");
        assert_eq!(results[0].title, "One");
        assert_eq!(results[1].title, "Two");
    }

    #[tokio::test]
    async fn mock_engine_propagates_errors() {
        let engine = MockEngine { results: vec![] };
        let err = engine
            .search("test", &SearchConfig::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("mock engine failure"));
    }
}

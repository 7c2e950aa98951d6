//! Web search gatherer.

use super::{AuxiliarySignal, Gathered, SignalKind};
use crate::config::MAX_SEARCH_RESULTS;
use crate::error::AuxiliaryError;
use async_trait::async_trait;

/// Marker merged when the provider answers with zero results.
pub const NO_RESULTS_MARKER: &str = "The web search returned no results for this question.";

/// One search result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    /// Page title.
    pub title: String,
    /// Snippet text.
    pub body: String,
    /// Page URL.
    pub url: String,
}

/// A web search provider.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Up to `max_results` hits for `query`, in the provider's ranking.
    async fn search(&self, query: &str, max_results: usize)
    -> Result<Vec<SearchHit>, AuxiliaryError>;
}

/// [`SearchBackend`] backed by the embedded `kai-search` scrapers.
#[derive(Debug, Clone, Default)]
pub struct WebSearch {
    config: kai_search::SearchConfig,
}

impl WebSearch {
    /// Backend using `config` for engines, timeouts and caching.
    pub fn new(config: kai_search::SearchConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl SearchBackend for WebSearch {
    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<SearchHit>, AuxiliaryError> {
        let config = kai_search::SearchConfig {
            max_results,
            ..self.config.clone()
        };
        let results = kai_search::search(query, &config)
            .await
            .map_err(|e| AuxiliaryError::Search(e.to_string()))?;
        Ok(results
            .into_iter()
            .map(|r| SearchHit {
                title: r.title,
                body: r.snippet,
                url: r.url,
            })
            .collect())
    }
}

/// Run one search and turn the outcome into a [`Gathered`] value.
///
/// Hits are rendered as `title: body` lines in provider order. At most
/// five results are kept whatever `max_results` says.
pub async fn gather(backend: &dyn SearchBackend, query: &str, max_results: usize) -> Gathered {
    let max_results = max_results.clamp(1, MAX_SEARCH_RESULTS);
    tracing::trace!(query, max_results, "web search");
    match backend.search(query, max_results).await {
        Ok(hits) if hits.is_empty() => {
            tracing::debug!("web search returned no results");
            Gathered::NoResults(AuxiliarySignal::new(SignalKind::Search, NO_RESULTS_MARKER))
        }
        Ok(hits) => {
            let text = hits
                .iter()
                .take(max_results)
                .map(|hit| format!("{}: {}", hit.title, hit.body))
                .collect::<Vec<_>>()
                .join("\n");
            tracing::debug!(count = hits.len().min(max_results), "web search results gathered");
            Gathered::Data(AuxiliarySignal::new(SignalKind::Search, text))
        }
        Err(e) => {
            tracing::warn!(error = %e, "web search failed, continuing without it");
            Gathered::Diagnostic(e.to_string())
        }
    }
}

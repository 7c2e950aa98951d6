//! Web search for Kai without API keys.
//!
//! Public result pages are fetched and scraped directly. The engines in
//! [`SearchConfig::engines`] are tried one after another; the first one to
//! answer supplies the results, ranked as that engine ranked them. Results
//! from different engines are never mixed.
//!
//! Answers are cached in memory per normalised query for
//! [`SearchConfig::cache_ttl_seconds`]. Query text is only logged at trace
//! level.

pub mod cache;
pub mod config;
pub mod engine;
pub mod engines;
pub mod error;
pub mod http;
pub mod types;

pub use config::SearchConfig;
pub use engine::SearchEngineTrait;
pub use error::{Result, SearchError};
pub use types::{SearchEngine, SearchResult};

use engines::{BingEngine, DuckDuckGoEngine};

/// Run `query` against the configured engines in order.
///
/// At most `config.max_results` hits are returned, all from the first
/// engine that answers. An engine answering with nothing is still an
/// answer: the empty list is returned and later engines are not asked.
///
/// # Errors
///
/// [`SearchError::Config`] when `config` does not validate, and
/// [`SearchError::AllEnginesFailed`] listing each engine's failure when
/// none answers.
///
/// ```no_run
/// # async fn demo() -> kai_search::Result<()> {
/// let hits = kai_search::search("量子纠缠", &kai_search::SearchConfig::default()).await?;
/// for hit in hits {
///     println!("{} <{}>", hit.title, hit.url);
/// }
/// # Ok(())
/// # }
/// ```
pub async fn search(query: &str, config: &SearchConfig) -> Result<Vec<SearchResult>> {
    config.validate()?;
    let ttl = config.cache_ttl_seconds;
    let key = cache::CacheKey::new(query, &config.engines, config.max_results);

    if ttl > 0 {
        if let Some(hit) = cache::get(&key, ttl).await {
            tracing::trace!(query, "answered from cache");
            return Ok(hit);
        }
    }

    let mut failures = Vec::with_capacity(config.engines.len());
    for &engine in &config.engines {
        let mut results = match query_engine(engine, query, config).await {
            Ok(results) => results,
            Err(err) => {
                tracing::warn!(%engine, error = %err, "engine failed, falling back");
                failures.push(format!("{engine}: {err}"));
                continue;
            }
        };
        results.truncate(config.max_results);
        tracing::debug!(%engine, count = results.len(), "engine answered");
        if ttl > 0 {
            cache::insert(key, results.clone(), ttl).await;
        }
        return Ok(results);
    }

    Err(SearchError::AllEnginesFailed(failures.join("; ")))
}

async fn query_engine(
    engine: SearchEngine,
    query: &str,
    config: &SearchConfig,
) -> Result<Vec<SearchResult>> {
    match engine {
        SearchEngine::DuckDuckGo => DuckDuckGoEngine.search(query, config).await,
        SearchEngine::Bing => BingEngine.search(query, config).await,
    }
}

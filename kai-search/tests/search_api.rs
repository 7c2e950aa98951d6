//! Integration tests for the public search API.
//!
//! No network calls: results are seeded through the cache so the fallback
//! path is never reached. Live engine tests live next to each engine and are
//! marked `#[ignore]`.

use kai_search::cache::{self, CacheKey};
use kai_search::{SearchConfig, SearchEngine, SearchError, SearchResult};

fn make_result(title: &str, engine: SearchEngine) -> SearchResult {
    SearchResult {
        title: title.to_string(),
        url: format!("https://{}.example", title.to_lowercase().replace(' ', "-")),
        snippet: format!("Snippet for {title}"),
        engine: engine.name().to_string(),
    }
}

#[tokio::test]
async fn cached_results_keep_provider_order() {
    let config = SearchConfig {
        engines: vec![SearchEngine::DuckDuckGo],
        max_results: 5,
        ..Default::default()
    };
    let seeded = vec![
        make_result("Zeta first", SearchEngine::DuckDuckGo),
        make_result("Alpha second", SearchEngine::DuckDuckGo),
        make_result("Mu third", SearchEngine::DuckDuckGo),
    ];
    cache::insert(
        CacheKey::new("provider order check", &config.engines, config.max_results),
        seeded.clone(),
        config.cache_ttl_seconds,
    )
    .await;

    let results = kai_search::search("Provider Order Check", &config)
        .await
        .expect("cache hit");
    assert_eq!(results, seeded);
}

#[tokio::test]
async fn invalid_config_is_rejected_before_any_request() {
    let config = SearchConfig {
        engines: vec![],
        ..Default::default()
    };
    let err = kai_search::search("anything", &config).await.unwrap_err();
    assert!(matches!(err, SearchError::Config(_)));
}

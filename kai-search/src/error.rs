//! Search failures.
//!
//! Messages may be shown to the user as-is, so they never echo the query.

/// Why a search produced no results.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// No configured engine answered. Holds `engine: reason` entries
    /// joined by `; `.
    #[error("all search engines failed: {0}")]
    AllEnginesFailed(String),

    /// Transport failure or non-success status.
    #[error("HTTP error: {0}")]
    Http(String),

    /// The page could not be scraped.
    #[error("parse error: {0}")]
    Parse(String),

    /// Rejected by [`crate::SearchConfig::validate`].
    #[error("config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, SearchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_a_category_prefix() {
        let cases = [
            (
                SearchError::AllEnginesFailed("DuckDuckGo: HTTP error: 403; Bing: HTTP error: 429".into()),
                "all search engines failed: DuckDuckGo: HTTP error: 403; Bing: HTTP error: 429",
            ),
            (SearchError::Http("Bing returned 503".into()), "HTTP error: Bing returned 503"),
            (SearchError::Parse("bad selector".into()), "parse error: bad selector"),
            (
                SearchError::Config("max_results must be at least 1".into()),
                "config error: max_results must be at least 1",
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(err.to_string(), expected);
        }
    }

    #[test]
    fn crosses_task_boundaries() {
        fn send_sync<T: Send + Sync + 'static>() {}
        send_sync::<SearchError>();
    }
}

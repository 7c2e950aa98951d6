//! Search result and engine identification types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single search result, in the order the engine ranked it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Title of the result page.
    pub title: String,
    /// URL of the result page, with engine redirect wrappers removed.
    pub url: String,
    /// Text snippet summarising the page.
    pub snippet: String,
    /// Name of the engine that returned this result.
    pub engine: String,
}

/// Search engines kai-search can scrape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchEngine {
    /// DuckDuckGo HTML endpoint: scraper-friendly, privacy-aligned.
    DuckDuckGo,
    /// Bing: fallback with an independent index.
    Bing,
}

impl SearchEngine {
    /// Human-readable engine name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::DuckDuckGo => "DuckDuckGo",
            Self::Bing => "Bing",
        }
    }

    /// All supported engines, in default fallback order.
    pub fn all() -> &'static [SearchEngine] {
        &[Self::DuckDuckGo, Self::Bing]
    }
}

impl fmt::Display for SearchEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

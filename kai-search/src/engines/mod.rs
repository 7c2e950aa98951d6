//! Engine scrapers.
//!
//! Every engine renders results as a list of blocks with a title link and
//! a caption. [`PageLayout`] names the CSS selectors for those parts and
//! [`scrape`] walks the page with them, so an engine module only has to
//! build its request and unwrap its redirect links.

pub mod bing;
pub mod duckduckgo;

pub use bing::BingEngine;
pub use duckduckgo::DuckDuckGoEngine;

use crate::error::SearchError;
use crate::types::{SearchEngine, SearchResult};
use scraper::{ElementRef, Html, Selector};

/// CSS selectors locating the parts of one organic result.
pub(crate) struct PageLayout {
    /// One match per result block.
    pub item: &'static str,
    /// Title element inside a block.
    pub title: &'static str,
    /// Link inside the title. `None` when the title is the link itself.
    pub link: Option<&'static str>,
    /// Caption inside a block. The first match is used.
    pub snippet: &'static str,
}

struct Compiled {
    item: Selector,
    title: Selector,
    link: Option<Selector>,
    snippet: Selector,
}

fn compile(css: &str) -> Result<Selector, SearchError> {
    Selector::parse(css).map_err(|e| SearchError::Parse(format!("bad selector {css:?}: {e:?}")))
}

impl PageLayout {
    fn compile(&self) -> Result<Compiled, SearchError> {
        Ok(Compiled {
            item: compile(self.item)?,
            title: compile(self.title)?,
            link: self.link.map(compile).transpose()?,
            snippet: compile(self.snippet)?,
        })
    }
}

fn text_of(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_owned()
}

/// Collect up to `max_results` results from `html` in page order.
///
/// Blocks with an empty title or an href that `unwrap_link` rejects are
/// skipped. A missing caption yields an empty snippet.
pub(crate) fn scrape(
    html: &str,
    layout: &PageLayout,
    engine: SearchEngine,
    max_results: usize,
    unwrap_link: fn(&str) -> Option<String>,
) -> Result<Vec<SearchResult>, SearchError> {
    let sel = layout.compile()?;
    let page = Html::parse_document(html);

    let results: Vec<SearchResult> = page
        .select(&sel.item)
        .filter_map(|block| {
            let heading = block.select(&sel.title).next()?;
            let title = text_of(heading);
            if title.is_empty() {
                return None;
            }
            let anchor = match &sel.link {
                Some(link) => heading.select(link).next()?,
                None => heading,
            };
            let url = anchor.value().attr("href").and_then(unwrap_link)?;
            let snippet = block.select(&sel.snippet).next().map(text_of).unwrap_or_default();
            Some(SearchResult {
                title,
                url,
                snippet,
                engine: engine.name().to_owned(),
            })
        })
        .take(max_results)
        .collect();

    tracing::debug!(engine = engine.name(), count = results.len(), "results scraped");
    Ok(results)
}

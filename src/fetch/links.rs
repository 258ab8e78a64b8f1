// src/fetch/links.rs
use scraper::{Html, Selector};
use serde::Serialize;

/// One `href` from the listing page, as written in the markup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkEntry(pub String);

impl LinkEntry {
    /// Everything after the last `/` of the raw href.
    pub fn basename(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Every `<a href>` in `html` whose href ends with `extension`, in document
/// order. Duplicates are kept.
pub fn extract_links(html: &str, extension: &str) -> Vec<LinkEntry> {
    let selector = Selector::parse("a[href]").expect("CSS selector for links should be valid");
    Html::parse_document(html)
        .select(&selector)
        .filter_map(|e| e.value().attr("href"))
        .filter(|href| href.ends_with(extension))
        .map(|href| LinkEntry(href.to_string()))
        .collect()
}

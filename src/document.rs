//! Narrow document-query abstraction over fetched markup
//!
//! The crawler core never touches a concrete markup-tree type. Everything it
//! needs from a fetched page goes through the [`Document`] trait: text nodes,
//! attribute values, and per-entry sub-documents. The shipped implementation
//! is backed by `scraper`; tests can substitute fixture documents.

use scraper::{Html, Selector};

/// Read-only query interface over a fetched document
pub trait Document: Sized {
    /// Returns every text node under every element matched by `selector`,
    /// in document order. Values are raw (untrimmed).
    fn select_text_nodes(&self, selector: &str) -> Vec<String>;

    /// Returns the value of `attr` on the first element matched by `selector`
    fn select_first_attr(&self, selector: &str, attr: &str) -> Option<String>;

    /// Returns the value of `attr` on every element matched by `selector`
    fn select_all_attr(&self, selector: &str, attr: &str) -> Vec<String>;

    /// Returns each element matched by `selector` as its own sub-document,
    /// scoping later selections to that entry
    fn fragments(&self, selector: &str) -> Vec<Self>;
}

/// `scraper`-backed document implementation
pub struct HtmlDocument {
    html: Html,
}

impl HtmlDocument {
    /// Parses a fetched page body
    pub fn parse(body: &str) -> Self {
        Self {
            html: Html::parse_document(body),
        }
    }

    fn compile(selector: &str) -> Option<Selector> {
        match Selector::parse(selector) {
            Ok(s) => Some(s),
            Err(e) => {
                tracing::warn!("Invalid selector '{}': {:?}", selector, e);
                None
            }
        }
    }
}

impl Document for HtmlDocument {
    fn select_text_nodes(&self, selector: &str) -> Vec<String> {
        let Some(sel) = Self::compile(selector) else {
            return Vec::new();
        };
        self.html
            .select(&sel)
            .flat_map(|el| el.text().map(|t| t.to_string()))
            .collect()
    }

    fn select_first_attr(&self, selector: &str, attr: &str) -> Option<String> {
        let sel = Self::compile(selector)?;
        self.html
            .select(&sel)
            .find_map(|el| el.value().attr(attr).map(|v| v.to_string()))
    }

    fn select_all_attr(&self, selector: &str, attr: &str) -> Vec<String> {
        let Some(sel) = Self::compile(selector) else {
            return Vec::new();
        };
        self.html
            .select(&sel)
            .filter_map(|el| el.value().attr(attr).map(|v| v.to_string()))
            .collect()
    }

    fn fragments(&self, selector: &str) -> Vec<Self> {
        let Some(sel) = Self::compile(selector) else {
            return Vec::new();
        };
        self.html
            .select(&sel)
            .map(|el| Self {
                html: Html::parse_fragment(&el.html()),
            })
            .collect()
    }
}

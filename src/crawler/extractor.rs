//! Listing-record extraction from leaf pages
//!
//! One leaf page carries a list of listing entries; each becomes one
//! [`ListingRecord`]. Extraction degrades per field: a missing or malformed
//! field gets the sentinel value, and never discards the record or its
//! siblings. Description text is tokenized with internal whitespace removed;
//! tokens that are pure separator glyphs are dropped here, at extraction
//! time.

use crate::document::{Document, HtmlDocument};
use crate::records::{ListingRecord, FIELD_SENTINEL};

const ENTRY_SELECTOR: &str =
    "div.content__article > div.content__list:first-of-type div.content__list--item";
const TITLE_SELECTOR: &str = "p.content__list--item--title a.twoline";
const DES_SELECTOR: &str = "p.content__list--item--des";
const BOTTOM_SELECTOR: &str = "p.content__list--item--bottom i";
const BRAND_SELECTOR: &str = "p.content__list--item--brand span.brand";
const PRICE_SELECTOR: &str = "span.content__list--item-price";

/// Tokens that are presentation separators, not data
const SEPARATOR_GLYPHS: [&str; 2] = ["-", "/"];

/// Price unit the catalog renders outside the highlighted number
const PRICE_UNIT: &str = "元/月";

/// Extracts every listing entry on a leaf page
pub fn extract_records<D: Document>(doc: &D) -> Vec<ListingRecord> {
    doc.fragments(ENTRY_SELECTOR)
        .iter()
        .map(extract_entry)
        .collect()
}

/// Parses a body and extracts its records in one step
pub fn extract_records_from_body(body: &str) -> Vec<ListingRecord> {
    extract_records(&HtmlDocument::parse(body))
}

fn extract_entry<D: Document>(entry: &D) -> ListingRecord {
    let title = entry
        .select_text_nodes(TITLE_SELECTOR)
        .into_iter()
        .next()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| FIELD_SENTINEL.to_string());

    let des = entry
        .select_text_nodes(DES_SELECTOR)
        .iter()
        .map(|t| compact_whitespace(t))
        .filter(|t| !t.is_empty() && !SEPARATOR_GLYPHS.contains(&t.as_str()))
        .collect();

    let bottom = entry
        .select_text_nodes(BOTTOM_SELECTOR)
        .iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();

    let brand = entry
        .select_text_nodes(BRAND_SELECTOR)
        .into_iter()
        .next()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| FIELD_SENTINEL.to_string());

    let price = entry
        .select_text_nodes(PRICE_SELECTOR)
        .into_iter()
        .next()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .map(|t| format!("{}{}", t, PRICE_UNIT))
        .unwrap_or_else(|| FIELD_SENTINEL.to_string());

    ListingRecord {
        title,
        des,
        bottom,
        brand,
        price,
    }
}

/// Removes all internal whitespace ("整租 · 南山 3室" -> "整租·南山3室")
fn compact_whitespace(s: &str) -> String {
    s.split_whitespace().collect()
}

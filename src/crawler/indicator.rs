//! Result-size indicator extraction
//!
//! A results page carries two signals the partitioner depends on: the total
//! match count in the view's title line, and the total page count on the
//! pagination element. Extraction is a pure function of the document; it
//! never retries. An absent or unparsable count is `MissingIndicator`, which
//! is a retryable condition for the caller, not a zero.

use crate::document::{Document, HtmlDocument};
use thiserror::Error;

const TOTAL_COUNT_SELECTOR: &str = "span.content__title--hl";
const TOTAL_PAGE_SELECTOR: &str = "div.content__pg";
const TOTAL_PAGE_ATTR: &str = "data-totalpage";

/// The (total count, total pages) signal of one filtered view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Indicator {
    /// Total matching records the origin reports for this view
    pub total_count: u64,

    /// Total result pages; 0 when the catalog omits the pagination element
    /// (single-page result sets)
    pub total_page: u32,
}

/// The result-count indicator was absent or unreadable
#[derive(Debug, Clone, Copy, Error)]
#[error("result-count indicator missing from document")]
pub struct MissingIndicator;

/// Extracts the indicator pair from a fetched results document.
///
/// The match count must be present and numeric. The page count may be
/// legitimately absent (reported as 0, meaning unknown); if the pagination
/// element is present its value must parse.
pub fn extract_indicator<D: Document>(doc: &D) -> Result<Indicator, MissingIndicator> {
    let count_text = doc
        .select_text_nodes(TOTAL_COUNT_SELECTOR)
        .into_iter()
        .next()
        .ok_or(MissingIndicator)?;
    let total_count: u64 = count_text.trim().parse().map_err(|_| MissingIndicator)?;

    let total_page: u32 = match doc.select_first_attr(TOTAL_PAGE_SELECTOR, TOTAL_PAGE_ATTR) {
        Some(value) => value.trim().parse().map_err(|_| MissingIndicator)?,
        None => 0,
    };

    Ok(Indicator {
        total_count,
        total_page,
    })
}

/// Parses a body and extracts its indicator in one step
pub fn extract_indicator_from_body(body: &str) -> Result<Indicator, MissingIndicator> {
    extract_indicator(&HtmlDocument::parse(body))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn results_page(count: &str, total_page: Option<&str>) -> String {
        let pagination = match total_page {
            Some(p) => format!(r#"<div class="content__pg" data-totalpage="{}"></div>"#, p),
            None => String::new(),
        };
        format!(
            r#"<html><body>
                <span class="content__title--hl">{}</span>
                {}
            </body></html>"#,
            count, pagination
        )
    }

    #[test]
    fn test_extracts_both_signals() {
        let indicator = extract_indicator_from_body(&results_page("2543", Some("85"))).unwrap();
        assert_eq!(indicator.total_count, 2543);
        assert_eq!(indicator.total_page, 85);
    }

    #[test]
    fn test_missing_count_is_retryable_not_zero() {
        let body = r#"<html><body><div class="content__pg" data-totalpage="3"></div></body></html>"#;
        assert!(extract_indicator_from_body(body).is_err());
    }

    #[test]
    fn test_absent_pagination_element_means_unknown() {
        let indicator = extract_indicator_from_body(&results_page("12", None)).unwrap();
        assert_eq!(indicator.total_count, 12);
        assert_eq!(indicator.total_page, 0);
    }

    #[test]
    fn test_present_zero_is_a_legitimate_zero() {
        let indicator = extract_indicator_from_body(&results_page("0", Some("0"))).unwrap();
        assert_eq!(indicator.total_count, 0);
        assert_eq!(indicator.total_page, 0);
    }

    #[test]
    fn test_unparsable_values_are_missing() {
        assert!(extract_indicator_from_body(&results_page("many", Some("3"))).is_err());
        assert!(extract_indicator_from_body(&results_page("12", Some("???"))).is_err());
    }

    #[test]
    fn test_empty_body_is_missing() {
        assert!(extract_indicator_from_body("").is_err());
    }
}

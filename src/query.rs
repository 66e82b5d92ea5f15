//! Query builder: deterministic address composition for facet assignments
//!
//! Addresses are composed positionally. An area path replaces the catalog
//! root, a price bucket is appended as a trailing segment, and each deeper
//! dimension's code is spliced in textually just before the code of the
//! dimension assigned before it. The builder is pure: the same assignment
//! always yields the same address.

use crate::taxonomy::{Facet, Insertion};
use crate::{QueryError, QueryResult};

/// Composes fetch addresses for one catalog instance
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    base_url: String,
    root_path: String,
}

impl QueryBuilder {
    pub fn new(base_url: &str, root_path: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            root_path: root_path.to_string(),
        }
    }

    /// First-page address of the unfiltered catalog root
    pub fn root_address(&self) -> String {
        format!("{}{}", self.base_url, self.root_path)
    }

    /// Composes one child address per code of `facet`, anchored on the
    /// parent address.
    ///
    /// The anchor is located once; if it is absent from the parent address
    /// the whole branch fails with [`QueryError::EmptyTaxonomyMatch`] and no
    /// children are produced.
    ///
    /// Returns `(code, address)` pairs in the facet's code order.
    pub fn child_addresses(
        &self,
        parent: &str,
        facet: &Facet,
        codes: &[String],
    ) -> QueryResult<Vec<(String, String)>> {
        match &facet.insertion {
            Insertion::ReplaceRootPath => Ok(codes
                .iter()
                .map(|path| (path.clone(), format!("{}{}", self.base_url, path)))
                .collect()),

            Insertion::AppendSegment => Ok(codes
                .iter()
                .map(|code| (code.clone(), format!("{}{}/", parent, code)))
                .collect()),

            Insertion::BeforeAnchor(anchor) => {
                let m = anchor.find(parent).ok_or_else(|| QueryError::EmptyTaxonomyMatch {
                    dimension: facet.dimension.name().to_string(),
                    address: parent.to_string(),
                })?;
                let (left, right) = parent.split_at(m.start());
                Ok(codes
                    .iter()
                    .map(|code| (code.clone(), format!("{}{}{}", left, code, right)))
                    .collect())
            }
        }
    }

    /// Enumerates the page-fetch addresses for a measured leaf.
    ///
    /// A known page count yields `pg1/..pgN/` addresses. A catalog that
    /// omits the page count for a non-empty single-page result yields the
    /// leaf's own address, once. An empty leaf yields nothing.
    pub fn page_addresses(leaf: &str, total_page: u32, total_count: u64) -> Vec<String> {
        if total_page > 0 {
            (1..=total_page)
                .map(|page| format!("{}pg{}/", leaf, page))
                .collect()
        } else if total_count > 0 {
            vec![leaf.to_string()]
        } else {
            Vec::new()
        }
    }
}

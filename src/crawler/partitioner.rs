//! Recursive query-space partitioner: buckets and the overflow decision
//!
//! A bucket is one combination of facet values plus its measured result
//! size. The origin truncates any filtered view at a page cap, so a bucket
//! whose view overflows is split into one child per code of the next
//! taxonomy dimension; a bucket under the cap (or out of dimensions) is a
//! leaf and is paginated exactly once. The decision itself is a pure
//! function; scheduling lives in the coordinator.

use crate::crawler::indicator::Indicator;
use crate::taxonomy::Dimension;

/// An ordered partial assignment of facet codes, in taxonomy order
#[derive(Debug, Clone, Default)]
pub struct FacetAssignment {
    assigned: Vec<(Dimension, String)>,
}

impl FacetAssignment {
    /// The empty assignment: the unfiltered catalog root
    pub fn root() -> Self {
        Self::default()
    }

    /// Number of assigned dimensions
    pub fn depth(&self) -> usize {
        self.assigned.len()
    }

    /// Builds a child assignment by appending one more dimension
    pub fn child(&self, dimension: Dimension, code: String) -> Self {
        let mut assigned = self.assigned.clone();
        assigned.push((dimension, code));
        Self { assigned }
    }

    pub fn assigned(&self) -> &[(Dimension, String)] {
        &self.assigned
    }

    /// Human-readable form for log lines, e.g. `area=/zufang/x/ price=rp3`
    pub fn describe(&self) -> String {
        if self.assigned.is_empty() {
            return "root".to_string();
        }
        self.assigned
            .iter()
            .map(|(dim, code)| format!("{}={}", dim.name(), code))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// A node in the partition search: a facet assignment plus its fetch address
#[derive(Debug, Clone)]
pub struct Bucket {
    pub assignment: FacetAssignment,
    pub address: String,
}

impl Bucket {
    pub fn root(address: String) -> Self {
        Self {
            assignment: FacetAssignment::root(),
            address,
        }
    }

    pub fn child(&self, dimension: Dimension, code: String, address: String) -> Self {
        Self {
            assignment: self.assignment.child(dimension, code),
            address,
        }
    }

    pub fn depth(&self) -> usize {
        self.assignment.depth()
    }

    pub fn describe(&self) -> String {
        self.assignment.describe()
    }
}

/// What to do with a measured bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Overflowing with dimensions left: one child per code of the next one
    Split,

    /// Fully paginatable (possibly zero pages)
    Leaf,

    /// At maximum depth and still overflowing: paginated as a leaf, but
    /// content beyond the page cap is unreachable. Flagged, not silent.
    TruncatedLeaf,
}

/// Whether the origin will refuse to fully paginate this view.
///
/// The page cap is compared with `>=` rather than equality so that an origin
/// reporting a smaller cap than configured still counts as overflowing.
pub fn is_overflowing(indicator: &Indicator, page_cap: u32, count_cap: u64) -> bool {
    indicator.total_page >= page_cap || indicator.total_count > count_cap
}

/// The split-or-paginate decision for a measured bucket
pub fn decide(
    indicator: &Indicator,
    depth: usize,
    max_depth: usize,
    page_cap: u32,
    count_cap: u64,
) -> Decision {
    if !is_overflowing(indicator, page_cap, count_cap) {
        Decision::Leaf
    } else if depth < max_depth {
        Decision::Split
    } else {
        Decision::TruncatedLeaf
    }
}

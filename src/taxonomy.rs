//! Facet taxonomy: the ordered partitioning dimensions of a catalog
//!
//! A filtered catalog view is narrowed by assigning facets in a fixed order:
//! area, then price bucket, then room count, then orientation, then floor.
//! Each dimension carries its enumerable filter codes and the rule for where
//! its code lands inside a composed address. Area codes are not static; they
//! are read once from the catalog's filter panel when the root view first
//! overflows.

use crate::document::Document;
use regex::Regex;

/// Selector for the area filter panel's anchor list
const AREA_FILTER_SELECTOR: &str = r#"div.filter ul[data-target="area"] li a"#;

/// One filterable dimension of the catalog query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    Area,
    Price,
    Room,
    Orientation,
    Floor,
}

impl Dimension {
    pub fn name(&self) -> &'static str {
        match self {
            Dimension::Area => "area",
            Dimension::Price => "price",
            Dimension::Room => "room",
            Dimension::Orientation => "orientation",
            Dimension::Floor => "floor",
        }
    }
}

/// Where a dimension's filter code lands inside a composed address
#[derive(Debug, Clone)]
pub enum Insertion {
    /// The code is an absolute path replacing the catalog root path
    /// (area anchors come out of the filter panel as full paths)
    ReplaceRootPath,

    /// The code becomes a trailing path segment of the parent address
    AppendSegment,

    /// The code is inserted textually, immediately before the first match of
    /// the anchor pattern (the previously assigned dimension's code)
    BeforeAnchor(Regex),
}

/// One dimension with its enumerated codes and insertion rule
#[derive(Debug, Clone)]
pub struct Facet {
    pub dimension: Dimension,
    pub codes: Vec<String>,
    pub insertion: Insertion,
}

/// The ordered list of partitioning dimensions for one catalog instance
#[derive(Debug, Clone)]
pub struct FacetTaxonomy {
    facets: Vec<Facet>,
}

impl FacetTaxonomy {
    /// Builds the rental-catalog taxonomy for a city.
    ///
    /// Shanghai exposes eight price buckets; every other city exposes seven.
    /// Area codes start empty and are filled from the filter panel via
    /// [`FacetTaxonomy::with_area_paths`] once the root view is fetched.
    pub fn lianjia_rent(city: &str) -> Self {
        let price_buckets = if city == "sh" { 8 } else { 7 };
        let price_codes: Vec<String> = (1..=price_buckets).map(|i| format!("rp{}", i)).collect();
        let room_codes: Vec<String> = (0..=3).map(|i| format!("l{}", i)).collect();
        let orientation_codes: Vec<String> = [
            "f100500000001",
            "f100500000005",
            "f100500000003",
            "f100500000007",
            "f100500000009",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        let floor_codes: Vec<String> = ["lc200500000003", "lc200500000002", "lc200500000001"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        let facets = vec![
            Facet {
                dimension: Dimension::Area,
                codes: Vec::new(),
                insertion: Insertion::ReplaceRootPath,
            },
            Facet {
                dimension: Dimension::Price,
                codes: price_codes,
                insertion: Insertion::AppendSegment,
            },
            Facet {
                dimension: Dimension::Room,
                codes: room_codes,
                insertion: Insertion::BeforeAnchor(anchor(r"rp[1-8]")),
            },
            Facet {
                dimension: Dimension::Orientation,
                codes: orientation_codes,
                insertion: Insertion::BeforeAnchor(anchor(r"l[0-3]")),
            },
            Facet {
                dimension: Dimension::Floor,
                codes: floor_codes,
                insertion: Insertion::BeforeAnchor(anchor(r"f10050000000[13579]")),
            },
        ];

        Self { facets }
    }

    /// Returns a copy of this taxonomy with the area dimension's codes set
    /// to the discovered filter-panel paths
    pub fn with_area_paths(&self, paths: Vec<String>) -> Self {
        let facets = self
            .facets
            .iter()
            .map(|f| {
                if f.dimension == Dimension::Area {
                    Facet {
                        dimension: f.dimension,
                        codes: paths.clone(),
                        insertion: f.insertion.clone(),
                    }
                } else {
                    f.clone()
                }
            })
            .collect();
        Self { facets }
    }

    /// The dimension assigned at `depth`, or None past the last dimension
    pub fn facet_at(&self, depth: usize) -> Option<&Facet> {
        self.facets.get(depth)
    }

    /// Number of dimensions; a bucket at this depth cannot split further
    pub fn max_depth(&self) -> usize {
        self.facets.len()
    }
}

fn anchor(pattern: &str) -> Regex {
    // Patterns are literals defined in this module
    Regex::new(pattern).expect("anchor pattern is valid")
}

/// Reads the area filter paths from a catalog root document.
///
/// The unfiltered root path itself appears in the panel and is excluded;
/// anything that is not an absolute path is ignored.
pub fn discover_area_paths<D: Document>(doc: &D, root_path: &str) -> Vec<String> {
    doc.select_all_attr(AREA_FILTER_SELECTOR, "href")
        .into_iter()
        .filter(|href| href.starts_with('/') && href != root_path)
        .collect()
}

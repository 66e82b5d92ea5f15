//! Lianjia-Harvest: an exhaustive harvester for capped listing catalogs
//!
//! This crate implements a crawler for paginated listing catalogs whose search
//! views are truncated by the origin (at most 100 result pages per filtered
//! view). It recursively partitions the query space by filter facets until
//! every sub-query fits under the cap, paginates each leaf exactly once, and
//! runs an offline deduplication pass over the collected records.

pub mod config;
pub mod crawler;
pub mod document;
pub mod query;
pub mod records;
pub mod taxonomy;

use thiserror::Error;

/// Main error type for harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Query composition error: {0}")]
    Query(#[from] QueryError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Record serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Sink error at {path}: {source}")]
    Sink {
        path: String,
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Query-composition errors
#[derive(Debug, Error)]
pub enum QueryError {
    /// The anchor code a facet inserts against was not found in the address.
    /// The affected branch is skipped; siblings are unaffected.
    #[error("No insertion anchor for dimension '{dimension}' in address: {address}")]
    EmptyTaxonomyMatch { dimension: String, address: String },
}

/// Result type alias for harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for query-composition operations
pub type QueryResult<T> = std::result::Result<T, QueryError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{run_harvest, HarvestSummary};
pub use records::{dedup_records, DedupOptions, ListingRecord};
pub use taxonomy::{Dimension, FacetTaxonomy};

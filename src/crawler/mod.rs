//! Crawler module: partitioning, fetching, and record collection
//!
//! This module contains the harvest core:
//! - HTTP fetching through a rotating proxy pool, with transport retry
//! - Outcome classification and bounded retry policy
//! - Result-size indicator extraction
//! - The recursive query-space partitioner
//! - Listing-record extraction from leaf pages
//! - The bounded-concurrency work-queue dispatcher

mod coordinator;
mod extractor;
mod fetcher;
mod indicator;
mod partitioner;
mod policy;

pub use coordinator::{Coordinator, HarvestSummary};
pub use extractor::{extract_records, extract_records_from_body};
pub use fetcher::{FetchOutcome, Fetcher};
pub use indicator::{extract_indicator, extract_indicator_from_body, Indicator, MissingIndicator};
pub use partitioner::{decide, is_overflowing, Bucket, Decision, FacetAssignment};
pub use policy::{
    resolve_content, resolve_indicator, AbandonReason, ContentResolution, IndicatorResolution,
    ResiliencePolicy,
};

use crate::config::Config;
use crate::Result;

/// Runs a complete harvest for one catalog instance.
///
/// Resolves the root query, partitions every overflowing view by facets,
/// paginates each leaf exactly once, and appends extracted records to the
/// configured sink. Returns once every scheduled fetch has resolved to
/// success, abandonment, or exhausted retries.
pub async fn run_harvest(config: Config) -> Result<HarvestSummary> {
    let coordinator = Coordinator::new(config)?;
    coordinator.run().await
}

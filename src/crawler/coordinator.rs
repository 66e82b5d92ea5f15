//! Harvest coordinator: the explicit work queue and its dispatcher
//!
//! Partitioning is recursion over an event loop in spirit, but it runs here
//! as an explicit queue of pending jobs (bucket resolutions and leaf-page
//! fetches) consumed by a small fixed pool of workers. A bucket's children
//! are only submitted after its own fetch resolves, so a decision never
//! races with its children; jobs from different buckets interleave freely.
//! The run completes when the outstanding-job count reaches zero.

use crate::config::Config;
use crate::crawler::extractor::extract_records_from_body;
use crate::crawler::fetcher::Fetcher;
use crate::crawler::partitioner::{decide, Bucket, Decision};
use crate::crawler::policy::{
    resolve_content, resolve_indicator, ContentResolution, IndicatorResolution, ResiliencePolicy,
};
use crate::document::HtmlDocument;
use crate::query::QueryBuilder;
use crate::records::RecordSink;
use crate::taxonomy::{discover_area_paths, Dimension, FacetTaxonomy};
use crate::Result;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Notify};

/// One unit of work for a dispatcher worker
#[derive(Debug)]
enum Job {
    /// Fetch a bucket's first page and decide split-or-paginate
    Resolve(Bucket),

    /// Fetch one leaf page and extract its records
    LeafPage { address: String },

    /// Stop the receiving worker
    Shutdown,
}

/// Counts reported after a completed run
#[derive(Debug, Clone)]
pub struct HarvestSummary {
    pub buckets_resolved: u64,
    pub leaves: u64,
    pub abandoned_addresses: u64,
    pub truncated_leaves: u64,
    pub pages_fetched: u64,
    pub records_collected: u64,
    pub started_at: DateTime<Utc>,
    pub duration: Duration,
}

impl fmt::Display for HarvestSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Harvest started {}", self.started_at.to_rfc3339())?;
        writeln!(f, "  buckets resolved:    {}", self.buckets_resolved)?;
        writeln!(f, "  leaves paginated:    {}", self.leaves)?;
        writeln!(f, "  addresses abandoned: {}", self.abandoned_addresses)?;
        writeln!(f, "  truncated leaves:    {}", self.truncated_leaves)?;
        writeln!(f, "  pages fetched:       {}", self.pages_fetched)?;
        writeln!(f, "  records collected:   {}", self.records_collected)?;
        write!(f, "  duration:            {:.1?}", self.duration)
    }
}

#[derive(Default)]
struct Counters {
    buckets_resolved: AtomicU64,
    leaves: AtomicU64,
    abandoned: AtomicU64,
    truncated_leaves: AtomicU64,
    pages_fetched: AtomicU64,
    records_collected: AtomicU64,
}

/// Unbounded job queue with completion tracking.
///
/// `outstanding` counts submitted-but-unfinished jobs; a worker submits any
/// children of its job before marking it finished, so the count can only
/// reach zero when nothing is queued or running.
struct WorkQueue {
    tx: mpsc::UnboundedSender<Job>,
    outstanding: AtomicUsize,
    done: Notify,
}

impl WorkQueue {
    fn submit(&self, job: Job) {
        self.outstanding.fetch_add(1, Ordering::SeqCst);
        // Send only fails once receivers are gone, at which point the run
        // is already over
        let _ = self.tx.send(job);
    }

    fn job_finished(&self) {
        if self.outstanding.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.done.notify_one();
        }
    }
}

/// Shared state cloned into every worker
#[derive(Clone)]
struct HarvestContext {
    fetcher: Arc<Fetcher>,
    policy: ResiliencePolicy,
    query: Arc<QueryBuilder>,
    taxonomy: Arc<FacetTaxonomy>,
    sink: Arc<RecordSink>,
    queue: Arc<WorkQueue>,
    /// Once-only address filter, consulted and updated atomically per address
    scheduled: Arc<Mutex<HashSet<String>>>,
    counters: Arc<Counters>,
    root_path: String,
    page_cap: u32,
    count_cap: u64,
}

impl HarvestContext {
    /// Atomically marks an address as scheduled; false means it already was
    fn mark_scheduled(&self, address: &str) -> bool {
        self.scheduled.lock().unwrap().insert(address.to_string())
    }
}

/// Main harvest coordinator
pub struct Coordinator {
    config: Config,
    fetcher: Arc<Fetcher>,
    sink: Arc<RecordSink>,
}

impl Coordinator {
    pub fn new(config: Config) -> Result<Self> {
        let fetcher = Arc::new(Fetcher::new(&config.crawler)?);
        let sink = Arc::new(RecordSink::create(Path::new(&config.output.sink_path))?);
        Ok(Self {
            config,
            fetcher,
            sink,
        })
    }

    /// Runs the harvest to completion.
    ///
    /// Seeds the queue with the root bucket, spawns the worker pool, waits
    /// for the outstanding-job count to drain, and stops the workers. There
    /// is no cancellation path: every scheduled fetch resolves to success,
    /// abandonment, or exhausted retries before this returns.
    pub async fn run(&self) -> Result<HarvestSummary> {
        let started_at = Utc::now();
        let start = Instant::now();

        let query = Arc::new(QueryBuilder::new(
            &self.config.catalog.base_url,
            &self.config.catalog.root_path,
        ));
        let taxonomy = Arc::new(FacetTaxonomy::lianjia_rent(&self.config.catalog.city));
        let policy = ResiliencePolicy::from_config(&self.config.crawler);

        let (tx, rx) = mpsc::unbounded_channel();
        let rx = Arc::new(tokio::sync::Mutex::new(rx));
        let queue = Arc::new(WorkQueue {
            tx,
            outstanding: AtomicUsize::new(0),
            done: Notify::new(),
        });

        let ctx = HarvestContext {
            fetcher: Arc::clone(&self.fetcher),
            policy,
            query: Arc::clone(&query),
            taxonomy: Arc::clone(&taxonomy),
            sink: Arc::clone(&self.sink),
            queue: Arc::clone(&queue),
            scheduled: Arc::new(Mutex::new(HashSet::new())),
            counters: Arc::new(Counters::default()),
            root_path: self.config.catalog.root_path.clone(),
            page_cap: self.config.crawler.page_cap,
            count_cap: self.config.crawler.count_cap,
        };

        let root_address = query.root_address();
        tracing::info!("Starting harvest at {}", root_address);
        ctx.mark_scheduled(&root_address);
        queue.submit(Job::Resolve(Bucket::root(root_address)));

        let worker_count = self.config.crawler.concurrency as usize;
        let workers: Vec<_> = (0..worker_count)
            .map(|id| {
                let ctx = ctx.clone();
                let rx = Arc::clone(&rx);
                tokio::spawn(worker_loop(id, ctx, rx))
            })
            .collect();

        queue.done.notified().await;

        for _ in 0..worker_count {
            let _ = queue.tx.send(Job::Shutdown);
        }
        for worker in workers {
            let _ = worker.await;
        }

        self.sink.flush()?;

        let counters = &ctx.counters;
        let summary = HarvestSummary {
            buckets_resolved: counters.buckets_resolved.load(Ordering::SeqCst),
            leaves: counters.leaves.load(Ordering::SeqCst),
            abandoned_addresses: counters.abandoned.load(Ordering::SeqCst),
            truncated_leaves: counters.truncated_leaves.load(Ordering::SeqCst),
            pages_fetched: counters.pages_fetched.load(Ordering::SeqCst),
            records_collected: counters.records_collected.load(Ordering::SeqCst),
            started_at,
            duration: start.elapsed(),
        };

        tracing::info!(
            "Harvest completed: {} records from {} pages across {} leaves in {:.1?}",
            summary.records_collected,
            summary.pages_fetched,
            summary.leaves,
            summary.duration
        );
        if summary.truncated_leaves > 0 {
            tracing::warn!(
                "{} max-depth leaves still overflow the page cap; their tail pages are unreachable",
                summary.truncated_leaves
            );
        }

        Ok(summary)
    }
}

async fn worker_loop(
    id: usize,
    ctx: HarvestContext,
    rx: Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<Job>>>,
) {
    tracing::debug!("Worker {} started", id);
    loop {
        let job = { rx.lock().await.recv().await };
        match job {
            None | Some(Job::Shutdown) => break,
            Some(Job::Resolve(bucket)) => {
                process_bucket(&ctx, bucket).await;
                ctx.queue.job_finished();
            }
            Some(Job::LeafPage { address }) => {
                process_leaf_page(&ctx, &address).await;
                ctx.queue.job_finished();
            }
        }
    }
    tracing::debug!("Worker {} stopped", id);
}

/// Resolves one bucket: fetch, measure, then split or paginate
async fn process_bucket(ctx: &HarvestContext, bucket: Bucket) {
    tracing::info!("Resolving bucket [{}] at {}", bucket.describe(), bucket.address);

    let (indicator, body) =
        match resolve_indicator(&ctx.fetcher, &bucket.address, &ctx.policy).await {
            IndicatorResolution::Resolved { indicator, body } => (indicator, body),
            IndicatorResolution::Abandoned(reason) => {
                tracing::warn!(
                    "Abandoning bucket [{}] at {}: {}",
                    bucket.describe(),
                    bucket.address,
                    reason
                );
                ctx.counters.abandoned.fetch_add(1, Ordering::SeqCst);
                return;
            }
        };

    ctx.counters.buckets_resolved.fetch_add(1, Ordering::SeqCst);

    let depth = bucket.depth();
    let decision = decide(
        &indicator,
        depth,
        ctx.taxonomy.max_depth(),
        ctx.page_cap,
        ctx.count_cap,
    );

    match decision {
        Decision::Split => split_bucket(ctx, &bucket, &body),
        Decision::Leaf | Decision::TruncatedLeaf => {
            if decision == Decision::TruncatedLeaf {
                tracing::warn!(
                    "Bucket [{}] still overflows at maximum depth ({} records, {} pages); \
                     content beyond the page cap is unreachable",
                    bucket.describe(),
                    indicator.total_count,
                    indicator.total_page
                );
                ctx.counters.truncated_leaves.fetch_add(1, Ordering::SeqCst);
            }
            paginate_leaf(ctx, &bucket, indicator.total_page, indicator.total_count);
        }
    }
}

/// Produces one child bucket per code of the next unassigned dimension
fn split_bucket(ctx: &HarvestContext, bucket: &Bucket, body: &str) {
    let depth = bucket.depth();
    let Some(facet) = ctx.taxonomy.facet_at(depth) else {
        // decide() only splits below max_depth, so a missing facet would be
        // a taxonomy bug; drop the branch rather than the run
        tracing::error!("No facet at depth {} for [{}]", depth, bucket.describe());
        return;
    };

    // Area codes are not static: they are read once, from the filter panel
    // of the overflowing root view itself
    let discovered;
    let codes = if facet.dimension == Dimension::Area {
        discovered = {
            let doc = HtmlDocument::parse(body);
            discover_area_paths(&doc, &ctx.root_path)
        };
        if discovered.is_empty() {
            tracing::warn!(
                "No area filters found at {}; branch dropped",
                bucket.address
            );
            return;
        }
        &discovered
    } else {
        &facet.codes
    };

    match ctx.query.child_addresses(&bucket.address, facet, codes) {
        Ok(children) => {
            tracing::info!(
                "Splitting [{}] into {} {} children",
                bucket.describe(),
                children.len(),
                facet.dimension.name()
            );
            for (code, address) in children {
                if ctx.mark_scheduled(&address) {
                    ctx.queue
                        .submit(Job::Resolve(bucket.child(facet.dimension, code, address)));
                } else {
                    tracing::debug!("Address already scheduled, skipping: {}", address);
                }
            }
        }
        Err(e) => {
            // EmptyTaxonomyMatch: the branch is simply not produced; other
            // buckets are unaffected
            tracing::warn!("Cannot split [{}]: {}", bucket.describe(), e);
        }
    }
}

/// Submits one leaf-page job per enumerated page of a measured leaf
fn paginate_leaf(ctx: &HarvestContext, bucket: &Bucket, total_page: u32, total_count: u64) {
    ctx.counters.leaves.fetch_add(1, Ordering::SeqCst);

    let pages = QueryBuilder::page_addresses(&bucket.address, total_page, total_count);
    if pages.is_empty() {
        tracing::debug!("Leaf [{}] is empty, nothing to paginate", bucket.describe());
        return;
    }

    tracing::info!(
        "Leaf [{}]: {} pages ({} records)",
        bucket.describe(),
        pages.len(),
        total_count
    );
    for address in pages {
        // A single-page leaf re-fetches its own measured address for record
        // extraction; that re-issue intentionally bypasses the filter
        let bypass_filter = address == bucket.address;
        if bypass_filter || ctx.mark_scheduled(&address) {
            ctx.queue.submit(Job::LeafPage { address });
        } else {
            tracing::debug!("Page already scheduled, skipping: {}", address);
        }
    }
}

/// Fetches one leaf page and appends its records to the sink
async fn process_leaf_page(ctx: &HarvestContext, address: &str) {
    match resolve_content(&ctx.fetcher, address, &ctx.policy).await {
        ContentResolution::Abandoned(reason) => {
            tracing::warn!("Abandoning leaf page {}: {}", address, reason);
            ctx.counters.abandoned.fetch_add(1, Ordering::SeqCst);
        }
        ContentResolution::Content { body } => {
            ctx.counters.pages_fetched.fetch_add(1, Ordering::SeqCst);

            let records = extract_records_from_body(&body);
            tracing::debug!("Extracted {} records from {}", records.len(), address);

            for record in &records {
                if let Err(e) = ctx.sink.append(record) {
                    // A failed append loses one record, not the run
                    tracing::error!("Failed to append record from {}: {}", address, e);
                }
            }
            ctx.counters
                .records_collected
                .fetch_add(records.len() as u64, Ordering::SeqCst);
        }
    }
}

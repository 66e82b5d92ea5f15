//! Lianjia-Harvest main entry point
//!
//! Command-line interface for the capped-catalog harvester.

use clap::Parser;
use lianjia_harvest::config::load_config_with_hash;
use lianjia_harvest::crawler::run_harvest;
use lianjia_harvest::records::{dedup_sink_file, DedupOptions};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Lianjia-Harvest: exhaustive harvester for capped listing catalogs
///
/// Recursively partitions a catalog's query space by filter facets until
/// every sub-query fits under the origin's pagination cap, paginates each
/// leaf exactly once, and deduplicates the collected records afterwards.
#[derive(Parser, Debug)]
#[command(name = "lianjia-harvest")]
#[command(version = "1.0.0")]
#[command(about = "Exhaustive harvester for capped listing catalogs", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be harvested without fetching
    #[arg(long, conflicts_with_all = ["dedup_only", "skip_dedup"])]
    dry_run: bool,

    /// Run only the dedup pass over an existing sink file
    #[arg(long, conflicts_with = "skip_dedup")]
    dedup_only: bool,

    /// Harvest without the post-run dedup pass
    #[arg(long)]
    skip_dedup: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if cli.dry_run {
        handle_dry_run(&config, &config_hash);
        return Ok(());
    }

    if cli.dedup_only {
        return handle_dedup(&config);
    }

    match run_harvest(config.clone()).await {
        Ok(summary) => {
            println!("{}", summary);
        }
        Err(e) => {
            tracing::error!("Harvest failed: {}", e);
            return Err(e.into());
        }
    }

    if !cli.skip_dedup {
        handle_dedup(&config)?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("lianjia_harvest=info,warn"),
            1 => EnvFilter::new("lianjia_harvest=debug,info"),
            2 => EnvFilter::new("lianjia_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles --dry-run: validates config and echoes the harvest plan
fn handle_dry_run(config: &lianjia_harvest::config::Config, config_hash: &str) {
    println!("=== Lianjia-Harvest Dry Run ===\n");

    println!("Catalog:");
    println!("  Base URL: {}", config.catalog.base_url);
    println!("  Root path: {}", config.catalog.root_path);
    println!("  City: {}", config.catalog.city);

    println!("\nCrawler:");
    println!("  Concurrency: {}", config.crawler.concurrency);
    println!("  Request delay: {}ms", config.crawler.request_delay_ms);
    println!("  Redirect retries: {}", config.crawler.max_redirect_retries);
    println!(
        "  Missing-indicator retries: {}",
        config.crawler.max_missing_indicator_retries
    );
    println!(
        "  Overflow caps: {} pages / {} records",
        config.crawler.page_cap, config.crawler.count_cap
    );
    println!("  Proxies: {}", config.crawler.proxies.len());

    println!("\nOutput:");
    println!("  Sink: {}", config.output.sink_path);
    println!(
        "  Dedup description tokens: {}",
        config.output.dedup_description_tokens
    );

    println!("\n✓ Configuration is valid (hash: {})", config_hash);
    println!(
        "✓ Would start harvesting from {}{}",
        config.catalog.base_url, config.catalog.root_path
    );
}

/// Runs the offline dedup pass over the configured sink
fn handle_dedup(config: &lianjia_harvest::config::Config) -> anyhow::Result<()> {
    let options = DedupOptions {
        dedup_description_tokens: config.output.dedup_description_tokens,
    };

    let (stats, clean_path) = dedup_sink_file(Path::new(&config.output.sink_path), &options)?;
    println!(
        "Dedup: {} records in, {} out -> {}",
        stats.before,
        stats.after,
        clean_path.display()
    );
    Ok(())
}

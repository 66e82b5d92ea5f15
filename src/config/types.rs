use serde::Deserialize;

/// Main configuration structure for Lianjia-Harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub catalog: CatalogConfig,
    pub crawler: CrawlerConfig,
    pub output: OutputConfig,
}

/// Catalog instance configuration (one city)
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogConfig {
    /// Origin of the catalog, e.g. "https://sz.lianjia.com"
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Path of the unfiltered listing root, e.g. "/zufang/"
    #[serde(rename = "root-path", default = "default_root_path")]
    pub root_path: String,

    /// City code the catalog serves (bj | sh | gz | sz | ...).
    /// Shanghai exposes one extra price bucket.
    pub city: String,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Number of concurrently in-flight fetches
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,

    /// Minimum delay before each request on a connection (milliseconds)
    #[serde(rename = "request-delay-ms", default = "default_request_delay")]
    pub request_delay_ms: u64,

    /// Retries for a redirected response before accepting it as empty
    #[serde(rename = "max-redirect-retries", default = "default_redirect_retries")]
    pub max_redirect_retries: u32,

    /// Retries for a page missing its result-count indicator before the
    /// address is abandoned
    #[serde(
        rename = "max-missing-indicator-retries",
        default = "default_indicator_retries"
    )]
    pub max_missing_indicator_retries: u32,

    /// Page count at which the origin truncates a filtered view
    #[serde(rename = "page-cap", default = "default_page_cap")]
    pub page_cap: u32,

    /// Result count above which a filtered view cannot be fully paginated
    #[serde(rename = "count-cap", default = "default_count_cap")]
    pub count_cap: u64,

    /// Rotating proxy pool; empty means direct connections
    #[serde(default)]
    pub proxies: Vec<String>,

    /// User-agent header sent with every request
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path of the append-only JSON-lines record sink
    #[serde(rename = "sink-path")]
    pub sink_path: String,

    /// Whether the dedup pass also collapses repeated description tokens
    /// within each record
    #[serde(rename = "dedup-description-tokens", default = "default_true")]
    pub dedup_description_tokens: bool,
}

fn default_root_path() -> String {
    "/zufang/".to_string()
}

fn default_concurrency() -> u32 {
    2
}

fn default_request_delay() -> u64 {
    2000
}

fn default_redirect_retries() -> u32 {
    2
}

fn default_indicator_retries() -> u32 {
    10
}

fn default_page_cap() -> u32 {
    100
}

fn default_count_cap() -> u64 {
    3000
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/130.0.0.0 Safari/537.36"
        .to_string()
}

fn default_true() -> bool {
    true
}

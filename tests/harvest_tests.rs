//! Integration tests for the harvester
//!
//! These tests run the full coordinator against wiremock catalogs and check
//! the partition tree's shape through the requests it issues.

use lianjia_harvest::config::{CatalogConfig, Config, CrawlerConfig, OutputConfig};
use lianjia_harvest::crawler::run_harvest;
use lianjia_harvest::records::read_records;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_config(base_url: &str, sink_path: &str) -> Config {
    Config {
        catalog: CatalogConfig {
            base_url: base_url.to_string(),
            root_path: "/zufang/".to_string(),
            city: "sz".to_string(),
        },
        crawler: CrawlerConfig {
            concurrency: 2,
            request_delay_ms: 0, // No politeness delay against the mock
            max_redirect_retries: 2,
            max_missing_indicator_retries: 3,
            page_cap: 100,
            count_cap: 3000,
            proxies: vec![],
            user_agent: "TestHarvester/1.0".to_string(),
        },
        output: OutputConfig {
            sink_path: sink_path.to_string(),
            dedup_description_tokens: true,
        },
    }
}

fn sink_path(dir: &TempDir) -> String {
    dir.path().join("records.jsonl").display().to_string()
}

/// A results page with the given indicator and optional extra markup
fn results_page(total_count: u64, total_page: Option<u32>, extra: &str) -> String {
    let pagination = match total_page {
        Some(p) => format!(r#"<div class="content__pg" data-totalpage="{}"></div>"#, p),
        None => String::new(),
    };
    format!(
        r#"<html><body>
            <span class="content__title--hl">{}</span>
            {}
            {}
        </body></html>"#,
        total_count, pagination, extra
    )
}

/// The area filter panel as it appears on the catalog root
fn area_panel(paths: &[&str]) -> String {
    let items: String = std::iter::once(r#"<li><a href="/zufang/">不限</a></li>"#.to_string())
        .chain(
            paths
                .iter()
                .map(|p| format!(r#"<li><a href="{}">x</a></li>"#, p)),
        )
        .collect();
    format!(
        r#"<div class="filter"><ul data-target="area">{}</ul></div>"#,
        items
    )
}

fn listing_entry(title: &str, price: &str) -> String {
    format!(
        r#"<div class="content__list--item">
             <div class="content__list--item--main">
               <p class="content__list--item--title"><a class="twoline">{}</a></p>
               <p class="content__list--item--des">南山区 - <i>精装</i> / 60㎡</p>
               <p class="content__list--item--bottom oneline"><i>近地铁</i></p>
               <p class="content__list--item--brand oneline"><span class="brand">链家</span></p>
               <span class="content__list--item-price"><em>{}</em></span>
             </div>
           </div>"#,
        title, price
    )
}

fn listing_block(entries: &[String]) -> String {
    format!(
        r#"<div class="content__article"><div class="content__list">{}</div></div>"#,
        entries.join("\n")
    )
}

async fn count_requests_to(server: &MockServer, request_path: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.url.path() == request_path)
        .count()
}

#[tokio::test]
async fn test_overflowing_root_splits_into_discovered_areas() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    // Root overflows (page cap hit) and carries the area filter panel
    Mock::given(method("GET"))
        .and(path("/zufang/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(results_page(
            50000,
            Some(100),
            &area_panel(&["/zufang/areaa/", "/zufang/areab/"]),
        )))
        .mount(&server)
        .await;

    // Both areas fit under the cap with one page each
    for (area, title) in [("areaa", "甲"), ("areab", "乙")] {
        Mock::given(method("GET"))
            .and(path(format!("/zufang/{}/", area)))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(results_page(25, Some(1), "")),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("/zufang/{}/pg1/", area)))
            .respond_with(ResponseTemplate::new(200).set_body_string(results_page(
                25,
                Some(1),
                &listing_block(&[listing_entry(title, "3500")]),
            )))
            .mount(&server)
            .await;
    }

    let sink = sink_path(&dir);
    let summary = run_harvest(test_config(&server.uri(), &sink)).await.unwrap();

    assert_eq!(summary.buckets_resolved, 3); // root + 2 areas
    assert_eq!(summary.leaves, 2);
    assert_eq!(summary.pages_fetched, 2);
    assert_eq!(summary.records_collected, 2);
    assert_eq!(summary.abandoned_addresses, 0);

    let records = read_records(std::path::Path::new(&sink)).unwrap();
    let mut titles: Vec<&str> = records.iter().map(|r| r.title.as_str()).collect();
    titles.sort_unstable();
    assert_eq!(titles, vec!["乙", "甲"]);
}

#[tokio::test]
async fn test_overflowing_area_produces_exactly_one_child_per_price_code() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/zufang/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(results_page(
            50000,
            Some(100),
            &area_panel(&["/zufang/areaa/"]),
        )))
        .mount(&server)
        .await;

    // The area itself overflows by count
    Mock::given(method("GET"))
        .and(path("/zufang/areaa/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(results_page(4000, Some(99), "")))
        .mount(&server)
        .await;

    // All seven price buckets (city "sz") are empty leaves
    for i in 1..=7 {
        Mock::given(method("GET"))
            .and(path(format!("/zufang/areaa/rp{}/", i)))
            .respond_with(ResponseTemplate::new(200).set_body_string(results_page(0, Some(0), "")))
            .expect(1)
            .mount(&server)
            .await;
    }

    let summary = run_harvest(test_config(&server.uri(), &sink_path(&dir)))
        .await
        .unwrap();

    // Root + area + 7 price buckets, no more, no fewer
    assert_eq!(summary.buckets_resolved, 9);
    assert_eq!(summary.leaves, 7);
    // Empty leaves issue no page fetches
    assert_eq!(summary.pages_fetched, 0);
    assert_eq!(summary.records_collected, 0);
}

#[tokio::test]
async fn test_leaf_pagination_exactness() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/zufang/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(results_page(
            50000,
            Some(100),
            &area_panel(&["/zufang/areaa/"]),
        )))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/zufang/areaa/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(results_page(360, Some(12), "")))
        .expect(1)
        .mount(&server)
        .await;

    for i in 1..=12 {
        Mock::given(method("GET"))
            .and(path(format!("/zufang/areaa/pg{}/", i)))
            .respond_with(ResponseTemplate::new(200).set_body_string(results_page(
                360,
                Some(12),
                &listing_block(&[listing_entry(&format!("p{}", i), "3000")]),
            )))
            .expect(1)
            .mount(&server)
            .await;
    }

    let summary = run_harvest(test_config(&server.uri(), &sink_path(&dir)))
        .await
        .unwrap();

    assert_eq!(summary.leaves, 1);
    assert_eq!(summary.pages_fetched, 12);
    assert_eq!(summary.records_collected, 12);
    // Exactly pages 1..=12, no page 13
    assert_eq!(count_requests_to(&server, "/zufang/areaa/pg12/").await, 1);
    assert_eq!(count_requests_to(&server, "/zufang/areaa/pg13/").await, 0);
}

#[tokio::test]
async fn test_missing_indicator_abandons_after_exact_retry_bound() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    // The root never exposes an indicator
    Mock::given(method("GET"))
        .and(path("/zufang/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html><body></body></html>"))
        .mount(&server)
        .await;

    let summary = run_harvest(test_config(&server.uri(), &sink_path(&dir)))
        .await
        .unwrap();

    // max_missing_indicator_retries = 3 in the test config
    assert_eq!(count_requests_to(&server, "/zufang/").await, 3);
    assert_eq!(summary.buckets_resolved, 0);
    assert_eq!(summary.abandoned_addresses, 1);
    assert_eq!(summary.leaves, 0);
    assert_eq!(summary.records_collected, 0);
}

#[tokio::test]
async fn test_indicator_appearing_on_third_response_proceeds_normally() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    // Two broken responses, then a healthy single-page leaf
    Mock::given(method("GET"))
        .and(path("/zufang/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html><body></body></html>"))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/zufang/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(results_page(
            20,
            Some(1),
            "",
        )))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/zufang/pg1/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(results_page(
            20,
            Some(1),
            &listing_block(&[listing_entry("t", "2600")]),
        )))
        .mount(&server)
        .await;

    let summary = run_harvest(test_config(&server.uri(), &sink_path(&dir)))
        .await
        .unwrap();

    // Exactly 3 decision fetches to the root, then normal pagination
    assert_eq!(count_requests_to(&server, "/zufang/").await, 3);
    assert_eq!(summary.buckets_resolved, 1);
    assert_eq!(summary.leaves, 1);
    assert_eq!(summary.records_collected, 1);
}

#[tokio::test]
async fn test_single_page_leaf_without_page_count_refetches_own_address() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    // No pagination element at all, but a non-zero count: the leaf's own
    // address is fetched once more for extraction
    Mock::given(method("GET"))
        .and(path("/zufang/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(results_page(
            5,
            None,
            &listing_block(&[listing_entry("唯一", "1800")]),
        )))
        .expect(2)
        .mount(&server)
        .await;

    let summary = run_harvest(test_config(&server.uri(), &sink_path(&dir)))
        .await
        .unwrap();

    assert_eq!(summary.leaves, 1);
    assert_eq!(summary.pages_fetched, 1);
    assert_eq!(summary.records_collected, 1);
}

#[tokio::test]
async fn test_blocked_address_is_abandoned_without_retry() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/zufang/"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", "/captcha/verify"))
        .expect(1)
        .mount(&server)
        .await;

    let summary = run_harvest(test_config(&server.uri(), &sink_path(&dir)))
        .await
        .unwrap();

    assert_eq!(summary.abandoned_addresses, 1);
    assert_eq!(summary.buckets_resolved, 0);
    assert_eq!(summary.records_collected, 0);
}

#[tokio::test]
async fn test_abandoned_branch_does_not_affect_siblings() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/zufang/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(results_page(
            50000,
            Some(100),
            &area_panel(&["/zufang/bad/", "/zufang/good/"]),
        )))
        .mount(&server)
        .await;

    // One area never yields an indicator
    Mock::given(method("GET"))
        .and(path("/zufang/bad/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html><body></body></html>"))
        .mount(&server)
        .await;

    // Its sibling works fine
    Mock::given(method("GET"))
        .and(path("/zufang/good/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(results_page(10, Some(1), "")))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/zufang/good/pg1/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(results_page(
            10,
            Some(1),
            &listing_block(&[listing_entry("存活", "2000")]),
        )))
        .mount(&server)
        .await;

    let summary = run_harvest(test_config(&server.uri(), &sink_path(&dir)))
        .await
        .unwrap();

    assert_eq!(summary.abandoned_addresses, 1);
    assert_eq!(summary.records_collected, 1);
    assert_eq!(count_requests_to(&server, "/zufang/bad/").await, 3);
}

#[tokio::test]
async fn test_redirected_leaf_page_degrades_to_empty_content() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/zufang/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(results_page(30, Some(2), "")))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/zufang/pg1/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(results_page(
            30,
            Some(2),
            &listing_block(&[listing_entry("可达", "2200")]),
        )))
        .mount(&server)
        .await;

    // pg2 always redirects; after the retry bound it counts as an empty
    // page, not a failure
    Mock::given(method("GET"))
        .and(path("/zufang/pg2/"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", "/elsewhere/"))
        .expect(3) // initial attempt + 2 redirect retries
        .mount(&server)
        .await;

    let summary = run_harvest(test_config(&server.uri(), &sink_path(&dir)))
        .await
        .unwrap();

    assert_eq!(summary.abandoned_addresses, 0);
    assert_eq!(summary.pages_fetched, 2);
    assert_eq!(summary.records_collected, 1);
}

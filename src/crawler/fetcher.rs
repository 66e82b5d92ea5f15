//! HTTP fetcher with proxy rotation and transport retry
//!
//! Every outbound request draws a proxy uniformly at random from the
//! configured pool (reqwest binds a proxy to a client, so the pool is a set
//! of clients, one per proxy) and asks the far end to close the connection
//! after responding. Redirects are never followed; they are surfaced to the
//! resilience policy as outcomes. Connection-level failures are retried here
//! with a bounded backoff before being reported.

use crate::config::CrawlerConfig;
use rand::Rng;
use reqwest::header::{CONNECTION, LOCATION};
use reqwest::{redirect::Policy, Client, Proxy};
use std::time::Duration;

/// Transport-level retry bound; not configurable, the policy layer never
/// distinguishes these retries further
const TRANSPORT_RETRIES: u32 = 3;
const TRANSPORT_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Classified result of one address resolution at the transport level
#[derive(Debug)]
pub enum FetchOutcome {
    /// A content response; body may still lack indicators
    Content {
        /// Final URL as reported by the client
        final_url: String,
        /// Response body
        body: String,
    },

    /// The origin answered with a redirect instead of content
    Redirected {
        /// Redirect target, when the origin sent one
        location: Option<String>,
    },

    /// Anti-automation challenge detected; fatal for this address
    Blocked {
        /// The URL that exposed the challenge
        final_url: String,
    },

    /// Connection-level failure after exhausting transport retries
    TransportError {
        /// Error description
        error: String,
    },
}

/// Shared fetch layer for all workers
pub struct Fetcher {
    /// One client per proxy; a single direct client when the pool is empty.
    /// Invariant: never empty.
    clients: Vec<Client>,

    /// Minimum delay before each request on a connection
    request_delay: Duration,
}

impl Fetcher {
    pub fn new(config: &CrawlerConfig) -> Result<Self, reqwest::Error> {
        let mut clients = Vec::new();
        if config.proxies.is_empty() {
            clients.push(build_client(config, None)?);
        } else {
            for proxy in &config.proxies {
                clients.push(build_client(config, Some(proxy))?);
            }
        }

        Ok(Self {
            clients,
            request_delay: Duration::from_millis(config.request_delay_ms),
        })
    }

    /// Fetches one address and classifies the outcome.
    ///
    /// Retry of redirects and missing indicators is the policy layer's
    /// responsibility; only connection-level failures are retried here.
    pub async fn fetch(&self, address: &str) -> FetchOutcome {
        if !self.request_delay.is_zero() {
            tokio::time::sleep(self.request_delay).await;
        }

        let mut attempt = 0;
        loop {
            attempt += 1;

            let client = {
                let mut rng = rand::thread_rng();
                &self.clients[rng.gen_range(0..self.clients.len())]
            };

            let result = client
                .get(address)
                .header(CONNECTION, "close")
                .send()
                .await;

            match result {
                Ok(response) => {
                    let status = response.status();
                    let final_url = response.url().to_string();

                    if is_challenge_url(&final_url) {
                        return FetchOutcome::Blocked { final_url };
                    }

                    if status.is_redirection() {
                        let location = response
                            .headers()
                            .get(LOCATION)
                            .and_then(|v| v.to_str().ok())
                            .map(|v| v.to_string());

                        // A redirect straight into a challenge page is a
                        // block, not a retryable redirect
                        if location.as_deref().is_some_and(is_challenge_url) {
                            return FetchOutcome::Blocked { final_url };
                        }

                        return FetchOutcome::Redirected { location };
                    }

                    match response.text().await {
                        Ok(body) => {
                            return FetchOutcome::Content { final_url, body };
                        }
                        Err(e) => {
                            if attempt >= TRANSPORT_RETRIES {
                                return FetchOutcome::TransportError {
                                    error: e.to_string(),
                                };
                            }
                            tracing::warn!(
                                "Body read failed for {} (attempt {}): {}",
                                address,
                                attempt,
                                e
                            );
                        }
                    }
                }
                Err(e) => {
                    if attempt >= TRANSPORT_RETRIES {
                        return FetchOutcome::TransportError {
                            error: e.to_string(),
                        };
                    }
                    tracing::warn!("Request failed for {} (attempt {}): {}", address, attempt, e);
                }
            }

            tokio::time::sleep(TRANSPORT_RETRY_DELAY).await;
        }
    }
}

fn build_client(config: &CrawlerConfig, proxy: Option<&str>) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::none()) // Redirects are classified, not followed
        .gzip(true)
        .brotli(true);

    if let Some(proxy) = proxy {
        builder = builder.proxy(Proxy::all(proxy)?);
    }

    builder.build()
}

/// The origin redirects suspected automation to a captcha page
fn is_challenge_url(url: &str) -> bool {
    url.contains("captcha")
}

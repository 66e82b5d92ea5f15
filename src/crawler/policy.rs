//! Resilience policy: fetch-outcome classification and bounded retry
//!
//! Applied uniformly to partition-decision fetches and leaf-page fetches.
//! Blocked is fatal for the address. Redirects are retried a bounded number
//! of times, then the response is accepted as empty content rather than
//! failing the run. Decision fetches additionally retry the identical
//! address while its result-count indicator is missing, up to a bound, after
//! which the address is abandoned. Every failure stays scoped to its own
//! address; nothing here unwinds past it.

use crate::config::CrawlerConfig;
use crate::crawler::fetcher::{FetchOutcome, Fetcher};
use crate::crawler::indicator::{extract_indicator_from_body, Indicator};
use std::fmt;

/// Retry bounds for one catalog run
#[derive(Debug, Clone, Copy)]
pub struct ResiliencePolicy {
    /// Redirect retries before a response is accepted as empty content
    pub max_redirect_retries: u32,

    /// Missing-indicator retries before an address is abandoned
    pub max_missing_indicator_retries: u32,
}

impl ResiliencePolicy {
    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self {
            max_redirect_retries: config.max_redirect_retries,
            max_missing_indicator_retries: config.max_missing_indicator_retries,
        }
    }
}

/// Why an address was given up on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbandonReason {
    /// Anti-automation challenge; never retried
    Blocked,

    /// Connection-level failure after the transport layer's own retries
    Transport,

    /// The result-count indicator never appeared within the retry bound
    MissingIndicator,
}

impl fmt::Display for AbandonReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbandonReason::Blocked => write!(f, "blocked by anti-automation challenge"),
            AbandonReason::Transport => write!(f, "transport failure"),
            AbandonReason::MissingIndicator => write!(f, "indicator never present"),
        }
    }
}

/// Outcome of resolving one address to content
#[derive(Debug)]
pub enum ContentResolution {
    /// A body was obtained (possibly empty after redirect exhaustion)
    Content { body: String },

    /// The address was given up on
    Abandoned(AbandonReason),
}

/// Outcome of a partition-decision fetch
#[derive(Debug)]
pub enum IndicatorResolution {
    /// Indicator obtained; the body is kept for facet discovery
    Resolved { indicator: Indicator, body: String },

    /// The address was given up on
    Abandoned(AbandonReason),
}

/// Resolves one address to content, classifying each fetch outcome.
///
/// The redirect counter lives here, scoped to this one resolution; parallel
/// resolutions of other addresses count independently.
pub async fn resolve_content(
    fetcher: &Fetcher,
    address: &str,
    policy: &ResiliencePolicy,
) -> ContentResolution {
    let mut redirect_attempts = 0;

    loop {
        match fetcher.fetch(address).await {
            FetchOutcome::Content { body, .. } => {
                return ContentResolution::Content { body };
            }

            FetchOutcome::Blocked { final_url } => {
                tracing::warn!("Captcha challenge at {} (requested {})", final_url, address);
                return ContentResolution::Abandoned(AbandonReason::Blocked);
            }

            FetchOutcome::Redirected { location } => {
                if redirect_attempts < policy.max_redirect_retries {
                    redirect_attempts += 1;
                    tracing::info!(
                        "Redirect from {} (to {:?}), retrying ({}/{})",
                        address,
                        location,
                        redirect_attempts,
                        policy.max_redirect_retries
                    );
                    continue;
                }
                tracing::warn!(
                    "Still redirected after {} retries, accepting {} as empty",
                    policy.max_redirect_retries,
                    address
                );
                return ContentResolution::Content { body: String::new() };
            }

            FetchOutcome::TransportError { error } => {
                tracing::warn!("Transport failure for {}: {}", address, error);
                return ContentResolution::Abandoned(AbandonReason::Transport);
            }
        }
    }
}

/// Resolves a partition-decision address to its result-size indicator.
///
/// The identical address is re-fetched while the indicator is missing; the
/// once-only address filter is deliberately not consulted on these retries.
/// Exactly `max_missing_indicator_retries` fetches are issued in the
/// never-succeeds case.
pub async fn resolve_indicator(
    fetcher: &Fetcher,
    address: &str,
    policy: &ResiliencePolicy,
) -> IndicatorResolution {
    let max_attempts = policy.max_missing_indicator_retries.max(1);

    for attempt in 1..=max_attempts {
        match resolve_content(fetcher, address, policy).await {
            ContentResolution::Abandoned(reason) => {
                return IndicatorResolution::Abandoned(reason);
            }
            ContentResolution::Content { body } => match extract_indicator_from_body(&body) {
                Ok(indicator) => {
                    return IndicatorResolution::Resolved { indicator, body };
                }
                Err(_) if attempt < max_attempts => {
                    tracing::info!(
                        "Missing indicator at {}, retrying ({}/{})",
                        address,
                        attempt,
                        max_attempts
                    );
                }
                Err(_) => {}
            },
        }
    }

    tracing::warn!(
        "Giving up on {} after {} attempts without an indicator",
        address,
        max_attempts
    );
    IndicatorResolution::Abandoned(AbandonReason::MissingIndicator)
}

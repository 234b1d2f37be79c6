// src/fetch/mod.rs

use anyhow::{Context, Result};
use reqwest::{Client, Response};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, warn};

pub mod pdfs;
pub mod policies;

pub use pdfs::download_pdf;
pub use policies::{fetch_policies, parse_policy_links, Policy};

/// Retry settings shared by every outbound GET.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 500,
        }
    }
}

async fn get_core(client: &Client, url: &str, timeout: Duration) -> Result<Response> {
    debug!(%url, "GET");
    client
        .get(url)
        .timeout(timeout)
        .send()
        .await
        .with_context(|| format!("GET {} failed", url))?
        .error_for_status()
        .with_context(|| format!("Non-success status {}", url))
}

/// GET `url`, retrying transport errors and 5xx replies with exponential backoff.
/// 4xx replies fail immediately.
pub(crate) async fn get_with_retry(
    client: &Client,
    url: &str,
    timeout: Duration,
    retry: RetryPolicy,
) -> Result<Response> {
    let mut attempts = 0;
    loop {
        match get_core(client, url, timeout).await {
            Ok(resp) => return Ok(resp),
            Err(e) if attempts < retry.max_retries && is_transient(&e) => {
                attempts += 1;
                let backoff = backoff_ms(retry, attempts);
                warn!(%url, attempt = attempts, delay_ms = backoff, error = %e, "Retrying");
                sleep(Duration::from_millis(backoff)).await;
            }
            Err(e) => {
                error!(%url, error = %e, "GET failed");
                return Err(e);
            }
        }
    }
}

/// Delay before retry number `attempt` (1-based), saturating on large settings.
fn backoff_ms(retry: RetryPolicy, attempt: u32) -> u64 {
    let factor = 2u64.saturating_pow(attempt.saturating_sub(1));
    retry.initial_backoff_ms.saturating_mul(factor)
}

/// Connection failures and 5xx replies. A request that could not even be
/// built (bad URL) never succeeds on retry.
fn is_transient(err: &anyhow::Error) -> bool {
    match err.downcast_ref::<reqwest::Error>() {
        Some(e) if e.is_builder() => false,
        Some(e) => e.status().map_or(true, |s| s.is_server_error()),
        None => true,
    }
}

use anyhow::{Context, Result};
use reqwest::Client;
use std::time::Duration;
use tracing::{info, instrument};

use super::{get_with_retry, RetryPolicy};

/// Download the policy PDF at `url` into memory.
#[instrument(level = "info", skip(client, retry))]
pub async fn download_pdf(
    client: &Client,
    url: &str,
    timeout: Duration,
    retry: RetryPolicy,
) -> Result<Vec<u8>> {
    let resp = get_with_retry(client, url, timeout, retry)
        .await
        .context("Failed to download PDF")?;
    let bytes = resp
        .bytes()
        .await
        .with_context(|| format!("Failed to download PDF: reading body from {}", url))?;
    info!(bytes = bytes.len(), "downloaded");
    Ok(bytes.to_vec())
}

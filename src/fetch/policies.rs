use anyhow::{Context, Result};
use reqwest::Client;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use std::{collections::HashSet, time::Duration};
use tracing::{info, instrument, trace};
use url::Url;

use super::{get_with_retry, RetryPolicy};

/// A clinical coverage policy PDF linked from the listing page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    pub name: String,
    pub url: String,
}

/// Scrape the listing page at `source_url` and return every policy PDF link,
/// sorted by name.
#[instrument(level = "info", skip(client, retry))]
pub async fn fetch_policies(
    client: &Client,
    source_url: &str,
    timeout: Duration,
    retry: RetryPolicy,
) -> Result<Vec<Policy>> {
    let base = Url::parse(source_url).with_context(|| format!("parsing listing URL {}", source_url))?;
    let html = get_with_retry(client, source_url, timeout, retry)
        .await?
        .text()
        .await
        .with_context(|| format!("reading body from {}", source_url))?;

    let policies = parse_policy_links(&html, &base);
    info!(count = policies.len(), "found policy links");
    Ok(policies)
}

/// Pull policy download links out of the listing HTML.
/// - keeps `<a href>` whose href contains `/download`
/// - resolves it against `base` and requires `attachment` in the result
/// - first link wins per URL; links without text are dropped
pub fn parse_policy_links(html: &str, base: &Url) -> Vec<Policy> {
    let doc = Html::parse_document(html);
    let selector = Selector::parse("a[href]").expect("CSS selector for links should be valid");

    let mut seen = HashSet::new();
    let mut policies = Vec::new();
    for el in doc.select(&selector) {
        let Some(href) = el.value().attr("href") else {
            continue;
        };
        if !href.contains("/download") {
            continue;
        }
        let Ok(full) = base.join(href.trim()) else {
            trace!(href, "unresolvable link");
            continue;
        };
        let url = full.to_string();
        if !url.contains("attachment") || !seen.insert(url.clone()) {
            continue;
        }

        let name = el.text().collect::<String>().trim().to_string();
        if name.is_empty() {
            continue;
        }
        policies.push(Policy { name, url });
    }

    policies.sort_by(|a, b| a.name.cmp(&b.name));
    policies
}

use std::{env, str::FromStr, time::Duration};
use tracing::warn;

use crate::fetch::RetryPolicy;

pub const DEFAULT_SOURCE_URL: &str =
    "https://medicaid.ncdhhs.gov/providers/program-specific-clinical-coverage-policies";

/// Runtime settings, read once at startup from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// Listing page scraped for policy PDF links.
    pub source_url: String,
    pub listing_timeout: Duration,
    pub pdf_timeout: Duration,
    pub max_concurrent_downloads: usize,
    pub fetch_retries: u32,
    pub retry_backoff_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            source_url: DEFAULT_SOURCE_URL.to_string(),
            listing_timeout: Duration::from_secs(30),
            pdf_timeout: Duration::from_secs(60),
            max_concurrent_downloads: 3,
            fetch_retries: 3,
            retry_backoff_ms: 500,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; unparsable values keep their default.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let d = Self::default();
        Self {
            port: parse_or(&lookup, "PORT", d.port),
            source_url: lookup("SOURCE_URL")
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(d.source_url),
            listing_timeout: Duration::from_secs(parse_or(
                &lookup,
                "LISTING_TIMEOUT_SECS",
                d.listing_timeout.as_secs(),
            )),
            pdf_timeout: Duration::from_secs(parse_or(
                &lookup,
                "PDF_TIMEOUT_SECS",
                d.pdf_timeout.as_secs(),
            )),
            max_concurrent_downloads: parse_or(
                &lookup,
                "MAX_CONCURRENT_DOWNLOADS",
                d.max_concurrent_downloads,
            )
            .max(1),
            fetch_retries: parse_or(&lookup, "FETCH_RETRIES", d.fetch_retries),
            retry_backoff_ms: parse_or(&lookup, "RETRY_BACKOFF_MS", d.retry_backoff_ms),
        }
    }
}

impl From<&Config> for RetryPolicy {
    fn from(config: &Config) -> Self {
        Self {
            max_retries: config.fetch_retries,
            initial_backoff_ms: config.retry_backoff_ms,
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Copy + std::fmt::Debug,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(key, value = %raw, default = ?default, "invalid setting, using default");
            default
        }),
        None => default,
    }
}

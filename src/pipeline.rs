// src/pipeline.rs

use anyhow::{Context, Result};
use futures::{stream, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{info, instrument, warn};

use crate::{
    config::Config,
    extract::extract_tables,
    fetch::{download_pdf, Policy},
    process::{normalize, Extraction},
};

/// What came out of one selected policy document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentResult {
    pub name: String,
    pub url: String,
    #[serde(flatten)]
    pub outcome: Outcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    /// `headers` is `Code`, `Code Type`, then the document's other columns;
    /// every row is aligned with it.
    Success {
        #[serde(default)]
        headers: Vec<String>,
        #[serde(default)]
        rows: Vec<Vec<String>>,
    },
    NoTable,
    Error {
        error: String,
    },
}

impl DocumentResult {
    pub fn from_extraction(policy: &Policy, extraction: Extraction) -> Self {
        let outcome = match extraction {
            Extraction::Table(table) => Outcome::Success {
                headers: table.headers(),
                rows: table.grid(),
            },
            Extraction::NoTableFound => Outcome::NoTable,
        };
        Self {
            name: policy.name.clone(),
            url: policy.url.clone(),
            outcome,
        }
    }

    pub fn failed(policy: &Policy, err: &anyhow::Error) -> Self {
        Self {
            name: policy.name.clone(),
            url: policy.url.clone(),
            outcome: Outcome::Error {
                error: format!("{:#}", err),
            },
        }
    }
}

async fn download_and_normalize(client: &Client, config: &Config, url: &str) -> Result<Extraction> {
    let pdf = download_pdf(client, url, config.pdf_timeout, config.into()).await?;

    // pdf parsing is CPU-bound
    tokio::task::spawn_blocking(move || -> Result<Extraction> {
        let tables = extract_tables(&pdf)?;
        Ok(normalize(&tables))
    })
    .await
    .context("Failed to parse PDF: extraction task aborted")?
}

/// Download, parse and normalize one policy. Failures become an `error`
/// result for this document only.
#[instrument(level = "info", skip(client, config, policy), fields(name = %policy.name))]
pub async fn extract_document(client: &Client, config: &Config, policy: &Policy) -> DocumentResult {
    let start = Instant::now();
    match download_and_normalize(client, config, &policy.url).await {
        Ok(extraction) => {
            let result = DocumentResult::from_extraction(policy, extraction);
            match &result.outcome {
                Outcome::Success { rows, .. } => {
                    info!(rows = rows.len(), elapsed = ?start.elapsed(), "extracted")
                }
                _ => info!(elapsed = ?start.elapsed(), "no code table"),
            }
            result
        }
        Err(e) => {
            warn!(url = %policy.url, error = %format!("{:#}", e), "extraction failed");
            DocumentResult::failed(policy, &e)
        }
    }
}

/// Extract every policy, at most `max_concurrent_downloads` at a time,
/// returning results in the order the policies were given.
pub async fn extract_all(client: &Client, config: &Config, policies: &[Policy]) -> Vec<DocumentResult> {
    info!(count = policies.len(), "extracting policies");
    stream::iter(policies.iter().cloned())
        .map(move |policy| async move { extract_document(client, config, &policy).await })
        .buffered(config.max_concurrent_downloads.max(1))
        .collect()
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::RawTable;

    fn policy() -> Policy {
        Policy {
            name: "Policy 5A-1".into(),
            url: "https://example.org/media/1/download?attachment".into(),
        }
    }

    #[test]
    fn test_result_json_shape() {
        let tables = vec![RawTable::new(
            vec!["CPT/HCPCS Code".into(), "Description".into()],
            vec![vec!["99213\n99214".into(), "Office visit".into()]],
        )];
        let result = DocumentResult::from_extraction(&policy(), normalize(&tables));
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "name": "Policy 5A-1",
                "url": "https://example.org/media/1/download?attachment",
                "status": "success",
                "headers": ["Code", "Code Type", "Description"],
                "rows": [["99213", "CPT", "Office visit"], ["99214", "CPT", "Office visit"]]
            })
        );

        let back: DocumentResult = serde_json::from_value(json).unwrap();
        assert_eq!(back, result);
    }

    #[test]
    fn test_no_table_and_error_results() {
        let none = DocumentResult::from_extraction(&policy(), Extraction::NoTableFound);
        assert_eq!(serde_json::to_value(&none).unwrap()["status"], "no_table");

        let err = anyhow::anyhow!("connection reset").context("Failed to download PDF");
        let failed = DocumentResult::failed(&policy(), &err);
        assert_eq!(
            failed.outcome,
            Outcome::Error {
                error: "Failed to download PDF: connection reset".into()
            }
        );
    }

    #[test]
    fn test_lenient_result_input() {
        // shape posted back by older clients
        let posted = serde_json::json!({
            "name": "Policy 1A-1",
            "url": "",
            "status": "no_table",
            "headers": [],
            "rows": []
        });
        let result: DocumentResult = serde_json::from_value(posted).unwrap();
        assert_eq!(result.outcome, Outcome::NoTable);
    }

    #[tokio::test]
    async fn test_bad_url_becomes_error_result() {
        let client = Client::new();
        let config = Config {
            fetch_retries: 0,
            ..Config::default()
        };
        let bad = Policy {
            name: "Broken".into(),
            url: "not a url".into(),
        };
        let results = extract_all(&client, &config, &[bad]).await;
        assert_eq!(results.len(), 1);
        match &results[0].outcome {
            Outcome::Error { error } => assert!(error.starts_with("Failed to download PDF")),
            other => panic!("expected error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_results_keep_request_order() {
        use warp::{http::StatusCode, Filter};

        // later requests answer first
        let slow = warp::path!("slow" / u64).and_then(|ms: u64| async move {
            tokio::time::sleep(std::time::Duration::from_millis(ms)).await;
            Ok::<_, warp::Rejection>(warp::reply::with_status("gone", StatusCode::NOT_FOUND))
        });
        let (addr, server) = warp::serve(slow).bind_ephemeral(([127, 0, 0, 1], 0));
        tokio::spawn(server);

        let config = Config {
            fetch_retries: 0,
            max_concurrent_downloads: 2,
            ..Config::default()
        };
        let policies: Vec<Policy> = [300, 10, 150, 0]
            .iter()
            .enumerate()
            .map(|(i, ms)| Policy {
                name: format!("Policy {}", i),
                url: format!("http://{}/slow/{}", addr, ms),
            })
            .collect();

        let results = extract_all(&Client::new(), &config, &policies).await;
        let names: Vec<&str> = results.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Policy 0", "Policy 1", "Policy 2", "Policy 3"]);
        assert!(results
            .iter()
            .all(|r| matches!(r.outcome, Outcome::Error { .. })));
    }
}

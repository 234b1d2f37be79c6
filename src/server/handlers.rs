use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use std::time::Instant;
use tracing::{error, info, warn};
use warp::{
    http::StatusCode,
    hyper::body::Bytes,
    reject::Rejection,
    reply::{self, Reply, Response},
};

use super::context::AppContext;
use crate::{
    config::Config,
    export::{to_csv_string, CSV_FILENAME},
    fetch::{fetch_policies, Policy, RetryPolicy},
    pipeline::{extract_all, DocumentResult},
};

#[derive(Deserialize)]
struct PolicyInput {
    name: Option<String>,
    url: Option<String>,
}

impl From<PolicyInput> for Policy {
    fn from(input: PolicyInput) -> Self {
        Policy {
            name: input.name.unwrap_or_else(|| "Unknown".to_string()),
            url: input.url.unwrap_or_default(),
        }
    }
}

#[derive(Serialize)]
struct PoliciesResponse {
    policies: Vec<Policy>,
}

#[derive(Serialize)]
struct ExtractResponse {
    results: Vec<DocumentResult>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

fn error_reply(status: StatusCode, message: impl Into<String>) -> Response {
    reply::with_status(
        reply::json(&ErrorResponse {
            error: message.into(),
        }),
        status,
    )
    .into_response()
}

/// Pull `field` out of a JSON object body.
/// Missing body, bad JSON, missing or null field → "Missing '<field>' in request body".
fn required_field<T: DeserializeOwned>(body: &[u8], field: &str) -> Result<T, Response> {
    let missing = || {
        error_reply(
            StatusCode::BAD_REQUEST,
            format!("Missing '{}' in request body", field),
        )
    };
    let mut value: Value = serde_json::from_slice(body).map_err(|_| missing())?;
    let inner = match value.get_mut(field).map(Value::take) {
        Some(Value::Null) | None => return Err(missing()),
        Some(inner) => inner,
    };
    serde_json::from_value(inner).map_err(|e| {
        error_reply(
            StatusCode::BAD_REQUEST,
            format!("Invalid '{}' in request body: {}", field, e),
        )
    })
}

pub async fn health_check() -> Result<impl Reply, Rejection> {
    Ok(reply::json(&serde_json::json!({
        "status": "healthy",
        "service": "policycodes"
    })))
}

pub async fn list_policies(ctx: AppContext) -> Result<Response, Rejection> {
    let cfg: &Config = &ctx.config;
    match fetch_policies(
        &ctx.client,
        &cfg.source_url,
        cfg.listing_timeout,
        RetryPolicy::from(cfg),
    )
    .await
    {
        Ok(policies) => Ok(reply::json(&PoliciesResponse { policies }).into_response()),
        Err(e) => {
            warn!(error = %format!("{:#}", e), "policy listing failed");
            Ok(error_reply(
                StatusCode::BAD_GATEWAY,
                format!("Failed to fetch policy listing: {:#}", e),
            ))
        }
    }
}

pub async fn extract(body: Bytes, ctx: AppContext) -> Result<Response, Rejection> {
    let inputs: Vec<PolicyInput> = match required_field(&body, "policies") {
        Ok(inputs) => inputs,
        Err(resp) => return Ok(resp),
    };
    let policies: Vec<Policy> = inputs.into_iter().map(Policy::from).collect();

    let start = Instant::now();
    let results = extract_all(&ctx.client, &ctx.config, &policies).await;
    info!(
        documents = results.len(),
        elapsed = ?start.elapsed(),
        "extraction request done"
    );
    Ok(reply::json(&ExtractResponse { results }).into_response())
}

pub async fn export_csv(body: Bytes) -> Result<Response, Rejection> {
    let results: Vec<DocumentResult> = match required_field(&body, "results") {
        Ok(results) => results,
        Err(resp) => return Ok(resp),
    };

    match to_csv_string(&results) {
        Ok(csv) => {
            let resp = reply::with_header(csv, "content-type", "text/csv");
            let resp = reply::with_header(
                resp,
                "content-disposition",
                format!("attachment; filename={}", CSV_FILENAME),
            );
            Ok(resp.into_response())
        }
        Err(e) => {
            error!(error = %format!("{:#}", e), "CSV export failed");
            Ok(error_reply(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to build CSV: {:#}", e),
            ))
        }
    }
}

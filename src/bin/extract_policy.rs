use anyhow::{bail, Context, Result};
use chrono::Local;
use clap::Parser;
use policycodes::{
    config::Config,
    export::write_csv,
    fetch::{fetch_policies, Policy, RetryPolicy},
    pipeline::{extract_all, Outcome},
};
use reqwest::Client;
use std::{fs::File, io::BufWriter, path::PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Extract CPT/HCPCS code tables from Medicaid clinical coverage policy PDFs"
)]
struct Args {
    /// Policy PDF URL to extract; repeat for several documents
    #[arg(short, long = "url")]
    urls: Vec<String>,
    /// Also extract every listed policy whose name contains this text
    #[arg(short, long)]
    matching: Option<String>,
    /// Print the scraped policy listing as JSON and exit
    #[arg(long)]
    list: bool,
    /// CSV output path
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = Config::from_env();
    let client = Client::builder()
        .cookie_store(true)
        .gzip(true)
        .build()
        .context("building HTTP client")?;

    // 1) listing, when asked for or needed for --matching
    let listing = if args.list || args.matching.is_some() {
        fetch_policies(
            &client,
            &config.source_url,
            config.listing_timeout,
            RetryPolicy::from(&config),
        )
        .await
        .context("Failed to fetch policy listing")?
    } else {
        Vec::new()
    };
    if args.list {
        println!("{}", serde_json::to_string_pretty(&listing)?);
        return Ok(());
    }

    // 2) selection
    let mut policies: Vec<Policy> = args
        .urls
        .iter()
        .map(|u| Policy {
            name: u.clone(),
            url: u.clone(),
        })
        .collect();
    if let Some(needle) = &args.matching {
        let needle = needle.to_lowercase();
        policies.extend(
            listing
                .into_iter()
                .filter(|p| p.name.to_lowercase().contains(&needle)),
        );
    }
    if policies.is_empty() {
        bail!("nothing to extract: pass --url or a --matching filter that selects a policy");
    }

    // 3) extract + write
    let results = extract_all(&client, &config, &policies).await;
    let output = args.output.unwrap_or_else(|| {
        PathBuf::from(format!(
            "medicaid_code_tables_{}.csv",
            Local::now().format("%Y%m%d_%H%M%S")
        ))
    });
    let file = File::create(&output).with_context(|| format!("creating {}", output.display()))?;
    write_csv(&results, BufWriter::new(file))?;

    for result in &results {
        match &result.outcome {
            Outcome::Success { rows, .. } => info!(name = %result.name, rows = rows.len(), "ok"),
            Outcome::NoTable => info!(name = %result.name, "no table found"),
            Outcome::Error { error } => warn!(name = %result.name, %error, "failed"),
        }
    }
    info!("wrote {}", output.display());
    Ok(())
}

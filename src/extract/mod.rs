use anyhow::{Context, Result};
use tracing::{debug, instrument};

use crate::process::RawTable;

pub mod layout;

pub use layout::tables_from_text;

/// Read the text layer of an in-memory PDF and recover its tables.
/// CPU-bound; run it off the async executor.
#[instrument(level = "info", skip(pdf), fields(bytes = pdf.len()))]
pub fn extract_tables(pdf: &[u8]) -> Result<Vec<RawTable>> {
    let text = pdf_extract::extract_text_from_mem(pdf).context("Failed to parse PDF")?;
    let tables = tables_from_text(&text);
    debug!(tables = tables.len(), chars = text.len(), "recovered tables");
    Ok(tables)
}

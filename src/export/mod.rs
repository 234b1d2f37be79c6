// src/export/mod.rs

use anyhow::{Context, Result};
use csv::WriterBuilder;
use std::{collections::HashSet, io::Write};
use tracing::debug;

use crate::pipeline::{DocumentResult, Outcome};

pub const CSV_FILENAME: &str = "medicaid_code_tables.csv";
pub const NO_TABLE_MARKER: &str = "No table found";

const FIXED_HEADERS: [&str; 4] = ["Policy Name", "PDF URL", "Code", "Code Type"];

/// Union of every document's non-code columns, in first-seen order.
pub fn extra_columns(results: &[DocumentResult]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut columns = Vec::new();
    for result in results {
        if let Outcome::Success { headers, .. } = &result.outcome {
            for h in headers.iter().skip(2) {
                if seen.insert(h.as_str()) {
                    columns.push(h.clone());
                }
            }
        }
    }
    columns
}

/// Write all results as one flat CSV. Documents without a code table, and
/// documents that failed, get a single marker row.
pub fn write_csv<W: Write>(results: &[DocumentResult], writer: W) -> Result<()> {
    let extra = extra_columns(results);
    let width = FIXED_HEADERS.len() + extra.len();
    let mut wtr = WriterBuilder::new().from_writer(writer);

    let header: Vec<&str> = FIXED_HEADERS
        .iter()
        .copied()
        .chain(extra.iter().map(String::as_str))
        .collect();
    wtr.write_record(&header).context("writing CSV header")?;

    for result in results {
        let mut record = vec![String::new(); width];
        record[0] = result.name.clone();
        record[1] = result.url.clone();

        match &result.outcome {
            Outcome::Success { headers, rows } if !rows.is_empty() => {
                // position of each of this document's columns in the global layout
                let positions: Vec<Option<usize>> = headers
                    .iter()
                    .skip(2)
                    .map(|h| extra.iter().position(|e| e == h))
                    .collect();
                for row in rows {
                    let mut out = record.clone();
                    out[2] = row.first().cloned().unwrap_or_default();
                    out[3] = row.get(1).cloned().unwrap_or_default();
                    for (i, pos) in positions.iter().enumerate() {
                        if let (Some(pos), Some(value)) = (pos, row.get(i + 2)) {
                            out[FIXED_HEADERS.len() + pos] = value.clone();
                        }
                    }
                    wtr.write_record(&out)
                        .with_context(|| format!("writing row for {}", result.name))?;
                }
            }
            Outcome::Success { .. } | Outcome::NoTable => {
                record[2] = NO_TABLE_MARKER.to_string();
                wtr.write_record(&record)
                    .with_context(|| format!("writing marker for {}", result.name))?;
            }
            Outcome::Error { error } => {
                record[2] = format!("Error: {}", error);
                wtr.write_record(&record)
                    .with_context(|| format!("writing marker for {}", result.name))?;
            }
        }
    }

    wtr.flush().context("flushing CSV")?;
    debug!(documents = results.len(), columns = width, "wrote CSV");
    Ok(())
}

/// [`write_csv`] into an in-memory string.
pub fn to_csv_string(results: &[DocumentResult]) -> Result<String> {
    let mut buf = Vec::new();
    write_csv(results, &mut buf)?;
    String::from_utf8(buf).context("CSV output is not UTF-8")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn success(name: &str, headers: &[&str], rows: &[&[&str]]) -> DocumentResult {
        DocumentResult {
            name: name.into(),
            url: format!("https://example.org/{}", name),
            outcome: Outcome::Success {
                headers: headers.iter().map(|h| h.to_string()).collect(),
                rows: rows
                    .iter()
                    .map(|r| r.iter().map(|c| c.to_string()).collect())
                    .collect(),
            },
        }
    }

    #[test]
    fn test_global_columns_and_markers() -> Result<()> {
        let results = vec![
            success(
                "a",
                &["Code", "Code Type", "Description"],
                &[&["99213", "CPT", "Office visit"]],
            ),
            DocumentResult {
                name: "b".into(),
                url: "https://example.org/b".into(),
                outcome: Outcome::NoTable,
            },
            success(
                "c",
                &["Code", "Code Type", "Billing Unit", "Description"],
                &[&["E0100", "HCPCS", "1", "Cane"]],
            ),
            DocumentResult {
                name: "d".into(),
                url: "https://example.org/d".into(),
                outcome: Outcome::Error {
                    error: "Failed to download PDF: timeout".into(),
                },
            },
        ];

        let csv = to_csv_string(&results)?;
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(
            lines,
            vec![
                "Policy Name,PDF URL,Code,Code Type,Description,Billing Unit",
                "a,https://example.org/a,99213,CPT,Office visit,",
                "b,https://example.org/b,No table found,,,",
                "c,https://example.org/c,E0100,HCPCS,Cane,1",
                "d,https://example.org/d,Error: Failed to download PDF: timeout,,,",
            ]
        );
        Ok(())
    }

    #[test]
    fn test_success_without_rows_gets_marker() -> Result<()> {
        let results = vec![success("a", &["Code", "Code Type", "Description"], &[])];
        let csv = to_csv_string(&results)?;
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(
            lines,
            vec![
                "Policy Name,PDF URL,Code,Code Type,Description",
                "a,https://example.org/a,No table found,,",
            ]
        );
        Ok(())
    }

    #[test]
    fn test_multiline_values_are_quoted() -> Result<()> {
        let results = vec![success(
            "a",
            &["Code", "Code Type", "Notes"],
            &[&["86003", "CPT", "line one\nline two"]],
        )];
        let csv = to_csv_string(&results)?;
        assert!(csv.contains("\"line one\nline two\""));
        Ok(())
    }

    #[test]
    fn test_write_to_file() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join(CSV_FILENAME);
        let results = vec![success("a", &["Code", "Code Type"], &[&["T1015", "HCPCS"]])];
        write_csv(&results, fs::File::create(&path)?)?;

        let mut rdr = csv::Reader::from_path(&path)?;
        let records: Vec<csv::StringRecord> = rdr.records().collect::<Result<_, _>>()?;
        assert_eq!(records.len(), 1);
        assert_eq!(&records[0][2], "T1015");
        Ok(())
    }
}

//! Turns the raw tables of one policy document into a single flat list of
//! code rows: pick the code-bearing tables, split multi-code cells, classify
//! each code, merge the column sets and drop duplicate rows.

use std::collections::{BTreeMap, HashSet};
use tracing::{debug, trace};

use crate::process::{
    classify::{classify, CodeType},
    raw_table::RawTable,
    utils::{clean_header, fold_lines, split_values},
};

/// One billing code with the rest of its table row.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExtractedRow {
    pub code: String,
    pub code_type: CodeType,
    /// Every column of the document's unified column set; `""` where the
    /// originating table had no such column.
    pub fields: BTreeMap<String, String>,
}

impl ExtractedRow {
    pub fn get(&self, column: &str) -> &str {
        self.fields.get(column).map(String::as_str).unwrap_or("")
    }
}

/// All code rows of one document under a unified column set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodeTable {
    /// Non-code columns, in first-seen order across the document's tables.
    pub columns: Vec<String>,
    pub rows: Vec<ExtractedRow>,
}

impl CodeTable {
    pub const CODE_HEADER: &'static str = "Code";
    pub const CODE_TYPE_HEADER: &'static str = "Code Type";

    /// `Code`, `Code Type`, then the unified columns.
    pub fn headers(&self) -> Vec<String> {
        let mut headers = Vec::with_capacity(self.columns.len() + 2);
        headers.push(Self::CODE_HEADER.to_string());
        headers.push(Self::CODE_TYPE_HEADER.to_string());
        headers.extend(self.columns.iter().cloned());
        headers
    }

    /// Rows as string grids aligned with [`CodeTable::headers`].
    pub fn grid(&self) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|row| {
                let mut cells = Vec::with_capacity(self.columns.len() + 2);
                cells.push(row.code.clone());
                cells.push(row.code_type.to_string());
                cells.extend(self.columns.iter().map(|c| row.get(c).to_string()));
                cells
            })
            .collect()
    }
}

/// Outcome of normalizing one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    Table(CodeTable),
    /// None of the document's tables carried a usable code column.
    NoTableFound,
}

/// Where the code lives in a relevant table, and what the other columns are called.
struct TableLayout<'a> {
    table: &'a RawTable,
    code_col: usize,
    code_header: String,
    /// (column index, unique cleaned header) for every named non-code column.
    others: Vec<(usize, String)>,
}

impl<'a> TableLayout<'a> {
    /// `None` unless some header mentions "code" and none mentions ICD.
    fn detect(table: &'a RawTable) -> Option<Self> {
        let headers: Vec<String> = table.headers.iter().map(|h| clean_header(h)).collect();
        let lower: Vec<String> = headers.iter().map(|h| h.to_lowercase()).collect();

        if lower.iter().any(|h| h.contains("icd")) {
            trace!(headers = ?headers, "skipping ICD-10 table");
            return None;
        }
        let code_col = lower.iter().position(|h| h.contains("code"))?;

        // names already used in the output row, fixed columns included
        let mut taken: HashSet<String> = [CodeTable::CODE_HEADER, CodeTable::CODE_TYPE_HEADER]
            .iter()
            .map(|h| h.to_string())
            .collect();
        let mut others = Vec::new();
        for (i, h) in headers.iter().enumerate() {
            if i == code_col || h.is_empty() {
                continue;
            }
            let mut name = h.clone();
            let mut n = 1;
            while !taken.insert(name.clone()) {
                n += 1;
                name = format!("{} ({})", h, n);
            }
            others.push((i, name));
        }

        Some(Self {
            table,
            code_col,
            code_header: headers[code_col].clone(),
            others,
        })
    }

    /// One output row per code found in data row `row`.
    fn expand_row(&self, row: usize, columns: &[String]) -> Vec<ExtractedRow> {
        let codes = split_values(self.table.cell(row, self.code_col));
        let count = codes.len();

        codes
            .iter()
            .enumerate()
            .map(|(index, code)| {
                let mut fields: BTreeMap<String, String> =
                    columns.iter().map(|c| (c.clone(), String::new())).collect();
                for (col, name) in &self.others {
                    let value = aligned_value(self.table.cell(row, *col), index, count);
                    fields.insert(name.clone(), value);
                }
                ExtractedRow {
                    code: code.to_string(),
                    code_type: classify(code, &self.code_header),
                    fields,
                }
            })
            .collect()
    }
}

/// Value of a non-code cell for sub-row `index` out of `count` codes.
/// A single code keeps the whole cell; a single value repeats on every
/// sub-row; several values pair up with the codes by position.
fn aligned_value(cell: &str, index: usize, count: usize) -> String {
    if count <= 1 {
        return fold_lines(cell);
    }
    let values = split_values(cell);
    match values.len() {
        0 => String::new(),
        1 => values[0].to_string(),
        _ => values.get(index).map(|v| v.to_string()).unwrap_or_default(),
    }
}

/// Normalize every raw table of one document into a [`CodeTable`], or report
/// that none of them holds billing codes.
pub fn normalize(tables: &[RawTable]) -> Extraction {
    // 1) keep only the code-bearing, non-ICD tables
    let layouts: Vec<TableLayout> = tables.iter().filter_map(TableLayout::detect).collect();
    debug!(
        tables = tables.len(),
        relevant = layouts.len(),
        "selected code tables"
    );

    // 2) union of non-code columns, first-seen order
    let mut columns = Vec::new();
    let mut seen_cols = HashSet::new();
    for layout in &layouts {
        for (_, name) in &layout.others {
            if seen_cols.insert(name.as_str()) {
                columns.push(name.clone());
            }
        }
    }

    // 3) expand + dedupe in source order
    let mut rows = Vec::new();
    let mut seen_rows = HashSet::new();
    for layout in &layouts {
        for row in 0..layout.table.rows.len() {
            for extracted in layout.expand_row(row, &columns) {
                if seen_rows.insert(extracted.clone()) {
                    rows.push(extracted);
                }
            }
        }
    }

    if rows.is_empty() {
        return Extraction::NoTableFound;
    }
    debug!(rows = rows.len(), columns = columns.len(), "normalized document");
    Extraction::Table(CodeTable { columns, rows })
}

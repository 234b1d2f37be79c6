//! Table recovery from laid-out PDF text.
//!
//! Columns in the text are separated by runs of two or more spaces (or tabs).
//! The header line fixes where each column starts; later cells are placed in
//! the column whose start they line up with.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::trace;

use crate::process::RawTable;

static CELL_GAP: Lazy<Regex> = Lazy::new(|| Regex::new(r"\t+| {2,}").unwrap());

/// Slack, in characters, when matching a cell to a column start.
const ALIGN_TOLERANCE: usize = 2;

/// Text of one cell and the character column it starts at.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Cell {
    start: usize,
    text: String,
}

fn split_cells(line: &str) -> Vec<Cell> {
    let mut cells = Vec::new();
    let mut from = 0;
    for gap in CELL_GAP.find_iter(line) {
        push_cell(line, from, gap.start(), &mut cells);
        from = gap.end();
    }
    push_cell(line, from, line.len(), &mut cells);
    cells
}

fn push_cell(line: &str, from: usize, to: usize, cells: &mut Vec<Cell>) {
    let raw = &line[from..to];
    let text = raw.trim();
    if text.is_empty() {
        return;
    }
    let lead = raw.len() - raw.trim_start().len();
    cells.push(Cell {
        start: line[..from + lead].chars().count(),
        text: text.to_string(),
    });
}

fn append(cell: &mut String, text: &str, sep: char) {
    if !cell.is_empty() {
        cell.push(sep);
    }
    cell.push_str(text);
}

struct TableBuilder {
    starts: Vec<usize>,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl TableBuilder {
    fn start(cells: Vec<Cell>) -> Self {
        let starts = cells.iter().map(|c| c.start).collect();
        let headers = cells.into_iter().map(|c| c.text).collect();
        Self {
            starts,
            headers,
            rows: Vec::new(),
        }
    }

    fn column_for(&self, start: usize) -> usize {
        self.starts
            .iter()
            .rposition(|&s| s <= start + ALIGN_TOLERANCE)
            .unwrap_or(0)
    }

    /// A lone cell continues the table when it lines up with a column start
    /// and ends before the next column begins.
    fn is_continuation(&self, cell: &Cell) -> bool {
        if !self
            .starts
            .iter()
            .any(|&s| s.abs_diff(cell.start) <= ALIGN_TOLERANCE)
        {
            return false;
        }
        let col = self.column_for(cell.start);
        match self.starts.get(col + 1) {
            Some(&next) => cell.start + cell.text.chars().count() < next,
            None => true,
        }
    }

    fn repeats_header(&self, cells: &[Cell]) -> bool {
        cells.len() == self.headers.len()
            && cells.iter().zip(&self.headers).all(|(c, h)| c.text == *h)
    }

    fn push_row(&mut self, cells: Vec<Cell>) {
        let mut row = vec![String::new(); self.headers.len()];
        for cell in cells {
            let col = self.column_for(cell.start);
            append(&mut row[col], &cell.text, ' ');
        }
        self.rows.push(row);
    }

    /// Wrapped text: extends the last row, or the header while no row exists.
    fn continue_cell(&mut self, cell: Cell) {
        let col = self.column_for(cell.start);
        let target = match self.rows.last_mut() {
            Some(row) => row,
            None => &mut self.headers,
        };
        append(&mut target[col], &cell.text, '\n');
    }

    fn finish(self) -> Option<RawTable> {
        if self.rows.is_empty() {
            trace!(headers = ?self.headers, "dropping table without rows");
            return None;
        }
        Some(RawTable::new(self.headers, self.rows))
    }
}

/// Recover every table found in `text`, in reading order.
pub fn tables_from_text(text: &str) -> Vec<RawTable> {
    let mut tables = Vec::new();
    let mut current: Option<TableBuilder> = None;

    for line in text.lines() {
        if line.trim().is_empty() {
            continue;
        }
        let mut cells = split_cells(line);

        if let Some(table) = current.as_mut() {
            if cells.len() >= 2 {
                if !table.repeats_header(&cells) {
                    table.push_row(cells);
                }
                continue;
            }
            if table.is_continuation(&cells[0]) {
                table.continue_cell(cells.remove(0));
                continue;
            }
        }

        if let Some(done) = current.take().and_then(TableBuilder::finish) {
            tables.push(done);
        }
        if cells.len() >= 2 {
            current = Some(TableBuilder::start(cells));
        }
    }
    if let Some(done) = current.and_then(TableBuilder::finish) {
        tables.push(done);
    }

    tables
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_cells_positions() {
        let cells = split_cells("  E0100     Cane, adjustable   1");
        assert_eq!(
            cells,
            vec![
                Cell { start: 2, text: "E0100".into() },
                Cell { start: 12, text: "Cane, adjustable".into() },
                Cell { start: 31, text: "1".into() },
            ]
        );
    }

    #[test]
    fn test_recovers_table_with_continuations() {
        let text = "\
5.0 Billing Guidelines
The following codes are covered.

HCPCS Code   Description          Billing
                                  Unit
E0100        Cane, adjustable     1
E0105        Quad cane            1
E0110
E0130        Walker,              1
             rigid

Attachment B: Claims-Related Information
";
        let tables = tables_from_text(text);
        assert_eq!(tables.len(), 1);
        let t = &tables[0];
        assert_eq!(t.headers, vec!["HCPCS Code", "Description", "Billing\nUnit"]);
        assert_eq!(
            t.rows,
            vec![
                vec!["E0100", "Cane, adjustable", "1"],
                vec!["E0105\nE0110", "Quad cane", "1"],
                vec!["E0130", "Walker,\nrigid", "1"],
            ]
        );
    }

    #[test]
    fn test_repeated_page_header_is_skipped() {
        let text = "\
Code     Description
99213    Office visit
Code     Description
99214    Office visit
";
        let tables = tables_from_text(text);
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].rows.len(), 2);
    }

    #[test]
    fn test_prose_only_yields_nothing() {
        let text = "Policy 1A-1\nAcupuncture is covered when medically necessary.\n";
        assert!(tables_from_text(text).is_empty());
    }

    #[test]
    fn test_header_without_rows_is_dropped() {
        let text = "Revision   Date\nEnd of document.\n";
        assert!(tables_from_text(text).is_empty());
    }
}

/// A table as recovered from one page of a policy PDF, before any filtering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    /// Column names, from the first line of the table.
    /// Wrapped header text is joined with `\n`; callers clean it before use.
    pub headers: Vec<String>,
    /// Each data row, one String per cell. Rows may be shorter than `headers`.
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    pub fn width(&self) -> usize {
        self.headers.len()
    }

    /// Cell at (`row`, `col`), or `""` when the row is too short.
    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(String::as_str)
            .unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_rows_read_as_empty() {
        let table = RawTable::new(
            vec!["Code".into(), "Description".into(), "Notes".into()],
            vec![vec!["E0100".into()]],
        );
        assert_eq!(table.width(), 3);
        assert_eq!(table.cell(0, 0), "E0100");
        assert_eq!(table.cell(0, 2), "");
        assert_eq!(table.cell(5, 0), "");
    }
}

use once_cell::sync::Lazy;
use regex::Regex;

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// 1) Trim + collapse every whitespace run (line breaks included) into one space.
pub fn clean_header(raw: &str) -> String {
    WHITESPACE_RUN.replace_all(raw.trim(), " ").into_owned()
}

/// 2) Split a cell on line breaks, trimming each value and dropping empties.
pub fn split_values(cell: &str) -> Vec<&str> {
    cell.lines()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .collect()
}

/// 3) Fold a multi-line cell into a single line of text.
pub fn fold_lines(cell: &str) -> String {
    split_values(cell).join(" ")
}

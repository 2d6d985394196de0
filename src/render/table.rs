//! Pipe-table parsing and terminal rendering
//!
//! Markdown tables inside a message are parsed into [`TableData`] for two
//! consumers: the terminal renderer (via `prettytable`) and the spreadsheet
//! export. A line counts as a table row when it contains at least two pipe
//! characters; separator rows (`| --- | --- |`) are skipped.

use prettytable::{format, Cell, Row, Table};

/// A parsed pipe table: a header row plus zero or more data rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableData {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Cell characters that still count as numeric (currency, separators).
const NUMERIC_EXTRAS: &str = ",.$€£¥%";

/// Whether a cell should be right-aligned as numeric.
pub fn is_numeric_cell(cell: &str) -> bool {
    !cell.is_empty()
        && cell
            .chars()
            .all(|c| c.is_ascii_digit() || NUMERIC_EXTRAS.contains(c))
        && cell.chars().any(|c| c.is_ascii_digit())
}

fn is_table_row(line: &str) -> bool {
    line.matches('|').count() >= 2
}

fn is_separator_row(line: &str) -> bool {
    line.contains('-')
        && line
            .chars()
            .all(|c| c == '|' || c == '-' || c == ':' || c.is_whitespace())
}

fn split_cells(line: &str) -> Vec<String> {
    line.split('|')
        .map(str::trim)
        .filter(|cell| !cell.is_empty())
        .map(str::to_string)
        .collect()
}

/// Extract every pipe table from `text`, in order of appearance.
pub fn extract_tables(text: &str) -> Vec<TableData> {
    let mut tables = Vec::new();
    let mut current: Option<TableData> = None;

    for raw_line in text.lines() {
        let line = raw_line.trim();

        if is_table_row(line) && !is_separator_row(line) {
            let cells = split_cells(line);
            match current.as_mut() {
                None => {
                    current = Some(TableData {
                        headers: cells,
                        rows: Vec::new(),
                    })
                }
                Some(table) => table.rows.push(cells),
            }
        } else if is_separator_row(line) && current.is_some() {
            continue;
        } else if let Some(table) = current.take() {
            tables.push(table);
        }
    }

    if let Some(table) = current {
        tables.push(table);
    }
    tables
}

/// Render a parsed table for the terminal, right-aligning numeric cells.
pub fn render_table(table: &TableData) -> String {
    let mut rendered = Table::new();
    rendered.set_format(*format::consts::FORMAT_BOX_CHARS);

    rendered.set_titles(Row::new(
        table
            .headers
            .iter()
            .map(|h| Cell::new(h).style_spec("b"))
            .collect(),
    ));

    for row in &table.rows {
        rendered.add_row(Row::new(
            row.iter()
                .map(|cell| {
                    if is_numeric_cell(cell) {
                        Cell::new(cell).style_spec("r")
                    } else {
                        Cell::new(cell)
                    }
                })
                .collect(),
        ));
    }

    rendered.to_string()
}

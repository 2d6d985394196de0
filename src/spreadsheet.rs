//! Styled spreadsheet export of rendered tables
//!
//! Any pipe table in an assistant message can be exported as an `.xlsx`
//! workbook: bold white-on-blue header row with a fixed height, numeric
//! cells right-aligned and number-formatted, alternating row fill, thin
//! borders, width-fitted columns, and an autofilter over the full range.

use crate::error::{ChatwireError, Result};
use crate::render::table::TableData;
use chrono::{DateTime, Local};
use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder, Workbook};
use std::path::Path;

const HEADER_FILL: Color = Color::RGB(0x2F5496);
const EVEN_ROW_FILL: Color = Color::RGB(0xF2F7FC);
const GRID_COLOR: Color = Color::RGB(0xD0D0D0);

const MIN_COLUMN_WIDTH: f64 = 12.0;
const MAX_COLUMN_WIDTH: f64 = 40.0;
const HEADER_ROW_HEIGHT: f64 = 28.0;

/// Filename for a table export, stamped with the local time.
pub fn export_filename(now: DateTime<Local>) -> String {
    format!("QueryResults_{}.xlsx", now.format("%m-%d-%Y_%H%M%S"))
}

/// Write `table` to an `.xlsx` workbook at `path`.
pub fn write_table(table: &TableData, path: &Path) -> Result<()> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet
        .set_name("Query Results")
        .map_err(|e| ChatwireError::Storage(format!("worksheet setup failed: {}", e)))?;

    let header_format = Format::new()
        .set_bold()
        .set_font_name("Arial")
        .set_font_size(11)
        .set_font_color(Color::White)
        .set_background_color(HEADER_FILL)
        .set_align(FormatAlign::Center)
        .set_align(FormatAlign::VerticalCenter)
        .set_text_wrap()
        .set_border(FormatBorder::Thin)
        .set_border_color(Color::Black);

    let mut column_widths: Vec<f64> = table
        .headers
        .iter()
        .map(|h| MIN_COLUMN_WIDTH.max(h.chars().count() as f64))
        .collect();

    for (col, header) in table.headers.iter().enumerate() {
        worksheet
            .write_string_with_format(0, col as u16, header, &header_format)
            .map_err(|e| ChatwireError::Storage(format!("header write failed: {}", e)))?;
    }

    for (row_index, row) in table.rows.iter().enumerate() {
        let sheet_row = (row_index + 1) as u32;
        let even_row = sheet_row % 2 == 0;

        for (col, cell) in row.iter().enumerate() {
            if col >= column_widths.len() {
                column_widths.push(MIN_COLUMN_WIDTH);
            }
            column_widths[col] = column_widths[col].max(cell.chars().count() as f64);

            let numeric = cell.parse::<f64>().ok().filter(|n| n.is_finite());
            let format = cell_format(even_row, numeric.is_some(), cell);

            match numeric {
                Some(value) => worksheet
                    .write_number_with_format(sheet_row, col as u16, value, &format)
                    .map_err(|e| ChatwireError::Storage(format!("cell write failed: {}", e)))?,
                None => worksheet
                    .write_string_with_format(sheet_row, col as u16, cell, &format)
                    .map_err(|e| ChatwireError::Storage(format!("cell write failed: {}", e)))?,
            };
        }
    }

    for (col, width) in column_widths.iter().enumerate() {
        worksheet
            .set_column_width(col as u16, (width + 4.0).min(MAX_COLUMN_WIDTH))
            .map_err(|e| ChatwireError::Storage(format!("column width failed: {}", e)))?;
    }

    worksheet
        .set_row_height(0, HEADER_ROW_HEIGHT)
        .map_err(|e| ChatwireError::Storage(format!("row height failed: {}", e)))?;

    if !table.headers.is_empty() {
        worksheet
            .autofilter(
                0,
                0,
                table.rows.len() as u32,
                (table.headers.len() - 1) as u16,
            )
            .map_err(|e| ChatwireError::Storage(format!("autofilter failed: {}", e)))?;
    }

    workbook
        .save(path)
        .map_err(|e| ChatwireError::Storage(format!("workbook save failed: {}", e)))?;

    Ok(())
}

fn cell_format(even_row: bool, numeric: bool, cell: &str) -> Format {
    let mut format = Format::new()
        .set_font_name("Arial")
        .set_font_size(11)
        .set_align(FormatAlign::VerticalCenter)
        .set_border(FormatBorder::Thin)
        .set_border_color(GRID_COLOR)
        .set_background_color(if even_row { EVEN_ROW_FILL } else { Color::White });

    if numeric {
        format = format.set_align(FormatAlign::Right);
        // Decimals and large values get a price-style format.
        let price_like = cell.contains('.') || cell.parse::<f64>().map(|n| n > 100.0).unwrap_or(false);
        format = format.set_num_format(if price_like { "#,##0.00" } else { "#,##0" });
    } else {
        format = format.set_align(FormatAlign::Center);
    }

    format
}

//! Tabular file parsing for batch import.
//!
//! Delimited text goes through the `csv` crate; spreadsheet workbooks go
//! through `calamine`, reading the first sheet only. Both produce the same
//! [`ParsedTable`].

use std::collections::BTreeMap;
use std::io::Cursor;
use std::path::Path;

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use serde::{Deserialize, Serialize};

use crate::{AppError, Result};

const SPREADSHEET_EXTENSIONS: [&str; 5] = ["xlsx", "xlsm", "xlsb", "xls", "ods"];
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Offset from a zero-based data index to the row number a user sees:
/// one for the header row, one for 1-based counting.
pub const ROW_NUMBER_OFFSET: usize = 2;

/// A header row plus data rows, all cells as text.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParsedTable {
    /// Trimmed header cells, in file order.
    pub columns: Vec<String>,
    /// Data rows, each padded to the header width.
    pub rows: Vec<Vec<String>>,
    /// Source row number of each data row; the header is row 1.
    #[serde(default)]
    pub row_numbers: Vec<usize>,
}

impl ParsedTable {
    /// Number of data rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no data rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a header, matched exactly.
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Row number in the source file for the data row at `index`.
    ///
    /// Blank rows are dropped at parse time, so this is not always
    /// `index + 2`.
    #[must_use]
    pub fn row_number(&self, index: usize) -> usize {
        self.row_numbers
            .get(index)
            .copied()
            .unwrap_or(index + ROW_NUMBER_OFFSET)
    }

    fn push_row(&mut self, row_number: usize, mut cells: Vec<String>) {
        if cells.iter().all(|c| c.trim().is_empty()) {
            return;
        }
        cells.resize(self.columns.len().max(cells.len()), String::new());
        self.rows.push(cells);
        self.row_numbers.push(row_number);
    }
}

/// First rows of a table, for column mapping in the UI.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TablePreview {
    /// Header cells.
    pub columns: Vec<String>,
    /// Sample rows keyed by header.
    pub sample: Vec<BTreeMap<String, String>>,
    /// Data rows in the whole table.
    pub total_rows: usize,
}

/// Parse an uploaded file, choosing the reader by file extension.
///
/// Unknown or missing extensions are read as delimited text.
///
/// # Errors
///
/// Returns `AppError::Import` if the file cannot be parsed or has no
/// header row.
pub fn parse_table(filename: &str, bytes: &[u8]) -> Result<ParsedTable> {
    let extension = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    let table = match extension.as_deref() {
        Some(ext) if SPREADSHEET_EXTENSIONS.contains(&ext) => parse_spreadsheet(bytes)?,
        _ => parse_delimited(bytes)?,
    };

    if table.columns.iter().all(String::is_empty) {
        return Err(AppError::Import(format!("{filename}: missing header row")));
    }
    Ok(table)
}

/// Parse comma-delimited text with double-quote quoting.
///
/// # Errors
///
/// Returns `AppError::Import` on malformed input.
pub fn parse_delimited(bytes: &[u8]) -> Result<ParsedTable> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);

    let mut table = ParsedTable {
        columns: reader.headers()?.iter().map(|h| h.trim().to_owned()).collect(),
        ..ParsedTable::default()
    };
    for (index, record) in reader.records().enumerate() {
        let record = record?;
        // The reader skips empty lines, so its line position is the file row.
        let row_number = record
            .position()
            .and_then(|p| usize::try_from(p.line()).ok())
            .unwrap_or(index + ROW_NUMBER_OFFSET);
        table.push_row(row_number, record.iter().map(str::to_owned).collect());
    }
    Ok(table)
}

/// Parse the first sheet of a spreadsheet workbook.
///
/// # Errors
///
/// Returns `AppError::Import` if the workbook cannot be opened or has no
/// sheets.
pub fn parse_spreadsheet(bytes: &[u8]) -> Result<ParsedTable> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))?;
    let first = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| AppError::Import("workbook has no sheets".into()))?;
    let range = workbook.worksheet_range(&first)?;

    // The used range may begin below the first sheet row.
    let header_row = range
        .start()
        .and_then(|(row, _)| usize::try_from(row).ok())
        .unwrap_or(0)
        + 1;
    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return Ok(ParsedTable::default());
    };
    let mut table = ParsedTable {
        columns: header.iter().map(|c| cell_to_string(c).trim().to_owned()).collect(),
        ..ParsedTable::default()
    };
    for (offset, row) in rows.enumerate() {
        table.push_row(header_row + offset + 1, row.iter().map(cell_to_string).collect());
    }
    Ok(table)
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        // Phone numbers typed into a spreadsheet arrive as floats.
        #[allow(clippy::float_cmp)]
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{f:.0}"),
        other => other.to_string(),
    }
}

/// Header plus up to `limit` sample rows.
#[must_use]
pub fn preview(table: &ParsedTable, limit: usize) -> TablePreview {
    let sample = table
        .rows
        .iter()
        .take(limit)
        .map(|row| {
            table
                .columns
                .iter()
                .zip(row)
                .map(|(column, value)| (column.clone(), value.clone()))
                .collect()
        })
        .collect();

    TablePreview {
        columns: table.columns.clone(),
        sample,
        total_rows: table.len(),
    }
}

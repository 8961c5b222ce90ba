use std::io::Cursor;

use calamine::{Data, DataType, Reader, Xlsx};
use csv::ReaderBuilder;

use crate::error::RosterError;

/// A spreadsheet-shaped table: one header row plus string cells.
///
/// Both upload formats normalize into this before any business logic runs,
/// so header variance and cell typing stay out of the reconciler.
#[derive(Debug, Clone, Default)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    /// Builds a table from pre-structured cells. Used by callers that
    /// already hold rows (report building, tests).
    pub fn from_rows<S: Into<String>>(headers: Vec<S>, rows: Vec<Vec<S>>) -> Table {
        Table {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: rows
                .into_iter()
                .map(|row| row.into_iter().map(Into::into).collect())
                .collect(),
        }
    }

    /// Reads a delimited-text table.
    pub fn from_csv(bytes: &[u8]) -> Result<Table, RosterError> {
        let mut reader = ReaderBuilder::new().flexible(true).from_reader(bytes);
        let headers = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();
        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            rows.push(record.iter().map(|c| c.trim().to_string()).collect());
        }
        Ok(Table { headers, rows })
    }

    /// Reads the first worksheet of an `.xlsx` workbook.
    pub fn from_xlsx(bytes: &[u8]) -> Result<Table, RosterError> {
        let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes))
            .map_err(|e| RosterError::Spreadsheet(e.to_string()))?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| RosterError::Spreadsheet("workbook has no worksheets".to_string()))?
            .map_err(|e| RosterError::Spreadsheet(e.to_string()))?;
        let mut cell_rows = range.rows();
        let headers = match cell_rows.next() {
            Some(row) => row.iter().map(cell_to_string).collect(),
            None => Vec::new(),
        };
        let rows = cell_rows
            .map(|row| row.iter().map(cell_to_string).collect())
            .collect();
        Ok(Table { headers, rows })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, index: usize) -> &[String] {
        &self.rows[index]
    }

    /// Index of an exactly named column.
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Index of the first column matching any of the given names,
    /// compared case-insensitively.
    pub fn column_any(&self, names: &[&str]) -> Option<usize> {
        self.headers
            .iter()
            .position(|h| names.iter().any(|n| h.eq_ignore_ascii_case(n)))
    }

    /// Cell content; empty string for ragged rows and out-of-range columns.
    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(String::as_str)
            .unwrap_or("")
    }
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Int(n) => n.to_string(),
        // Counts arrive as floats from spreadsheets; render 2.0 as "2".
        Data::Float(f) if f.fract() == 0.0 => format!("{}", *f as i64),
        Data::Float(f) => f.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(_) | Data::DateTimeIso(_) => cell
            .as_datetime()
            .map(|dt| dt.date().format("%Y-%m-%d").to_string())
            .unwrap_or_default(),
        Data::DurationIso(s) => s.clone(),
        Data::Error(_) => String::new(),
    }
}

/// An uploaded file held fully in memory.
///
/// Buffering the bytes instead of spooling to a temp file means there is
/// nothing to clean up on any exit path.
#[derive(Debug, Clone)]
pub struct Upload {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Upload {
        Upload {
            filename: filename.into(),
            bytes,
        }
    }

    pub fn is_spreadsheet(&self) -> bool {
        self.filename.to_ascii_lowercase().ends_with(".xlsx")
    }

    pub fn is_delimited_text(&self) -> bool {
        self.filename.to_ascii_lowercase().ends_with(".csv")
    }

    /// Parses an upload that must be the binary spreadsheet format.
    pub fn spreadsheet_table(&self) -> Result<Table, RosterError> {
        if !self.is_spreadsheet() {
            return Err(RosterError::unsupported_format(&self.filename));
        }
        Table::from_xlsx(&self.bytes)
    }

    /// Parses a roster upload, which may be a spreadsheet or delimited text.
    pub fn roster_table(&self) -> Result<Table, RosterError> {
        if self.is_spreadsheet() {
            Table::from_xlsx(&self.bytes)
        } else if self.is_delimited_text() {
            Table::from_csv(&self.bytes)
        } else {
            Err(RosterError::unsupported_format(&self.filename))
        }
    }
}

//! Uploaded spreadsheets and CSV exports, reduced to a header row plus string
//! cells. Every report builder reads from a [`RecordTable`].

mod cells;
pub mod dates;

use std::io::{Cursor, Read};
use std::path::Path;

/// File formats accepted for uploads and downloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Csv,
    Spreadsheet,
}

impl SourceFormat {
    /// Picks a format from a file name; anything that is not `.csv` is handed
    /// to the spreadsheet reader, which sniffs xls/xlsx/ods itself.
    pub fn from_file_name(name: &str) -> Self {
        if name.trim().to_ascii_lowercase().ends_with(".csv") {
            Self::Csv
        } else {
            Self::Spreadsheet
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TableError {
    #[error("failed to read table: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid CSV data: {0}")]
    Csv(#[from] csv::Error),
    #[error("invalid spreadsheet: {0}")]
    Spreadsheet(String),
    #[error("spreadsheet has no worksheets")]
    NoWorksheet,
    #[error("missing columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    /// Source line of each row; the header is line 1 unless a title row
    /// sat above it.
    lines: Vec<usize>,
}

/// A grid row tagged with its line in the source file.
type NumberedRow = (usize, Vec<String>);

impl RecordTable {
    /// Builds a table, trimming headers and padding short rows so every row
    /// has one cell per header. Rows are numbered from line 2.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let numbered = rows.into_iter().enumerate().map(|(idx, row)| (idx + 2, row));
        Self::from_numbered(headers, numbered)
    }

    fn from_numbered(headers: Vec<String>, rows: impl IntoIterator<Item = NumberedRow>) -> Self {
        let headers: Vec<String> = headers.into_iter().map(|h| h.trim().to_string()).collect();
        let width = headers.len();
        let (lines, rows) = rows
            .into_iter()
            .filter(|(_, row)| row.iter().any(|cell| !cell.trim().is_empty()))
            .map(|(line, mut row)| {
                row.resize(width, String::new());
                (line, row)
            })
            .unzip();
        Self {
            headers,
            rows,
            lines,
        }
    }

    /// Builds a table from raw grid rows, the first of which is line 1.
    pub fn from_grid(grid: Vec<Vec<String>>) -> Self {
        Self::from_numbered_grid(
            grid.into_iter()
                .enumerate()
                .map(|(idx, row)| (idx + 1, row))
                .collect(),
        )
    }

    /// A first row holding at most one non-blank cell, above a wider row, is
    /// a title and gives way to the real header. Columns without a header
    /// are dropped, so a blank index header (`,Name,Date/Time`) only loses
    /// the index column.
    fn from_numbered_grid(mut grid: Vec<NumberedRow>) -> Self {
        if grid.is_empty() {
            return Self::default();
        }

        let filled = |row: &[String]| row.iter().filter(|cell| !cell.trim().is_empty()).count();
        if grid.len() > 1 {
            let (title, next) = (filled(&grid[0].1[..]), filled(&grid[1].1[..]));
            if title <= 1 && next > title {
                grid.remove(0);
            }
        }

        let mut rows = grid.into_iter();
        let (_, header) = rows.next().unwrap_or_default();
        let keep: Vec<usize> = header
            .iter()
            .enumerate()
            .filter(|(_, name)| !name.trim().is_empty())
            .map(|(idx, _)| idx)
            .collect();

        let headers = keep.iter().map(|idx| header[*idx].clone()).collect();
        let rows = rows.map(|(line, row)| {
            let cells = keep
                .iter()
                .map(|idx| row.get(*idx).cloned().unwrap_or_default())
                .collect();
            (line, cells)
        });

        Self::from_numbered(headers, rows)
    }

    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self, TableError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut grid = Vec::new();
        for (idx, record) in csv_reader.records().enumerate() {
            let record = record?;
            let line = record
                .position()
                .map_or(idx + 1, |position| position.line() as usize);
            grid.push((
                line,
                record
                    .iter()
                    .map(|cell| cell.trim_start_matches('\u{feff}').to_string())
                    .collect(),
            ));
        }

        Ok(Self::from_numbered_grid(grid))
    }

    pub fn from_spreadsheet_bytes(bytes: Vec<u8>) -> Result<Self, TableError> {
        let grid = cells::first_sheet_grid(Cursor::new(bytes))?;
        Ok(Self::from_grid(grid))
    }

    pub fn from_bytes(bytes: Vec<u8>, format: SourceFormat) -> Result<Self, TableError> {
        match format {
            SourceFormat::Csv => Self::from_csv_reader(Cursor::new(bytes)),
            SourceFormat::Spreadsheet => Self::from_spreadsheet_bytes(bytes),
        }
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, TableError> {
        let path = path.as_ref();
        let format = SourceFormat::from_file_name(&path.to_string_lossy());
        let bytes = std::fs::read(path)?;
        Self::from_bytes(bytes, format)
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of the column whose trimmed header equals `name`.
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|header| header == name.trim())
    }

    /// Index of the first column whose header satisfies `predicate`.
    pub fn find_column(&self, predicate: impl Fn(&str) -> bool) -> Option<usize> {
        self.headers.iter().position(|header| predicate(header))
    }

    pub fn require_columns(&self, names: &[&str]) -> Result<Vec<usize>, TableError> {
        let mut found = Vec::with_capacity(names.len());
        let mut missing = Vec::new();
        for name in names {
            match self.column(name) {
                Some(idx) => found.push(idx),
                None => missing.push((*name).to_string()),
            }
        }

        if missing.is_empty() {
            Ok(found)
        } else {
            Err(TableError::MissingColumns(missing))
        }
    }

    /// Cell text, or `""` when the column is absent.
    pub fn cell(&self, row: usize, column: Option<usize>) -> &str {
        column
            .and_then(|idx| self.rows.get(row).and_then(|cells| cells.get(idx)))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Source line of a row, header counted as line 1.
    pub fn line(&self, row: usize) -> usize {
        self.lines.get(row).copied().unwrap_or(row + 2)
    }

    /// Copy of the table keeping only rows that satisfy `predicate`.
    pub fn filter_rows(&self, predicate: impl Fn(&[String]) -> bool) -> Self {
        let keep: Vec<usize> = (0..self.rows.len())
            .filter(|idx| predicate(self.rows[*idx].as_slice()))
            .collect();
        self.select_rows(&keep)
    }

    /// Copy of the table holding the rows at `indices`, in that order.
    pub fn select_rows(&self, indices: &[usize]) -> Self {
        let (lines, rows) = indices
            .iter()
            .filter_map(|idx| Some((self.line(*idx), self.rows.get(*idx)?.clone())))
            .unzip();
        Self {
            headers: self.headers.clone(),
            rows,
            lines,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_headers_are_trimmed_and_blank_rows_skipped() {
        let table = RecordTable::from_csv_reader(Cursor::new(
            "\u{feff} Name , Date/Time \nAlice,2026-01-05 09:00\n,\nBob,2026-01-05 09:10\n",
        ))
        .expect("csv parses");
        assert_eq!(table.headers(), &["Name".to_string(), "Date/Time".to_string()]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.cell(1, table.column("Name")), "Bob");
    }

    #[test]
    fn title_row_above_header_is_skipped() {
        let table = RecordTable::from_csv_reader(Cursor::new(
            ",Application Report,\nStatus,Application Owner,\nIn Progress,Asha,\n",
        ))
        .expect("csv parses");
        assert_eq!(
            table.headers(),
            &["Status".to_string(), "Application Owner".to_string()]
        );
        assert_eq!(table.cell(0, Some(1)), "Asha");
    }

    #[test]
    fn blank_index_header_keeps_the_named_columns() {
        let table = RecordTable::from_csv_reader(Cursor::new(
            ",Name,Date/Time\n0,Alice,05/01/2026 09:00\n1,Alice,05/01/2026 18:00\n",
        ))
        .expect("csv parses");
        assert_eq!(table.headers(), &["Name".to_string(), "Date/Time".to_string()]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.cell(1, table.column("Date/Time")), "05/01/2026 18:00");
    }

    #[test]
    fn single_column_table_keeps_its_header() {
        let table =
            RecordTable::from_csv_reader(Cursor::new("Client Name\nAsha\n")).expect("csv parses");
        assert_eq!(table.headers(), &["Client Name".to_string()]);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn lines_survive_blank_rows_and_filtering() {
        let table = RecordTable::from_csv_reader(Cursor::new(
            "Name,Date/Time\nAlice,2026-01-05 09:00\n,\nBob,soon\n",
        ))
        .expect("csv parses");
        assert_eq!(table.len(), 2);
        assert_eq!(table.line(0), 2);
        assert_eq!(table.line(1), 4);

        let bob = table.filter_rows(|row| row[0] == "Bob");
        assert_eq!(bob.line(0), 4);
        assert_eq!(table.select_rows(&[1, 0]).line(1), 2);
    }

    #[test]
    fn title_row_shifts_line_numbers() {
        let table = RecordTable::from_csv_reader(Cursor::new(
            ",Application Report,\nStatus,Application Owner,\nIn Progress,Asha,\n",
        ))
        .expect("csv parses");
        assert_eq!(table.line(0), 3);
    }

    #[test]
    fn short_rows_are_padded() {
        let table = RecordTable::from_csv_reader(Cursor::new("A,B,C\n1\n")).expect("csv parses");
        assert_eq!(table.rows()[0], vec!["1".to_string(), String::new(), String::new()]);
    }

    #[test]
    fn require_columns_lists_every_missing_name() {
        let table = RecordTable::new(vec!["Status".into()], vec![]);
        let err = table
            .require_columns(&["Status", "Workflow Name", "Application Owner"])
            .expect_err("missing");
        assert_eq!(
            err.to_string(),
            "missing columns: Workflow Name, Application Owner"
        );
    }

    #[test]
    fn format_is_picked_from_extension() {
        assert_eq!(SourceFormat::from_file_name("punches.CSV"), SourceFormat::Csv);
        assert_eq!(
            SourceFormat::from_file_name("punches.xlsx"),
            SourceFormat::Spreadsheet
        );
    }
}

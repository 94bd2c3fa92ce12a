use super::TableError;
use calamine::{open_workbook_auto_from_rs, Data, Reader};
use std::io::{Read, Seek};

/// Reads the first worksheet of an xls/xlsx/ods workbook into string cells.
pub(super) fn first_sheet_grid<RS>(source: RS) -> Result<Vec<Vec<String>>, TableError>
where
    RS: Read + Seek + Clone,
{
    let mut workbook = open_workbook_auto_from_rs(source)
        .map_err(|err| TableError::Spreadsheet(err.to_string()))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or(TableError::NoWorksheet)?
        .map_err(|err| TableError::Spreadsheet(err.to_string()))?;

    Ok(range
        .rows()
        .map(|row| row.iter().map(cell_to_string).collect())
        .collect())
}

/// Excel dates become ISO text so they go through the same parser as CSV.
fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(n) => n.to_string(),
        Data::Float(f) => format!("{}", f),
        Data::Bool(b) => b.to_string(),
        Data::Error(e) => format!("#ERR({:?})", e),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(|value| value.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| dt.as_f64().to_string()),
        Data::DateTimeIso(s) => s.replacen('T', " ", 1),
        Data::DurationIso(s) => s.clone(),
    }
}

use super::RenderError;
use rust_xlsxwriter::{Format, FormatBorder, Workbook};

#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(f64),
    Bool(bool),
    Empty,
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<u32> for CellValue {
    fn from(value: u32) -> Self {
        Self::Number(value as f64)
    }
}

impl From<usize> for CellValue {
    fn from(value: usize) -> Self {
        Self::Number(value as f64)
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<Option<String>> for CellValue {
    fn from(value: Option<String>) -> Self {
        value.map(Self::Text).unwrap_or(Self::Empty)
    }
}

/// A named worksheet: header row followed by data rows.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkbookSheet {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl WorkbookSheet {
    pub fn new<H, S>(name: impl Into<String>, headers: H) -> Self
    where
        H: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn with_rows(mut self, rows: impl IntoIterator<Item = Vec<CellValue>>) -> Self {
        self.rows.extend(rows);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Renders sheets into an in-memory `.xlsx`, one worksheet per entry in order.
pub fn render_workbook(sheets: &[WorkbookSheet]) -> Result<Vec<u8>, RenderError> {
    if sheets.is_empty() {
        return Err(RenderError::NoSheets);
    }

    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold().set_border(FormatBorder::Thin);

    for sheet in sheets {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(&sheet.name)?;

        for (col, header) in sheet.headers.iter().enumerate() {
            worksheet.write_string_with_format(0, col as u16, header, &header_format)?;
        }

        for (idx, row) in sheet.rows.iter().enumerate() {
            let row_num = (idx + 1) as u32;
            for (col, cell) in row.iter().enumerate() {
                let col = col as u16;
                match cell {
                    CellValue::Text(text) => {
                        worksheet.write_string(row_num, col, text)?;
                    }
                    CellValue::Number(number) => {
                        worksheet.write_number(row_num, col, *number)?;
                    }
                    CellValue::Bool(flag) => {
                        worksheet.write_boolean(row_num, col, *flag)?;
                    }
                    CellValue::Empty => {}
                }
            }
        }
    }

    Ok(workbook.save_to_buffer()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tabular::RecordTable;

    #[test]
    fn rendered_workbook_reads_back() {
        let sheet = WorkbookSheet::new("SC 500 < 3 Months", ["Client Name", "Days"]).with_rows([
            vec![CellValue::from("Asha"), CellValue::from(12u32)],
            vec![CellValue::from("Ravi"), CellValue::Empty],
        ]);
        let bytes = render_workbook(&[sheet]).expect("renders");
        assert_eq!(&bytes[..2], b"PK");

        let table = RecordTable::from_spreadsheet_bytes(bytes).expect("reads back");
        assert_eq!(table.headers(), &["Client Name".to_string(), "Days".to_string()]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.cell(0, Some(1)), "12");
    }

    #[test]
    fn rejects_empty_sheet_list() {
        assert!(matches!(render_workbook(&[]), Err(RenderError::NoSheets)));
    }

    #[test]
    fn invalid_sheet_names_fail() {
        let sheet = WorkbookSheet::new("bad/name", ["A"]);
        assert!(matches!(
            render_workbook(&[sheet]),
            Err(RenderError::Workbook(_))
        ));
    }
}

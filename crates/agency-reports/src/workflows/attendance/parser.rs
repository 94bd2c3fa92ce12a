use super::columns::AttendanceColumns;
use super::domain::{PunchEvent, RowWarning};
use crate::tabular::dates::parse_datetime;
use crate::tabular::RecordTable;

/// Turns table rows into punches. Rows without a name or with an unreadable
/// timestamp are skipped and reported under their source line.
pub(crate) fn parse_punches(
    table: &RecordTable,
    columns: AttendanceColumns,
) -> (Vec<PunchEvent>, Vec<RowWarning>) {
    let mut punches = Vec::with_capacity(table.len());
    let mut warnings = Vec::new();

    for idx in 0..table.len() {
        let row = table.line(idx);
        let employee = table.cell(idx, Some(columns.name)).trim();
        let raw_timestamp = table.cell(idx, Some(columns.timestamp));

        if employee.is_empty() {
            warnings.push(RowWarning {
                row,
                reason: "missing employee name".to_string(),
            });
            continue;
        }

        match parse_datetime(raw_timestamp) {
            Some(timestamp) => punches.push(PunchEvent::new(employee, timestamp)),
            None => warnings.push(RowWarning {
                row,
                reason: format!("unreadable timestamp '{}'", raw_timestamp.trim()),
            }),
        }
    }

    (punches, warnings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn bad_rows_are_dropped_with_warnings() {
        let table = RecordTable::from_csv_reader(Cursor::new(
            "Name,Date/Time\n Alice ,05/01/2026 09:52\nBob,yesterday\n,05/01/2026 10:00\n",
        ))
        .expect("csv");
        let columns = AttendanceColumns::detect(table.headers()).expect("columns");
        let (punches, warnings) = parse_punches(&table, columns);

        assert_eq!(punches.len(), 1);
        assert_eq!(punches[0].employee, "Alice");
        assert_eq!(
            warnings,
            vec![
                RowWarning {
                    row: 3,
                    reason: "unreadable timestamp 'yesterday'".to_string()
                },
                RowWarning {
                    row: 4,
                    reason: "missing employee name".to_string()
                },
            ]
        );
    }

    #[test]
    fn warnings_point_at_source_lines_past_blank_rows() {
        let table = RecordTable::from_csv_reader(Cursor::new(
            "Name,Date/Time\nAlice,05/01/2026 09:52\n,\n,\nBob,yesterday\n",
        ))
        .expect("csv");
        let columns = AttendanceColumns::detect(table.headers()).expect("columns");
        let (_, warnings) = parse_punches(&table, columns);

        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].row, 5);
    }

    #[test]
    fn names_are_not_case_folded() {
        let table = RecordTable::from_csv_reader(Cursor::new(
            "Name,Date/Time\nalice,2026-01-05 09:00\nAlice,2026-01-05 18:00\n",
        ))
        .expect("csv");
        let columns = AttendanceColumns::detect(table.headers()).expect("columns");
        let (punches, _) = parse_punches(&table, columns);
        assert_ne!(punches[0].employee, punches[1].employee);
    }
}

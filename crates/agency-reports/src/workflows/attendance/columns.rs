use super::AttendanceError;

/// Positions of the two columns the classifier reads. Every other column in
/// the upload is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttendanceColumns {
    pub name: usize,
    pub timestamp: usize,
}

impl AttendanceColumns {
    /// Maps headers onto the name and timestamp columns. When several headers
    /// match, the last one wins. A header taken as the name is never also
    /// the timestamp.
    pub fn detect(headers: &[String]) -> Result<Self, AttendanceError> {
        let mut name = None;
        let mut timestamp = None;

        for (idx, header) in headers.iter().enumerate() {
            let lowered = header.trim().to_lowercase();
            if is_name_header(&lowered) {
                name = Some(idx);
            } else if is_timestamp_header(&lowered) {
                timestamp = Some(idx);
            }
        }

        match (name, timestamp) {
            (Some(name), Some(timestamp)) => Ok(Self { name, timestamp }),
            (name, timestamp) => {
                let mut columns = Vec::new();
                if name.is_none() {
                    columns.push("employee name");
                }
                if timestamp.is_none() {
                    columns.push("date/time");
                }
                Err(AttendanceError::MissingColumn { columns })
            }
        }
    }
}

fn is_name_header(lowered: &str) -> bool {
    lowered.contains("name") && !lowered.contains("department")
}

fn is_timestamp_header(lowered: &str) -> bool {
    lowered.contains("date/time")
        || lowered.contains("datetime")
        || (lowered.contains("date") && lowered.contains("time"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn detects_biometric_export_headers() {
        let columns =
            AttendanceColumns::detect(&headers(&["No.", "Department Name", "Name", "Date/Time"]))
                .expect("columns");
        assert_eq!(columns, AttendanceColumns { name: 2, timestamp: 3 });
    }

    #[test]
    fn accepts_datetime_and_split_tokens() {
        let columns = AttendanceColumns::detect(&headers(&["Employee Name", "Punch DateTime"]))
            .expect("columns");
        assert_eq!(columns.timestamp, 1);

        let columns = AttendanceColumns::detect(&headers(&[" Time of Date ", "Staff name"]))
            .expect("columns");
        assert_eq!(columns, AttendanceColumns { name: 1, timestamp: 0 });
    }

    #[test]
    fn name_header_never_doubles_as_timestamp() {
        let columns =
            AttendanceColumns::detect(&headers(&["Date/Time", "Staff Name Date Time"]))
                .expect("columns");
        assert_eq!(columns, AttendanceColumns { name: 1, timestamp: 0 });

        let err = AttendanceColumns::detect(&headers(&["Name Date Time"]))
            .expect_err("one header cannot fill both roles");
        assert_eq!(err.to_string(), "missing required column(s): date/time");
    }

    #[test]
    fn department_only_headers_do_not_count_as_names() {
        let err = AttendanceColumns::detect(&headers(&["Department Name", "Date/Time"]))
            .expect_err("missing name");
        match err {
            AttendanceError::MissingColumn { columns } => {
                assert_eq!(columns, vec!["employee name"])
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn reports_both_missing_columns() {
        let err = AttendanceColumns::detect(&headers(&["Code", "Checked"])).expect_err("missing");
        assert_eq!(
            err.to_string(),
            "missing required column(s): employee name, date/time"
        );
    }
}

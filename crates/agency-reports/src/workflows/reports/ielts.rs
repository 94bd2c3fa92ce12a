//! IELTS/PTE class finances: who has paid for their course, what the period
//! earned and what teaching cost.
//!
//! Three sources feed the report. Payments are individual receipts,
//! enrollments list every student with the fee they owe, and expenses hold
//! monthly teacher costs. Enrollments are the roster; payments are matched to
//! students by lower-cased name.

use super::filters::{apply_all, parse_report_date, CategoricalFilter, DateWindow};
use super::table::{metric_sheet, record_sheet, SummaryRow, SummaryTable};
use super::{parse_amount, ReportError, ReportWarning};
use crate::tabular::RecordTable;
use crate::workflows::delivery::workbook::{CellValue, WorkbookSheet};
use chrono::NaiveDate;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use tracing::info;

pub const PAYMENT_COLUMNS: [&str; 5] = ["Date", "Students Name", "Course Type", "Paid Amount", "Office"];
pub const ENROLLMENT_COLUMNS: [&str; 4] = ["Name", "Note", "Office", "Month"];
pub const EXPENSE_COLUMNS: [&str; 2] = ["Month", "Amount"];
const EXPECTED_FEE_COLUMN: &str = "Payment";

pub const SHEET_SUMMARY: &str = "Summary";
pub const SHEET_OUTSTANDING: &str = "Outstanding Payments";
pub const SHEET_FULLY_PAID: &str = "Fully Paid";
pub const SHEET_ALL_STUDENTS: &str = "All Students";
pub const SHEET_MONTHLY: &str = "Monthly Revenue";
pub const SHEET_OFFICES: &str = "Office Revenue";
pub const SHEET_EXPENSES: &str = "Expenses";

const STUDENT_HEADERS: [&str; 8] = [
    "Name",
    "Office",
    "Month",
    "Expected",
    "Paid",
    "Balance",
    "Status",
    "Note",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum StudentStatus {
    Reference,
    Dropped,
    FullyPaid,
    PartialPayment,
    Outstanding,
}

impl StudentStatus {
    /// Notes win over money: a reference or dropped student is never chased
    /// for a balance.
    pub fn classify(note: &str, balance: f64, paid: f64) -> Self {
        let note = note.to_lowercase();
        if note.contains("ref") {
            StudentStatus::Reference
        } else if note.contains("dropped") {
            StudentStatus::Dropped
        } else if balance <= 0.0 {
            StudentStatus::FullyPaid
        } else if paid > 0.0 {
            StudentStatus::PartialPayment
        } else {
            StudentStatus::Outstanding
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            StudentStatus::Reference => "Reference",
            StudentStatus::Dropped => "Dropped",
            StudentStatus::FullyPaid => "Fully Paid",
            StudentStatus::PartialPayment => "Partial Payment",
            StudentStatus::Outstanding => "Outstanding",
        }
    }

    pub const fn owes_balance(self) -> bool {
        !matches!(self, StudentStatus::Reference | StudentStatus::Dropped)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentBalance {
    pub name: String,
    pub office: String,
    pub month: String,
    pub expected: f64,
    pub paid: f64,
    pub balance: f64,
    pub status: StudentStatus,
    pub status_label: &'static str,
    pub note: String,
}

impl StudentBalance {
    pub fn is_outstanding(&self) -> bool {
        self.status.owes_balance() && self.balance > 0.0
    }

    fn to_cells(&self) -> Vec<CellValue> {
        vec![
            self.name.as_str().into(),
            self.office.as_str().into(),
            self.month.as_str().into(),
            self.expected.into(),
            self.paid.into(),
            self.balance.into(),
            self.status_label.into(),
            self.note.as_str().into(),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct IeltsTotals {
    pub total_revenue: f64,
    pub student_revenue: f64,
    pub book_revenue: f64,
    pub expenses: f64,
    pub profit: f64,
    pub outstanding: f64,
    pub total_students: usize,
    pub new_students: usize,
    pub latest_month_revenue: f64,
    pub latest_month_expenses: f64,
}

#[derive(Debug, Clone)]
pub struct IeltsSources {
    pub payments: RecordTable,
    pub enrollments: RecordTable,
    pub expenses: RecordTable,
}

#[derive(Debug, Clone)]
pub struct IeltsReport {
    pub window: DateWindow,
    pub students: Vec<StudentBalance>,
    pub totals: IeltsTotals,
    pub offices: SummaryTable,
    pub monthly_revenue: SummaryTable,
    pub expenses: RecordTable,
    pub warnings: Vec<ReportWarning>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IeltsReportSummary {
    pub window: DateWindow,
    pub period: String,
    pub totals: IeltsTotals,
    pub status_counts: BTreeMap<&'static str, usize>,
    pub offices: SummaryTable,
    pub monthly_revenue: SummaryTable,
    pub warnings: Vec<ReportWarning>,
}

struct Payment {
    date: Option<NaiveDate>,
    month: Option<String>,
    student: String,
    course_type: String,
    amount: f64,
    office: String,
}

impl Payment {
    fn is_student_fee(&self) -> bool {
        let upper = self.course_type.to_uppercase();
        upper.contains("IELTS") || upper.contains("PTE")
    }

    fn is_book(&self) -> bool {
        self.course_type.trim().eq_ignore_ascii_case("BOOK")
    }
}

/// Builds the report for payments and expenses inside `window`. The
/// categorical filters narrow the enrollment roster.
pub fn build(
    sources: &IeltsSources,
    window: &DateWindow,
    filters: &[CategoricalFilter],
) -> Result<IeltsReport, ReportError> {
    let mut warnings = Vec::new();
    let payments = read_payments(&sources.payments, &mut warnings)?;
    let in_window: Vec<&Payment> = payments
        .iter()
        .filter(|payment| payment.date.is_some_and(|date| window.contains(date)))
        .collect();

    let expense_columns = sources.expenses.require_columns(&EXPENSE_COLUMNS)?;
    let (expenses, skipped) = window.apply(&sources.expenses, expense_columns[0]);
    warnings.extend(skipped);
    let expense_total = sum_amounts(&expenses, expense_columns[1], &mut warnings);

    let enrollments = apply_all(&sources.enrollments, filters)?;
    let students = student_balances(&enrollments, &in_window)?;

    let month_col = enrollments.require_columns(&["Month"])?[0];
    let new_students = (0..enrollments.len())
        .filter_map(|idx| parse_report_date(enrollments.cell(idx, Some(month_col))))
        .filter(|date| window.contains(*date))
        .count();

    let total_revenue: f64 = in_window.iter().map(|payment| payment.amount).sum();
    let student_revenue: f64 = in_window
        .iter()
        .filter(|payment| payment.is_student_fee())
        .map(|payment| payment.amount)
        .sum();
    let book_revenue: f64 = in_window
        .iter()
        .filter(|payment| payment.is_book())
        .map(|payment| payment.amount)
        .sum();
    let outstanding: f64 = students
        .iter()
        .filter(|student| student.is_outstanding())
        .map(|student| student.balance)
        .sum();

    let latest = DateWindow::months(window.end, window.end);
    let latest_month_revenue: f64 = payments
        .iter()
        .filter(|payment| payment.date.is_some_and(|date| latest.contains(date)))
        .map(|payment| payment.amount)
        .sum();
    let (latest_expenses, _) = latest.apply(&sources.expenses, expense_columns[0]);
    let latest_month_expenses = sum_amounts(&latest_expenses, expense_columns[1], &mut Vec::new());

    let totals = IeltsTotals {
        total_revenue,
        student_revenue,
        book_revenue,
        expenses: expense_total,
        profit: total_revenue - expense_total,
        outstanding,
        total_students: students.len(),
        new_students,
        latest_month_revenue,
        latest_month_expenses,
    };

    let offices = office_breakdown(&students, &in_window);
    let monthly_revenue = monthly_revenue(&payments);

    info!(
        students = totals.total_students,
        payments = in_window.len(),
        revenue = totals.total_revenue,
        outstanding = totals.outstanding,
        "built IELTS/PTE report"
    );

    Ok(IeltsReport {
        window: *window,
        students,
        totals,
        offices,
        monthly_revenue,
        expenses,
        warnings,
    })
}

fn read_payments(
    table: &RecordTable,
    warnings: &mut Vec<ReportWarning>,
) -> Result<Vec<Payment>, ReportError> {
    let columns = table.require_columns(&PAYMENT_COLUMNS)?;
    let (date, student, course, amount, office) =
        (columns[0], columns[1], columns[2], columns[3], columns[4]);

    let mut payments = Vec::with_capacity(table.len());
    for idx in 0..table.len() {
        let raw_date = table.cell(idx, Some(date));
        let parsed = parse_report_date(raw_date);
        if parsed.is_none() && !raw_date.trim().is_empty() {
            warnings.push(ReportWarning::unreadable_date(table.line(idx), PAYMENT_COLUMNS[0], raw_date));
        }
        let raw_amount = table.cell(idx, Some(amount));
        let paid = parse_amount(raw_amount).unwrap_or_else(|| {
            warnings.push(ReportWarning::unreadable_amount(table.line(idx), PAYMENT_COLUMNS[3], raw_amount));
            0.0
        });

        payments.push(Payment {
            date: parsed,
            month: parsed.map(|date| date.format("%Y-%m").to_string()),
            student: table.cell(idx, Some(student)).trim().to_lowercase(),
            course_type: table.cell(idx, Some(course)).trim().to_string(),
            amount: paid,
            office: table.cell(idx, Some(office)).trim().to_string(),
        });
    }
    Ok(payments)
}

fn student_balances(
    enrollments: &RecordTable,
    payments: &[&Payment],
) -> Result<Vec<StudentBalance>, ReportError> {
    let columns = enrollments.require_columns(&ENROLLMENT_COLUMNS)?;
    let (name, note, office, month) = (columns[0], columns[1], columns[2], columns[3]);
    let fee = enrollments.column(EXPECTED_FEE_COLUMN);

    let mut paid_by_student: HashMap<&str, f64> = HashMap::new();
    for payment in payments {
        *paid_by_student.entry(payment.student.as_str()).or_default() += payment.amount;
    }

    Ok((0..enrollments.len())
        .map(|idx| {
            let display_name = enrollments.cell(idx, Some(name)).trim().to_string();
            let expected = parse_amount(enrollments.cell(idx, fee)).unwrap_or(0.0);
            let paid = paid_by_student
                .get(display_name.to_lowercase().as_str())
                .copied()
                .unwrap_or(0.0);
            let balance = expected - paid;
            let note = enrollments.cell(idx, Some(note)).trim().to_string();
            let status = StudentStatus::classify(&note, balance, paid);
            StudentBalance {
                name: display_name,
                office: enrollments.cell(idx, Some(office)).trim().to_string(),
                month: enrollments.cell(idx, Some(month)).trim().to_string(),
                expected,
                paid,
                balance,
                status,
                status_label: status.label(),
                note,
            }
        })
        .collect())
}

fn sum_amounts(table: &RecordTable, column: usize, warnings: &mut Vec<ReportWarning>) -> f64 {
    let header = table.headers().get(column).cloned().unwrap_or_default();
    (0..table.len())
        .map(|idx| {
            let raw = table.cell(idx, Some(column));
            parse_amount(raw).unwrap_or_else(|| {
                warnings.push(ReportWarning::unreadable_amount(table.line(idx), &header, raw));
                0.0
            })
        })
        .sum()
}

/// Offices come from the roster; revenue from payments is attached to the
/// offices found there.
fn office_breakdown(students: &[StudentBalance], payments: &[&Payment]) -> SummaryTable {
    let mut revenue: HashMap<&str, f64> = HashMap::new();
    for payment in payments {
        *revenue.entry(payment.office.as_str()).or_default() += payment.amount;
    }

    let mut offices: BTreeMap<&str, [f64; 6]> = BTreeMap::new();
    for student in students {
        let entry = offices.entry(student.office.as_str()).or_default();
        entry[0] += 1.0;
        if student.status == StudentStatus::FullyPaid {
            entry[1] += 1.0;
        }
        if student.is_outstanding() {
            entry[2] += 1.0;
        }
        match student.status {
            StudentStatus::Reference => entry[3] += 1.0,
            StudentStatus::Dropped => entry[4] += 1.0,
            _ => {}
        }
    }

    SummaryTable::new(
        "Office",
        [
            "Total Students",
            "Fully Paid",
            "Outstanding",
            "References",
            "Dropped",
            "Revenue",
        ],
        offices
            .into_iter()
            .map(|(office, mut values)| {
                values[5] = revenue.get(office).copied().unwrap_or(0.0);
                SummaryRow::new(office, values.to_vec())
            })
            .collect(),
    )
}

/// Revenue per `YYYY-MM` across every payment, newest month first.
fn monthly_revenue(payments: &[Payment]) -> SummaryTable {
    let mut months: BTreeMap<&str, f64> = BTreeMap::new();
    for payment in payments {
        if let Some(month) = payment.month.as_deref() {
            *months.entry(month).or_default() += payment.amount;
        }
    }
    SummaryTable::new(
        "Month",
        ["Revenue"],
        months
            .into_iter()
            .rev()
            .map(|(month, revenue)| SummaryRow::new(month, vec![revenue]))
            .collect(),
    )
}

/// `March 2026` for a single month, otherwise `Jan 2026 to Mar 2026`.
pub fn period_label(window: &DateWindow) -> String {
    if window.start.format("%Y-%m").to_string() == window.end.format("%Y-%m").to_string() {
        window.start.format("%B %Y").to_string()
    } else {
        format!(
            "{} to {}",
            window.start.format("%b %Y"),
            window.end.format("%b %Y")
        )
    }
}

impl IeltsReport {
    pub fn period(&self) -> String {
        period_label(&self.window)
    }

    /// Students still owing money, largest balance first.
    pub fn outstanding_students(&self) -> Vec<&StudentBalance> {
        let mut owing: Vec<&StudentBalance> = self
            .students
            .iter()
            .filter(|student| student.is_outstanding())
            .collect();
        owing.sort_by(|a, b| b.balance.partial_cmp(&a.balance).unwrap_or(Ordering::Equal));
        owing
    }

    pub fn fully_paid_students(&self) -> Vec<&StudentBalance> {
        self.students
            .iter()
            .filter(|student| student.status == StudentStatus::FullyPaid)
            .collect()
    }

    pub fn status_counts(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for student in &self.students {
            *counts.entry(student.status_label).or_default() += 1;
        }
        counts
    }

    /// Empty student lists are left out of the workbook.
    pub fn sheets(&self) -> Vec<WorkbookSheet> {
        let totals = &self.totals;
        let mut sheets = vec![metric_sheet(
            SHEET_SUMMARY,
            &[
                ("Total Revenue", totals.total_revenue),
                ("Student Revenue", totals.student_revenue),
                ("Book Revenue", totals.book_revenue),
                ("Outstanding Balance", totals.outstanding),
                ("Total Students", totals.total_students as f64),
            ],
        )];

        let student_lists = [
            (SHEET_OUTSTANDING, self.outstanding_students()),
            (SHEET_FULLY_PAID, self.fully_paid_students()),
            (SHEET_ALL_STUDENTS, self.students.iter().collect()),
        ];
        for (name, students) in student_lists {
            if !students.is_empty() {
                sheets.push(
                    WorkbookSheet::new(name, STUDENT_HEADERS)
                        .with_rows(students.iter().map(|student| student.to_cells())),
                );
            }
        }

        sheets.push(self.monthly_revenue.to_sheet(SHEET_MONTHLY));
        sheets.push(self.offices.to_sheet(SHEET_OFFICES));
        sheets.push(record_sheet(SHEET_EXPENSES, &self.expenses));
        sheets
    }

    pub fn summary(&self) -> IeltsReportSummary {
        IeltsReportSummary {
            window: self.window,
            period: self.period(),
            totals: self.totals,
            status_counts: self.status_counts(),
            offices: self.offices.clone(),
            monthly_revenue: self.monthly_revenue.clone(),
            warnings: self.warnings.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn table(csv: &str) -> RecordTable {
        RecordTable::from_csv_reader(Cursor::new(csv.to_string())).expect("csv")
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn sources() -> IeltsSources {
        IeltsSources {
            payments: table(
                "Date,Students Name,Course Type,Paid Amount,Office\n\
2026-02-03,Asha Rai,IELTS,\"10,000\",Kathmandu\n\
2026-03-05, asha rai ,IELTS + Book,5000,Kathmandu\n\
2026-03-06,Ravi KC,PTE,4000,Pokhara\n\
2026-03-07,Walk In,Book,800,Pokhara\n\
2026-01-15,Sita Thapa,IELTS,9000,Kathmandu\n\
someday,Ravi KC,PTE,100,Pokhara\n",
            ),
            enrollments: table(
                "Name,Payment,Note,Office,Month\n\
Asha Rai,15000,,Kathmandu,2026-02-01\n\
Ravi KC,12000,,Pokhara,2026-03-01\n\
Sita Thapa,15000,,Kathmandu,2026-01-01\n\
Hari Lama,,Reference from Asha,Pokhara,2026-03-01\n\
Gita Shah,15000,dropped after week 1,Kathmandu,2026-02-01\n",
            ),
            expenses: table(
                "Month,Teacher Name,Amount,Office\n\
2026-02-01,Teacher A,\"6,000\",Kathmandu\n\
2026-03-01,Teacher B,7000,Pokhara\n\
2026-01-01,Teacher A,5000,Kathmandu\n",
            ),
        }
    }

    fn february_to_march() -> DateWindow {
        DateWindow::months(date(2026, 2, 1), date(2026, 3, 1))
    }

    #[test]
    fn status_rules_prefer_notes() {
        assert_eq!(StudentStatus::classify("REF by agent", 500.0, 0.0), StudentStatus::Reference);
        assert_eq!(StudentStatus::classify("Dropped", -10.0, 100.0), StudentStatus::Dropped);
        assert_eq!(StudentStatus::classify("", 0.0, 100.0), StudentStatus::FullyPaid);
        assert_eq!(StudentStatus::classify("", 10.0, 100.0), StudentStatus::PartialPayment);
        assert_eq!(StudentStatus::classify("", 10.0, 0.0), StudentStatus::Outstanding);
    }

    #[test]
    fn balances_use_payments_inside_the_window() {
        let report = build(&sources(), &february_to_march(), &[]).expect("report");
        let by_name: HashMap<&str, &StudentBalance> = report
            .students
            .iter()
            .map(|student| (student.name.as_str(), student))
            .collect();

        assert_eq!(by_name["Asha Rai"].paid, 15000.0);
        assert_eq!(by_name["Asha Rai"].status, StudentStatus::FullyPaid);
        assert_eq!(by_name["Ravi KC"].balance, 8000.0);
        assert_eq!(by_name["Ravi KC"].status, StudentStatus::PartialPayment);
        assert_eq!(by_name["Sita Thapa"].status, StudentStatus::Outstanding);
        assert_eq!(by_name["Hari Lama"].status, StudentStatus::Reference);
        assert_eq!(by_name["Gita Shah"].status, StudentStatus::Dropped);
        assert_eq!(report.warnings.len(), 1);
    }

    #[test]
    fn totals_split_revenue_streams() {
        let report = build(&sources(), &february_to_march(), &[]).expect("report");
        let totals = report.totals;

        assert_eq!(totals.total_revenue, 19800.0);
        assert_eq!(totals.student_revenue, 19000.0);
        assert_eq!(totals.book_revenue, 800.0);
        assert_eq!(totals.expenses, 13000.0);
        assert_eq!(totals.profit, 6800.0);
        // Ravi 8000 + Sita 15000; Gita is dropped
        assert_eq!(totals.outstanding, 23000.0);
        assert_eq!(totals.total_students, 5);
        assert_eq!(totals.new_students, 4);
        assert_eq!(totals.latest_month_revenue, 9800.0);
        assert_eq!(totals.latest_month_expenses, 7000.0);
    }

    #[test]
    fn office_breakdown_counts_students_and_revenue() {
        let report = build(&sources(), &february_to_march(), &[]).expect("report");
        let kathmandu = report.offices.row("Kathmandu").expect("kathmandu");
        assert_eq!(kathmandu.values, vec![3.0, 1.0, 1.0, 0.0, 1.0, 15000.0]);
        let pokhara = report.offices.row("Pokhara").expect("pokhara");
        assert_eq!(pokhara.values, vec![2.0, 0.0, 1.0, 1.0, 0.0, 4800.0]);
        let total = report.offices.grand_total().expect("total");
        assert_eq!(total.values[0], 5.0);
        assert_eq!(total.values[5], 19800.0);
    }

    #[test]
    fn monthly_revenue_covers_all_payments_newest_first() {
        let report = build(&sources(), &february_to_march(), &[]).expect("report");
        let months: Vec<&str> = report
            .monthly_revenue
            .body()
            .iter()
            .map(|row| row.label.as_str())
            .collect();
        assert_eq!(months, vec!["2026-03", "2026-02", "2026-01"]);
        assert_eq!(report.monthly_revenue.row("2026-01").expect("jan").values, vec![9000.0]);
    }

    #[test]
    fn sheets_and_period_label() {
        let report = build(&sources(), &february_to_march(), &[]).expect("report");
        let names: Vec<String> = report.sheets().into_iter().map(|sheet| sheet.name).collect();
        assert_eq!(
            names,
            vec![
                SHEET_SUMMARY,
                SHEET_OUTSTANDING,
                SHEET_FULLY_PAID,
                SHEET_ALL_STUDENTS,
                SHEET_MONTHLY,
                SHEET_OFFICES,
                SHEET_EXPENSES
            ]
        );
        assert_eq!(report.period(), "Feb 2026 to Mar 2026");
        let single = DateWindow::months(date(2026, 3, 1), date(2026, 3, 1));
        assert_eq!(period_label(&single), "March 2026");
    }

    #[test]
    fn roster_filters_narrow_students() {
        let report = build(
            &sources(),
            &february_to_march(),
            &[CategoricalFilter::exact("Office", "Pokhara")],
        )
        .expect("report");
        assert_eq!(report.totals.total_students, 2);
        assert!(report.offices.row("Kathmandu").is_none());
    }
}

use agency_reports::config::{RecipientList, ReportSettings};
use agency_reports::tabular::RecordTable;
use agency_reports::workflows::delivery::emails::{coe_email, visa_email};
use agency_reports::workflows::delivery::{
    recipients_for, render_workbook, Attachment, MailBody, Mailer, MemoryMailer, SendError,
};
use agency_reports::workflows::reports::{coe, leads, visa, DateWindow, SummaryTable, GRAND_TOTAL};
use calamine::Reader;
use chrono::NaiveDate;
use std::io::Cursor;

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 1, 10).expect("valid date")
}

fn table(csv: &str) -> RecordTable {
    RecordTable::from_csv_reader(csv.as_bytes()).expect("csv parses")
}

fn clients() -> RecordTable {
    table(
        "Client Name,Visa Type,Visa Expiry Date,Email\n\
         Asha Rai,Student (500),01/02/2026,asha@example.com\n\
         Bikash Thapa,Temporary Graduate (485),2026-03-15,bikash@example.com\n\
         Chandra Gurung,Student (500),2026-12-01,chandra@example.com\n\
         Dipa Shrestha,Visitor (600),2026-01-20,dipa@example.com\n\
         Esha Karki,Student (500),,esha@example.com\n",
    )
}

fn settings() -> ReportSettings {
    ReportSettings {
        recipients: "ops@example.com, director@example.com".to_string(),
        coe_recipients: "compliance@example.com".to_string(),
        ..ReportSettings::default()
    }
}

fn assert_grand_total_sums_body(table: &SummaryTable) {
    let total = table.grand_total().expect("total row");
    assert_eq!(total.label, GRAND_TOTAL);
    for (col, value) in total.values.iter().enumerate() {
        let sum: f64 = table.body().iter().map(|row| row.values[col]).sum();
        assert!((value - sum).abs() < 1e-9, "column {col}: {value} != {sum}");
    }
}

#[test]
fn visa_report_is_exported_and_mailed() {
    let window = DateWindow::upcoming(today(), visa::WINDOW_DAYS);
    let report = visa::build(&clients(), &window, &[]).expect("visa report builds");
    let summary = report.summary();
    assert_eq!(summary.total, 3);
    assert_eq!(summary.subclass_500, 1);
    assert_eq!(summary.subclass_485, 1);

    let bytes = render_workbook(&report.sheets()).expect("workbook renders");
    let workbook =
        calamine::open_workbook_auto_from_rs(Cursor::new(bytes.clone())).expect("xlsx opens");
    assert_eq!(
        workbook.sheet_names(),
        vec![visa::SHEET_ALL, visa::SHEET_500, visa::SHEET_485]
    );

    let mailer = MemoryMailer::default();
    let recipients = recipients_for(&settings(), RecipientList::Visa).expect("recipients");
    let email = visa_email(&summary, today());
    assert!(email.warnings.is_empty());
    let attachment = Attachment::xlsx("Weekly_Report_2026-01-10.xlsx", bytes);
    mailer
        .send(&email.into_mail(recipients, Some(attachment)))
        .expect("mail recorded");

    let sent = mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, vec!["ops@example.com", "director@example.com"]);
    assert_eq!(sent[0].subject, "Weekly Visa Report - 2026-01-10");
    let MailBody::Plain(body) = &sent[0].body else {
        panic!("visa mail is plain text");
    };
    assert!(body.contains("- Total < 3 Months: 3"));
    assert!(body.contains("- SC 485: 1"));
    assert_eq!(
        sent[0].attachment.as_ref().map(|a| a.filename.as_str()),
        Some("Weekly_Report_2026-01-10.xlsx")
    );
}

#[test]
fn coe_report_uses_its_own_recipients() {
    let students = table(
        "Student,Course,COE End Date\n\
         Asha,Diploma,2026-02-28\n\
         Bikash,Bachelor,2026-06-30\n\
         Chandra,Master,2027-06-30\n\
         Dipa,Diploma,2026-02-01\n",
    );
    let window = DateWindow::upcoming(today(), coe::WINDOW_DAYS);
    let report = coe::build(&students, &window, &[]).expect("coe report builds");
    let summary = report.summary();
    assert_eq!(summary.date_column, "COE End Date");
    assert_eq!(summary.total_students, 4);
    assert_eq!(summary.expiring, 3);
    assert_eq!(
        report.by_month.row("February 2026").map(|row| row.values[0]),
        Some(2.0)
    );
    assert_grand_total_sums_body(&report.by_month);

    let recipients = recipients_for(&settings(), RecipientList::Coe).expect("recipients");
    assert_eq!(recipients, vec!["compliance@example.com"]);
    let mail = coe_email(&summary, today()).into_mail(recipients, None);
    assert_eq!(mail.subject, "Weekly COE Report - 2026-01-10");
}

#[test]
fn every_summary_table_ends_with_a_column_wise_total() {
    let window = DateWindow::upcoming(today(), visa::WINDOW_DAYS);
    let visa_report = visa::build(&clients(), &window, &[]).expect("visa report builds");
    assert_grand_total_sums_body(&visa_report.by_visa_type);

    let applications = table(
        "Internal Client ID,Status,Workflow Name,Application Owner\n\
         1,In Progress,Skills Assessment,Asha\n\
         1,In Progress,University Admission,Asha\n\
         2,In Progress,University Admission,\n\
         3,In Progress,State Government Nomination,Bikash\n\
         4,Completed,University Admission,Bikash\n\
         5,Completed,Migration Service,Asha\n",
    );
    let lead_report = leads::build(&applications, &leads::CompletedSelection::default(), &[])
        .expect("lead report builds");
    assert_grand_total_sums_body(&lead_report.in_progress_summary);
    assert_grand_total_sums_body(&lead_report.completed_summary);
    assert!(lead_report
        .in_progress_summary
        .row(leads::UNASSIGNED)
        .is_some());
}

#[test]
fn missing_recipients_stop_delivery() {
    let err = recipients_for(&ReportSettings::default(), RecipientList::Leads)
        .expect_err("no recipients configured");
    assert!(matches!(err, SendError::NoRecipients));
}

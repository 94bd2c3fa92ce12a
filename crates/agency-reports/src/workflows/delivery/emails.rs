//! Subjects and bodies for the report emails. Bodies are `{{Key}}` templates
//! rendered through [`render_text`], so a missing value shows up as a
//! warning instead of an empty gap.

use super::mailer::{Attachment, MailBody, OutgoingMail};
use super::template::{render_text, Placeholders, TemplateWarning};
use crate::workflows::attendance::AttendanceSummary;
use crate::workflows::reports::coe::CoeReportSummary;
use crate::workflows::reports::financial::FinancialReportSummary;
use crate::workflows::reports::ielts::IeltsReportSummary;
use crate::workflows::reports::leads::LeadReportSummary;
use crate::workflows::reports::visa::VisaReportSummary;
use crate::workflows::reports::SummaryTable;
use chrono::NaiveDate;
use std::collections::BTreeMap;

const SIGN_OFF: &str = "Report Automator";

const VISA_BODY: &str = "Hi Team,

Please find attached the Weekly Visa Report for {{Date}}.

Summary:
- Total < 3 Months: {{Total}}
- SC 500: {{Subclass500}}
- SC 485: {{Subclass485}}

Regards,
{{SignOff}}";

const COE_BODY: &str = "Hi Team,

Please find attached the COE Report for {{Date}}.

Summary:
- Total Students: {{Total}}
- Expiring < 6 Months: {{Expiring}}

Regards,
{{SignOff}}";

const LEAD_BODY: &str = "Hi Team,

Please find attached the Lead Report for {{Date}}.

Summary:
- Applications In Progress: {{InProgress}}
- Completed Applications: {{Completed}}

Regards,
{{SignOff}}";

const IELTS_BODY: &str = r#"<html><body style="font-family:Arial,sans-serif;font-size:14px;color:#333;">
<p>Dear Team,</p>
<p>Kindly find attached the <strong>IELTS/PTE Financial Report for {{Period}}</strong>.</p>
<h2>Financial Summary</h2>
<table style="border-collapse:collapse;">
<tr><td>Revenue ({{LatestMonth}})</td><td>{{LatestRevenue}}</td></tr>
<tr><td>Total Revenue ({{Period}})</td><td>{{TotalRevenue}}</td></tr>
<tr><td>Expenses ({{LatestMonth}})</td><td>{{LatestExpenses}}</td></tr>
<tr><td>Total Expenses ({{Period}})</td><td>{{TotalExpenses}}</td></tr>
<tr><td>Profit</td><td>{{Profit}}</td></tr>
<tr><td>Outstanding Balance</td><td>{{Outstanding}}</td></tr>
<tr><td>New Students</td><td>{{NewStudents}}</td></tr>
</table>
<h2>Students by Office</h2>
{{OfficeTable}}
<p>Regards,<br>{{SignOff}}</p>
</body></html>"#;

const ATTENDANCE_BODY: &str = r#"<html><body style="font-family:Arial,sans-serif;font-size:14px;color:#333;">
<p>Dear Team,</p>
<p>Please find attached the attendance report for <strong>{{Period}}</strong>.</p>
<table style="border-collapse:collapse;">
<tr><td>Employees</td><td>{{Employees}}</td></tr>
<tr><td>Average Attendance</td><td>{{AvgAttendance}}%</td></tr>
<tr><td>Average Work Hours</td><td>{{AvgHours}}</td></tr>
<tr><td>Chronic Late</td><td>{{ChronicLatePct}}%</td></tr>
<tr><td>Under Hours</td><td>{{UnderHoursPct}}%</td></tr>
</table>
<h2>Highest Risk</h2>
{{RiskTable}}
<h2>Chronic Late</h2>
{{ChronicLateList}}
<h2>Under Required Hours</h2>
{{UnderHoursList}}
<p>Regards,<br>{{SignOff}}</p>
</body></html>"#;

const FINANCIAL_BODY: &str = r#"<html><body style="font-family:Helvetica,Arial,sans-serif;color:#333;">
<h2>Nepal Finance Overview</h2>
<div style="color:#64748b;">{{Month}}</div>
<p>Dear Sirs,</p>
<p>Please find below the financial overview for <b>{{Month}}</b>.</p>
<h3>Income Breakdown</h3>
{{IncomeTable}}
<h3>Transfer from Wise</h3>
{{WiseTable}}
<h3>Expense Breakdown</h3>
{{ExpenseTable}}
<p><b>Net Balance: {{NetBalance}}</b></p>
<table style="border-collapse:collapse;">
<tr><td>Income</td><td>{{Income}}</td><td>{{IncomeChange}}</td></tr>
<tr><td>Expenses</td><td>{{Expenses}}</td><td>{{ExpensesChange}}</td></tr>
<tr><td>Transfer from Wise</td><td>{{Wise}}</td><td>{{WiseChange}}</td></tr>
</table>
<h3>Closing Balances</h3>
{{BalanceTable}}
<p>Regards,<br>{{SignOff}}</p>
</body></html>"#;

/// A rendered subject and body, ready to be addressed.
#[derive(Debug, Clone, PartialEq)]
pub struct EmailContent {
    pub subject: String,
    pub body: MailBody,
    pub warnings: Vec<TemplateWarning>,
}

impl EmailContent {
    pub fn into_mail(self, to: Vec<String>, attachment: Option<Attachment>) -> OutgoingMail {
        OutgoingMail {
            to,
            subject: self.subject,
            body: self.body,
            attachment,
        }
    }
}

fn plain(subject: String, template: &str, placeholders: &Placeholders) -> EmailContent {
    let rendered = render_text(template, placeholders);
    EmailContent {
        subject,
        body: MailBody::Plain(rendered.text),
        warnings: rendered.warnings,
    }
}

fn html(subject: String, template: &str, placeholders: &Placeholders) -> EmailContent {
    let rendered = render_text(template, placeholders);
    EmailContent {
        subject,
        body: MailBody::Html(rendered.text),
        warnings: rendered.warnings,
    }
}

pub fn visa_email(summary: &VisaReportSummary, today: NaiveDate) -> EmailContent {
    let date = today.format("%Y-%m-%d").to_string();
    let placeholders: Placeholders = [
        ("Date", date.clone()),
        ("Total", summary.total.to_string()),
        ("Subclass500", summary.subclass_500.to_string()),
        ("Subclass485", summary.subclass_485.to_string()),
        ("SignOff", SIGN_OFF.to_string()),
    ]
    .into_iter()
    .collect();
    plain(format!("Weekly Visa Report - {date}"), VISA_BODY, &placeholders)
}

pub fn coe_email(summary: &CoeReportSummary, today: NaiveDate) -> EmailContent {
    let date = today.format("%Y-%m-%d").to_string();
    let placeholders: Placeholders = [
        ("Date", date.clone()),
        ("Total", summary.total_students.to_string()),
        ("Expiring", summary.expiring.to_string()),
        ("SignOff", SIGN_OFF.to_string()),
    ]
    .into_iter()
    .collect();
    plain(format!("Weekly COE Report - {date}"), COE_BODY, &placeholders)
}

pub fn lead_email(summary: &LeadReportSummary, today: NaiveDate) -> EmailContent {
    let date = today.format("%Y-%m-%d").to_string();
    let placeholders: Placeholders = [
        ("Date", date.clone()),
        ("InProgress", summary.in_progress.to_string()),
        ("Completed", summary.completed.to_string()),
        ("SignOff", SIGN_OFF.to_string()),
    ]
    .into_iter()
    .collect();
    plain(format!("Weekly Lead Report - {date}"), LEAD_BODY, &placeholders)
}

pub fn ielts_email(summary: &IeltsReportSummary) -> EmailContent {
    let totals = &summary.totals;
    let placeholders: Placeholders = [
        ("Period", escape_html(&summary.period)),
        ("LatestMonth", summary.window.end.format("%B %Y").to_string()),
        ("LatestRevenue", npr(totals.latest_month_revenue, 0)),
        ("TotalRevenue", npr(totals.total_revenue, 0)),
        ("LatestExpenses", npr(totals.latest_month_expenses, 0)),
        ("TotalExpenses", npr(totals.expenses, 0)),
        ("Profit", npr(totals.profit, 0)),
        ("Outstanding", npr(totals.outstanding, 0)),
        ("NewStudents", totals.new_students.to_string()),
        ("OfficeTable", summary_table_html(&summary.offices)),
        ("SignOff", SIGN_OFF.to_string()),
    ]
    .into_iter()
    .collect();
    html(
        format!("IELTS/PTE Financial Report - {}", summary.period),
        IELTS_BODY,
        &placeholders,
    )
}

pub fn attendance_email(summary: &AttendanceSummary, period: &str) -> EmailContent {
    let risk_rows: Vec<Vec<String>> = summary
        .top_risk
        .iter()
        .map(|stats| {
            vec![
                stats.employee.clone(),
                stats.late_days.to_string(),
                stats.early_exit_days.to_string(),
                stats.total_risk_days.to_string(),
            ]
        })
        .collect();
    let placeholders: Placeholders = [
        ("Period", escape_html(period)),
        ("Employees", summary.employees.to_string()),
        ("AvgAttendance", format!("{:.1}", summary.avg_attendance_pct)),
        ("AvgHours", format!("{:.1}", summary.avg_work_hours)),
        ("ChronicLatePct", format!("{:.1}", summary.chronic_late_pct)),
        ("UnderHoursPct", format!("{:.1}", summary.under_hours_pct)),
        (
            "RiskTable",
            html_table(&["Employee", "Late Days", "Early Exits", "Risk Days"], &risk_rows),
        ),
        (
            "ChronicLateList",
            name_list(summary.chronic_late.iter().map(|stats| stats.employee.as_str())),
        ),
        (
            "UnderHoursList",
            name_list(summary.under_hours.iter().map(|stats| stats.employee.as_str())),
        ),
        ("SignOff", SIGN_OFF.to_string()),
    ]
    .into_iter()
    .collect();
    html(
        format!("Attendance Report - {period}"),
        ATTENDANCE_BODY,
        &placeholders,
    )
}

pub fn financial_email(summary: &FinancialReportSummary) -> EmailContent {
    let current = &summary.current;
    let previous = &summary.previous;
    let placeholders: Placeholders = [
        ("Month", summary.month.clone()),
        (
            "IncomeTable",
            breakdown_html("Source", &current.income_breakdown, current.income),
        ),
        ("WiseTable", breakdown_html("Source", &current.wise_breakdown, 0.0)),
        (
            "ExpenseTable",
            breakdown_html("Category", &current.expense_breakdown, current.expenses),
        ),
        ("NetBalance", npr(current.net_balance, 2)),
        ("Income", npr(current.income, 2)),
        ("IncomeChange", change_note(current.income, previous.income)),
        ("Expenses", npr(current.expenses, 2)),
        ("ExpensesChange", change_note(current.expenses, previous.expenses)),
        ("Wise", npr(current.wise, 2)),
        ("WiseChange", change_note(current.wise, previous.wise)),
        (
            "BalanceTable",
            html_table(
                &["Account", "Balance"],
                &summary
                    .closing_balances
                    .iter()
                    .map(|(account, balance)| vec![account.clone(), npr(*balance, 2)])
                    .collect::<Vec<_>>(),
            ),
        ),
        ("SignOff", SIGN_OFF.to_string()),
    ]
    .into_iter()
    .collect();
    html(
        format!("Financial Report - {}", summary.month),
        FINANCIAL_BODY,
        &placeholders,
    )
}

/// `1234567.5` with two decimals is `1,234,567.50`.
pub fn group_thousands(value: f64, decimals: usize) -> String {
    let formatted = format!("{:.*}", decimals, value.abs());
    let (whole, fraction) = match formatted.split_once('.') {
        Some((whole, fraction)) => (whole.to_string(), Some(fraction.to_string())),
        None => (formatted.clone(), None),
    };

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (idx, digit) in whole.chars().enumerate() {
        if idx > 0 && (whole.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if value < 0.0 && formatted.chars().any(|ch| ch.is_ascii_digit() && ch != '0') {
        "-"
    } else {
        ""
    };
    match fraction {
        Some(fraction) => format!("{sign}{grouped}.{fraction}"),
        None => format!("{sign}{grouped}"),
    }
}

fn npr(value: f64, decimals: usize) -> String {
    format!("NPR {}", group_thousands(value, decimals))
}

fn change_note(current: f64, previous: f64) -> String {
    if previous == 0.0 {
        return "No prev data".to_string();
    }
    let pct = (current - previous) / previous * 100.0;
    let direction = if current >= previous { "Up" } else { "Down" };
    format!("Prev: {}, {direction} by {:.1}%", npr(previous, 2), pct.abs())
}

pub(crate) fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

fn html_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    if rows.is_empty() {
        return "<p style=\"color:gray\">None</p>".to_string();
    }
    let mut html = String::from("<table style=\"width:100%;border-collapse:collapse;font-size:13px;\"><tr>");
    for header in headers {
        html.push_str(&format!(
            "<th style=\"background-color:#3498db;color:white;padding:6px;text-align:left;\">{}</th>",
            escape_html(header)
        ));
    }
    html.push_str("</tr>");
    for row in rows {
        html.push_str("<tr>");
        for cell in row {
            html.push_str(&format!(
                "<td style=\"border:1px solid #ddd;padding:5px;\">{}</td>",
                escape_html(cell)
            ));
        }
        html.push_str("</tr>");
    }
    html.push_str("</table>");
    html
}

fn summary_table_html(table: &SummaryTable) -> String {
    let headers: Vec<&str> = std::iter::once(table.label_header.as_str())
        .chain(table.metric_headers.iter().map(String::as_str))
        .collect();
    let rows: Vec<Vec<String>> = table
        .rows()
        .iter()
        .map(|row| {
            std::iter::once(row.label.clone())
                .chain(row.values.iter().map(|value| group_thousands(*value, 0)))
                .collect()
        })
        .collect();
    html_table(&headers, &rows)
}

/// Largest amounts first, with each line's share of `total` when positive.
fn breakdown_html(label: &str, breakdown: &BTreeMap<String, f64>, total: f64) -> String {
    let mut entries: Vec<(&String, &f64)> = breakdown.iter().collect();
    entries.sort_by(|a, b| b.1.partial_cmp(a.1).unwrap_or(std::cmp::Ordering::Equal));

    let mut rows: Vec<Vec<String>> = entries
        .into_iter()
        .map(|(name, amount)| {
            let amount_text = if total > 0.0 {
                format!("{} ({:.1}%)", npr(*amount, 2), amount / total * 100.0)
            } else {
                npr(*amount, 2)
            };
            vec![name.clone(), amount_text]
        })
        .collect();
    let sum: f64 = breakdown.values().sum();
    rows.push(vec!["TOTAL".to_string(), npr(sum, 2)]);
    html_table(&[label, "Amount"], &rows)
}

fn name_list<'a>(names: impl Iterator<Item = &'a str>) -> String {
    let items: Vec<String> = names
        .map(|name| format!("<li>{}</li>", escape_html(name)))
        .collect();
    if items.is_empty() {
        "<p style=\"color:gray\">None</p>".to_string()
    } else {
        format!("<ul>{}</ul>", items.concat())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::reports::filters::DateWindow;
    use crate::workflows::reports::SummaryRow;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 5).expect("valid date")
    }

    #[test]
    fn visa_email_lists_counts() {
        let summary = VisaReportSummary {
            window: DateWindow::upcoming(today(), 90),
            total: 7,
            subclass_500: 4,
            subclass_485: 2,
            by_visa_type: SummaryTable::new("Visa Type", ["Clients"], Vec::new()),
            warnings: Vec::new(),
        };
        let email = visa_email(&summary, today());

        assert_eq!(email.subject, "Weekly Visa Report - 2026-01-05");
        assert!(email.warnings.is_empty());
        let MailBody::Plain(body) = &email.body else {
            panic!("expected plain body");
        };
        assert!(body.starts_with("Hi Team,\n\nPlease find attached the Weekly Visa Report for 2026-01-05."));
        assert!(body.contains("- Total < 3 Months: 7\n- SC 500: 4\n- SC 485: 2"));
        assert!(body.ends_with("Regards,\nReport Automator"));
    }

    #[test]
    fn coe_email_mentions_six_month_window() {
        let summary = CoeReportSummary {
            window: DateWindow::upcoming(today(), 180),
            date_column: "COE End Date".into(),
            total_students: 12,
            expiring: 3,
            by_month: SummaryTable::new("Expiry Month", ["Students"], Vec::new()),
            warnings: Vec::new(),
        };
        let email = coe_email(&summary, today());
        assert_eq!(email.subject, "Weekly COE Report - 2026-01-05");
        let MailBody::Plain(body) = email.body else {
            panic!("expected plain body");
        };
        assert!(body.contains("- Total Students: 12\n- Expiring < 6 Months: 3"));
    }

    #[test]
    fn html_tables_escape_cells() {
        let table = SummaryTable::new(
            "Office",
            ["Revenue"],
            vec![SummaryRow::new("R&D <HQ>", vec![1250000.0])],
        );
        let html = summary_table_html(&table);
        assert!(html.contains("R&amp;D &lt;HQ&gt;"));
        assert!(html.contains("1,250,000"));
        assert!(html.contains("Grand Total"));
    }

    #[test]
    fn thousands_grouping() {
        assert_eq!(group_thousands(1234567.5, 2), "1,234,567.50");
        assert_eq!(group_thousands(999.0, 0), "999");
        assert_eq!(group_thousands(-4500.0, 0), "-4,500");
        assert_eq!(group_thousands(-0.001, 2), "0.00");
    }

    #[test]
    fn change_note_describes_direction() {
        assert_eq!(change_note(5.0, 0.0), "No prev data");
        assert_eq!(change_note(150.0, 100.0), "Prev: NPR 100.00, Up by 50.0%");
        assert_eq!(change_note(50.0, 100.0), "Prev: NPR 100.00, Down by 50.0%");
    }
}

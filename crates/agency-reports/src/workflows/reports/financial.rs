//! Monthly profit and loss over the shared transaction ledger.

use super::filters::{apply_all, month_end, month_start, parse_report_date, CategoricalFilter, DateWindow};
use super::table::{metric_sheet, record_sheet, SummaryRow, SummaryTable};
use super::{parse_amount, ReportError, ReportWarning};
use crate::tabular::RecordTable;
use crate::workflows::delivery::workbook::WorkbookSheet;
use chrono::{Months, NaiveDate};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use tracing::info;

pub const DATE_COLUMN: &str = "Txn Date (Cash Basis)";
pub const AMOUNT_COLUMN: &str = "Amount (NPR)";
pub const TO_COLUMN: &str = "To Account";
pub const FROM_COLUMN: &str = "From Account";
pub const CATEGORY_COLUMN: &str = "Category";
pub const DESCRIPTION_COLUMN: &str = "Description";
pub const ACCOUNT_NAME_COLUMN: &str = "Account Name";
pub const OPENING_BALANCE_COLUMN: &str = "Opening Balance (AUD)";

pub const TRACKED_ACCOUNTS: [&str; 3] = ["NMB", "NBL", "Petty Cash"];
const EXPENSE_ACCOUNT: &str = "Expense";
const INCOME_ACCOUNT: &str = "Income";
const WISE_ACCOUNT: &str = "Wise";
const OTHER: &str = "Other";
const TOP_EXPENSES: usize = 5;

pub const SHEET_SUMMARY: &str = "Summary";
pub const SHEET_EXPENSES: &str = "Expense Breakdown";
pub const SHEET_INCOME: &str = "Income Breakdown";
pub const SHEET_WISE: &str = "Wise Breakdown";
pub const SHEET_BALANCES: &str = "Account Balances";
pub const SHEET_TRANSACTIONS: &str = "Transactions";

#[derive(Debug, Clone, PartialEq)]
struct Transaction {
    row: usize,
    date: Option<NaiveDate>,
    amount: f64,
    to: String,
    from: String,
    category: String,
    description: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct MonthlyMetrics {
    pub expenses: f64,
    pub income: f64,
    pub wise: f64,
    pub net_balance: f64,
    pub expense_breakdown: BTreeMap<String, f64>,
    pub income_breakdown: BTreeMap<String, f64>,
    pub wise_breakdown: BTreeMap<String, f64>,
}

/// Percentage change against the previous month, zero when there is nothing
/// to compare with.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct MonthChange {
    pub expenses_pct: f64,
    pub income_pct: f64,
    pub wise_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExpenseShare {
    pub category: String,
    pub amount: f64,
    pub share_pct: f64,
}

#[derive(Debug, Clone)]
pub struct FinancialReport {
    pub month: NaiveDate,
    pub previous_month: NaiveDate,
    pub current: MonthlyMetrics,
    pub previous: MonthlyMetrics,
    pub change: MonthChange,
    pub opening_balances: BTreeMap<String, f64>,
    pub closing_balances: BTreeMap<String, f64>,
    pub top_expenses: Vec<ExpenseShare>,
    pub transactions: RecordTable,
    pub warnings: Vec<ReportWarning>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FinancialReportSummary {
    pub month: String,
    pub previous_month: String,
    pub current: MonthlyMetrics,
    pub previous: MonthlyMetrics,
    pub change: MonthChange,
    pub closing_balances: BTreeMap<String, f64>,
    pub top_expenses: Vec<ExpenseShare>,
    pub warnings: Vec<ReportWarning>,
}

pub fn pct_change(current: f64, previous: f64) -> f64 {
    if previous == 0.0 {
        0.0
    } else {
        (current - previous) / previous * 100.0
    }
}

/// Months that have at least one dated transaction, newest first.
pub fn available_months(records: &RecordTable) -> Vec<NaiveDate> {
    let Some(date) = records.column(DATE_COLUMN) else {
        return Vec::new();
    };
    let months: BTreeSet<NaiveDate> = (0..records.len())
        .filter_map(|idx| parse_report_date(records.cell(idx, Some(date))))
        .map(month_start)
        .collect();
    months.into_iter().rev().collect()
}

/// Profit and loss for the calendar month containing `month`.
pub fn build(
    records: &RecordTable,
    month: NaiveDate,
    filters: &[CategoricalFilter],
) -> Result<FinancialReport, ReportError> {
    records.require_columns(&[DATE_COLUMN, AMOUNT_COLUMN, TO_COLUMN, FROM_COLUMN])?;
    let records = apply_all(records, filters)?;
    let mut warnings = Vec::new();
    let ledger = read_ledger(&records, &mut warnings);

    let month = month_start(month);
    let window = DateWindow::months(month, month);
    let in_month: Vec<&Transaction> = ledger
        .iter()
        .filter(|txn| txn.date.is_some_and(|date| window.contains(date)))
        .collect();
    if in_month.is_empty() {
        return Err(ReportError::UnknownMonth(month.format("%B %Y").to_string()));
    }

    let previous_month = month.checked_sub_months(Months::new(1)).unwrap_or(month);
    let previous_window = DateWindow::months(previous_month, previous_month);

    let current = monthly_metrics(in_month.iter().copied());
    let previous = monthly_metrics(
        ledger
            .iter()
            .filter(|txn| txn.date.is_some_and(|date| previous_window.contains(date))),
    );
    let change = MonthChange {
        expenses_pct: pct_change(current.expenses, previous.expenses),
        income_pct: pct_change(current.income, previous.income),
        wise_pct: pct_change(current.wise, previous.wise),
    };

    let opening_balances = opening_balances(&records);
    let closing_balances = balances_at(&ledger, &opening_balances, month_end(month));
    let top_expenses = top_expenses(&current);

    let rows: Vec<usize> = in_month.iter().map(|txn| txn.row).collect();
    let transactions = records.select_rows(&rows);

    info!(
        month = %month.format("%Y-%m"),
        transactions = in_month.len(),
        income = current.income,
        expenses = current.expenses,
        "built financial report"
    );

    Ok(FinancialReport {
        month,
        previous_month,
        current,
        previous,
        change,
        opening_balances,
        closing_balances,
        top_expenses,
        transactions,
        warnings,
    })
}

fn read_ledger(records: &RecordTable, warnings: &mut Vec<ReportWarning>) -> Vec<Transaction> {
    let date = records.column(DATE_COLUMN);
    let amount = records.column(AMOUNT_COLUMN);
    let to = records.column(TO_COLUMN);
    let from = records.column(FROM_COLUMN);
    let category = records.column(CATEGORY_COLUMN);
    let description = records.column(DESCRIPTION_COLUMN);

    (0..records.len())
        .map(|idx| {
            let raw_date = records.cell(idx, date);
            let parsed = parse_report_date(raw_date);
            if parsed.is_none() && !raw_date.trim().is_empty() {
                warnings.push(ReportWarning::unreadable_date(records.line(idx), DATE_COLUMN, raw_date));
            }
            let raw_amount = records.cell(idx, amount);
            let value = parse_amount(raw_amount).unwrap_or_else(|| {
                warnings.push(ReportWarning::unreadable_amount(records.line(idx), AMOUNT_COLUMN, raw_amount));
                0.0
            });
            let category = records.cell(idx, category).trim();

            Transaction {
                row: idx,
                date: parsed,
                amount: value,
                to: records.cell(idx, to).trim().to_string(),
                from: records.cell(idx, from).trim().to_string(),
                category: if category.is_empty() {
                    OTHER.to_string()
                } else {
                    category.to_string()
                },
                description: records.cell(idx, description).trim().to_string(),
            }
        })
        .collect()
}

fn wise_category(txn: &Transaction) -> String {
    let text = format!("{} {}", txn.category, txn.description).to_lowercase();
    if text.contains("sales") {
        "Sales".to_string()
    } else if text.contains("ielts") {
        "IELTS".to_string()
    } else if text.contains("commission") {
        "Commission".to_string()
    } else if txn.category != "Transfer" {
        txn.category.clone()
    } else {
        OTHER.to_string()
    }
}

/// Expenses count money moved into `Expense` by absolute value; income and
/// Wise inflows keep their sign.
fn monthly_metrics<'a>(transactions: impl Iterator<Item = &'a Transaction>) -> MonthlyMetrics {
    let mut metrics = MonthlyMetrics::default();
    for txn in transactions {
        if txn.to == EXPENSE_ACCOUNT {
            let amount = txn.amount.abs();
            metrics.expenses += amount;
            *metrics.expense_breakdown.entry(txn.category.clone()).or_default() += amount;
        }
        if txn.from == INCOME_ACCOUNT {
            metrics.income += txn.amount;
            *metrics.income_breakdown.entry(txn.category.clone()).or_default() += txn.amount;
        }
        if txn.from == WISE_ACCOUNT {
            metrics.wise += txn.amount;
            *metrics.wise_breakdown.entry(wise_category(txn)).or_default() += txn.amount;
        }
    }
    metrics.net_balance = metrics.income - metrics.expenses;
    metrics
}

/// First non-zero opening balance listed for each tracked account.
fn opening_balances(records: &RecordTable) -> BTreeMap<String, f64> {
    let mut balances: BTreeMap<String, f64> = TRACKED_ACCOUNTS
        .iter()
        .map(|account| (account.to_string(), 0.0))
        .collect();
    let (Some(account), Some(opening)) = (
        records.column(ACCOUNT_NAME_COLUMN),
        records.column(OPENING_BALANCE_COLUMN),
    ) else {
        return balances;
    };

    for idx in 0..records.len() {
        let name = records.cell(idx, Some(account)).trim();
        let raw = records.cell(idx, Some(opening));
        if raw.trim().is_empty() {
            continue;
        }
        if let Some(balance) = balances.get_mut(name) {
            if *balance == 0.0 {
                *balance = parse_amount(raw).unwrap_or(0.0);
            }
        }
    }
    balances
}

/// Replays every dated transfer up to `until` on top of the opening balances.
fn balances_at(
    ledger: &[Transaction],
    opening: &BTreeMap<String, f64>,
    until: NaiveDate,
) -> BTreeMap<String, f64> {
    let mut balances = opening.clone();
    for txn in ledger {
        if !txn.date.is_some_and(|date| date <= until) {
            continue;
        }
        let amount = txn.amount.abs();
        if let Some(balance) = balances.get_mut(&txn.to) {
            *balance += amount;
        }
        if let Some(balance) = balances.get_mut(&txn.from) {
            *balance -= amount;
        }
    }
    balances
}

fn top_expenses(metrics: &MonthlyMetrics) -> Vec<ExpenseShare> {
    let mut shares: Vec<ExpenseShare> = metrics
        .expense_breakdown
        .iter()
        .map(|(category, amount)| ExpenseShare {
            category: category.clone(),
            amount: *amount,
            share_pct: if metrics.expenses > 0.0 {
                (amount / metrics.expenses * 1000.0).round() / 10.0
            } else {
                0.0
            },
        })
        .collect();
    shares.sort_by(|a, b| b.amount.partial_cmp(&a.amount).unwrap_or(Ordering::Equal));
    shares.truncate(TOP_EXPENSES);
    shares
}

fn breakdown_table(label: &str, breakdown: &BTreeMap<String, f64>) -> SummaryTable {
    SummaryTable::new(
        label,
        ["Amount"],
        breakdown
            .iter()
            .map(|(category, amount)| SummaryRow::new(category.clone(), vec![*amount]))
            .collect(),
    )
}

impl FinancialReport {
    pub fn month_name(&self) -> String {
        self.month.format("%B %Y").to_string()
    }

    pub fn previous_month_name(&self) -> String {
        self.previous_month.format("%B %Y").to_string()
    }

    pub fn expense_table(&self) -> SummaryTable {
        breakdown_table("Category", &self.current.expense_breakdown)
    }

    pub fn income_table(&self) -> SummaryTable {
        breakdown_table("Category", &self.current.income_breakdown)
    }

    pub fn wise_table(&self) -> SummaryTable {
        breakdown_table("Category", &self.current.wise_breakdown)
    }

    pub fn balance_table(&self) -> SummaryTable {
        SummaryTable::new(
            "Account",
            ["Opening Balance", "Closing Balance"],
            TRACKED_ACCOUNTS
                .iter()
                .map(|account| {
                    SummaryRow::new(
                        *account,
                        vec![
                            self.opening_balances.get(*account).copied().unwrap_or(0.0),
                            self.closing_balances.get(*account).copied().unwrap_or(0.0),
                        ],
                    )
                })
                .collect(),
        )
    }

    pub fn sheets(&self) -> Vec<WorkbookSheet> {
        vec![
            metric_sheet(
                SHEET_SUMMARY,
                &[
                    ("Expenses", self.current.expenses),
                    ("Income", self.current.income),
                    ("Transfer from Wise", self.current.wise),
                    ("Net Balance", self.current.net_balance),
                    ("Previous Expenses", self.previous.expenses),
                    ("Previous Income", self.previous.income),
                    ("Previous Wise", self.previous.wise),
                ],
            ),
            self.expense_table().to_sheet(SHEET_EXPENSES),
            self.income_table().to_sheet(SHEET_INCOME),
            self.wise_table().to_sheet(SHEET_WISE),
            self.balance_table().to_sheet(SHEET_BALANCES),
            record_sheet(SHEET_TRANSACTIONS, &self.transactions),
        ]
    }

    pub fn summary(&self) -> FinancialReportSummary {
        FinancialReportSummary {
            month: self.month_name(),
            previous_month: self.previous_month_name(),
            current: self.current.clone(),
            previous: self.previous.clone(),
            change: self.change,
            closing_balances: self.closing_balances.clone(),
            top_expenses: self.top_expenses.clone(),
            warnings: self.warnings.clone(),
        }
    }
}

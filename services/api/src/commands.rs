use crate::infra::{parse_clock_arg, parse_date, parse_filter, parse_month_arg};
use agency_reports::config::{AppConfig, RecipientList, ReportSettings, SettingsStore};
use agency_reports::error::AppError;
use agency_reports::tabular::RecordTable;
use agency_reports::telemetry;
use agency_reports::workflows::agentcis::AgentcisClient;
use agency_reports::workflows::attendance::{AttendanceImporter, AttendanceReport, ThresholdConfig};
use agency_reports::workflows::delivery::emails::{
    attendance_email, coe_email, financial_email, ielts_email, lead_email, visa_email,
    EmailContent,
};
use agency_reports::workflows::delivery::{
    recipients_for, render_workbook, Attachment, Mailer, OutgoingMail, SmtpMailer, WorkbookSheet,
};
use agency_reports::workflows::hr::{
    employee_names, find_employee, generate_letter, EmployeeProfile, HrRosterClient, LetterKind,
};
use agency_reports::workflows::reports::ielts::{period_label, IeltsSources};
use agency_reports::workflows::reports::leads::{CompletedSelection, DEFAULT_COMPLETED_STATUS};
use agency_reports::workflows::reports::{
    coe, financial, ielts, leads, visa, CategoricalFilter, DateWindow, ReportError,
};
use agency_reports::workflows::sheets::SheetFetcher;
use chrono::{Local, NaiveDate, NaiveTime};
use clap::{Args, Subcommand};
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::info;

const MASK: &str = "********";
const SECRET_KEYS: [&str; 2] = ["sender_password", "agentcis_api_token"];

#[derive(Args, Debug, Default)]
pub(crate) struct DeliveryArgs {
    /// Where to write the Excel export (defaults to a dated name in the working directory)
    #[arg(long)]
    pub(crate) out: Option<PathBuf>,
    /// Email the export to the recipients stored in settings
    #[arg(long)]
    pub(crate) email: bool,
}

#[derive(Args, Debug, Default)]
pub(crate) struct ReportArgs {
    /// Keep only rows matching Column=value (exact) or Column~text (contains); repeatable
    #[arg(long = "filter", value_parser = parse_filter)]
    pub(crate) filters: Vec<CategoricalFilter>,
    #[command(flatten)]
    pub(crate) delivery: DeliveryArgs,
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
pub(crate) struct SourceArgs {
    /// CSV or XLSX file on disk
    #[arg(long)]
    pub(crate) file: Option<PathBuf>,
    /// Published CSV export or shared spreadsheet link
    #[arg(long)]
    pub(crate) url: Option<String>,
}

#[derive(Args, Debug)]
pub(crate) struct AttendanceArgs {
    /// Biometric punch export (CSV or XLSX)
    #[arg(long)]
    pub(crate) file: PathBuf,
    /// Arrivals after this time are late (HH:MM)
    #[arg(long, value_parser = parse_clock_arg)]
    pub(crate) late_threshold: Option<NaiveTime>,
    /// Departures before this time are early exits (HH:MM)
    #[arg(long, value_parser = parse_clock_arg)]
    pub(crate) exit_threshold: Option<NaiveTime>,
    /// Hours between first and last punch needed for a full day
    #[arg(long)]
    pub(crate) required_hours: Option<f64>,
    /// Share of late days that marks an employee as chronically late
    #[arg(long)]
    pub(crate) chronic_late_ratio: Option<f64>,
    #[command(flatten)]
    pub(crate) delivery: DeliveryArgs,
}

#[derive(Args, Debug)]
#[group(id = "visa_source", required = true, multiple = false)]
pub(crate) struct VisaSource {
    /// Client export with Visa Type and Visa Expiry Date columns
    #[arg(long)]
    pub(crate) file: Option<PathBuf>,
    /// Pull client details from the CRM instead of a file
    #[arg(long)]
    pub(crate) fetch: bool,
}

#[derive(Args, Debug)]
pub(crate) struct VisaArgs {
    #[command(flatten)]
    pub(crate) source: VisaSource,
    /// Stop after this many clients when fetching
    #[arg(long, requires = "fetch")]
    pub(crate) limit: Option<usize>,
    /// Reporting date (YYYY-MM-DD, defaults to today)
    #[arg(long, value_parser = parse_date)]
    pub(crate) today: Option<NaiveDate>,
    #[command(flatten)]
    pub(crate) report: ReportArgs,
}

#[derive(Args, Debug)]
pub(crate) struct CoeArgs {
    #[command(flatten)]
    pub(crate) source: SourceArgs,
    /// Reporting date (YYYY-MM-DD, defaults to today)
    #[arg(long, value_parser = parse_date)]
    pub(crate) today: Option<NaiveDate>,
    #[command(flatten)]
    pub(crate) report: ReportArgs,
}

#[derive(Args, Debug)]
pub(crate) struct LeadsArgs {
    #[command(flatten)]
    pub(crate) source: SourceArgs,
    /// Status summarised as completed work
    #[arg(long, default_value = DEFAULT_COMPLETED_STATUS)]
    pub(crate) status: String,
    /// First Last Updated date to include (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date, requires = "to")]
    pub(crate) from: Option<NaiveDate>,
    /// Last Last Updated date to include (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date, requires = "from")]
    pub(crate) to: Option<NaiveDate>,
    /// Workflow name to keep in the completed summary; repeatable
    #[arg(long = "workflow")]
    pub(crate) workflows: Vec<String>,
    #[command(flatten)]
    pub(crate) report: ReportArgs,
}

#[derive(Args, Debug)]
pub(crate) struct IeltsArgs {
    /// Payments sheet (path or URL)
    #[arg(long)]
    pub(crate) payments: String,
    /// Enrollment sheet (path or URL)
    #[arg(long)]
    pub(crate) enrollments: String,
    /// Expense sheet (path or URL)
    #[arg(long)]
    pub(crate) expenses: String,
    /// First month of the period (YYYY-MM or "January 2026")
    #[arg(long, value_parser = parse_month_arg)]
    pub(crate) from_month: NaiveDate,
    /// Last month of the period (defaults to the first)
    #[arg(long, value_parser = parse_month_arg)]
    pub(crate) to_month: Option<NaiveDate>,
    #[command(flatten)]
    pub(crate) report: ReportArgs,
}

#[derive(Args, Debug)]
pub(crate) struct FinancialArgs {
    #[command(flatten)]
    pub(crate) source: SourceArgs,
    /// Month to report (defaults to the newest month with transactions)
    #[arg(long, value_parser = parse_month_arg)]
    pub(crate) month: Option<NaiveDate>,
    #[command(flatten)]
    pub(crate) report: ReportArgs,
}

#[derive(Args, Debug)]
#[group(id = "employee_source", required = true, multiple = false)]
pub(crate) struct EmployeeSource {
    /// Employee record as JSON
    #[arg(long)]
    pub(crate) employee_json: Option<PathBuf>,
    /// Pick this employee from the HR roster at `hr_api_url`
    #[arg(long)]
    pub(crate) employee: Option<String>,
}

#[derive(Args, Debug)]
pub(crate) struct HrLetterArgs {
    #[command(flatten)]
    pub(crate) source: EmployeeSource,
    /// Letter template (.docx) with {{Key}} placeholders
    #[arg(long)]
    pub(crate) template: PathBuf,
    /// salary-certificate, experience-letter or employment-contract
    #[arg(long, value_parser = parse_letter_kind, default_value = "salary-certificate")]
    pub(crate) kind: LetterKind,
    /// Letter date (YYYY-MM-DD, defaults to today)
    #[arg(long, value_parser = parse_date)]
    pub(crate) today: Option<NaiveDate>,
    /// Output path (defaults to <Kind>_<Name>.docx)
    #[arg(long)]
    pub(crate) out: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub(crate) enum SettingsCommand {
    /// Print stored settings with secrets masked
    Show,
    /// Store one value, e.g. `settings set sender_email reports@example.com`
    Set { key: String, value: String },
}

fn parse_letter_kind(raw: &str) -> Result<LetterKind, String> {
    match raw.trim().to_ascii_lowercase().replace('_', "-").as_str() {
        "salary-certificate" => Ok(LetterKind::SalaryCertificate),
        "experience-letter" => Ok(LetterKind::ExperienceLetter),
        "employment-contract" => Ok(LetterKind::EmploymentContract),
        other => Err(format!(
            "unknown letter kind '{other}' (salary-certificate, experience-letter, employment-contract)"
        )),
    }
}

struct Context {
    config: AppConfig,
    settings: ReportSettings,
}

impl Context {
    fn load() -> Result<Self, AppError> {
        let config = AppConfig::load()?;
        telemetry::init(&config.telemetry)?;
        let settings = SettingsStore::new(config.reports.settings_path.clone()).load()?;
        Ok(Self { config, settings })
    }

    fn fetcher(&self) -> Result<SheetFetcher, AppError> {
        Ok(SheetFetcher::new(self.config.reports.http_timeout)?)
    }

    async fn load_table(&self, location: &str) -> Result<RecordTable, AppError> {
        if is_url(location) {
            Ok(self.fetcher()?.fetch_table(location).await?)
        } else {
            Ok(RecordTable::from_path(location)?)
        }
    }

    async fn load_source(&self, source: &SourceArgs) -> Result<RecordTable, AppError> {
        match (&source.file, &source.url) {
            (Some(path), _) => Ok(RecordTable::from_path(path)?),
            (None, Some(url)) => Ok(self.fetcher()?.fetch_table(url).await?),
            (None, None) => Err(AppError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "either --file or --url is required",
            ))),
        }
    }

    /// Writes the workbook, then mails it when asked.
    async fn deliver(
        &self,
        sheets: &[WorkbookSheet],
        default_name: String,
        delivery: &DeliveryArgs,
        list: RecipientList,
        email: EmailContent,
    ) -> Result<(), AppError> {
        let bytes = render_workbook(sheets)?;
        let path = delivery
            .out
            .clone()
            .unwrap_or_else(|| PathBuf::from(&default_name));
        std::fs::write(&path, &bytes)?;
        println!("Saved {}", path.display());

        if delivery.email {
            let recipients = recipients_for(&self.settings, list)?;
            let mailer = SmtpMailer::from_settings(&self.settings)?;
            let attachment = Attachment {
                filename: file_name(&path, &default_name),
                content_type: mime_guess::from_path(&path).first_or_octet_stream(),
                bytes,
            };
            let count = recipients.len();
            send_blocking(mailer, email.into_mail(recipients, Some(attachment))).await?;
            println!("Emailed {count} recipient(s)");
        }
        Ok(())
    }
}

/// Runs a synchronous mailer on the blocking pool.
async fn send_blocking<M>(mailer: M, mail: OutgoingMail) -> Result<(), AppError>
where
    M: Mailer + 'static,
{
    let sent = tokio::task::spawn_blocking(move || mailer.send(&mail))
        .await
        .map_err(|err| AppError::Io(std::io::Error::other(err)))?;
    Ok(sent?)
}

fn is_url(location: &str) -> bool {
    let location = location.trim_start();
    location.starts_with("http://") || location.starts_with("https://")
}

fn file_name(path: &Path, fallback: &str) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| fallback.to_string())
}

fn today_or_now(today: Option<NaiveDate>) -> NaiveDate {
    today.unwrap_or_else(|| Local::now().date_naive())
}

fn print_json<T: Serialize>(label: &str, value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{label}:\n{json}"),
        Err(err) => println!("{label} unavailable: {err}"),
    }
}

/// Month span covered by the punches, e.g. `January 2026`.
fn attendance_period(report: &AttendanceReport) -> String {
    let dates = report.daily.iter().map(|record| record.date);
    match (dates.clone().min(), dates.max()) {
        (Some(first), Some(last)) => period_label(&DateWindow::between(first, last)),
        _ => "No data".to_string(),
    }
}

pub(crate) async fn run_attendance(args: AttendanceArgs) -> Result<(), AppError> {
    let ctx = Context::load()?;
    let defaults = ThresholdConfig::default();
    let thresholds = ThresholdConfig {
        late_threshold: args.late_threshold.unwrap_or(defaults.late_threshold),
        exit_threshold: args.exit_threshold.unwrap_or(defaults.exit_threshold),
        required_hours: args.required_hours.unwrap_or(defaults.required_hours),
        chronic_late_ratio: args
            .chronic_late_ratio
            .unwrap_or(defaults.chronic_late_ratio),
    };

    let report = AttendanceImporter::from_path(&args.file, &thresholds)?;
    if report.is_empty() {
        println!("No valid punches found in {}", args.file.display());
        return Ok(());
    }

    let summary = report.summary();
    let period = attendance_period(&report);
    println!(
        "Attendance {period}: {} employees | {:.1}% average attendance | {:.1} h average day",
        summary.employees, summary.avg_attendance_pct, summary.avg_work_hours
    );
    if !report.warnings.is_empty() {
        println!("Skipped {} unreadable row(s)", report.warnings.len());
    }
    print_json("Summary", &summary);

    let today = today_or_now(None);
    ctx.deliver(
        &report.sheets(),
        format!("Attendance_Report_{today}.xlsx"),
        &args.delivery,
        RecipientList::Attendance,
        attendance_email(&summary, &period),
    )
    .await
}

pub(crate) async fn run_visa(args: VisaArgs) -> Result<(), AppError> {
    let ctx = Context::load()?;
    let today = today_or_now(args.today);

    let records = match args.source.file {
        Some(path) => RecordTable::from_path(path)?,
        None => {
            let client =
                AgentcisClient::from_settings(&ctx.settings, ctx.config.reports.http_timeout)?;
            let fetched = client.fetch_visa_records(args.limit).await?;
            println!(
                "Fetched {} of {} clients ({} skipped)",
                fetched.records.len(),
                fetched.clients_listed,
                fetched.warnings.len()
            );
            fetched.records
        }
    };

    let window = DateWindow::upcoming(today, visa::WINDOW_DAYS);
    let report = visa::build(&records, &window, &args.report.filters)?;
    let summary = report.summary();
    println!(
        "{} visas expire by {} ({} subclass 500, {} subclass 485)",
        summary.total, window.end, summary.subclass_500, summary.subclass_485
    );
    print_json("Summary", &summary);

    ctx.deliver(
        &report.sheets(),
        format!("Weekly_Report_{today}.xlsx"),
        &args.report.delivery,
        RecipientList::Visa,
        visa_email(&summary, today),
    )
    .await
}

pub(crate) async fn run_coe(args: CoeArgs) -> Result<(), AppError> {
    let ctx = Context::load()?;
    let today = today_or_now(args.today);
    let records = ctx.load_source(&args.source).await?;

    let window = DateWindow::upcoming(today, coe::WINDOW_DAYS);
    let report = coe::build(&records, &window, &args.report.filters)?;
    let summary = report.summary();
    println!(
        "{} of {} students have a COE ending by {}",
        summary.expiring, summary.total_students, window.end
    );
    print_json("Summary", &summary);

    ctx.deliver(
        &report.sheets(),
        format!("COE_Report_{today}.xlsx"),
        &args.report.delivery,
        RecipientList::Coe,
        coe_email(&summary, today),
    )
    .await
}

pub(crate) async fn run_leads(args: LeadsArgs) -> Result<(), AppError> {
    let ctx = Context::load()?;
    let today = today_or_now(None);
    let records = ctx.load_source(&args.source).await?;

    let selection = CompletedSelection {
        status: args.status,
        window: args.from.zip(args.to).map(|(from, to)| DateWindow::between(from, to)),
        workflows: args.workflows,
    };
    let report = leads::build(&records, &selection, &args.report.filters)?;
    let summary = report.summary();
    println!(
        "{} applications in progress, {} marked {}",
        summary.in_progress, summary.completed, selection.status
    );
    print_json("Summary", &summary);

    ctx.deliver(
        &report.sheets(),
        format!("Application_Summary_{today}.xlsx"),
        &args.report.delivery,
        RecipientList::Leads,
        lead_email(&summary, today),
    )
    .await
}

pub(crate) async fn run_ielts(args: IeltsArgs) -> Result<(), AppError> {
    let ctx = Context::load()?;
    let today = today_or_now(None);
    let sources = IeltsSources {
        payments: ctx.load_table(&args.payments).await?,
        enrollments: ctx.load_table(&args.enrollments).await?,
        expenses: ctx.load_table(&args.expenses).await?,
    };

    let window = DateWindow::months(args.from_month, args.to_month.unwrap_or(args.from_month));
    let report = ielts::build(&sources, &window, &args.report.filters)?;
    let summary = report.summary();
    println!(
        "{}: revenue NPR {:.2}, expenses NPR {:.2}, outstanding NPR {:.2}",
        summary.period, summary.totals.total_revenue, summary.totals.expenses, summary.totals.outstanding
    );
    print_json("Summary", &summary);

    ctx.deliver(
        &report.sheets(),
        format!("IELTS_PTE_Report_{today}.xlsx"),
        &args.report.delivery,
        RecipientList::Ielts,
        ielts_email(&summary),
    )
    .await
}

pub(crate) async fn run_financial(args: FinancialArgs) -> Result<(), AppError> {
    let ctx = Context::load()?;
    let records = ctx.load_source(&args.source).await?;

    let month = match args.month {
        Some(month) => month,
        None => financial::available_months(&records)
            .first()
            .copied()
            .ok_or_else(|| ReportError::UnknownMonth("any month".to_string()))?,
    };
    let report = financial::build(&records, month, &args.report.filters)?;
    let summary = report.summary();
    println!(
        "{}: income NPR {:.2}, expenses NPR {:.2}, net NPR {:.2}",
        summary.month, summary.current.income, summary.current.expenses, summary.current.net_balance
    );
    print_json("Summary", &summary);

    ctx.deliver(
        &report.sheets(),
        format!("Financial_Report_{}.xlsx", month.format("%Y-%m")),
        &args.report.delivery,
        RecipientList::Financial,
        financial_email(&summary),
    )
    .await
}

pub(crate) async fn run_hr_letter(args: HrLetterArgs) -> Result<(), AppError> {
    let profile = match (&args.source.employee_json, &args.source.employee) {
        (Some(path), _) => {
            let raw = std::fs::read_to_string(path)?;
            serde_json::from_str::<EmployeeProfile>(&raw).map_err(|err| {
                AppError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, err))
            })?
        }
        (None, Some(name)) => roster_employee(name).await?,
        (None, None) => {
            return Err(AppError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "either --employee-json or --employee is required",
            )))
        }
    };
    let template = std::fs::read(&args.template)?;

    let document = generate_letter(&template, args.kind, &profile, today_or_now(args.today))?;
    let path = args
        .out
        .unwrap_or_else(|| PathBuf::from(args.kind.file_name(&profile.name)));
    std::fs::write(&path, &document.bytes)?;

    println!("Saved {} for {} to {}", args.kind.label(), profile.name.trim(), path.display());
    for warning in &document.warnings {
        print_json("Unfilled placeholder", warning);
    }
    Ok(())
}

async fn roster_employee(name: &str) -> Result<EmployeeProfile, AppError> {
    let ctx = Context::load()?;
    let client = HrRosterClient::from_settings(&ctx.settings, ctx.config.reports.http_timeout)?;
    let employees = client.fetch_employees().await?;
    find_employee(&employees, name).cloned().ok_or_else(|| {
        AppError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!(
                "no employee named '{}' (roster: {})",
                name.trim(),
                employee_names(&employees).join(", ")
            ),
        ))
    })
}

pub(crate) fn run_settings(command: SettingsCommand) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let store = SettingsStore::new(config.reports.settings_path.clone());
    let mut settings = store.load()?;

    match command {
        SettingsCommand::Show => {
            println!("Settings file: {}", store.path().display());
            print_json("Settings", &masked(&settings));
        }
        SettingsCommand::Set { key, value } => {
            settings.set(&key, &value).map_err(|err| {
                AppError::Io(std::io::Error::new(std::io::ErrorKind::InvalidInput, err))
            })?;
            store.save(&settings)?;
            info!(key = %key, path = %store.path().display(), "updated setting");
            println!("Saved {key}");
        }
    }
    Ok(())
}

fn masked(settings: &ReportSettings) -> Value {
    let mut value = serde_json::to_value(settings).unwrap_or(Value::Null);
    if let Value::Object(object) = &mut value {
        for key in SECRET_KEYS {
            if let Some(Value::String(secret)) = object.get_mut(key) {
                if !secret.is_empty() {
                    *secret = MASK.to_string();
                }
            }
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use agency_reports::workflows::attendance::{classify, PunchEvent};
    use agency_reports::workflows::delivery::{MailBody, MemoryMailer};

    #[test]
    fn secrets_are_masked_but_blanks_stay_blank() {
        let settings = ReportSettings {
            sender_email: "reports@example.com".to_string(),
            sender_password: "app-password".to_string(),
            ..ReportSettings::default()
        };
        let value = masked(&settings);
        assert_eq!(value["sender_password"], MASK);
        assert_eq!(value["agentcis_api_token"], "");
        assert_eq!(value["sender_email"], "reports@example.com");
    }

    #[tokio::test]
    async fn mail_is_sent_from_the_blocking_pool() {
        let mail = |to: Vec<String>| OutgoingMail {
            to,
            subject: "Weekly Visa Report".to_string(),
            body: MailBody::Plain("Hi Team".to_string()),
            attachment: None,
        };
        let mailer = MemoryMailer::default();
        send_blocking(mailer.clone(), mail(vec!["ops@example.com".to_string()]))
            .await
            .expect("sent");
        assert_eq!(mailer.sent().len(), 1);

        assert!(matches!(
            send_blocking(mailer, mail(Vec::new())).await,
            Err(AppError::Send(_))
        ));
    }

    #[test]
    fn letter_kinds_parse_in_either_case() {
        assert_eq!(
            parse_letter_kind("Experience_Letter"),
            Ok(LetterKind::ExperienceLetter)
        );
        assert!(parse_letter_kind("reference").is_err());
    }

    #[test]
    fn urls_are_told_apart_from_paths() {
        assert!(is_url("https://docs.google.com/x/pub?output=csv"));
        assert!(!is_url("data/payments.csv"));
    }

    #[test]
    fn attendance_period_spans_punch_months() {
        let stamp = |raw: &str| {
            chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M").expect("valid stamp")
        };
        let punches = vec![
            PunchEvent::new("Asha", stamp("2026-01-30 09:00")),
            PunchEvent::new("Asha", stamp("2026-01-30 18:00")),
            PunchEvent::new("Asha", stamp("2026-02-02 09:00")),
        ];
        let (daily, stats) = classify(&punches, &ThresholdConfig::default());
        let report = AttendanceReport {
            daily,
            stats,
            warnings: Vec::new(),
        };
        assert_eq!(attendance_period(&report), "Jan 2026 to Feb 2026");
        assert_eq!(attendance_period(&AttendanceReport::default()), "No data");
    }
}

use crate::commands::{
    run_attendance, run_coe, run_financial, run_hr_letter, run_ielts, run_leads, run_settings,
    run_visa, AttendanceArgs, CoeArgs, FinancialArgs, HrLetterArgs, IeltsArgs, LeadsArgs,
    SettingsCommand, VisaArgs,
};
use crate::server;
use agency_reports::error::AppError;
use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "Agency Reports",
    about = "Build, export and email the agency's weekly and monthly back-office reports",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Classify a biometric attendance export against office hours
    Attendance(AttendanceArgs),
    /// Visa expiries in the next 90 days, from a file or the CRM
    Visa(VisaArgs),
    /// COE end dates in the next 180 days
    Coe(CoeArgs),
    /// In-progress and completed application summaries
    Leads(LeadsArgs),
    /// IELTS/PTE revenue, balances and expenses for a range of months
    Ielts(IeltsArgs),
    /// Monthly income, expense and account balance report
    Financial(FinancialArgs),
    /// Fill an HR letter template for one employee
    HrLetter(HrLetterArgs),
    /// Inspect or change stored credentials and recipient lists
    Settings {
        #[command(subcommand)]
        command: SettingsCommand,
    },
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Attendance(args) => run_attendance(args).await,
        Command::Visa(args) => run_visa(args).await,
        Command::Coe(args) => run_coe(args).await,
        Command::Leads(args) => run_leads(args).await,
        Command::Ielts(args) => run_ielts(args).await,
        Command::Financial(args) => run_financial(args).await,
        Command::HrLetter(args) => run_hr_letter(args).await,
        Command::Settings { command } => run_settings(command),
    }
}

use super::EmployeeProfile;
use crate::config::ReportSettings;
use crate::workflows::agentcis::FetchError;
use reqwest::header::ACCEPT;
use serde::Deserialize;
use std::time::Duration;
use tracing::{error, info};

#[derive(Debug, Deserialize)]
struct RosterEnvelope {
    #[serde(default)]
    employees: Vec<EmployeeProfile>,
}

/// Read-only client for the HR roster endpoint, which answers a plain GET
/// with `{"employees": [...]}`.
#[derive(Debug, Clone)]
pub struct HrRosterClient {
    http: reqwest::Client,
    url: String,
}

impl HrRosterClient {
    /// Fails with [`FetchError::MissingCredentials`] when the URL is blank.
    pub fn new(url: &str, timeout: Duration) -> Result<Self, FetchError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(FetchError::MissingCredentials);
        }

        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            url: url.to_string(),
        })
    }

    pub fn from_settings(settings: &ReportSettings, timeout: Duration) -> Result<Self, FetchError> {
        Self::new(&settings.hr_api_url, timeout)
    }

    pub async fn fetch_employees(&self) -> Result<Vec<EmployeeProfile>, FetchError> {
        let response = self
            .http
            .get(&self.url)
            .header(ACCEPT, "application/json")
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            error!(url = %self.url, status = status.as_u16(), "hr roster fetch failed");
            return Err(FetchError::Status {
                url: response.url().to_string(),
                status: status.as_u16(),
            });
        }

        let envelope: RosterEnvelope = response.json().await?;
        info!(employees = envelope.employees.len(), "fetched hr roster");
        Ok(envelope.employees)
    }
}

/// Picks an employee by name, ignoring case and surrounding whitespace.
pub fn find_employee<'a>(employees: &'a [EmployeeProfile], name: &str) -> Option<&'a EmployeeProfile> {
    let wanted = name.trim().to_lowercase();
    employees
        .iter()
        .find(|employee| employee.name.trim().to_lowercase() == wanted)
}

/// Roster names, sorted, for listing choices.
pub fn employee_names(employees: &[EmployeeProfile]) -> Vec<String> {
    let mut names: Vec<String> = employees.iter().map(|e| e.name.trim().to_string()).collect();
    names.sort();
    names
}

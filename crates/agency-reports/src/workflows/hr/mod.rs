//! Employee letters (salary certificates, experience letters, contracts)
//! rendered from `.docx` templates with `{{Key}}` placeholders.

mod roster;
mod words;

pub use roster::{employee_names, find_employee, HrRosterClient};
pub use words::money_in_words;

use crate::tabular::dates::parse_date;
use crate::workflows::delivery::emails::group_thousands;
use crate::workflows::delivery::{render_docx, Placeholders, RenderError, RenderedDocument};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

const DEFAULT_PAN: &str = "N/A";
const DEFAULT_MANAGER: &str = "Office Manager";
const BASIC_SHARE: f64 = 0.6;
const ALLOWANCE_SHARE: f64 = 0.4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LetterKind {
    SalaryCertificate,
    ExperienceLetter,
    EmploymentContract,
}

impl LetterKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::SalaryCertificate => "Salary Certificate",
            Self::ExperienceLetter => "Experience Letter",
            Self::EmploymentContract => "Employment Contract",
        }
    }

    /// `Salary_Certificate_Asha_Rai.docx`
    pub fn file_name(self, employee: &str) -> String {
        let kind = self.label().replace(' ', "_");
        let employee = employee.split_whitespace().collect::<Vec<_>>().join("_");
        format!("{kind}_{employee}.docx")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    /// Anything mentioning "female" is female; every other value,
    /// including blanks, gets the male forms.
    pub fn parse(value: &str) -> Self {
        if value.to_ascii_lowercase().contains("female") {
            Self::Female
        } else {
            Self::Male
        }
    }

    pub const fn title(self) -> &'static str {
        match self {
            Self::Male => "Mr.",
            Self::Female => "Miss",
        }
    }

    /// Subject, object and possessive pronouns, lowercase.
    const fn pronouns(self) -> [&'static str; 3] {
        match self {
            Self::Male => ["he", "him", "his"],
            Self::Female => ["she", "her", "her"],
        }
    }
}

/// One employee record, as kept in the HR sheet or passed as JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmployeeProfile {
    pub name: String,
    pub gender: String,
    pub employee_id: String,
    pub designation: String,
    pub department: String,
    /// Free text as entered; rendered as `dd-mm-YYYY` when it parses.
    pub joining_date: String,
    pub pan: Option<String>,
    pub last_salary: f64,
    pub reporting_manager: Option<String>,
    pub responsibilities: Option<String>,
}

impl EmployeeProfile {
    pub fn gender(&self) -> Gender {
        Gender::parse(&self.gender)
    }

    pub fn placeholders(&self, today: NaiveDate) -> Placeholders {
        let gender = self.gender();
        let title = gender.title();
        let name = self.name.trim();
        let mut map = Placeholders::new();

        map.insert("Name", format!("{title} {name}"));
        map.insert("OnlyName", name);
        map.insert("Title", title);
        for (key, pronoun) in ["He", "Him", "His"].into_iter().zip(gender.pronouns()) {
            map.insert(key.to_ascii_lowercase(), pronoun);
            map.insert(key, capitalize(pronoun));
        }

        map.insert("EmployeeID", self.employee_id.trim());
        map.insert("Designation", self.designation.trim());
        map.insert("Role", self.designation.trim());
        map.insert("Department", self.department.trim());
        map.insert("PAN", non_blank(self.pan.as_deref()).unwrap_or(DEFAULT_PAN));
        map.insert(
            "ReportingManager",
            non_blank(self.reporting_manager.as_deref()).unwrap_or(DEFAULT_MANAGER),
        );
        map.insert(
            "Responsibilities",
            non_blank(self.responsibilities.as_deref()).unwrap_or_default(),
        );

        let joined = parse_date(&self.joining_date);
        let raw_join = self.joining_date.trim();
        map.insert(
            "JoinDate",
            joined.map_or_else(|| raw_join.to_string(), |d| d.format("%d-%m-%Y").to_string()),
        );
        map.insert(
            "JoinMonthYear",
            joined.map_or_else(|| raw_join.to_string(), |d| d.format("%B %Y").to_string()),
        );

        let salary = self.last_salary;
        let words = money_in_words(salary);
        map.insert("Salary", group_thousands(salary, 2));
        map.insert("BasicSalary", group_thousands(salary * BASIC_SHARE, 2));
        map.insert("DearnessAllowance", group_thousands(salary * ALLOWANCE_SHARE, 2));
        map.insert("SalaryWords", words.clone());
        map.insert("SalaryInWords", words);

        map.insert("Date", ordinal_date(today));
        map
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// `January 29th, 2026`
pub fn ordinal_date(date: NaiveDate) -> String {
    let day = date.day();
    let suffix = match day {
        4..=20 | 24..=30 => "th",
        _ => match day % 10 {
            1 => "st",
            2 => "nd",
            _ => "rd",
        },
    };
    format!("{} {day}{suffix}, {}", date.format("%B"), date.year())
}

/// Fills a letter template for one employee. Tokens the profile cannot
/// supply stay in the document and come back as warnings.
pub fn generate_letter(
    template: &[u8],
    kind: LetterKind,
    profile: &EmployeeProfile,
    today: NaiveDate,
) -> Result<RenderedDocument, RenderError> {
    let document = render_docx(template, &profile.placeholders(today))?;
    if document.warnings.is_empty() {
        info!(kind = kind.label(), employee = %profile.name, "generated letter");
    } else {
        warn!(
            kind = kind.label(),
            employee = %profile.name,
            unmatched = document.warnings.len(),
            "letter has unfilled placeholders"
        );
    }
    Ok(document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::delivery::template::tests::{docx_with_body, document_text};
    use crate::workflows::delivery::TemplateWarning;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn asha() -> EmployeeProfile {
        EmployeeProfile {
            name: " Asha Rai ".into(),
            gender: "Female".into(),
            employee_id: "EMP-014".into(),
            designation: "Counsellor".into(),
            department: "Admissions".into(),
            joining_date: "2024-03-15".into(),
            pan: None,
            last_salary: 125000.0,
            reporting_manager: Some("  ".into()),
            responsibilities: None,
        }
    }

    #[test]
    fn ordinal_suffixes() {
        let dates = [
            (1, "1st"),
            (2, "2nd"),
            (3, "3rd"),
            (11, "11th"),
            (13, "13th"),
            (22, "22nd"),
            (23, "23rd"),
            (29, "29th"),
            (31, "31st"),
        ];
        for (d, expected) in dates {
            assert_eq!(ordinal_date(day(2026, 1, d)), format!("January {expected}, 2026"));
        }
    }

    #[test]
    fn female_profile_placeholders() {
        let map = asha().placeholders(day(2026, 1, 29));
        assert_eq!(map.resolve("Name"), Some("Miss Asha Rai"));
        assert_eq!(map.resolve("OnlyName"), Some("Asha Rai"));
        assert_eq!(map.resolve("He"), Some("She"));
        assert_eq!(map.resolve("he"), Some("she"));
        assert_eq!(map.resolve("his"), Some("her"));
        assert_eq!(map.resolve("Him"), Some("Her"));
        assert_eq!(map.resolve("JoinDate"), Some("15-03-2024"));
        assert_eq!(map.resolve("JoinMonthYear"), Some("March 2024"));
        assert_eq!(map.resolve("Salary"), Some("125,000.00"));
        assert_eq!(map.resolve("BasicSalary"), Some("75,000.00"));
        assert_eq!(map.resolve("DearnessAllowance"), Some("50,000.00"));
        assert_eq!(map.resolve("SalaryInWords"), Some("One Lakh Twenty Five Thousand only"));
        assert_eq!(map.resolve("PAN"), Some("N/A"));
        assert_eq!(map.resolve("ReportingManager"), Some("Office Manager"));
        assert_eq!(map.resolve("Date"), Some("January 29th, 2026"));
        assert_eq!(map.resolve("EmployeeId"), Some("EMP-014"));
    }

    #[test]
    fn male_default_and_raw_join_date() {
        let profile = EmployeeProfile {
            name: "Bikash".into(),
            joining_date: "sometime in spring".into(),
            ..EmployeeProfile::default()
        };
        let map = profile.placeholders(day(2026, 2, 2));
        assert_eq!(map.resolve("Name"), Some("Mr. Bikash"));
        assert_eq!(map.resolve("His"), Some("His"));
        assert_eq!(map.resolve("JoinDate"), Some("sometime in spring"));
        assert_eq!(map.resolve("SalaryWords"), Some("Zero"));
    }

    #[test]
    fn profiles_parse_from_partial_json() {
        let profile: EmployeeProfile = serde_json::from_value(serde_json::json!({
            "name": "Asha Rai",
            "gender": "female",
            "last_salary": 40000
        }))
        .expect("profile parses");
        assert_eq!(profile.gender(), Gender::Female);
        assert_eq!(profile.last_salary, 40000.0);
        assert!(profile.pan.is_none());
    }

    #[test]
    fn letters_fill_template_and_report_gaps() {
        let template = docx_with_body(
            "<w:p><w:r><w:t>This is to certify that {{Name}} earns NPR {{Salary}} ({{SalaryWords}}). {{Signatory}}</w:t></w:r></w:p>",
        );
        let document =
            generate_letter(&template, LetterKind::SalaryCertificate, &asha(), day(2026, 1, 29))
                .expect("letter renders");
        let xml = document_text(&document.bytes);
        assert!(xml.contains(
            "This is to certify that Miss Asha Rai earns NPR 125,000.00 \
             (One Lakh Twenty Five Thousand only)."
        ));
        assert_eq!(
            document.warnings,
            vec![TemplateWarning::Unmatched {
                token: "{{Signatory}}".to_string()
            }]
        );
    }

    #[test]
    fn letter_file_names() {
        assert_eq!(
            LetterKind::ExperienceLetter.file_name(" Asha  Rai "),
            "Experience_Letter_Asha_Rai.docx"
        );
    }
}

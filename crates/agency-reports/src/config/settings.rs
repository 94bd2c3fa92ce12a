use super::ConfigError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Credentials and recipient lists shared by every report. Stored as a flat
/// JSON object; absent keys read as empty strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportSettings {
    #[serde(default)]
    pub agentcis_api_token: String,
    #[serde(default)]
    pub agentcis_base_url: String,
    #[serde(default)]
    pub hr_api_url: String,
    #[serde(default)]
    pub sender_email: String,
    #[serde(default)]
    pub sender_password: String,
    #[serde(default)]
    pub recipients: String,
    #[serde(default)]
    pub coe_recipients: String,
    #[serde(default)]
    pub lead_recipients: String,
    #[serde(default)]
    pub ielts_recipients: String,
    #[serde(default)]
    pub attendance_recipients: String,
    #[serde(default)]
    pub financial_recipients: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Which recipient list a report is mailed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecipientList {
    Visa,
    Coe,
    Leads,
    Ielts,
    Attendance,
    Financial,
}

impl ReportSettings {
    /// Recipient string for a report, falling back to the shared `recipients`
    /// list when the report-specific one is blank.
    pub fn recipients_for(&self, list: RecipientList) -> &str {
        let specific = match list {
            RecipientList::Visa => "",
            RecipientList::Coe => self.coe_recipients.as_str(),
            RecipientList::Leads => self.lead_recipients.as_str(),
            RecipientList::Ielts => self.ielts_recipients.as_str(),
            RecipientList::Attendance => self.attendance_recipients.as_str(),
            RecipientList::Financial => self.financial_recipients.as_str(),
        };

        if specific.trim().is_empty() {
            self.recipients.as_str()
        } else {
            specific
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        let value = serde_json::to_value(self).ok()?;
        match value.get(key)? {
            Value::String(text) => Some(text.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Sets a key by name. Unknown keys are kept in `extra` so hand-edited
    /// files survive a round trip.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), serde_json::Error> {
        let mut object = match serde_json::to_value(&*self)? {
            Value::Object(object) => object,
            _ => Map::new(),
        };
        object.insert(key.to_string(), Value::String(value.to_string()));
        *self = serde_json::from_value(Value::Object(object))?;
        Ok(())
    }
}

/// Single owner of the settings file. Reads happen once per invocation and
/// every write goes through [`SettingsStore::save`].
#[derive(Debug)]
pub struct SettingsStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<ReportSettings, ConfigError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(ReportSettings::default()),
            Err(source) => {
                return Err(ConfigError::SettingsIo {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        if raw.trim().is_empty() {
            return Ok(ReportSettings::default());
        }

        serde_json::from_str(&raw).map_err(|source| ConfigError::SettingsFormat {
            path: self.path.clone(),
            source,
        })
    }

    pub fn save(&self, settings: &ReportSettings) -> Result<(), ConfigError> {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let body =
            serde_json::to_string_pretty(settings).map_err(|source| ConfigError::SettingsFormat {
                path: self.path.clone(),
                source,
            })?;

        let staging = self.path.with_extension("json.tmp");
        fs::write(&staging, body)
            .and_then(|_| fs::rename(&staging, &self.path))
            .map_err(|source| ConfigError::SettingsIo {
                path: self.path.clone(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn scratch_path(label: &str) -> PathBuf {
        static COUNTER: AtomicUsize = AtomicUsize::new(0);
        let n = COUNTER.fetch_add(1, Ordering::Relaxed);
        std::env::temp_dir().join(format!(
            "agency-settings-{}-{}-{}.json",
            label,
            std::process::id(),
            n
        ))
    }

    #[test]
    fn missing_file_loads_empty_defaults() {
        let store = SettingsStore::new(scratch_path("missing"));
        let settings = store.load().expect("defaults");
        assert_eq!(settings, ReportSettings::default());
        assert_eq!(settings.sender_email, "");
    }

    #[test]
    fn missing_keys_default_to_empty_strings() {
        let path = scratch_path("partial");
        fs::write(&path, r#"{"sender_email":"ops@example.com"}"#).expect("write");
        let settings = SettingsStore::new(&path).load().expect("loads");
        assert_eq!(settings.sender_email, "ops@example.com");
        assert_eq!(settings.agentcis_api_token, "");
        fs::remove_file(path).ok();
    }

    #[test]
    fn save_round_trips_and_keeps_unknown_keys() {
        let path = scratch_path("roundtrip");
        fs::write(&path, r#"{"recipients":"a@example.com","legacy_flag":"yes"}"#).expect("write");
        let store = SettingsStore::new(&path);
        let mut settings = store.load().expect("loads");
        settings
            .set("coe_recipients", "coe@example.com")
            .expect("set known key");
        store.save(&settings).expect("saves");

        let reloaded = store.load().expect("reloads");
        assert_eq!(reloaded.coe_recipients, "coe@example.com");
        assert_eq!(reloaded.get("legacy_flag").as_deref(), Some("yes"));
        fs::remove_file(path).ok();
    }

    #[test]
    fn malformed_json_is_reported() {
        let path = scratch_path("broken");
        fs::write(&path, "{not json").expect("write");
        let err = SettingsStore::new(&path).load().expect_err("malformed");
        assert!(matches!(err, ConfigError::SettingsFormat { .. }));
        fs::remove_file(path).ok();
    }

    #[test]
    fn report_specific_recipients_fall_back_to_shared_list() {
        let settings = ReportSettings {
            recipients: "team@example.com".to_string(),
            coe_recipients: "coe@example.com".to_string(),
            ..ReportSettings::default()
        };
        assert_eq!(settings.recipients_for(RecipientList::Coe), "coe@example.com");
        assert_eq!(settings.recipients_for(RecipientList::Leads), "team@example.com");
        assert_eq!(settings.recipients_for(RecipientList::Visa), "team@example.com");
    }
}

use serde::{Deserialize, Deserializer};

/// Columns of the visa roster built from client details.
pub const VISA_COLUMNS: [&str; 5] = [
    "Client Name",
    "Visa Type",
    "Visa Expiry Date",
    "Email",
    "Phone",
];

#[derive(Debug, Deserialize)]
pub(crate) struct Page<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
    #[serde(default)]
    pub meta: Option<PageMeta>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct PageMeta {
    #[serde(default)]
    pub last_page: Option<u32>,
}

/// One entry of the paginated client list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClientSummary {
    #[serde(default, deserialize_with = "client_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DetailEnvelope {
    #[serde(default)]
    pub data: ClientDetail,
}

/// Client detail record. Every field is optional upstream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ClientDetail {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub visa_type: Option<String>,
    #[serde(default)]
    pub visa_expiry_date: Option<ActualDate>,
    #[serde(default)]
    pub email: Option<EmailField>,
    #[serde(default)]
    pub phone: Option<PhoneField>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ActualDate {
    #[serde(default)]
    pub actual: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct EmailField {
    #[serde(default)]
    pub primary: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PhoneField {
    #[serde(default)]
    pub formatted: Option<String>,
}

impl ClientDetail {
    /// Cells in [`VISA_COLUMNS`] order; absent values become blanks.
    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.full_name.clone().unwrap_or_default(),
            self.visa_type.clone().unwrap_or_default(),
            self.visa_expiry_date
                .as_ref()
                .and_then(|date| date.actual.clone())
                .unwrap_or_default(),
            self.email
                .as_ref()
                .and_then(|email| email.primary.clone())
                .unwrap_or_default(),
            self.phone
                .as_ref()
                .and_then(|phone| phone.formatted.clone())
                .unwrap_or_default(),
        ]
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Number(u64),
    Text(String),
}

fn client_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<RawId>::deserialize(deserializer)?
        .map(|raw| match raw {
            RawId::Number(value) => value.to_string(),
            RawId::Text(value) => value.trim().to_string(),
        })
        .filter(|id| !id.is_empty()))
}

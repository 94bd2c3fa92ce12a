use crate::config::{RecipientList, ReportSettings};
use lettre::message::header::ContentType;
use lettre::message::{Attachment as MailAttachment, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use std::sync::{Arc, Mutex};
use tracing::{error, info};

pub const SMTP_HOST: &str = "smtp.gmail.com";
pub const SMTP_PORT: u16 = 587;

pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

#[derive(Debug, thiserror::Error)]
pub enum SendError {
    #[error("sender email and app password must be configured before sending")]
    MissingCredentials,
    #[error("no recipients configured")]
    NoRecipients,
    #[error("invalid address {address}: {reason}")]
    InvalidAddress { address: String, reason: String },
    #[error("could not build message: {0}")]
    Message(String),
    #[error("smtp delivery failed: {0}")]
    Transport(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MailBody {
    Plain(String),
    Html(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    pub filename: String,
    pub content_type: mime::Mime,
    pub bytes: Vec<u8>,
}

impl Attachment {
    /// Wraps a rendered workbook.
    pub fn xlsx(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            content_type: XLSX_CONTENT_TYPE
                .parse()
                .unwrap_or(mime::APPLICATION_OCTET_STREAM),
            bytes,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingMail {
    pub to: Vec<String>,
    pub subject: String,
    pub body: MailBody,
    pub attachment: Option<Attachment>,
}

/// Outbound mail boundary. Implementations make one attempt per call.
pub trait Mailer: Send + Sync {
    fn send(&self, mail: &OutgoingMail) -> Result<(), SendError>;
}

/// Splits a comma separated recipient string, dropping blanks.
pub fn parse_recipients(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|address| !address.is_empty())
        .map(str::to_string)
        .collect()
}

/// Recipients for a report from settings, or [`SendError::NoRecipients`].
pub fn recipients_for(
    settings: &ReportSettings,
    list: RecipientList,
) -> Result<Vec<String>, SendError> {
    let recipients = parse_recipients(settings.recipients_for(list));
    if recipients.is_empty() {
        Err(SendError::NoRecipients)
    } else {
        Ok(recipients)
    }
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub sender_email: String,
    pub sender_password: String,
}

impl SmtpConfig {
    pub fn from_settings(settings: &ReportSettings) -> Result<Self, SendError> {
        let sender_email = settings.sender_email.trim();
        let sender_password = settings.sender_password.trim();
        if sender_email.is_empty() || sender_password.is_empty() {
            return Err(SendError::MissingCredentials);
        }

        Ok(Self {
            host: SMTP_HOST.to_string(),
            port: SMTP_PORT,
            sender_email: sender_email.to_string(),
            sender_password: sender_password.to_string(),
        })
    }
}

/// STARTTLS submission with an email address and app password.
#[derive(Debug, Clone)]
pub struct SmtpMailer {
    config: SmtpConfig,
}

impl SmtpMailer {
    pub fn new(config: SmtpConfig) -> Self {
        Self { config }
    }

    pub fn from_settings(settings: &ReportSettings) -> Result<Self, SendError> {
        SmtpConfig::from_settings(settings).map(Self::new)
    }

    fn build_message(&self, mail: &OutgoingMail) -> Result<Message, SendError> {
        if mail.to.is_empty() {
            return Err(SendError::NoRecipients);
        }

        let mut builder = Message::builder()
            .from(parse_mailbox(&self.config.sender_email)?)
            .subject(mail.subject.clone());
        for address in &mail.to {
            builder = builder.to(parse_mailbox(address)?);
        }

        let body = match &mail.body {
            MailBody::Plain(text) => SinglePart::plain(text.clone()),
            MailBody::Html(html) => SinglePart::html(html.clone()),
        };

        let mut parts = MultiPart::mixed().singlepart(body);
        if let Some(attachment) = &mail.attachment {
            let content_type = ContentType::parse(attachment.content_type.as_ref())
                .map_err(|err| SendError::Message(err.to_string()))?;
            parts = parts.singlepart(
                MailAttachment::new(attachment.filename.clone())
                    .body(attachment.bytes.clone(), content_type),
            );
        }

        builder
            .multipart(parts)
            .map_err(|err| SendError::Message(err.to_string()))
    }
}

impl Mailer for SmtpMailer {
    fn send(&self, mail: &OutgoingMail) -> Result<(), SendError> {
        let message = self.build_message(mail)?;

        let transport = SmtpTransport::starttls_relay(&self.config.host)
            .map_err(|err| SendError::Transport(err.to_string()))?
            .port(self.config.port)
            .credentials(Credentials::new(
                self.config.sender_email.clone(),
                self.config.sender_password.clone(),
            ))
            .build();

        match transport.send(&message) {
            Ok(_) => {
                info!(recipients = mail.to.len(), subject = %mail.subject, "report email sent");
                Ok(())
            }
            Err(err) => {
                error!(error = %err, subject = %mail.subject, "report email failed");
                Err(SendError::Transport(err.to_string()))
            }
        }
    }
}

fn parse_mailbox(address: &str) -> Result<lettre::message::Mailbox, SendError> {
    address
        .parse()
        .map_err(|err: lettre::address::AddressError| SendError::InvalidAddress {
            address: address.to_string(),
            reason: err.to_string(),
        })
}

/// Collects mail instead of sending it.
#[derive(Debug, Default, Clone)]
pub struct MemoryMailer {
    sent: Arc<Mutex<Vec<OutgoingMail>>>,
}

impl MemoryMailer {
    pub fn sent(&self) -> Vec<OutgoingMail> {
        self.sent
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl Mailer for MemoryMailer {
    fn send(&self, mail: &OutgoingMail) -> Result<(), SendError> {
        if mail.to.is_empty() {
            return Err(SendError::NoRecipients);
        }
        self.sent
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(mail.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> ReportSettings {
        ReportSettings {
            sender_email: "reports@example.com".to_string(),
            sender_password: "app-password".to_string(),
            recipients: " a@example.com, ,b@example.com ".to_string(),
            ..ReportSettings::default()
        }
    }

    fn mail(to: Vec<String>) -> OutgoingMail {
        OutgoingMail {
            to,
            subject: "Weekly Visa Report".to_string(),
            body: MailBody::Plain("Hi Team".to_string()),
            attachment: Some(Attachment::xlsx("visa.xlsx", b"PK".to_vec())),
        }
    }

    #[test]
    fn recipients_are_split_and_trimmed() {
        assert_eq!(
            parse_recipients(" a@example.com, ,b@example.com "),
            vec!["a@example.com".to_string(), "b@example.com".to_string()]
        );
        assert!(parse_recipients("  ").is_empty());
    }

    #[test]
    fn blank_credentials_fail_before_connecting() {
        let err = SmtpMailer::from_settings(&ReportSettings::default()).expect_err("missing");
        assert!(matches!(err, SendError::MissingCredentials));
    }

    #[test]
    fn blank_recipient_lists_are_rejected() {
        let err = recipients_for(&ReportSettings::default(), RecipientList::Coe)
            .expect_err("no recipients");
        assert!(matches!(err, SendError::NoRecipients));
        assert_eq!(
            recipients_for(&settings(), RecipientList::Coe).expect("shared list"),
            vec!["a@example.com".to_string(), "b@example.com".to_string()]
        );
    }

    #[test]
    fn message_carries_attachment() {
        let mailer = SmtpMailer::from_settings(&settings()).expect("configured");
        let message = mailer
            .build_message(&mail(vec!["ops@example.com".to_string()]))
            .expect("builds");
        let raw = String::from_utf8_lossy(&message.formatted()).to_string();
        assert!(raw.contains("Subject: Weekly Visa Report"));
        assert!(raw.contains("visa.xlsx"));
        assert!(raw.contains(XLSX_CONTENT_TYPE));
    }

    #[test]
    fn invalid_addresses_are_reported() {
        let mailer = SmtpMailer::from_settings(&settings()).expect("configured");
        let err = mailer
            .build_message(&mail(vec!["not-an-address".to_string()]))
            .expect_err("invalid");
        assert!(matches!(err, SendError::InvalidAddress { .. }));
    }

    #[test]
    fn memory_mailer_records_sends() {
        let mailer = MemoryMailer::default();
        mailer
            .send(&mail(vec!["ops@example.com".to_string()]))
            .expect("sent");
        assert_eq!(mailer.sent().len(), 1);
        assert!(matches!(mailer.send(&mail(Vec::new())), Err(SendError::NoRecipients)));
    }
}

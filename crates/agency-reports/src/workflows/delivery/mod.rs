//! Everything that leaves the process: workbooks, rendered documents and mail.

pub mod emails;
pub mod mailer;
pub mod template;
pub mod workbook;

pub use mailer::{
    parse_recipients, recipients_for, Attachment, MailBody, Mailer, MemoryMailer, OutgoingMail,
    SendError, SmtpConfig, SmtpMailer,
};
pub use template::{
    render_docx, render_template, render_text, Placeholders, Rendered, RenderedDocument,
    TemplateWarning,
};
pub use workbook::{render_workbook, CellValue, WorkbookSheet};

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("failed to write workbook: {0}")]
    Workbook(#[from] rust_xlsxwriter::XlsxError),
    #[error("invalid document archive: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("failed to read template: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid document xml: {0}")]
    Xml(String),
    #[error("workbook needs at least one sheet")]
    NoSheets,
    #[error("template has no word/document.xml part")]
    MissingDocumentPart,
}

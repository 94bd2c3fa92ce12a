//! Downloads of published spreadsheet exports and shared file links.

use crate::tabular::{RecordTable, SourceFormat};
use crate::workflows::agentcis::FetchError;
use reqwest::header::CONTENT_TYPE;
use std::io::Cursor;
use std::time::Duration;
use tracing::{error, info};

const USER_AGENT: &str = "Mozilla/5.0 (compatible; agency-reports)";
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

/// Turns a Dropbox share link into a direct download (`dl=1`). Other URLs
/// come back unchanged.
pub fn direct_download_url(url: &str) -> String {
    let url = url.trim();
    if !url.contains("dropbox.com") {
        return url.to_string();
    }
    if url.contains("dl=0") {
        url.replace("dl=0", "dl=1")
    } else if url.contains("dl=1") {
        url.to_string()
    } else if url.contains('?') {
        format!("{url}&dl=1")
    } else {
        format!("{url}?dl=1")
    }
}

#[derive(Debug, Clone)]
pub struct SheetFetcher {
    http: reqwest::Client,
}

impl SheetFetcher {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { http })
    }

    /// Raw file bytes. An HTML response means a login or preview page was
    /// served instead of the file and is rejected.
    pub async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let url = direct_download_url(url);
        let response = self.http.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            error!(url = %url, status = status.as_u16(), "sheet download failed");
            return Err(FetchError::Status {
                url,
                status: status.as_u16(),
            });
        }

        let is_html = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.to_ascii_lowercase().contains("text/html"));
        if is_html {
            error!(url = %url, "sheet link returned a web page");
            return Err(FetchError::UnexpectedHtml { url });
        }

        let bytes = response.bytes().await?.to_vec();
        info!(url = %url, bytes = bytes.len(), "downloaded sheet");
        Ok(bytes)
    }

    /// A published CSV export, such as a Google Sheets `output=csv` link.
    pub async fn fetch_csv(&self, url: &str) -> Result<RecordTable, FetchError> {
        let bytes = self.fetch_bytes(url).await?;
        Ok(RecordTable::from_csv_reader(Cursor::new(bytes))?)
    }

    /// CSV or workbook, told apart by the zip signature of `.xlsx` files.
    pub async fn fetch_table(&self, url: &str) -> Result<RecordTable, FetchError> {
        let bytes = self.fetch_bytes(url).await?;
        let format = if bytes.starts_with(ZIP_MAGIC) {
            SourceFormat::Spreadsheet
        } else {
            SourceFormat::Csv
        };
        Ok(RecordTable::from_bytes(bytes, format)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::delivery::workbook::{render_workbook, WorkbookSheet};
    use axum::http::header;
    use axum::routing::get;
    use axum::Router;

    async fn spawn_fake() -> String {
        let workbook = render_workbook(&[WorkbookSheet::new("Sheet1", ["Student", "COE End Date"])
            .with_rows([vec!["Asha".into(), "2026-03-01".into()]])])
        .expect("workbook renders");

        let router = Router::new()
            .route(
                "/export.csv",
                get(|| async { ([(header::CONTENT_TYPE, "text/csv")], "Name,Month\nAsha,2026-01\n") }),
            )
            .route(
                "/login",
                get(|| async { ([(header::CONTENT_TYPE, "text/html; charset=utf-8")], "<html></html>") }),
            )
            .route(
                "/report.xlsx",
                get(move || {
                    let workbook = workbook.clone();
                    async move { ([(header::CONTENT_TYPE, "application/octet-stream")], workbook) }
                }),
            );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake host");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, router).await.expect("fake host serves");
        });
        format!("http://{addr}")
    }

    #[test]
    fn dropbox_links_become_direct_downloads() {
        assert_eq!(
            direct_download_url("https://www.dropbox.com/s/abc/report.xlsx?dl=0"),
            "https://www.dropbox.com/s/abc/report.xlsx?dl=1"
        );
        assert_eq!(
            direct_download_url("https://www.dropbox.com/scl/fi/abc/report.xlsx?rlkey=x"),
            "https://www.dropbox.com/scl/fi/abc/report.xlsx?rlkey=x&dl=1"
        );
        assert_eq!(
            direct_download_url("https://www.dropbox.com/s/abc/report.xlsx"),
            "https://www.dropbox.com/s/abc/report.xlsx?dl=1"
        );
        assert_eq!(
            direct_download_url("https://docs.google.com/x/pub?output=csv"),
            "https://docs.google.com/x/pub?output=csv"
        );
    }

    #[tokio::test]
    async fn csv_exports_load_as_tables() {
        let base = spawn_fake().await;
        let fetcher = SheetFetcher::new(Duration::from_secs(5)).expect("fetcher");
        let table = fetcher
            .fetch_csv(&format!("{base}/export.csv"))
            .await
            .expect("csv table");
        assert_eq!(table.headers(), &["Name".to_string(), "Month".to_string()]);
        assert_eq!(table.len(), 1);
    }

    #[tokio::test]
    async fn html_pages_are_rejected() {
        let base = spawn_fake().await;
        let fetcher = SheetFetcher::new(Duration::from_secs(5)).expect("fetcher");
        let err = fetcher
            .fetch_table(&format!("{base}/login"))
            .await
            .expect_err("html rejected");
        assert!(matches!(err, FetchError::UnexpectedHtml { .. }));
    }

    #[tokio::test]
    async fn workbooks_are_detected_by_signature() {
        let base = spawn_fake().await;
        let fetcher = SheetFetcher::new(Duration::from_secs(5)).expect("fetcher");
        let table = fetcher
            .fetch_table(&format!("{base}/report.xlsx"))
            .await
            .expect("xlsx table");
        assert_eq!(table.column("COE End Date"), Some(1));
        assert_eq!(table.cell(0, Some(0)), "Asha");
    }
}

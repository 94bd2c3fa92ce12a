//! Agentcis CRM REST client: paginated client roster plus a bounded,
//! concurrent fan-out over per-client detail records.

mod client;
pub mod schema;

pub use client::{
    AgentcisClient, DetailBatch, FetchWarning, VisaFetch, CLIENT_DETAIL_PATH, CLIENT_LIST_PATH,
    DEFAULT_CONCURRENCY, DEFAULT_PAGE_SIZE, DEFAULT_TIMEOUT,
};
pub use schema::{ClientDetail, ClientSummary, VISA_COLUMNS};

use crate::tabular::TableError;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("endpoint URL and credentials must be configured before fetching")]
    MissingCredentials,
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("{url} returned a web page instead of a data file; check that the link is shared publicly")]
    UnexpectedHtml { url: String },
    #[error(transparent)]
    Table(#[from] TableError),
}

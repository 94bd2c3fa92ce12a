use super::schema::{ClientDetail, ClientSummary, DetailEnvelope, Page, VISA_COLUMNS};
use super::FetchError;
use crate::config::ReportSettings;
use crate::tabular::RecordTable;
use futures::stream::{self, Stream, StreamExt, TryStreamExt};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, error, info, warn};

pub const CLIENT_LIST_PATH: &str = "/api/v2/clients/list";
pub const CLIENT_DETAIL_PATH: &str = "/api/v2/clients";
pub const DEFAULT_PAGE_SIZE: usize = 50;
pub const DEFAULT_CONCURRENCY: usize = 100;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// A client whose detail record could not be used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FetchWarning {
    pub client_id: Option<String>,
    pub reason: String,
}

/// Outcome of a detail fan-out, in completion order. Failed fetches hold
/// `None` and leave a warning.
#[derive(Debug, Clone, Default)]
pub struct DetailBatch {
    pub results: Vec<Option<ClientDetail>>,
    pub warnings: Vec<FetchWarning>,
}

impl DetailBatch {
    pub fn details(&self) -> impl Iterator<Item = &ClientDetail> {
        self.results.iter().flatten()
    }

    pub fn failed(&self) -> usize {
        self.results.iter().filter(|result| result.is_none()).count()
    }
}

#[derive(Debug, Clone)]
pub struct VisaFetch {
    pub records: RecordTable,
    pub clients_listed: usize,
    pub warnings: Vec<FetchWarning>,
}

#[derive(Debug, Clone)]
pub struct AgentcisClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl AgentcisClient {
    /// Fails with [`FetchError::MissingCredentials`] when either value is
    /// blank, before any request is made.
    pub fn new(base_url: &str, token: &str, timeout: Duration) -> Result<Self, FetchError> {
        let base_url = base_url.trim().trim_end_matches('/');
        let token = token.trim();
        if base_url.is_empty() || token.is_empty() {
            return Err(FetchError::MissingCredentials);
        }

        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.to_string(),
            token: token.to_string(),
        })
    }

    pub fn from_settings(settings: &ReportSettings, timeout: Duration) -> Result<Self, FetchError> {
        Self::new(&settings.agentcis_base_url, &settings.agentcis_api_token, timeout)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}{}", self.base_url, path))
            .bearer_auth(&self.token)
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json")
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, FetchError> {
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: response.url().to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response.json::<T>().await?)
    }

    /// Streams items from a page-numbered list endpoint. Stops on an empty
    /// page, a page shorter than `page_size`, or once `meta.last_page` is
    /// reached.
    pub fn paginate<'a, T>(
        &'a self,
        path: &'a str,
        page_size: usize,
    ) -> impl Stream<Item = Result<T, FetchError>> + 'a
    where
        T: DeserializeOwned + 'a,
    {
        stream::try_unfold(Some(1u32), move |next| async move {
            let Some(page) = next else {
                return Ok::<_, FetchError>(None);
            };

            let request = self
                .request(Method::POST, path)
                .json(&json!({ "page": page, "limit": page_size }));
            let body: Page<T> = self.send_json(request).await?;
            if body.data.is_empty() {
                return Ok(None);
            }

            let reached_last = body
                .meta
                .and_then(|meta| meta.last_page)
                .is_some_and(|last| page >= last);
            let done = body.data.len() < page_size || reached_last;
            debug!(page, items = body.data.len(), done, "fetched list page");

            Ok(Some((body.data, (!done).then_some(page + 1))))
        })
        .map_ok(|items| stream::iter(items.into_iter().map(Ok)))
        .try_flatten()
    }

    /// Whole client roster, cut at `limit` when given. A failed page ends the
    /// fetch.
    pub async fn fetch_client_list(
        &self,
        page_size: usize,
        limit: Option<usize>,
    ) -> Result<Vec<ClientSummary>, FetchError> {
        let mut pages = Box::pin(self.paginate::<ClientSummary>(CLIENT_LIST_PATH, page_size));
        let mut clients = Vec::new();

        loop {
            if limit.is_some_and(|limit| clients.len() >= limit) {
                break;
            }
            match pages.try_next().await {
                Ok(Some(client)) => clients.push(client),
                Ok(None) => break,
                Err(err) => {
                    error!(error = %err, fetched = clients.len(), "client list fetch failed");
                    return Err(err);
                }
            }
        }

        info!(clients = clients.len(), "fetched client list");
        Ok(clients)
    }

    pub async fn fetch_client_detail(&self, id: &str) -> Result<ClientDetail, FetchError> {
        let request = self.request(Method::GET, &format!("{CLIENT_DETAIL_PATH}/{id}"));
        let envelope: DetailEnvelope = self.send_json(request).await?;
        Ok(envelope.data)
    }

    /// Fetches details with at most `concurrency` requests in flight. A
    /// failure never cancels the other requests.
    pub async fn fetch_details_concurrently(&self, ids: &[String], concurrency: usize) -> DetailBatch {
        let outcomes: Vec<(String, Result<ClientDetail, FetchError>)> = stream::iter(ids.iter().cloned())
            .map(|id| async move {
                let result = self.fetch_client_detail(&id).await;
                (id, result)
            })
            .buffer_unordered(concurrency.max(1))
            .collect()
            .await;

        let mut batch = DetailBatch::default();
        for (id, outcome) in outcomes {
            match outcome {
                Ok(detail) => batch.results.push(Some(detail)),
                Err(err) => {
                    warn!(client_id = %id, error = %err, "client detail fetch failed");
                    batch.warnings.push(FetchWarning {
                        client_id: Some(id),
                        reason: err.to_string(),
                    });
                    batch.results.push(None);
                }
            }
        }

        info!(
            requested = ids.len(),
            fetched = batch.results.len() - batch.failed(),
            failed = batch.failed(),
            "fetched client details"
        );
        batch
    }

    /// Roster plus details as a table with [`VISA_COLUMNS`].
    pub async fn fetch_visa_records(&self, limit: Option<usize>) -> Result<VisaFetch, FetchError> {
        let clients = self.fetch_client_list(DEFAULT_PAGE_SIZE, limit).await?;

        let mut warnings = Vec::new();
        let mut ids = Vec::with_capacity(clients.len());
        for client in &clients {
            match &client.id {
                Some(id) => ids.push(id.clone()),
                None => warnings.push(FetchWarning {
                    client_id: None,
                    reason: format!(
                        "client '{}' has no id",
                        client.full_name.as_deref().unwrap_or("unknown")
                    ),
                }),
            }
        }

        let batch = self.fetch_details_concurrently(&ids, DEFAULT_CONCURRENCY).await;
        let rows = batch.details().map(ClientDetail::to_row).collect();
        warnings.extend(batch.warnings);

        Ok(VisaFetch {
            records: RecordTable::new(VISA_COLUMNS.iter().map(|c| c.to_string()).collect(), rows),
            clients_listed: clients.len(),
            warnings,
        })
    }
}

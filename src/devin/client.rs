//! HTTP client for the Devin session API.
//!
//! Endpoints used:
//! - `GET  /sessions?limit=&offset=`: paginated listing
//! - `GET  /session/{id}`: detail, including `status_enum`
//! - `DELETE /sessions/{id}`: terminate

use std::time::Duration;

use reqwest::{Client, RequestBuilder, header};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

use crate::retry::{RetryConfig, retry_with_backoff};
use crate::types::{PrUrl, SessionDetail, SessionFilter, SessionId, SessionStatus, SessionSummary};

use super::error::DevinApiError;
use super::provider::SessionProvider;

/// Default base URL of the session API.
pub const DEFAULT_DEVIN_API_URL: &str = "https://api.devin.ai/v1";

const DEFAULT_PAGE_SIZE: u32 = 100;
const DEFAULT_MAX_PAGES: u32 = 50;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 20;

/// Connection settings for the session API.
#[derive(Debug, Clone)]
pub struct DevinConfig {
    pub api_url: Url,
    pub api_key: String,
    /// Sessions requested per listing page.
    pub page_size: u32,
    /// Upper bound on pages walked by one listing.
    pub max_pages: u32,
    pub request_timeout: Duration,
}

impl DevinConfig {
    pub fn new(api_url: Url, api_key: impl Into<String>) -> Self {
        Self {
            api_url,
            api_key: api_key.into(),
            page_size: DEFAULT_PAGE_SIZE,
            max_pages: DEFAULT_MAX_PAGES,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

/// [`SessionProvider`] backed by the Devin REST API.
#[derive(Clone)]
pub struct DevinClient {
    config: DevinConfig,
    http: Client,
    retry: RetryConfig,
}

impl DevinClient {
    pub fn new(config: DevinConfig) -> Result<Self, DevinApiError> {
        let http = Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            config,
            http,
            retry: RetryConfig::DEFAULT,
        })
    }

    /// Overrides the retry configuration.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    fn endpoint(&self, path: &str) -> String {
        let base = self.config.api_url.as_str().trim_end_matches('/');
        let suffix = path.trim_start_matches('/');
        format!("{base}/{suffix}")
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request.header(header::AUTHORIZATION, format!("Bearer {}", self.config.api_key))
    }

    async fn send(&self, request: RequestBuilder) -> Result<String, DevinApiError> {
        let response = self.authorized(request).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(DevinApiError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }

    async fn request_json<T: DeserializeOwned>(
        &self,
        build: impl Fn() -> RequestBuilder,
    ) -> Result<T, DevinApiError> {
        let body = retry_with_backoff(self.retry, || self.send(build())).await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn list_page(&self, offset: u32) -> Result<Vec<SessionWire>, DevinApiError> {
        let limit = self.config.page_size.to_string();
        let offset = offset.to_string();
        let page: ListSessionsWire = self
            .request_json(|| {
                self.http
                    .get(self.endpoint("sessions"))
                    .query(&[("limit", limit.as_str()), ("offset", offset.as_str())])
            })
            .await?;
        Ok(page.sessions)
    }
}

impl std::fmt::Debug for DevinClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DevinClient")
            .field("api_url", &self.config.api_url.as_str())
            .finish_non_exhaustive()
    }
}

impl SessionProvider for DevinClient {
    #[instrument(skip(self))]
    async fn list_sessions(
        &self,
        filter: SessionFilter,
    ) -> Result<Vec<SessionSummary>, DevinApiError> {
        let mut summaries = Vec::new();
        let mut offset = 0;

        for _ in 0..self.config.max_pages {
            let page = self.list_page(offset).await?;
            let page_len = page.len();
            summaries.extend(select_sessions(page, filter));

            if page_len < self.config.page_size as usize {
                break;
            }
            offset += self.config.page_size;
        }

        debug!(count = summaries.len(), "Listed sessions");
        Ok(summaries)
    }

    #[instrument(skip(self, id), fields(session_id = %id))]
    async fn get_session_detail(&self, id: &SessionId) -> Result<SessionDetail, DevinApiError> {
        let path = format!("session/{}", id);
        let detail: SessionDetailWire = self
            .request_json(|| self.http.get(self.endpoint(&path)))
            .await?;

        Ok(SessionDetail {
            session_id: id.clone(),
            status: detail
                .status_enum
                .unwrap_or_else(|| SessionStatus::Other("unknown".to_string())),
        })
    }

    #[instrument(skip(self, id), fields(session_id = %id))]
    async fn terminate_session(&self, id: &SessionId) -> Result<(), DevinApiError> {
        let path = format!("sessions/{}", id);
        retry_with_backoff(self.retry, || {
            self.send(self.http.delete(self.endpoint(&path)))
        })
        .await?;
        Ok(())
    }
}

/// Converts one listing page into summaries, keeping only sessions the
/// filter selects.
fn select_sessions(page: Vec<SessionWire>, filter: SessionFilter) -> Vec<SessionSummary> {
    page.into_iter()
        .filter(|s| filter.status().is_none_or(|wanted| s.status == wanted))
        .map(|s| SessionSummary {
            session_id: SessionId(s.session_id),
            status: s.status,
            pr_url: s.pull_request.map(|pr| PrUrl(pr.url)),
        })
        .collect()
}

// ─── Wire types ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ListSessionsWire {
    sessions: Vec<SessionWire>,
}

#[derive(Debug, Deserialize)]
struct SessionWire {
    session_id: String,
    status: String,
    #[serde(default)]
    pull_request: Option<PullRequestWire>,
}

#[derive(Debug, Deserialize)]
struct PullRequestWire {
    url: String,
}

#[derive(Debug, Deserialize)]
struct SessionDetailWire {
    #[serde(default)]
    status_enum: Option<SessionStatus>,
}

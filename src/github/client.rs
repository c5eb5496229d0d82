//! Octocrab-backed implementation of the review-system traits.
//!
//! Pull requests go through octocrab's typed `pulls()` handler. Check-runs use
//! the raw REST routes with local request bodies so that `conclusion` can be
//! left out entirely for runs that are not completed.

use octocrab::Octocrab;
use serde::{Deserialize, Serialize};

use crate::retry::{RetryConfig, retry_with_backoff};
use crate::types::{
    CheckConclusion, CheckOutput, CheckRunId, CheckRunRef, CheckStatus, PrNumber, PrState,
    PullRequestInfo, RepoId, Sha,
};

use super::error::GitHubApiError;
use super::review::{CreateCheckRun, ReviewClient, ReviewClientFactory, UpdateCheckRun};

/// Page size for check-run listings. A commit rarely has more than one run with
/// our name, so the first page is enough.
const CHECK_RUNS_PER_PAGE: u8 = 100;

/// A GitHub API client with retry on transient failures.
#[derive(Clone)]
pub struct OctocrabClient {
    client: Octocrab,
    retry: RetryConfig,
}

impl OctocrabClient {
    pub fn new(client: Octocrab) -> Self {
        Self {
            client,
            retry: RetryConfig::DEFAULT,
        }
    }

    /// Creates a client from a GitHub token.
    pub fn from_token(token: impl Into<String>) -> Result<Self, octocrab::Error> {
        let client = Octocrab::builder().personal_token(token.into()).build()?;
        Ok(Self::new(client))
    }

    /// Overrides the retry configuration.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    async fn get_pull_request_once(
        &self,
        repo: &RepoId,
        number: PrNumber,
    ) -> Result<PullRequestInfo, GitHubApiError> {
        let pull = self
            .client
            .pulls(repo.owner.as_str(), repo.repo.as_str())
            .get(number.0)
            .await
            .map_err(GitHubApiError::from_octocrab)?;

        let state = if pull.merged_at.is_some() {
            PrState::Merged
        } else if pull.state == Some(octocrab::models::IssueState::Closed) {
            PrState::Closed
        } else {
            PrState::Open
        };

        Ok(PullRequestInfo {
            state,
            head_sha: Sha::new(pull.head.sha.clone()),
        })
    }

    async fn list_check_runs_once(
        &self,
        repo: &RepoId,
        head_sha: &Sha,
        name: &str,
    ) -> Result<Vec<CheckRunRef>, GitHubApiError> {
        let route = format!(
            "/repos/{}/{}/commits/{}/check-runs",
            repo.owner, repo.repo, head_sha
        );
        let params = ListCheckRunsParams {
            check_name: name,
            per_page: CHECK_RUNS_PER_PAGE,
        };

        let page: CheckRunsPage = self
            .client
            .get(route, Some(&params))
            .await
            .map_err(GitHubApiError::from_octocrab)?;

        Ok(page
            .check_runs
            .into_iter()
            .map(|run| CheckRunRef {
                id: CheckRunId(run.id),
                name: run.name,
                status: run.status,
                conclusion: run.conclusion,
            })
            .collect())
    }

    async fn create_check_run_once(
        &self,
        request: &CreateCheckRun,
    ) -> Result<CheckRunId, GitHubApiError> {
        let route = format!("/repos/{}/{}/check-runs", request.repo.owner, request.repo.repo);
        let body = CheckRunBody {
            name: Some(&request.name),
            head_sha: Some(request.head_sha.as_str()),
            status: request.update.state.status(),
            conclusion: request.update.state.conclusion(),
            details_url: request.details_url.as_deref(),
            output: &request.update.output,
        };

        let created: CheckRunResponse = self
            .client
            .post(route, Some(&body))
            .await
            .map_err(GitHubApiError::from_octocrab)?;

        Ok(CheckRunId(created.id))
    }

    async fn update_check_run_once(&self, request: &UpdateCheckRun) -> Result<(), GitHubApiError> {
        let route = format!(
            "/repos/{}/{}/check-runs/{}",
            request.repo.owner, request.repo.repo, request.check_run_id
        );
        let body = CheckRunBody {
            name: None,
            head_sha: None,
            status: request.update.state.status(),
            conclusion: request.update.state.conclusion(),
            details_url: request.details_url.as_deref(),
            output: &request.update.output,
        };

        let _: CheckRunResponse = self
            .client
            .patch(route, Some(&body))
            .await
            .map_err(GitHubApiError::from_octocrab)?;

        Ok(())
    }
}

impl std::fmt::Debug for OctocrabClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OctocrabClient")
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl ReviewClient for OctocrabClient {
    async fn get_pull_request(
        &self,
        repo: &RepoId,
        number: PrNumber,
    ) -> Result<PullRequestInfo, GitHubApiError> {
        retry_with_backoff(self.retry, || self.get_pull_request_once(repo, number)).await
    }

    async fn list_check_runs(
        &self,
        repo: &RepoId,
        head_sha: &Sha,
        name: &str,
    ) -> Result<Vec<CheckRunRef>, GitHubApiError> {
        retry_with_backoff(self.retry, || self.list_check_runs_once(repo, head_sha, name)).await
    }

    async fn create_check_run(&self, request: CreateCheckRun) -> Result<CheckRunId, GitHubApiError> {
        retry_with_backoff(self.retry, || self.create_check_run_once(&request)).await
    }

    async fn update_check_run(&self, request: UpdateCheckRun) -> Result<(), GitHubApiError> {
        retry_with_backoff(self.retry, || self.update_check_run_once(&request)).await
    }
}

/// Hands out clones of one authenticated octocrab instance.
///
/// Octocrab refreshes installation tokens internally, so a clone per unit of
/// work is enough to pick up rotated credentials.
#[derive(Clone, Debug)]
pub struct OctocrabClientFactory {
    client: OctocrabClient,
}

impl OctocrabClientFactory {
    pub fn new(client: OctocrabClient) -> Self {
        Self { client }
    }
}

impl ReviewClientFactory for OctocrabClientFactory {
    type Client = OctocrabClient;

    async fn client(&self) -> Result<OctocrabClient, GitHubApiError> {
        Ok(self.client.clone())
    }
}

// ─── Wire types ───────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ListCheckRunsParams<'a> {
    check_name: &'a str,
    per_page: u8,
}

#[derive(Debug, Deserialize)]
struct CheckRunsPage {
    check_runs: Vec<CheckRunResponse>,
}

#[derive(Debug, Deserialize)]
struct CheckRunResponse {
    id: u64,
    #[serde(default)]
    name: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    conclusion: Option<String>,
}

/// Body shared by the create and update endpoints.
#[derive(Debug, Serialize)]
struct CheckRunBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    head_sha: Option<&'a str>,
    status: CheckStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    conclusion: Option<CheckConclusion>,
    #[serde(skip_serializing_if = "Option::is_none")]
    details_url: Option<&'a str>,
    output: &'a CheckOutput,
}

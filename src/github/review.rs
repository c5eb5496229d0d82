//! The review-system seam: what the poller needs from GitHub.
//!
//! The poller only talks to these traits. [`super::OctocrabClient`] implements
//! them against the real API; tests use in-memory recorders.

use std::future::Future;

use crate::types::{CheckRunId, CheckRunRef, CheckRunUpdate, PrNumber, PullRequestInfo, RepoId, Sha};

use super::error::GitHubApiError;

/// Parameters for creating a check-run on a commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateCheckRun {
    pub repo: RepoId,
    pub name: String,
    pub head_sha: Sha,
    pub update: CheckRunUpdate,
    /// Link shown on the check-run; omitted from the request when `None`.
    pub details_url: Option<String>,
}

/// Parameters for updating an existing check-run in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateCheckRun {
    pub repo: RepoId,
    pub check_run_id: CheckRunId,
    pub update: CheckRunUpdate,
    pub details_url: Option<String>,
}

/// GitHub operations used by the poller.
pub trait ReviewClient: Send + Sync {
    /// Fetches a pull request's state and head commit.
    fn get_pull_request(
        &self,
        repo: &RepoId,
        number: PrNumber,
    ) -> impl Future<Output = Result<PullRequestInfo, GitHubApiError>> + Send;

    /// Lists check-runs on a commit, filtered by check name.
    fn list_check_runs(
        &self,
        repo: &RepoId,
        head_sha: &Sha,
        name: &str,
    ) -> impl Future<Output = Result<Vec<CheckRunRef>, GitHubApiError>> + Send;

    fn create_check_run(
        &self,
        request: CreateCheckRun,
    ) -> impl Future<Output = Result<CheckRunId, GitHubApiError>> + Send;

    fn update_check_run(
        &self,
        request: UpdateCheckRun,
    ) -> impl Future<Output = Result<(), GitHubApiError>> + Send;
}

/// Builds a fresh [`ReviewClient`] for each unit of work, so credentials can be
/// refreshed between calls.
pub trait ReviewClientFactory: Send + Sync + 'static {
    type Client: ReviewClient + 'static;

    fn client(&self) -> impl Future<Output = Result<Self::Client, GitHubApiError>> + Send;
}

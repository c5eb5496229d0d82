//! Shared test utilities: in-memory collaborators and proptest generators.

use std::collections::{HashMap, HashSet};
use std::future::{Future, ready};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, TimeZone, Utc};
use proptest::prelude::*;

use crate::devin::{DevinApiError, SessionProvider};
use crate::github::{
    CreateCheckRun, GitHubApiError, ReviewClient, ReviewClientFactory, UpdateCheckRun,
};
use crate::poller::PollerLog;
use crate::types::{
    CheckRunId, CheckRunRef, PrNumber, PrState, PrUrl, PullRequestInfo, RepoId, SessionDetail,
    SessionFilter, SessionId, SessionStatus, SessionSummary, Sha, TrackedPr,
};

// ─── Builders ────────────────────────────────────────────────────────────────

pub fn sha(c: char) -> Sha {
    Sha::new(c.to_string().repeat(40))
}

/// A tracked PR added just now, on head `aaaa...`.
pub fn tracked_pr(pr_url: &str, session_id: &str) -> TrackedPr {
    TrackedPr::from_url(
        PrUrl::new(pr_url),
        sha('a'),
        SessionId::new(session_id),
        Utc::now(),
    )
    .unwrap()
}

pub fn running_session(session_id: &str, pr_url: Option<&str>) -> SessionSummary {
    SessionSummary {
        session_id: SessionId::new(session_id),
        status: "running".to_string(),
        pr_url: pr_url.map(PrUrl::new),
    }
}

// ─── Generators ──────────────────────────────────────────────────────────────

pub fn arb_sha() -> impl Strategy<Value = Sha> {
    "[0-9a-f]{40}".prop_map(Sha::new)
}

pub fn arb_session_id() -> impl Strategy<Value = SessionId> {
    "devin-[0-9a-f]{8}".prop_map(SessionId::new)
}

pub fn arb_datetime() -> impl Strategy<Value = DateTime<Utc>> {
    (1_600_000_000i64..1_900_000_000i64).prop_map(|secs| {
        Utc.timestamp_opt(secs, 0)
            .single()
            .unwrap_or_else(Utc::now)
    })
}

/// PR URLs drawn from a small space so that generated collections collide.
pub fn arb_colliding_pr_url() -> impl Strategy<Value = PrUrl> {
    ("[ab]", "[xy]", 1u64..4)
        .prop_map(|(owner, repo, n)| PrUrl::new(format!("https://github.com/{owner}/{repo}/pull/{n}")))
}

pub fn arb_tracked_pr() -> impl Strategy<Value = TrackedPr> {
    (arb_colliding_pr_url(), arb_sha(), arb_session_id(), arb_datetime()).prop_map(
        |(url, head_sha, session_id, added_at)| {
            TrackedPr::from_url(url, head_sha, session_id, added_at).unwrap()
        },
    )
}

// ─── Session provider ────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct SessionsState {
    running: Vec<SessionSummary>,
    details: HashMap<SessionId, SessionStatus>,
    fail_listing: bool,
    failing_details: HashSet<SessionId>,
    list_calls: usize,
    detail_calls: Vec<SessionId>,
    terminated: Vec<SessionId>,
}

/// In-memory [`SessionProvider`]. Clones share state, so a test can keep a
/// handle after giving one to the poller.
#[derive(Debug, Clone, Default)]
pub struct MockSessions {
    state: Arc<Mutex<SessionsState>>,
}

impl MockSessions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the listing returned for the `Running` filter.
    pub fn set_running(&self, running: Vec<SessionSummary>) {
        self.state.lock().unwrap().running = running;
    }

    pub fn set_status(&self, session_id: &str, status: SessionStatus) {
        self.state
            .lock()
            .unwrap()
            .details
            .insert(SessionId::new(session_id), status);
    }

    pub fn fail_listing(&self, fail: bool) {
        self.state.lock().unwrap().fail_listing = fail;
    }

    pub fn fail_detail(&self, session_id: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_details
            .insert(SessionId::new(session_id));
    }

    pub fn list_calls(&self) -> usize {
        self.state.lock().unwrap().list_calls
    }

    pub fn detail_calls(&self) -> Vec<SessionId> {
        self.state.lock().unwrap().detail_calls.clone()
    }

    pub fn terminated(&self) -> Vec<SessionId> {
        self.state.lock().unwrap().terminated.clone()
    }
}

fn provider_failure() -> DevinApiError {
    DevinApiError::Status {
        status: 503,
        body: "unavailable".to_string(),
    }
}

impl SessionProvider for MockSessions {
    fn list_sessions(
        &self,
        filter: SessionFilter,
    ) -> impl Future<Output = Result<Vec<SessionSummary>, DevinApiError>> + Send {
        let mut state = self.state.lock().unwrap();
        state.list_calls += 1;
        let result = if state.fail_listing {
            Err(provider_failure())
        } else {
            Ok(state
                .running
                .iter()
                .filter(|s| filter.status().is_none_or(|wanted| s.status == wanted))
                .cloned()
                .collect())
        };
        ready(result)
    }

    fn get_session_detail(
        &self,
        id: &SessionId,
    ) -> impl Future<Output = Result<SessionDetail, DevinApiError>> + Send {
        let mut state = self.state.lock().unwrap();
        state.detail_calls.push(id.clone());
        let result = if state.failing_details.contains(id) {
            Err(provider_failure())
        } else {
            match state.details.get(id) {
                Some(status) => Ok(SessionDetail {
                    session_id: id.clone(),
                    status: status.clone(),
                }),
                None => Err(DevinApiError::Status {
                    status: 404,
                    body: format!("no session {id}"),
                }),
            }
        };
        ready(result)
    }

    fn terminate_session(
        &self,
        id: &SessionId,
    ) -> impl Future<Output = Result<(), DevinApiError>> + Send {
        let mut state = self.state.lock().unwrap();
        state.terminated.push(id.clone());
        state.running.retain(|s| &s.session_id != id);
        ready(Ok(()))
    }
}

// ─── Review system ───────────────────────────────────────────────────────────

/// A check-run write observed by [`MockGitHub`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckRunWrite {
    Create(CreateCheckRun),
    Update(UpdateCheckRun),
}

impl CheckRunWrite {
    pub fn repo(&self) -> &RepoId {
        match self {
            CheckRunWrite::Create(c) => &c.repo,
            CheckRunWrite::Update(u) => &u.repo,
        }
    }

    pub fn update(&self) -> &crate::types::CheckRunUpdate {
        match self {
            CheckRunWrite::Create(c) => &c.update,
            CheckRunWrite::Update(u) => &u.update,
        }
    }

    pub fn details_url(&self) -> Option<&str> {
        match self {
            CheckRunWrite::Create(c) => c.details_url.as_deref(),
            CheckRunWrite::Update(u) => u.details_url.as_deref(),
        }
    }

    /// Name of a created run; `None` for updates, which address runs by id.
    pub fn created_name(&self) -> Option<&str> {
        match self {
            CheckRunWrite::Create(c) => Some(&c.name),
            CheckRunWrite::Update(_) => None,
        }
    }
}

#[derive(Debug, Default)]
struct GitHubState {
    pull_requests: HashMap<(RepoId, PrNumber), PullRequestInfo>,
    failing_pr_fetches: HashSet<(RepoId, PrNumber)>,
    failing_check_writes: HashSet<RepoId>,
    check_runs: Vec<(RepoId, Sha, CheckRunRef)>,
    next_check_run_id: u64,
    clients_built: usize,
    pr_fetches: Vec<(RepoId, PrNumber)>,
    writes: Vec<CheckRunWrite>,
}

/// In-memory review system acting as both factory and client. Clones share
/// state.
#[derive(Debug, Clone, Default)]
pub struct MockGitHub {
    state: Arc<Mutex<GitHubState>>,
}

impl MockGitHub {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(pr_url: &str) -> (RepoId, PrNumber) {
        let location = PrUrl::new(pr_url).locate().unwrap();
        (location.repo, location.number)
    }

    pub fn set_pull_request(&self, pr_url: &str, state: PrState, head_sha: Sha) {
        self.state
            .lock()
            .unwrap()
            .pull_requests
            .insert(Self::key(pr_url), PullRequestInfo { state, head_sha });
    }

    pub fn fail_pr_fetch(&self, pr_url: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_pr_fetches
            .insert(Self::key(pr_url));
    }

    /// Makes every check-run write for the PR's repository fail.
    pub fn fail_check_writes(&self, pr_url: &str) {
        let (repo, _) = Self::key(pr_url);
        self.state.lock().unwrap().failing_check_writes.insert(repo);
    }

    /// Seeds an existing in-progress check-run on a commit.
    pub fn add_check_run(&self, pr_url: &str, head_sha: Sha, name: &str) -> CheckRunId {
        self.add_check_run_with_status(pr_url, head_sha, name, "in_progress", None)
    }

    /// Seeds an existing check-run with the given GitHub status and conclusion.
    pub fn add_check_run_with_status(
        &self,
        pr_url: &str,
        head_sha: Sha,
        name: &str,
        status: &str,
        conclusion: Option<&str>,
    ) -> CheckRunId {
        let (repo, _) = Self::key(pr_url);
        let mut state = self.state.lock().unwrap();
        state.next_check_run_id += 1;
        let id = CheckRunId(state.next_check_run_id);
        state.check_runs.push((
            repo,
            head_sha,
            CheckRunRef {
                id,
                name: name.to_string(),
                status: status.to_string(),
                conclusion: conclusion.map(str::to_string),
            },
        ));
        id
    }

    pub fn writes(&self) -> Vec<CheckRunWrite> {
        self.state.lock().unwrap().writes.clone()
    }

    pub fn writes_for(&self, pr_url: &str) -> Vec<CheckRunWrite> {
        let (repo, _) = Self::key(pr_url);
        self.writes()
            .into_iter()
            .filter(|w| w.repo() == &repo)
            .collect()
    }

    pub fn pr_fetches(&self) -> usize {
        self.state.lock().unwrap().pr_fetches.len()
    }

    pub fn clients_built(&self) -> usize {
        self.state.lock().unwrap().clients_built
    }
}

impl ReviewClientFactory for MockGitHub {
    type Client = MockGitHub;

    fn client(&self) -> impl Future<Output = Result<Self::Client, GitHubApiError>> + Send {
        self.state.lock().unwrap().clients_built += 1;
        ready(Ok(self.clone()))
    }
}

impl ReviewClient for MockGitHub {
    fn get_pull_request(
        &self,
        repo: &RepoId,
        number: PrNumber,
    ) -> impl Future<Output = Result<PullRequestInfo, GitHubApiError>> + Send {
        let mut state = self.state.lock().unwrap();
        let key = (repo.clone(), number);
        state.pr_fetches.push(key.clone());
        let result = if state.failing_pr_fetches.contains(&key) {
            Err(GitHubApiError::transient_without_source("connection reset"))
        } else {
            state
                .pull_requests
                .get(&key)
                .cloned()
                .ok_or_else(|| GitHubApiError::permanent_without_source("Not Found"))
        };
        ready(result)
    }

    fn list_check_runs(
        &self,
        repo: &RepoId,
        head_sha: &Sha,
        name: &str,
    ) -> impl Future<Output = Result<Vec<CheckRunRef>, GitHubApiError>> + Send {
        let state = self.state.lock().unwrap();
        let result = if state.failing_check_writes.contains(repo) {
            Err(GitHubApiError::permanent_without_source("Resource not accessible by integration"))
        } else {
            Ok(state
                .check_runs
                .iter()
                .filter(|(r, sha, run)| r == repo && sha == head_sha && run.name == name)
                .map(|(_, _, run)| run.clone())
                .collect())
        };
        ready(result)
    }

    fn create_check_run(
        &self,
        request: CreateCheckRun,
    ) -> impl Future<Output = Result<CheckRunId, GitHubApiError>> + Send {
        let mut state = self.state.lock().unwrap();
        let result = if state.failing_check_writes.contains(&request.repo) {
            Err(GitHubApiError::permanent_without_source("Resource not accessible by integration"))
        } else {
            state.next_check_run_id += 1;
            let id = CheckRunId(state.next_check_run_id);
            state.check_runs.push((
                request.repo.clone(),
                request.head_sha.clone(),
                CheckRunRef {
                    id,
                    name: request.name.clone(),
                    status: request.update.state.status().as_api_str().to_string(),
                    conclusion: request
                        .update
                        .state
                        .conclusion()
                        .map(|c| c.as_api_str().to_string()),
                },
            ));
            state.writes.push(CheckRunWrite::Create(request));
            Ok(id)
        };
        ready(result)
    }

    fn update_check_run(
        &self,
        request: UpdateCheckRun,
    ) -> impl Future<Output = Result<(), GitHubApiError>> + Send {
        let mut state = self.state.lock().unwrap();
        let result = if state.failing_check_writes.contains(&request.repo) {
            Err(GitHubApiError::permanent_without_source("Resource not accessible by integration"))
        } else {
            state.writes.push(CheckRunWrite::Update(request));
            Ok(())
        };
        ready(result)
    }
}

// ─── Logging ─────────────────────────────────────────────────────────────────

/// [`PollerLog`] that keeps every message for assertions.
#[derive(Debug, Default)]
pub struct RecordingLog {
    info: Mutex<Vec<String>>,
    error: Mutex<Vec<String>>,
}

impl RecordingLog {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn infos(&self) -> Vec<String> {
        self.info.lock().unwrap().clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.error.lock().unwrap().clone()
    }
}

impl PollerLog for RecordingLog {
    fn info(&self, message: &str) {
        self.info.lock().unwrap().push(message.to_string());
    }

    fn error(&self, message: &str) {
        self.error.lock().unwrap().push(message.to_string());
    }
}

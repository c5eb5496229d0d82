//! The reconciliation engine.
//!
//! [`StatusPoller`] owns the tracked-PR registry and runs one reconciliation
//! cycle per tick: list running sessions once, then for each tracked PR check
//! its age, check the PR is still open, resolve the session's status and
//! mirror it onto the PR's check-run.
//!
//! Nothing here returns an error to the host. Failures are reported through
//! [`PollerLog`] and retried on the next tick.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;

use crate::devin::{DevinApiError, SessionProvider};
use crate::github::{
    CreateCheckRun, GitHubApiError, ReviewClient, ReviewClientFactory, UpdateCheckRun,
};
use crate::types::{
    CheckConclusion, CheckRunUpdate, CheckState, InvalidPrUrl, PrUrl, PullRequestInfo, SessionFilter,
    SessionId, SessionStatus, SessionSummary, Sha, TrackedPr,
};

use super::config::PollerConfig;
use super::log::PollerLog;
use super::registry::{TrackOutcome, TrackedPrRegistry};

/// Failure while reconciling a single PR or discovering a single session.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Session(#[from] DevinApiError),

    #[error(transparent)]
    GitHub(#[from] GitHubApiError),

    #[error(transparent)]
    InvalidPrUrl(#[from] InvalidPrUrl),
}

/// What one reconciliation cycle did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Tracked PRs looked at.
    pub polled: usize,
    /// Evicted by the tracking age limit.
    pub aged_out: usize,
    /// Evicted because the PR was closed or merged.
    pub closed: usize,
    /// Final check-run rendered and entry evicted.
    pub completed: usize,
    /// In-progress check-run rendered; entry kept.
    pub still_running: usize,
    /// Session in a status that leaves the check-run alone.
    pub unchanged: usize,
    /// Reconciliation failed; entry kept for the next cycle.
    pub failed: usize,
    /// The running-session listing failed and no PR was looked at.
    pub aborted: bool,
}

impl CycleReport {
    fn record(&mut self, outcome: PrOutcome) {
        match outcome {
            PrOutcome::AgedOut => self.aged_out += 1,
            PrOutcome::Closed => self.closed += 1,
            PrOutcome::Completed => self.completed += 1,
            PrOutcome::StillRunning => self.still_running += 1,
            PrOutcome::Unchanged => self.unchanged += 1,
        }
    }

    /// Number of entries removed from the registry by this cycle.
    pub fn evicted(&self) -> usize {
        self.aged_out + self.closed + self.completed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PrOutcome {
    AgedOut,
    Closed,
    Completed,
    StillRunning,
    Unchanged,
}

/// What to do with a tracked PR given its session's status.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Resolution {
    Render { update: CheckRunUpdate, untrack: bool },
    Ignore,
}

/// Maps a session status to a check-run change.
///
/// `in_running_set` is whether the session appeared in this cycle's listing of
/// running sessions. A session that dropped out of it has ended, whatever its
/// detailed status claims.
fn resolve(status: &SessionStatus, session_id: &SessionId, in_running_set: bool) -> Resolution {
    let render = |state, title: String, untrack| Resolution::Render {
        update: CheckRunUpdate::new(state, title, format!("Session `{session_id}`: {status}")),
        untrack,
    };

    match (status, in_running_set) {
        (SessionStatus::Finished, _) => render(
            CheckState::Completed(CheckConclusion::Success),
            "Devin finished".to_string(),
            true,
        ),
        (SessionStatus::Expired, _) => render(
            CheckState::Completed(CheckConclusion::Cancelled),
            "Devin session expired".to_string(),
            true,
        ),
        (SessionStatus::Working, true) => render(
            CheckState::InProgress,
            "Devin is working".to_string(),
            false,
        ),
        (SessionStatus::Blocked, true) => render(
            CheckState::InProgress,
            "Devin is blocked and waiting for input".to_string(),
            false,
        ),
        (SessionStatus::Other(_), true) => Resolution::Ignore,
        (SessionStatus::Working | SessionStatus::Blocked | SessionStatus::Other(_), false) => render(
            CheckState::Completed(CheckConclusion::Neutral),
            format!("Devin session ended with status: {status}"),
            true,
        ),
    }
}

/// Indexes running sessions by PR URL. When several sessions claim the same
/// PR, the first one listed wins.
fn index_by_pr_url(sessions: Vec<SessionSummary>) -> HashMap<PrUrl, SessionSummary> {
    let mut lookup = HashMap::with_capacity(sessions.len());
    for session in sessions {
        if let Some(pr_url) = session.pr_url.clone() {
            lookup.entry(pr_url).or_insert(session);
        }
    }
    lookup
}

struct PollerInner<S, F> {
    config: PollerConfig,
    sessions: S,
    github: F,
    log: Arc<dyn PollerLog>,
    registry: TrackedPrRegistry,
    /// Cancels the timer task. `Some` while running.
    timer: Mutex<Option<CancellationToken>>,
}

/// Handle to the reconciliation engine.
///
/// Cloning is cheap; all clones drive the same registry and timer.
pub struct StatusPoller<S, F> {
    inner: Arc<PollerInner<S, F>>,
}

impl<S, F> Clone for StatusPoller<S, F> {
    fn clone(&self) -> Self {
        StatusPoller {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S, F> StatusPoller<S, F>
where
    S: SessionProvider,
    F: ReviewClientFactory,
{
    pub fn new(config: PollerConfig, sessions: S, github: F, log: Arc<dyn PollerLog>) -> Self {
        StatusPoller {
            inner: Arc::new(PollerInner {
                config,
                sessions,
                github,
                log,
                registry: TrackedPrRegistry::new(),
                timer: Mutex::new(None),
            }),
        }
    }

    pub fn config(&self) -> &PollerConfig {
        &self.inner.config
    }

    fn log(&self) -> &dyn PollerLog {
        self.inner.log.as_ref()
    }

    fn timer(&self) -> MutexGuard<'_, Option<CancellationToken>> {
        self.inner.timer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ─── Lifecycle ───────────────────────────────────────────────────────────

    /// Starts the poll timer and spawns startup discovery.
    ///
    /// The first cycle runs one poll interval from now. Calling `start` on a
    /// running poller does nothing. Must be called from within a tokio runtime.
    pub fn start(&self) {
        let token = {
            let mut timer = self.timer();
            if timer.is_some() {
                self.log().info("Status poller already running");
                return;
            }
            let token = CancellationToken::new();
            *timer = Some(token.clone());
            token
        };

        let period = self.inner.config.poll_interval;
        self.log().info(&format!(
            "Status poller started (interval {}ms)",
            period.as_millis()
        ));

        let discovery = self.clone();
        tokio::spawn(async move {
            discovery.discover().await;
        });

        let poller = self.clone();
        tokio::spawn(async move {
            let mut ticks = interval_at(Instant::now() + period, period);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticks.tick() => {
                        // Not awaited: a slow cycle does not hold back the next tick.
                        let cycle = poller.clone();
                        tokio::spawn(async move {
                            cycle.poll_once().await;
                        });
                    }
                }
            }
        });
    }

    /// Stops the poll timer. Cycles already in flight run to completion.
    pub fn stop(&self) {
        if let Some(token) = self.timer().take() {
            token.cancel();
            self.log().info("Status poller stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.timer().is_some()
    }

    // ─── Registry ────────────────────────────────────────────────────────────

    /// Starts tracking `pr`, or refreshes the head SHA and session of an
    /// already-tracked PR with the same URL.
    pub fn track(&self, pr: TrackedPr) -> TrackOutcome {
        let pr_url = pr.pr_url.clone();
        let session_id = pr.session_id.clone();
        let outcome = self.inner.registry.track(pr);
        match outcome {
            TrackOutcome::Inserted => self
                .log()
                .info(&format!("Now tracking {pr_url} for session {session_id}")),
            TrackOutcome::Updated => self
                .log()
                .info(&format!("Updated tracking for {pr_url} (session {session_id})")),
        }
        outcome
    }

    /// Stops tracking a PR. Returns whether it was tracked.
    pub fn untrack(&self, pr_url: &PrUrl) -> bool {
        let removed = self.inner.registry.untrack(pr_url);
        if removed {
            self.log().info(&format!("Stopped tracking {pr_url}"));
        }
        removed
    }

    /// Snapshot of tracked PRs, oldest first.
    pub fn list(&self) -> Vec<TrackedPr> {
        self.inner.registry.list()
    }

    pub fn get(&self, pr_url: &PrUrl) -> Option<TrackedPr> {
        self.inner.registry.get(pr_url)
    }

    /// Moves a tracked PR onto a new head commit. Returns false if the PR is
    /// not tracked; an untracked PR is never re-added.
    pub fn update_head_sha(&self, pr_url: &PrUrl, head_sha: Sha) -> bool {
        let moved = self.inner.registry.update_head_sha(pr_url, head_sha.clone());
        if moved {
            self.log().info(&format!(
                "{pr_url} moved to head {}",
                head_sha.short()
            ));
        }
        moved
    }

    /// Stops tracking a closed PR and terminates the running session working
    /// on it, if any. Returns the terminated session.
    pub async fn release_closed_pr(
        &self,
        pr_url: &PrUrl,
    ) -> Result<Option<SessionId>, DevinApiError> {
        self.untrack(pr_url);

        let running = self.inner.sessions.list_sessions(SessionFilter::Running).await?;
        let Some(session) = index_by_pr_url(running).remove(pr_url) else {
            return Ok(None);
        };

        self.inner
            .sessions
            .terminate_session(&session.session_id)
            .await?;
        self.log().info(&format!(
            "Terminated session {} after {pr_url} was closed",
            session.session_id
        ));
        Ok(Some(session.session_id))
    }

    // ─── Discovery ───────────────────────────────────────────────────────────

    /// Seeds the registry from sessions that are already running with an open
    /// PR. Returns the number of tracked PRs afterwards.
    pub async fn discover(&self) -> usize {
        let running = match self.inner.sessions.list_sessions(SessionFilter::Running).await {
            Ok(running) => running,
            Err(e) => {
                self.log()
                    .error(&format!("Startup discovery failed to list running sessions: {e}"));
                return self.inner.registry.len();
            }
        };

        for session in running {
            let Some(pr_url) = session.pr_url else {
                continue;
            };
            if let Err(e) = self.discover_session(&session.session_id, pr_url).await {
                self.log().error(&format!(
                    "Skipping session {} during discovery: {e}",
                    session.session_id
                ));
            }
        }

        let tracked = self.inner.registry.len();
        self.log()
            .info(&format!("Startup discovery complete: tracking {tracked} PR(s)"));
        tracked
    }

    async fn discover_session(
        &self,
        session_id: &SessionId,
        pr_url: PrUrl,
    ) -> Result<(), ReconcileError> {
        let location = pr_url.locate()?;

        let detail = self.inner.sessions.get_session_detail(session_id).await?;
        if detail.status != SessionStatus::Working {
            return Ok(());
        }

        let client = self.inner.github.client().await?;
        let pr = client
            .get_pull_request(&location.repo, location.number)
            .await?;
        if !pr.state.is_open() {
            return Ok(());
        }

        self.track(TrackedPr {
            pr_url,
            repo: location.repo,
            pr_number: location.number,
            head_sha: pr.head_sha,
            session_id: session_id.clone(),
            added_at: Utc::now(),
        });
        Ok(())
    }

    // ─── Poll cycle ──────────────────────────────────────────────────────────

    /// Runs one reconciliation cycle over the PRs tracked right now.
    pub async fn poll_once(&self) -> CycleReport {
        let mut report = CycleReport::default();

        let tracked = self.inner.registry.list();
        if tracked.is_empty() {
            return report;
        }

        let running = match self.inner.sessions.list_sessions(SessionFilter::Running).await {
            Ok(running) => running,
            Err(e) => {
                self.log()
                    .error(&format!("Poll cycle aborted, failed to list running sessions: {e}"));
                report.aborted = true;
                return report;
            }
        };
        let lookup = index_by_pr_url(running);
        let now = Utc::now();

        for pr in &tracked {
            report.polled += 1;
            match self.reconcile(pr, &lookup, now).await {
                Ok(outcome) => report.record(outcome),
                Err(e) => {
                    report.failed += 1;
                    self.log()
                        .error(&format!("Failed to reconcile {}: {e}", pr.pr_url));
                }
            }
        }

        if report.evicted() > 0 || report.failed > 0 {
            self.log().info(&format!(
                "Poll cycle: {} polled, {} evicted, {} failed, {} still tracked",
                report.polled,
                report.evicted(),
                report.failed,
                self.inner.registry.len()
            ));
        }
        report
    }

    async fn reconcile(
        &self,
        pr: &TrackedPr,
        lookup: &HashMap<PrUrl, SessionSummary>,
        now: DateTime<Utc>,
    ) -> Result<PrOutcome, ReconcileError> {
        if self.inner.config.is_expired(pr.added_at, now) {
            self.log().info(&format!(
                "{} has been tracked since {}; evicting",
                pr.pr_url, pr.added_at
            ));
            self.untrack(&pr.pr_url);
            return Ok(PrOutcome::AgedOut);
        }

        match self.fetch_pull_request(pr).await {
            Ok(info) if !info.state.is_open() => {
                self.log()
                    .info(&format!("{} is {}; no longer tracking", pr.pr_url, info.state));
                self.untrack(&pr.pr_url);
                return Ok(PrOutcome::Closed);
            }
            Ok(_) => {}
            Err(e) => self
                .log()
                .error(&format!("Liveness check failed for {}: {e}", pr.pr_url)),
        }

        // A session missing from the running set is re-read by the id stored
        // at tracking time; its detail is the authority on how it ended.
        let (session_id, in_running_set) = match lookup.get(&pr.pr_url) {
            Some(session) => (&session.session_id, true),
            None => (&pr.session_id, false),
        };
        let detail = self.inner.sessions.get_session_detail(session_id).await?;

        match resolve(&detail.status, session_id, in_running_set) {
            Resolution::Ignore => {
                self.log().info(&format!(
                    "Session {session_id} for {} is {}; leaving check-run unchanged",
                    pr.pr_url, detail.status
                ));
                Ok(PrOutcome::Unchanged)
            }
            Resolution::Render { update, untrack } => {
                self.render(pr, session_id, update).await;
                if untrack {
                    self.untrack(&pr.pr_url);
                    Ok(PrOutcome::Completed)
                } else {
                    Ok(PrOutcome::StillRunning)
                }
            }
        }
    }

    async fn fetch_pull_request(&self, pr: &TrackedPr) -> Result<PullRequestInfo, GitHubApiError> {
        let client = self.inner.github.client().await?;
        client.get_pull_request(&pr.repo, pr.pr_number).await
    }

    // ─── Check-run rendering ─────────────────────────────────────────────────

    /// Writes `update` onto the PR's check-run, creating it if needed.
    /// Failures are logged and otherwise ignored.
    async fn render(&self, pr: &TrackedPr, session_id: &SessionId, update: CheckRunUpdate) {
        let state = update.state;
        match self.write_check_run(pr, session_id, update).await {
            Ok(()) => self
                .log()
                .info(&format!("Check-run for {} set to {state}", pr.pr_url)),
            Err(e) => self
                .log()
                .error(&format!("Failed to update check-run for {}: {e}", pr.pr_url)),
        }
    }

    async fn write_check_run(
        &self,
        pr: &TrackedPr,
        session_id: &SessionId,
        update: CheckRunUpdate,
    ) -> Result<(), GitHubApiError> {
        let client = self.inner.github.client().await?;
        let name = &self.inner.config.check_name;
        let details_url = Some(self.inner.config.details_url(session_id));

        let existing = client
            .list_check_runs(&pr.repo, &pr.head_sha, name)
            .await?
            .into_iter()
            .find(|run| &run.name == name);

        match existing {
            Some(run) => {
                client
                    .update_check_run(UpdateCheckRun {
                        repo: pr.repo.clone(),
                        check_run_id: run.id,
                        update,
                        details_url,
                    })
                    .await
            }
            None => {
                client
                    .create_check_run(CreateCheckRun {
                        repo: pr.repo.clone(),
                        name: name.clone(),
                        head_sha: pr.head_sha.clone(),
                        update,
                        details_url,
                    })
                    .await?;
                Ok(())
            }
        }
    }
}

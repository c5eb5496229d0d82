//! The `Mergeable: bot_ci` gate.
//!
//! Branch protection requires `Mergeable: bot_ci` rather than `bot_ci` itself,
//! so PRs on which `bot_ci` never runs can still merge. The gate mirrors the
//! latest `bot_ci` run on the head commit:
//!
//! | `bot_ci` on the head commit | gate |
//! |---|---|
//! | none | completed / success |
//! | not completed | in progress |
//! | completed, success | completed / success |
//! | completed, anything else | completed / failure |
//!
//! It is refreshed whenever `bot_ci` changes and whenever a PR gets a new head.

use tracing::info;

use crate::github::{
    CreateCheckRun, GitHubApiError, ReviewClient, ReviewClientFactory, UpdateCheckRun,
};
use crate::types::{CheckConclusion, CheckRunRef, CheckRunUpdate, CheckState, RepoId, Sha};

/// The CI check the gate follows.
pub const BOT_CI_CHECK_NAME: &str = "bot_ci";

/// The check-run the gate writes.
pub const MERGEABLE_CHECK_NAME: &str = "Mergeable: bot_ci";

/// What the gate shows for the `bot_ci` run on a commit, if there is one.
pub fn gate_update(bot_ci: Option<&CheckRunRef>) -> CheckRunUpdate {
    let Some(run) = bot_ci else {
        return CheckRunUpdate::new(
            CheckState::Completed(CheckConclusion::Success),
            "bot_ci not triggered",
            "The bot_ci check was not triggered for this PR, so merging is allowed.",
        );
    };

    if !run.is_completed() {
        return CheckRunUpdate::new(
            CheckState::InProgress,
            "Waiting for bot_ci to complete",
            format!(
                "The bot_ci check is currently {}. Merging is blocked until it completes successfully.",
                run.status
            ),
        );
    }

    match run.conclusion.as_deref() {
        Some("success") => CheckRunUpdate::new(
            CheckState::Completed(CheckConclusion::Success),
            "bot_ci passed",
            "The bot_ci check has passed. Merging is allowed.",
        ),
        other => {
            let outcome = other.unwrap_or("failed");
            CheckRunUpdate::new(
                CheckState::Completed(CheckConclusion::Failure),
                format!("bot_ci {outcome}"),
                format!("The bot_ci check has {outcome}. Merging is blocked."),
            )
        }
    }
}

/// Writes the gate check-run through a [`ReviewClientFactory`].
#[derive(Debug)]
pub struct MergeableGate<F> {
    github: F,
}

impl<F: ReviewClientFactory> MergeableGate<F> {
    pub fn new(github: F) -> Self {
        MergeableGate { github }
    }

    /// Recomputes the gate for `head_sha` from its `bot_ci` run and writes it,
    /// updating an existing gate run in place. Returns the state written.
    pub async fn refresh(&self, repo: &RepoId, head_sha: &Sha) -> Result<CheckState, GitHubApiError> {
        let client = self.github.client().await?;

        let bot_ci = first_named(
            client.list_check_runs(repo, head_sha, BOT_CI_CHECK_NAME).await?,
            BOT_CI_CHECK_NAME,
        );
        let update = gate_update(bot_ci.as_ref());
        let state = update.state;

        let existing = first_named(
            client
                .list_check_runs(repo, head_sha, MERGEABLE_CHECK_NAME)
                .await?,
            MERGEABLE_CHECK_NAME,
        );
        match existing {
            Some(run) => {
                client
                    .update_check_run(UpdateCheckRun {
                        repo: repo.clone(),
                        check_run_id: run.id,
                        update,
                        details_url: None,
                    })
                    .await?
            }
            None => {
                client
                    .create_check_run(CreateCheckRun {
                        repo: repo.clone(),
                        name: MERGEABLE_CHECK_NAME.to_string(),
                        head_sha: head_sha.clone(),
                        update,
                        details_url: None,
                    })
                    .await?;
            }
        }

        info!(
            repo = %repo,
            head_sha = %head_sha.short(),
            state = %state,
            "Mergeable gate updated"
        );
        Ok(state)
    }
}

fn first_named(runs: Vec<CheckRunRef>, name: &str) -> Option<CheckRunRef> {
    runs.into_iter().find(|run| run.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CheckRunId;

    fn bot_ci(status: &str, conclusion: Option<&str>) -> CheckRunRef {
        CheckRunRef {
            id: CheckRunId(1),
            name: BOT_CI_CHECK_NAME.to_string(),
            status: status.to_string(),
            conclusion: conclusion.map(str::to_string),
        }
    }

    #[test]
    fn missing_bot_ci_allows_merge() {
        let update = gate_update(None);
        assert_eq!(update.state, CheckState::Completed(CheckConclusion::Success));
        assert_eq!(update.output.title, "bot_ci not triggered");
    }

    #[test]
    fn pending_bot_ci_blocks_without_conclusion() {
        for status in ["queued", "in_progress", "waiting"] {
            let update = gate_update(Some(&bot_ci(status, None)));
            assert_eq!(update.state, CheckState::InProgress);
            assert_eq!(update.output.title, "Waiting for bot_ci to complete");
            assert!(update.output.summary.contains(status));
        }
    }

    #[test]
    fn successful_bot_ci_allows_merge() {
        let update = gate_update(Some(&bot_ci("completed", Some("success"))));
        assert_eq!(update.state, CheckState::Completed(CheckConclusion::Success));
        assert_eq!(update.output.title, "bot_ci passed");
    }

    #[test]
    fn any_other_conclusion_blocks_merge() {
        for conclusion in ["failure", "cancelled", "timed_out", "neutral", "skipped"] {
            let update = gate_update(Some(&bot_ci("completed", Some(conclusion))));
            assert_eq!(update.state, CheckState::Completed(CheckConclusion::Failure));
            assert_eq!(update.output.title, format!("bot_ci {conclusion}"));
        }
    }

    #[test]
    fn completed_without_conclusion_reads_as_failed() {
        let update = gate_update(Some(&bot_ci("completed", None)));
        assert_eq!(update.state, CheckState::Completed(CheckConclusion::Failure));
        assert_eq!(update.output.title, "bot_ci failed");
    }
}
